//! Serial link helpers shared by the console and the GPS receiver.

use alloc::string::String;
use alloc::vec::Vec;

use embedded_io_async::{Read, Write};
use log::warn;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    #[error("serial read failed")]
    Read,
    #[error("serial write failed")]
    Write,
    #[error("serial stream closed before a line feed")]
    Closed,
}

/// A receiver that can be drained without waiting.
///
/// Returns `None` when no byte is buffered right now.
pub trait ByteSource {
    fn try_read_byte(&mut self) -> Option<u8>;
}

/// Read one line from a blocking stream.
///
/// Accumulates bytes until a line feed. Carriage returns are dropped wherever
/// they appear, the line feed itself is never part of the result, and an
/// empty line is a valid answer. Waits for as long as the stream stays silent.
pub async fn read_line<R: Read>(reader: &mut R) -> Result<String, SerialError> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        let read = reader.read(&mut byte).await.map_err(|e| {
            warn!("Serial read failed: {:?}", e);
            SerialError::Read
        })?;

        if read == 0 {
            return Err(SerialError::Closed);
        }

        match byte[0] {
            b'\n' => break,
            b'\r' => {}
            other => line.push(other),
        }
    }

    Ok(String::from_utf8_lossy(&line).into_owned())
}

/// Write `text` followed by CRLF and flush.
pub async fn write_line<W: Write>(writer: &mut W, text: &str) -> Result<(), SerialError> {
    write_str(writer, text).await?;
    write_str(writer, "\r\n").await
}

/// Write `text` verbatim and flush.
pub async fn write_str<W: Write>(writer: &mut W, text: &str) -> Result<(), SerialError> {
    writer.write_all(text.as_bytes()).await.map_err(|e| {
        warn!("Serial write failed: {:?}", e);
        SerialError::Write
    })?;
    writer.flush().await.map_err(|e| {
        warn!("Serial flush failed: {:?}", e);
        SerialError::Write
    })
}
