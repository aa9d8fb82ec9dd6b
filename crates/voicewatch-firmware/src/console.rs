//! Operator console on UART0.

use embedded_io_async::{ErrorKind, ErrorType, Read, Write};
use esp_hal::Async;
use esp_hal::uart::Uart;
use log::warn;
use voicewatch_core::serial::ByteSource;

/// The USB-serial console: configuration prompts in, status reports out.
pub struct Console {
    uart: Uart<'static, Async>,
}

impl Console {
    pub fn new(uart: Uart<'static, Async>) -> Self {
        Self { uart }
    }
}

impl ErrorType for Console {
    type Error = ErrorKind;
}

impl Read for Console {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.uart.read_async(buf).await.map_err(|e| {
            warn!("Console RX error: {:?}", e);
            ErrorKind::Other
        })
    }
}

impl Write for Console {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.uart.write_async(buf).await.map_err(|e| {
            warn!("Console TX error: {:?}", e);
            ErrorKind::Other
        })
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.uart.flush_async().await.map_err(|e| {
            warn!("Console flush error: {:?}", e);
            ErrorKind::Other
        })
    }
}

impl ByteSource for Console {
    fn try_read_byte(&mut self) -> Option<u8> {
        read_buffered_byte(&mut self.uart)
    }
}

/// Take one byte from the UART RX FIFO if one is waiting.
pub(crate) fn read_buffered_byte<Dm: esp_hal::DriverMode>(uart: &mut Uart<'_, Dm>) -> Option<u8> {
    let mut byte = [0u8; 1];
    match uart.read_buffered(&mut byte) {
        Ok(1) => Some(byte[0]),
        Ok(_) => None,
        Err(e) => {
            warn!("UART RX error: {:?}", e);
            None
        }
    }
}
