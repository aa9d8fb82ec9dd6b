//! Test doubles for the hardware seams.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use core::convert::Infallible;

use embedded_io_async::{ErrorType, Read, Write};

use crate::net::{Connection, NetError, Transport, WifiLink};
use crate::sensors::{AnalogInput, SensorError};
use crate::serial::ByteSource;

/// A serial link with canned input that records everything written to it.
///
/// Reads return `Ok(0)` once the input is exhausted.
#[derive(Debug, Default)]
pub struct ScriptedSerial {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl ScriptedSerial {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
        }
    }

    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
    }
}

impl ErrorType for ScriptedSerial {
    type Error = Infallible;
}

impl Read for ScriptedSerial {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let count = buf.len().min(self.input.len());
        for (slot, byte) in buf.iter_mut().zip(self.input.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

impl Write for ScriptedSerial {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl ByteSource for ScriptedSerial {
    fn try_read_byte(&mut self) -> Option<u8> {
        self.input.pop_front()
    }
}

/// A microphone replaying a fixed cycle of levels.
#[derive(Debug)]
pub struct ScriptedMicrophone {
    levels: Vec<u16>,
    reads: usize,
    fail: bool,
}

impl ScriptedMicrophone {
    pub fn new(levels: &[u16]) -> Self {
        Self {
            levels: levels.to_vec(),
            reads: 0,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            levels: Vec::new(),
            reads: 0,
            fail: true,
        }
    }

    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl AnalogInput for ScriptedMicrophone {
    async fn read(&mut self) -> Result<u16, SensorError> {
        if self.fail {
            return Err(SensorError::ReadFailed {
                sensor: "microphone",
                operation: "scripted read",
            });
        }
        let level = self.levels[self.reads % self.levels.len()];
        self.reads += 1;
        Ok(level)
    }
}

/// A WiFi station whose association succeeds after a set number of polls.
#[derive(Debug, Default)]
pub struct MockWifi {
    connected: bool,
    connect_after_polls: Option<u32>,
    polls_since_begin: u32,
    begins: Vec<(String, String)>,
}

impl MockWifi {
    pub fn online() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    pub fn offline() -> Self {
        Self::default()
    }

    /// Offline until `begin`, then connected from the `polls`-th poll on.
    pub fn connecting_after(polls: u32) -> Self {
        Self {
            connect_after_polls: Some(polls),
            ..Default::default()
        }
    }

    pub fn begins(&self) -> &[(String, String)] {
        &self.begins
    }

    pub fn drop_link(&mut self) {
        self.connected = false;
        self.connect_after_polls = None;
    }
}

impl WifiLink for MockWifi {
    fn is_connected(&mut self) -> bool {
        if let Some(polls) = self.connect_after_polls {
            if !self.begins.is_empty() {
                self.polls_since_begin += 1;
                if self.polls_since_begin >= polls {
                    self.connected = true;
                }
            }
        }
        self.connected
    }

    async fn begin(&mut self, ssid: &str, password: &str) -> Result<(), NetError> {
        self.begins.push((ssid.into(), password.into()));
        self.polls_since_begin = 0;
        Ok(())
    }
}

/// How the fake endpoint behaves once a connection is attempted.
#[derive(Debug, Clone)]
pub enum PeerBehaviour {
    /// Send these bytes, then close.
    Respond(Vec<u8>),
    /// Send these bytes, then stay open and silent forever.
    HangAfter(Vec<u8>),
    /// Refuse the TCP connection.
    Refuse,
    /// Accept the connection but fail every write.
    BrokenPipe,
}

impl PeerBehaviour {
    pub fn respond(bytes: &[u8]) -> Self {
        Self::Respond(bytes.to_vec())
    }

    pub fn hang_after(bytes: &[u8]) -> Self {
        Self::HangAfter(bytes.to_vec())
    }
}

#[derive(Debug)]
pub struct MockTransport {
    peer: PeerBehaviour,
    connects: Vec<(String, u16)>,
    written: Vec<u8>,
    closed: bool,
}

impl MockTransport {
    pub fn new(peer: PeerBehaviour) -> Self {
        Self {
            peer,
            connects: Vec::new(),
            written: Vec::new(),
            closed: false,
        }
    }

    pub fn set_peer(&mut self, peer: PeerBehaviour) {
        self.peer = peer;
    }

    pub fn connects(&self) -> &[(String, u16)] {
        &self.connects
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    pub fn closed(&self) -> bool {
        self.closed
    }
}

pub struct MockConnection<'a> {
    transport: &'a mut MockTransport,
    pending: VecDeque<u8>,
    hang: bool,
}

impl Transport for MockTransport {
    type Connection<'a>
        = MockConnection<'a>
    where
        Self: 'a;

    async fn connect(&mut self, host: &str, port: u16) -> Result<MockConnection<'_>, NetError> {
        self.connects.push((host.into(), port));
        self.closed = false;

        let (pending, hang) = match &self.peer {
            PeerBehaviour::Refuse => return Err(NetError::Connect),
            PeerBehaviour::Respond(bytes) => (bytes.iter().copied().collect(), false),
            PeerBehaviour::HangAfter(bytes) => (bytes.iter().copied().collect(), true),
            PeerBehaviour::BrokenPipe => (VecDeque::new(), false),
        };

        Ok(MockConnection {
            transport: self,
            pending,
            hang,
        })
    }
}

impl Connection for MockConnection<'_> {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), NetError> {
        if matches!(self.transport.peer, PeerBehaviour::BrokenPipe) {
            return Err(NetError::Io);
        }
        self.transport.written.extend_from_slice(bytes);
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        if self.pending.is_empty() {
            if self.hang {
                core::future::pending::<()>().await;
            }
            return Ok(0);
        }

        // Dribble the response out in small chunks so lines arrive split.
        let count = buf.len().min(self.pending.len()).min(7);
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    async fn close(self) {
        self.transport.closed = true;
    }
}
