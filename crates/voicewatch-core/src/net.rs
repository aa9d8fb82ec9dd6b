//! Network seams: the WiFi station link and the secure transport used to
//! reach the alert endpoint.

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    #[error("WiFi link error: {0}")]
    Link(&'static str),
    #[error("DNS lookup failed")]
    Dns,
    #[error("TCP connect failed")]
    Connect,
    #[error("TLS error: {0}")]
    Tls(&'static str),
    #[error("connection I/O failed")]
    Io,
}

/// WiFi station control, in the shape of a non-blocking `begin`/`status` API.
pub trait WifiLink {
    /// Whether the station is associated and has an IP configuration.
    fn is_connected(&mut self) -> bool;

    /// Start associating with the given network.
    ///
    /// Returns once the attempt is under way; poll [`WifiLink::is_connected`]
    /// to find out whether it succeeded.
    fn begin(&mut self, ssid: &str, password: &str) -> impl Future<Output = Result<(), NetError>>;
}

/// One open, secured byte stream to a remote host.
pub trait Connection {
    fn write_all(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), NetError>>;

    /// Read whatever is available, waiting for at least one byte.
    ///
    /// `Ok(0)` means the peer closed the stream.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, NetError>>;

    /// Shut the stream down. Errors while closing are not interesting.
    fn close(self) -> impl Future<Output = ()>;
}

/// Opens secured connections. One connection is alive at a time.
pub trait Transport {
    type Connection<'a>: Connection
    where
        Self: 'a;

    fn connect(
        &mut self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Connection<'_>, NetError>>;
}
