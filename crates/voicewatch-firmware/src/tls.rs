//! HTTPS transport: DNS and TCP from embassy-net, TLS 1.3 from embedded-tls.
//!
//! The server certificate is not verified.

use alloc::boxed::Box;
use alloc::vec;

use embassy_net::Stack;
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_time::Duration;
use embedded_tls::{
    Aes128GcmSha256, TlsConfig, TlsConnection, TlsContext, TlsError, UnsecureProvider,
};
use log::{debug, warn};
use voicewatch_core::net::{Connection, NetError, Transport};

use crate::rng::HwRng;

const SOCKET_RX_SIZE: usize = 4096;
const SOCKET_TX_SIZE: usize = 4096;
/// Largest TLS record plus overhead.
const TLS_READ_SIZE: usize = 16_640;
const TLS_WRITE_SIZE: usize = 4096;
const SOCKET_TIMEOUT: Duration = Duration::from_secs(15);

/// Opens one TLS session at a time over the embassy-net stack.
///
/// Buffers live on the heap and are reused by every connection.
pub struct TlsTransport {
    stack: Stack<'static>,
    rng: HwRng,
    socket_rx: Box<[u8]>,
    socket_tx: Box<[u8]>,
    tls_read: Box<[u8]>,
    tls_write: Box<[u8]>,
}

impl TlsTransport {
    pub fn new(stack: Stack<'static>, rng: HwRng) -> Self {
        Self {
            stack,
            rng,
            socket_rx: vec![0; SOCKET_RX_SIZE].into_boxed_slice(),
            socket_tx: vec![0; SOCKET_TX_SIZE].into_boxed_slice(),
            tls_read: vec![0; TLS_READ_SIZE].into_boxed_slice(),
            tls_write: vec![0; TLS_WRITE_SIZE].into_boxed_slice(),
        }
    }
}

pub struct TlsStream<'a> {
    tls: TlsConnection<'a, TcpSocket<'a>, Aes128GcmSha256>,
}

impl Transport for TlsTransport {
    type Connection<'a>
        = TlsStream<'a>
    where
        Self: 'a;

    async fn connect(&mut self, host: &str, port: u16) -> Result<TlsStream<'_>, NetError> {
        let addresses = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(|e| {
                warn!("DNS lookup for {} failed: {:?}", host, e);
                NetError::Dns
            })?;
        let address = addresses.first().copied().ok_or(NetError::Dns)?;
        debug!("{} resolved to {}", host, address);

        let mut socket = TcpSocket::new(self.stack, &mut self.socket_rx, &mut self.socket_tx);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        socket.connect((address, port)).await.map_err(|e| {
            warn!("TCP connect to {}:{} failed: {:?}", address, port, e);
            NetError::Connect
        })?;

        let config = TlsConfig::new().with_server_name(host);
        let mut tls = TlsConnection::new(socket, &mut self.tls_read, &mut self.tls_write);
        tls.open(TlsContext::new(
            &config,
            UnsecureProvider::new::<Aes128GcmSha256>(&mut self.rng),
        ))
        .await
        .map_err(|e| {
            warn!("TLS handshake with {} failed: {:?}", host, e);
            NetError::Tls("handshake failed")
        })?;

        Ok(TlsStream { tls })
    }
}

impl Connection for TlsStream<'_> {
    async fn write_all(&mut self, mut bytes: &[u8]) -> Result<(), NetError> {
        while !bytes.is_empty() {
            let written = self.tls.write(bytes).await.map_err(|e| {
                warn!("TLS write failed: {:?}", e);
                NetError::Tls("write failed")
            })?;
            if written == 0 {
                return Err(NetError::Io);
            }
            bytes = &bytes[written..];
        }

        self.tls.flush().await.map_err(|e| {
            warn!("TLS flush failed: {:?}", e);
            NetError::Tls("flush failed")
        })
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        match self.tls.read(buf).await {
            Ok(read) => Ok(read),
            Err(TlsError::ConnectionClosed) => Ok(0),
            Err(e) => {
                debug!("TLS read failed: {:?}", e);
                Err(NetError::Tls("read failed"))
            }
        }
    }

    async fn close(self) {
        match self.tls.close().await {
            Ok(mut socket) => socket.close(),
            Err((mut socket, e)) => {
                debug!("TLS close failed: {:?}", e);
                socket.abort();
            }
        }
    }
}
