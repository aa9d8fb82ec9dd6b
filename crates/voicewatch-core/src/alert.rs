//! Emergency alert delivery.
//!
//! An alert is a single HTTP/1.1 POST to the Supabase REST table, written by
//! hand over a TLS connection. The response is not parsed: it is scanned
//! line by line for a status line carrying `200` or `201`.
//!
//! Delivery is one blocking exchange. While [`AlertDispatcher::dispatch`]
//! waits for the response (up to its timeout), nothing else in the poll loop
//! runs: GPS bytes queue up in the UART and console commands wait.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write as _;

use embassy_time::{Duration, with_timeout};
use log::{debug, info, warn};
use serde::Serialize;
use thiserror_no_std::Error;

use crate::config::DeviceConfig;
use crate::constants::{ALERT_PATH, HTTPS_PORT};
use crate::gps::Position;
use crate::net::{Connection, NetError, Transport};

/// The only status value ever stored in the alerts table.
pub const ALERT_STATUS: &str = "emergency";

/// Longest response line kept in full; the rest of a longer line is dropped.
const MAX_LINE_LEN: usize = 512;

/// Response text retained for the debug log.
const MAX_RESPONSE_LEN: usize = 1024;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertError {
    #[error("could not reach endpoint: {0}")]
    Connect(NetError),
    #[error("could not serialize alert payload")]
    Serialize,
    #[error("could not send request: {0}")]
    Send(NetError),
    #[error("endpoint did not answer 200/201")]
    NotAccepted,
}

/// One alert as raised by the supervisor. Lives only for the dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertEvent<'a> {
    /// Alert number, counted from 1 since boot.
    pub sequence: u32,
    pub keyword: &'a str,
    pub threat_type: &'a str,
    pub confidence: u8,
    pub position: Position,
}

#[derive(Debug, Serialize)]
pub struct GpsLocation {
    pub lat: f64,
    pub lng: f64,
}

/// JSON body of the POST. Field order is the wire order.
#[derive(Debug, Serialize)]
pub struct AlertPayload<'a> {
    pub person_name: &'a str,
    pub place_name: &'a str,
    pub phone_number: &'a str,
    pub threat_call: &'a str,
    pub status: &'a str,
    pub gps_location: GpsLocation,
}

impl<'a> AlertPayload<'a> {
    /// Build the payload for `event`.
    ///
    /// `status` is accepted but not used: the stored status is always
    /// [`ALERT_STATUS`].
    pub fn new(config: &'a DeviceConfig, event: &AlertEvent<'a>, status: &'a str) -> Self {
        if status != ALERT_STATUS {
            debug!("Status '{}' replaced by '{}'", status, ALERT_STATUS);
        }

        Self {
            person_name: &config.person_name,
            place_name: &config.place_name,
            phone_number: &config.phone_number,
            threat_call: event.keyword,
            status: ALERT_STATUS,
            gps_location: GpsLocation {
                lat: event.position.latitude,
                lng: event.position.longitude,
            },
        }
    }

    pub fn to_json(&self) -> Result<String, AlertError> {
        serde_json::to_string(self).map_err(|e| {
            warn!("Alert payload serialization failed: {}", e);
            AlertError::Serialize
        })
    }
}

/// Render the full POST request, headers and body.
pub fn build_request(host: &str, api_key: &str, body: &str) -> String {
    let mut request = String::with_capacity(256 + host.len() + 2 * api_key.len() + body.len());

    // Writing into a String cannot fail.
    let _ = write!(
        request,
        "POST {ALERT_PATH} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Content-Type: application/json\r\n\
         apikey: {api_key}\r\n\
         Authorization: Bearer {api_key}\r\n\
         Prefer: return=minimal\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        body.len()
    );

    request
}

/// Whether a response line reports success.
///
/// The line must start with `HTTP/` and contain `200` or `201` anywhere past
/// its first character.
pub fn is_success_status(line: &str) -> bool {
    line.starts_with("HTTP/")
        && ["200", "201"]
            .iter()
            .any(|code| line.find(code).is_some_and(|index| index > 0))
}

/// Splits a response byte stream into lines and watches for a success line.
#[derive(Debug, Default)]
pub struct ResponseScanner {
    line: Vec<u8>,
    response: String,
    accepted: bool,
}

impl ResponseScanner {
    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == b'\n' {
                self.finish_line();
            } else if self.line.len() < MAX_LINE_LEN {
                self.line.push(byte);
            }
        }
    }

    /// Flush a trailing line that was never terminated.
    pub fn finish(&mut self) {
        if !self.line.is_empty() {
            self.finish_line();
        }
    }

    pub fn accepted(&self) -> bool {
        self.accepted
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    fn finish_line(&mut self) {
        let line = String::from_utf8_lossy(&self.line);

        if is_success_status(&line) {
            self.accepted = true;
        }

        if self.response.len() + line.len() < MAX_RESPONSE_LEN {
            self.response.push_str(&line);
            self.response.push('\n');
        }

        self.line.clear();
    }
}

/// Posts alerts through a [`Transport`].
pub struct AlertDispatcher<T> {
    transport: T,
    response_timeout: Duration,
}

impl<T: Transport> AlertDispatcher<T> {
    pub fn new(transport: T, response_timeout: Duration) -> Self {
        Self {
            transport,
            response_timeout,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Post `event` to the configured endpoint.
    ///
    /// Connects to `endpoint_host:443`, writes the request and reads until
    /// the peer closes or the response timeout elapses. `Ok(())` means a
    /// `200`/`201` status line was seen. There is no retry.
    pub async fn dispatch(
        &mut self,
        config: &DeviceConfig,
        event: &AlertEvent<'_>,
        status: &str,
    ) -> Result<(), AlertError> {
        let mut connection = self
            .transport
            .connect(&config.endpoint_host, HTTPS_PORT)
            .await
            .map_err(AlertError::Connect)?;

        let body = match AlertPayload::new(config, event, status).to_json() {
            Ok(body) => body,
            Err(e) => {
                connection.close().await;
                return Err(e);
            }
        };
        let request = build_request(&config.endpoint_host, &config.api_key, &body);

        if let Err(e) = connection.write_all(request.as_bytes()).await {
            connection.close().await;
            return Err(AlertError::Send(e));
        }
        debug!("Alert #{} sent ({} byte body)", event.sequence, body.len());

        let mut scanner = ResponseScanner::default();
        match with_timeout(
            self.response_timeout,
            read_response(&mut connection, &mut scanner),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Response read ended early: {}", e),
            Err(_) => debug!("No close from endpoint within {:?}", self.response_timeout),
        }
        scanner.finish();
        connection.close().await;

        debug!("Endpoint response:\n{}", scanner.response());

        if scanner.accepted() {
            info!("Alert #{} accepted by endpoint", event.sequence);
            Ok(())
        } else {
            Err(AlertError::NotAccepted)
        }
    }
}

async fn read_response<C: Connection>(
    connection: &mut C,
    scanner: &mut ResponseScanner,
) -> Result<(), NetError> {
    let mut buf = [0u8; 256];
    loop {
        let read = connection.read(&mut buf).await?;
        if read == 0 {
            return Ok(());
        }
        scanner.feed(&buf[..read]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTransport, PeerBehaviour};
    use embassy_futures::block_on;
    use embassy_time::Instant;

    fn config() -> DeviceConfig {
        DeviceConfig {
            wifi_ssid: "home-net".into(),
            wifi_password: "hunter2".into(),
            person_name: "Ada".into(),
            place_name: "Main Street".into(),
            phone_number: "+15550100".into(),
            endpoint_host: "abc.supabase.co".into(),
            api_key: "anon-key".into(),
        }
    }

    fn event() -> AlertEvent<'static> {
        AlertEvent {
            sequence: 1,
            keyword: "fire",
            threat_type: "fire_emergency",
            confidence: 90,
            position: Position {
                latitude: 48.5,
                longitude: 11.25,
                lock_acquired: true,
            },
        }
    }

    fn dispatcher(peer: PeerBehaviour) -> AlertDispatcher<MockTransport> {
        AlertDispatcher::new(MockTransport::new(peer), Duration::from_millis(50))
    }

    #[test]
    fn test_payload_json_layout() {
        let config = config();
        let event = event();

        let json = AlertPayload::new(&config, &event, ALERT_STATUS)
            .to_json()
            .unwrap();

        assert_eq!(
            json,
            "{\"person_name\":\"Ada\",\"place_name\":\"Main Street\",\
             \"phone_number\":\"+15550100\",\"threat_call\":\"fire\",\
             \"status\":\"emergency\",\"gps_location\":{\"lat\":48.5,\"lng\":11.25}}"
        );
    }

    #[test]
    fn test_status_argument_is_overridden() {
        let config = config();
        let event = event();

        let payload = AlertPayload::new(&config, &event, "test");
        let json = payload.to_json().unwrap();

        assert_eq!(payload.status, "emergency");
        assert!(json.contains("\"status\":\"emergency\""));
        assert!(!json.contains("\"test\""));
    }

    #[test]
    fn test_payload_escapes_user_text() {
        let mut config = config();
        config.person_name = "Ada \"Countess\" Lovelace".into();
        let event = event();

        let json = AlertPayload::new(&config, &event, ALERT_STATUS)
            .to_json()
            .unwrap();

        assert!(json.contains("\"person_name\":\"Ada \\\"Countess\\\" Lovelace\""));
    }

    #[test]
    fn test_request_headers_and_body() {
        let body = "{\"a\":1}";

        let request = build_request("abc.supabase.co", "anon-key", body);

        assert_eq!(
            request,
            "POST /rest/v1/emergency_alerts HTTP/1.1\r\n\
             Host: abc.supabase.co\r\n\
             Content-Type: application/json\r\n\
             apikey: anon-key\r\n\
             Authorization: Bearer anon-key\r\n\
             Prefer: return=minimal\r\n\
             Content-Length: 7\r\n\
             Connection: close\r\n\
             \r\n\
             {\"a\":1}"
        );
    }

    #[test]
    fn test_content_length_counts_bytes() {
        let body = "{\"place\":\"Zürich\"}";

        let request = build_request("h", "k", body);

        assert_eq!(body.len(), 19);
        assert!(request.contains("Content-Length: 19\r\n"));
    }

    #[test]
    fn test_success_status_lines() {
        assert!(is_success_status("HTTP/1.1 200 OK\r"));
        assert!(is_success_status("HTTP/1.1 201 Created"));
        assert!(is_success_status("HTTP/2 201"));
        assert!(!is_success_status("HTTP/1.1 401 Unauthorized"));
        assert!(!is_success_status("HTTP/1.1 500 Internal Server Error"));
        assert!(!is_success_status("Content-Length: 200"));
        assert!(!is_success_status("200 HTTP/1.1"));
    }

    #[test]
    fn test_scanner_handles_split_and_unterminated_lines() {
        let mut scanner = ResponseScanner::default();

        scanner.feed(b"HTTP/1.1 2");
        assert!(!scanner.accepted());
        scanner.feed(b"01 Created");
        scanner.finish();

        assert!(scanner.accepted());
        assert_eq!(scanner.response(), "HTTP/1.1 201 Created\n");
    }

    #[test]
    fn test_created_response_is_success() {
        let mut dispatcher = dispatcher(PeerBehaviour::respond(
            b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\n\r\n",
        ));

        let result = block_on(dispatcher.dispatch(&config(), &event(), ALERT_STATUS));

        assert_eq!(result, Ok(()));
        let transport = dispatcher.transport();
        assert_eq!(transport.connects(), &[(String::from("abc.supabase.co"), 443)]);
        assert!(transport.closed());
    }

    #[test]
    fn test_unauthorized_response_is_failure() {
        let mut dispatcher = dispatcher(PeerBehaviour::respond(
            b"HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\n\r\n{\"message\":\"Invalid API key\",\"code\":200}",
        ));

        let result = block_on(dispatcher.dispatch(&config(), &event(), ALERT_STATUS));

        assert_eq!(result, Err(AlertError::NotAccepted));
        assert!(dispatcher.transport().closed());
    }

    #[test]
    fn test_silent_peer_times_out() {
        let mut dispatcher = dispatcher(PeerBehaviour::hang_after(b"HTTP/1.1 102 Processing\r\n"));

        let started = Instant::now();
        let result = block_on(dispatcher.dispatch(&config(), &event(), ALERT_STATUS));

        assert_eq!(result, Err(AlertError::NotAccepted));
        assert!(started.elapsed() >= Duration::from_millis(50));
        assert!(dispatcher.transport().closed());
    }

    #[test]
    fn test_refused_connection_sends_nothing() {
        let mut dispatcher = dispatcher(PeerBehaviour::Refuse);

        let result = block_on(dispatcher.dispatch(&config(), &event(), ALERT_STATUS));

        assert_eq!(result, Err(AlertError::Connect(NetError::Connect)));
        assert!(dispatcher.transport().written().is_empty());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut dispatcher = dispatcher(PeerBehaviour::BrokenPipe);

        let result = block_on(dispatcher.dispatch(&config(), &event(), ALERT_STATUS));

        assert_eq!(result, Err(AlertError::Send(NetError::Io)));
        assert!(dispatcher.transport().closed());
    }

    #[test]
    fn test_written_request_matches_payload() {
        let config = config();
        let event = event();
        let mut dispatcher = dispatcher(PeerBehaviour::respond(b"HTTP/1.1 201 Created\r\n\r\n"));

        block_on(dispatcher.dispatch(&config, &event, "test")).unwrap();

        let body = AlertPayload::new(&config, &event, ALERT_STATUS)
            .to_json()
            .unwrap();
        let expected = build_request("abc.supabase.co", "anon-key", &body);
        assert_eq!(dispatcher.transport().written(), expected.as_bytes());
    }
}
