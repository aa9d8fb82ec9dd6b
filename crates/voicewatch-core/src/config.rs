//! Device configuration entered over the console at boot.

use alloc::string::String;
use core::fmt;

use embedded_io_async::{Read, Write};
use log::info;

use crate::serial::{SerialError, read_line, write_line};

/// Console prompts, in the order the fields are requested.
pub const PROMPTS: [&str; 7] = [
    "Enter WiFi SSID:",
    "Enter WiFi Password:",
    "Enter Person Name:",
    "Enter Place Name:",
    "Enter Phone Number:",
    "Enter Supabase URL:",
    "Enter Supabase Anon Key:",
];

/// Everything the device needs to know about its owner and its endpoint.
///
/// Filled once during boot and never modified afterwards. Values are taken
/// verbatim: no trimming, no validation, empty strings allowed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DeviceConfig {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub person_name: String,
    pub place_name: String,
    pub phone_number: String,
    /// Host name of the REST endpoint, also sent as the `Host` header.
    pub endpoint_host: String,
    /// Anon key, sent both as `apikey` and as the bearer token.
    pub api_key: String,
}

impl DeviceConfig {
    /// Prompt for and read the seven fields over a console link.
    pub async fn request<C: Read + Write>(console: &mut C) -> Result<Self, SerialError> {
        let mut fields: [String; 7] = Default::default();

        for (field, prompt) in fields.iter_mut().zip(PROMPTS) {
            write_line(console, prompt).await?;
            *field = read_line(console).await?;
        }

        let [
            wifi_ssid,
            wifi_password,
            person_name,
            place_name,
            phone_number,
            endpoint_host,
            api_key,
        ] = fields;

        let config = Self {
            wifi_ssid,
            wifi_password,
            person_name,
            place_name,
            phone_number,
            endpoint_host,
            api_key,
        };
        info!("Configuration received: {:?}", config);

        Ok(config)
    }
}

// Secrets stay out of the logs.
impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("wifi_ssid", &self.wifi_ssid)
            .field("wifi_password", &"***")
            .field("person_name", &self.person_name)
            .field("place_name", &self.place_name)
            .field("phone_number", &self.phone_number)
            .field("endpoint_host", &self.endpoint_host)
            .field("api_key", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testing::ScriptedSerial;
    use embassy_futures::block_on;
    use std::format;

    #[test]
    fn test_fields_are_read_in_order() {
        let mut console = ScriptedSerial::new(
            b"home-net\r\nhunter2\r\nAda\r\nMain Street\r\n+15550100\r\nabc.supabase.co\r\nanon-key\r\n",
        );

        let config = block_on(DeviceConfig::request(&mut console)).unwrap();

        assert_eq!(config.wifi_ssid, "home-net");
        assert_eq!(config.wifi_password, "hunter2");
        assert_eq!(config.person_name, "Ada");
        assert_eq!(config.place_name, "Main Street");
        assert_eq!(config.phone_number, "+15550100");
        assert_eq!(config.endpoint_host, "abc.supabase.co");
        assert_eq!(config.api_key, "anon-key");
    }

    #[test]
    fn test_no_field_keeps_a_carriage_return() {
        let mut console = ScriptedSerial::new(b"a\r\nb\r\nc\r\nd\r\ne\r\nf\r\ng\r\n");

        let config = block_on(DeviceConfig::request(&mut console)).unwrap();

        for field in [
            &config.wifi_ssid,
            &config.wifi_password,
            &config.person_name,
            &config.place_name,
            &config.phone_number,
            &config.endpoint_host,
            &config.api_key,
        ] {
            assert_eq!(field.len(), 1);
            assert!(!field.contains('\r'));
        }
    }

    #[test]
    fn test_prompts_are_printed_before_each_read() {
        let mut console = ScriptedSerial::new(b"\n\n\n\n\n\n\n");

        block_on(DeviceConfig::request(&mut console)).unwrap();

        let expected: std::string::String = PROMPTS.iter().map(|p| format!("{p}\r\n")).collect();
        assert_eq!(console.output(), expected);
    }

    #[test]
    fn test_missing_fields_fail_on_closed_stream() {
        let mut console = ScriptedSerial::new(b"ssid\npassword\n");

        assert_eq!(
            block_on(DeviceConfig::request(&mut console)),
            Err(SerialError::Closed)
        );
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = DeviceConfig {
            wifi_password: "hunter2".into(),
            api_key: "anon-key".into(),
            ..Default::default()
        };

        let rendered = format!("{:?}", config);

        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("anon-key"));
    }
}
