//! Peripheral setup for the voicewatch board
//!
//! Pin map:
//! - UART0 console: RX GPIO3, TX GPIO1, 115200 baud
//! - UART1 GPS receiver: RX GPIO26, TX GPIO19, 9600 baud
//! - Microphone: ADC1 on GPIO34, 11 dB attenuation
//! - Status LED: GPIO2, held low

use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::peripherals::{ADC1, GPIO1, GPIO2, GPIO3, GPIO19, GPIO26, GPIO34, UART0, UART1};
use esp_hal::uart::{Config as UartConfig, ConfigError, Uart};
use log::info;
use voicewatch_core::sensors::{AnalogInput, SensorError};
use voicewatch_core::serial::ByteSource;

use crate::console::{Console, read_buffered_byte};

pub const CONSOLE_BAUD: u32 = 115_200;
pub const GPS_BAUD: u32 = 9_600;

/// Create the operator console on UART0.
pub fn create_console(
    uart0: UART0<'static>,
    rx: GPIO3<'static>,
    tx: GPIO1<'static>,
) -> Result<Console, ConfigError> {
    let uart = Uart::new(uart0, UartConfig::default().with_baudrate(CONSOLE_BAUD))?
        .with_rx(rx)
        .with_tx(tx)
        .into_async();
    Ok(Console::new(uart))
}

/// NMEA receiver on UART1, drained without waiting.
pub struct GpsReceiver {
    uart: Uart<'static, Blocking>,
}

impl ByteSource for GpsReceiver {
    fn try_read_byte(&mut self) -> Option<u8> {
        read_buffered_byte(&mut self.uart)
    }
}

/// Create the GPS receiver on UART1 (8N1).
pub fn create_gps_receiver(
    uart1: UART1<'static>,
    rx: GPIO26<'static>,
    tx: GPIO19<'static>,
) -> Result<GpsReceiver, ConfigError> {
    let uart = Uart::new(uart1, UartConfig::default().with_baudrate(GPS_BAUD))?
        .with_rx(rx)
        .with_tx(tx);
    info!("GPS UART ready at {} baud", GPS_BAUD);
    Ok(GpsReceiver { uart })
}

/// Analog microphone on ADC1.
pub struct Microphone {
    adc: Adc<'static, ADC1<'static>, Blocking>,
    pin: AdcPin<GPIO34<'static>, ADC1<'static>>,
}

impl Microphone {
    pub fn new(adc1: ADC1<'static>, pin: GPIO34<'static>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(pin, Attenuation::_11dB);
        Self {
            adc: Adc::new(adc1, config),
            pin,
        }
    }
}

impl AnalogInput for Microphone {
    async fn read(&mut self) -> Result<u16, SensorError> {
        nb::block!(self.adc.read_oneshot(&mut self.pin)).map_err(|_| SensorError::ReadFailed {
            sensor: "microphone",
            operation: "oneshot conversion",
        })
    }
}

/// Drive the status LED low. It stays off for the life of the device.
pub fn init_status_led(pin: GPIO2<'static>) -> Output<'static> {
    Output::new(pin, Level::Low, OutputConfig::default())
}
