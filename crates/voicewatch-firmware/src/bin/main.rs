#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_net::StackResources;
use embassy_time::{Duration, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};
use rand::RngCore;
use static_cell::StaticCell;
use voicewatch_core::supervisor::{Devices, Supervisor, Timings};
use voicewatch_core::threat::SimulatedThreatSource;
use voicewatch_firmware::hardware::{
    Microphone, create_console, create_gps_receiver, init_status_led,
};
use voicewatch_firmware::rng::HwRng;
use voicewatch_firmware::tls::TlsTransport;
use voicewatch_firmware::wifi::StationLink;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);
    // TLS record buffers
    esp_alloc::heap_allocator!(size: 36 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized");

    let _led = init_status_led(peripherals.GPIO2);
    let console = create_console(peripherals.UART0, peripherals.GPIO3, peripherals.GPIO1)
        .expect("Failed to initialize console UART");
    let gps_uart = create_gps_receiver(peripherals.UART1, peripherals.GPIO26, peripherals.GPIO19)
        .expect("Failed to initialize GPS UART");
    let microphone = Microphone::new(peripherals.ADC1, peripherals.GPIO34);

    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio_init =
        RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));
    let (wifi_controller, interfaces) =
        esp_radio::wifi::new(radio_init, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");

    let mut rng = HwRng::new();
    static NET_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();
    let (stack, mut runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        rng.next_u64(),
    );

    let devices = Devices {
        console,
        gps_uart,
        microphone,
        wifi: StationLink::new(wifi_controller, stack),
        transport: TlsTransport::new(stack, rng),
        threats: SimulatedThreatSource::new(HwRng::new()),
    };

    let app = async move {
        match Supervisor::boot(devices, Timings::default()).await {
            Ok(supervisor) => supervisor.run().await,
            Err(e) => {
                error!("Boot failed: {}", e);
                loop {
                    Timer::after(Duration::from_secs(1)).await;
                }
            }
        }
    };

    // The network stack only makes progress while its runner is polled.
    let (never, _) = join(runner.run(), app).await;
    never
}
