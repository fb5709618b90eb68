#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_net::{Runner, StackResources};
use embassy_time::{Delay, Duration, Instant, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::Flex;
use esp_hal::rng::Rng;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::wifi::WifiDevice;
use log::{error, info, warn};
use static_cell::StaticCell;

use airq_core::app_state::{AppError, Subsystem};
use airq_core::boot::{self, BootScreen};
use airq_core::controller::{Context, Controller};
use airq_core::recovery::{RecoveryAction, RecoveryPolicy};
use airq_core::screens::Panel;
use airq_core::sensors::Ens160;
use airq_core::telemetry::Topics;
use airq_core::watchdog::LivenessGuard;
use airq_firmware::adc::AdcTemperatureInput;
use airq_firmware::clock::EmbassyClock;
use airq_firmware::hardware;
use airq_firmware::mqtt::{MqttBuffers, MqttConnector};
use airq_firmware::panel::OledPanel;
use airq_firmware::probe::{Ds18b20Probe, OneWirePin};
use airq_firmware::watchdog::RtcWatchdog;
use airq_firmware::wifi::EspWifiLink;

/// How often the supervisor feeds the watchdog while it waits.
const SUPERVISOR_FEED_INTERVAL: Duration = Duration::from_secs(1);

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
static MQTT_BUFFERS: StaticCell<MqttBuffers> = StaticCell::new();

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

/// Show the failure and act on the recovery policy. Never returns.
///
/// `feed` keeps an armed watchdog quiet while waiting; before the display
/// loop starts nothing is armed and it does nothing.
async fn supervise<Pn: Panel>(
    panel: &mut Pn,
    policy: &RecoveryPolicy,
    error: AppError,
    mut feed: impl FnMut(),
) -> ! {
    boot::show_fatal(panel, &error).await;

    match policy.decide(&error) {
        RecoveryAction::Halt => {
            error!("Halted: {}", error);
            loop {
                feed();
                Timer::after(SUPERVISOR_FEED_INTERVAL).await;
            }
        }
        RecoveryAction::RestartAfter(delay) => {
            warn!("Restarting in {} ms after: {}", delay.as_millis(), error);
            let deadline = Instant::now() + delay;
            while Instant::now() < deadline {
                feed();
                Timer::after(SUPERVISOR_FEED_INTERVAL.min(delay)).await;
            }
            esp_hal::system::software_reset()
        }
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!(log::LevelFilter::Info);

    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized");

    let config = airq_firmware::firmware_config();
    let policy = RecoveryPolicy::new(&config.recovery);

    let devices =
        match hardware::create_i2c_bus(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9) {
            Ok(devices) => devices,
            Err(e) => {
                // Without the bus there is no panel to show anything on.
                error!("I2C0 configuration rejected: {:?}", e);
                loop {
                    Timer::after(SUPERVISOR_FEED_INTERVAL).await;
                }
            }
        };
    let mut panel = OledPanel::new(devices.display);

    if let Err(e) = config.validate() {
        supervise(&mut panel, &policy, e, || {}).await;
    }

    let mut screen = BootScreen::new();

    if let Err(e) = boot::start_display(&mut panel, &config.display, &mut screen).await {
        supervise(&mut panel, &policy, e, || {}).await;
    }

    let mut sensor = Ens160::new(devices.sensor);
    if let Err(e) = boot::start_sensor(&mut panel, &mut sensor, &mut screen).await {
        supervise(&mut panel, &policy, e, || {}).await;
    }

    let probe = Ds18b20Probe::new(OneWirePin::new(Flex::new(peripherals.GPIO4)));
    let analog = AdcTemperatureInput::new(peripherals.ADC1, peripherals.GPIO1);
    let temperature =
        boot::select_temperature(&mut panel, probe, analog, config.analog, &mut screen).await;

    let radio = match esp_radio::init() {
        Ok(radio) => RADIO.init(radio),
        Err(e) => {
            error!("Radio init failed: {:?}", e);
            supervise(&mut panel, &policy, AppError::Setup(Subsystem::Wifi), || {}).await
        }
    };
    let (controller, interfaces) =
        match esp_radio::wifi::new(radio, peripherals.WIFI, Default::default()) {
            Ok(parts) => parts,
            Err(e) => {
                error!("Wi-Fi controller init failed: {:?}", e);
                supervise(&mut panel, &policy, AppError::Setup(Subsystem::Wifi), || {}).await
            }
        };

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::<4>::new()),
        seed,
    );
    if let Err(e) = spawner.spawn(net_task(runner)) {
        error!("Network task spawn failed: {:?}", e);
        supervise(&mut panel, &policy, AppError::Setup(Subsystem::Wifi), || {}).await;
    }

    let mut link = EspWifiLink::new(controller, stack);
    let address = match boot::join_network(
        &mut panel,
        &mut link,
        &config.internet,
        &config.association,
        &mut Delay,
        &mut screen,
    )
    .await
    {
        Ok(address) => address,
        Err(e) => supervise(&mut panel, &policy, e, || {}).await,
    };

    let mut connector = MqttConnector::new(stack, MQTT_BUFFERS.init(MqttBuffers::new()));
    let transport =
        match boot::connect_broker(&mut panel, &mut connector, &config.mqtt, &mut screen).await {
            Ok(transport) => transport,
            Err(e) => supervise(&mut panel, &policy, e, || {}).await,
        };

    screen.finish();

    let watchdog = LivenessGuard::arm(
        RtcWatchdog::new(Rtc::new(peripherals.LPWR)),
        config.watchdog.timeout(),
        Instant::now(),
    );

    let mut ctx = Context {
        panel,
        sensor,
        temperature,
        transport,
        topics: Topics::from_config(&config.mqtt),
        watchdog,
        delay: Delay,
        address: Some(address),
    };

    let mut controller = Controller::new(&config, Instant::now());
    let error = controller.run(&mut ctx, &EmbassyClock).await;

    info!(
        "Display loop fed the watchdog {} times, longest gap {} ms",
        ctx.watchdog.feeds(),
        ctx.watchdog.longest_gap().as_millis()
    );
    let watchdog = &mut ctx.watchdog;
    supervise(&mut ctx.panel, &policy, error, || watchdog.feed(Instant::now())).await
}
