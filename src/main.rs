//! RemoteLaserScope - firmware entry point
//!
//! Boots the board, brings up Wi-Fi and the HTTP/WebSocket server, hooks
//! the trigger ISR, then runs the cooperative sampling loop forever. All
//! of that only exists on the device; on the host this binary is a stub
//! and the core is exercised by `cargo test`.

#[cfg(target_os = "espidf")]
mod server;

#[cfg(target_os = "espidf")]
mod firmware {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::gpio::{InterruptType, PinDriver, Pull};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::log::EspLogger;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sys::EspError;
    use esp_idf_svc::wifi::{
        AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration, Configuration,
        EspWifi,
    };

    use log::{info, warn};

    use remote_laser_scope::hal::esp::{EspClock, PiezoOutput, ScopeInput};
    use remote_laser_scope::hal::FeedbackDac;
    use remote_laser_scope::{
        DeviceConfig, LockOutputs, MonotonicClock, SampleSettings, Sampler, Step, TriggerLatch,
    };

    use crate::server::ScopeServer;

    /// Device configuration, baked in at build time (same JSON schema the
    /// board used to read from flash).
    const CONFIG_JSON: &str = include_str!("../config.json");

    // Shared between ISR / HTTP handlers / sampling loop. All lock-free.
    static TRIGGER: TriggerLatch = TriggerLatch::new();
    static SETTINGS: SampleSettings = SampleSettings::new();
    static LOCKS: LockOutputs = LockOutputs::new();

    pub fn run() -> Result<(), EspError> {
        esp_idf_svc::sys::link_patches();
        EspLogger::initialize_default();
        info!("{}", env!("VERSION_STRING"));

        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        let config = DeviceConfig::load(CONFIG_JSON);
        SETTINGS.request(config.resolution_ms(), config.duration_ms());
        SETTINGS.promote();

        // Pins. The LED is inverted: low is on, signalling the board runs.
        let mut led = PinDriver::output(peripherals.pins.gpio2)?;
        led.set_low()?;

        // Lock outputs must begin low.
        let mut slow_lock = PinDriver::output(peripherals.pins.gpio23)?;
        let mut fast_lock = PinDriver::output(peripherals.pins.gpio22)?;
        slow_lock.set_low()?;
        fast_lock.set_low()?;

        let mut piezo = PiezoOutput::new(peripherals.pins.gpio26)?;
        piezo.set_level(255);

        let mut analog = ScopeInput::new(peripherals.adc1, peripherals.pins.gpio34)?;

        // Trigger input: latch the clock on every rising edge. The closure
        // runs in ISR context; it performs the single latch store and
        // nothing else.
        let mut trigger_pin = PinDriver::input(peripherals.pins.gpio14)?;
        trigger_pin.set_pull(Pull::Down)?;
        trigger_pin.set_interrupt_type(InterruptType::PosEdge)?;
        unsafe {
            trigger_pin.subscribe(|| TRIGGER.record(EspClock.now()))?;
        }
        trigger_pin.enable_interrupt()?;

        // Network
        let mut wifi = BlockingWifi::wrap(
            EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?,
            sysloop,
        )?;
        connect_wifi(&mut wifi, &config)?;

        // HTTP + WebSocket server; it owns the lock pins so its handlers
        // can write them.
        let name: &'static str = Box::leak(config.display_name().to_string().into_boxed_str());
        let _http = ScopeServer::start(&SETTINGS, &LOCKS, name, slow_lock, fast_lock)?;
        let (mut sink, mut control) = crate::server::transport_handles();

        info!("scope ready, streaming on /ws");

        // The cooperative loop. Nothing in here may block; a delayed pass
        // only compresses sample intervals, never drops a sample count.
        let clock = EspClock;
        let mut sampler: Sampler = Sampler::new(&SETTINGS, &TRIGGER, clock.now());
        loop {
            if let Step::Closed { emitted: false, len } =
                sampler.step(&clock, &mut analog, &mut sink)
            {
                warn!("viewer queues saturated, dropped a {len}-sample window");
            }

            remote_laser_scope::transport::service_control(&mut control, &mut piezo);

            // Yield so same-priority housekeeping (and the idle task's
            // watchdog feed) can run between passes.
            FreeRtos::delay_ms(0);
        }
    }

    fn connect_wifi(
        wifi: &mut BlockingWifi<EspWifi<'static>>,
        config: &DeviceConfig<'_>,
    ) -> Result<(), EspError> {
        // TODO: static IP via a custom EspNetif config (the board currently
        // takes a DHCP lease in station mode).
        if config.host {
            // Host our own network; one client max, so a second viewer
            // waits instead of splitting the stream.
            wifi.set_configuration(&Configuration::AccessPoint(AccessPointConfiguration {
                ssid: config
                    .host_ssid
                    .unwrap_or("laser-scope")
                    .try_into()
                    .unwrap_or_default(),
                password: config
                    .host_password
                    .unwrap_or_default()
                    .try_into()
                    .unwrap_or_default(),
                channel: config.channel(),
                auth_method: AuthMethod::WPA2Personal,
                max_connections: 1,
                ..Default::default()
            }))?;
            wifi.start()?;
            info!("hosting network, AP up");
        } else {
            let auth_method = if config.password.is_none() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            };
            wifi.set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: config
                    .ssid
                    .unwrap_or_default()
                    .try_into()
                    .unwrap_or_default(),
                password: config
                    .password
                    .unwrap_or_default()
                    .try_into()
                    .unwrap_or_default(),
                auth_method,
                ..Default::default()
            }))?;
            wifi.start()?;
            wifi.connect()?;
            wifi.wait_netif_up()?;
            info!("connected, IP {:?}", wifi.wifi().sta_netif().get_ip_info()?);
        }
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
fn main() {
    if let Err(err) = firmware::run() {
        // Nothing in the core is permitted to halt the sampling loop, so
        // reaching here means bring-up failed; the panic reboots the board.
        panic!("firmware bring-up failed: {err}");
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("remote-laser-scope only runs on the ESP32 (target_os = \"espidf\");");
    eprintln!("the core library is exercised on the host via `cargo test`.");
}
