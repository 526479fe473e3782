//! Desktop simulator for the Park It! kiosk.
//!
//! Runs the full task graph from `parkit-core` on the embassy std executor:
//! one producer per sensor, the heartbeat task and the UI task, all wired to
//! synthetic hardware. A scripted "visitor" walks through a session for each
//! sensor in turn, and the summary screen is rendered headlessly to PNG.
//!
//! # Environment
//!
//! | Variable              | Values                          | Default     |
//! |-----------------------|---------------------------------|-------------|
//! | `PARKIT_SHARE_MODE`   | `store`, `queue`                | `store`     |
//! | `PARKIT_SLOTS`        | `per-kind`, `last-written`      | `per-kind`  |
//! | `PARKIT_PUBLISH_MODE` | `batch`, `heartbeat`            | `batch`     |
//! | `PARKIT_ACTIVATION`   | `chained`, `free-running`       | `chained`   |
//! | `PARKIT_SNAPSHOT_DIR` | directory for PNG snapshots     | unset       |
//! | `PARKIT_RUN_SECS`     | seconds before exit             | `60`        |
//! | `PARKIT_CLIENT_ID`    | client id in every payload      | `parkit-sim-01` |
//!
//! Log output is controlled with `RUST_LOG`.

mod broker;
mod hardware;
mod settings;
mod snapshot;

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Timer};
use log::{error, info};
use static_cell::StaticCell;

use parkit_core::app_state::{AppContext, UiInput};
use parkit_core::config::{BrokerConfig, Config, InternetConfig};
use parkit_core::identity::load_identity;
use parkit_core::publisher::SharedClient;
use parkit_core::readings::SensorKind;
use parkit_core::sensors::{
    AccelSensor, GsrSensor, GyroSensor, MicSensor, Mpu6886, SensorSuite, SharedImu, SharedSensor,
};
use parkit_core::tasks::{run_heartbeat, run_producer, run_ui};

use broker::LoggingBroker;
use hardware::{SimAdc, SimIdentity, SimImu, SimMic};
use settings::Settings;
use snapshot::SnapshotDisplay;

type Shared<T> = Mutex<CriticalSectionRawMutex, T>;

type Gsr = GsrSensor<SimAdc>;
type Mic = MicSensor<SimMic>;
type Accel = AccelSensor<'static, SimImu>;
type Gyro = GyroSensor<'static, SimImu>;

type UiSensors =
    SensorSuite<SharedSensor<'static, Gsr>, SharedSensor<'static, Mic>, Accel, Gyro>;

type Context = AppContext<'static>;
type Client = SharedClient<'static, LoggingBroker>;

/// Pause between scripted touches
const TOUCH_PAUSE: Duration = Duration::from_millis(1500);

#[embassy_executor::task]
async fn gsr_producer(ctx: &'static Context, sensor: SharedSensor<'static, Gsr>) {
    run_producer(ctx, sensor).await
}

#[embassy_executor::task]
async fn mic_producer(ctx: &'static Context, sensor: SharedSensor<'static, Mic>) {
    run_producer(ctx, sensor).await
}

#[embassy_executor::task]
async fn accel_producer(ctx: &'static Context, sensor: Accel) {
    run_producer(ctx, sensor).await
}

#[embassy_executor::task]
async fn gyro_producer(ctx: &'static Context, sensor: Gyro) {
    run_producer(ctx, sensor).await
}

#[embassy_executor::task]
async fn heartbeat_task(ctx: &'static Context, client: Client) {
    run_heartbeat(ctx, client).await
}

#[embassy_executor::task]
async fn ui_task(ctx: &'static Context, sensors: UiSensors, display: SnapshotDisplay, client: Client) {
    run_ui(ctx, sensors, display, client).await
}

/// A visitor trying every sensor: select, wait for the live value, start,
/// wait out the session, then press Send.
#[embassy_executor::task]
async fn touch_script(ctx: &'static Context) {
    let session = ctx.config.tick_interval() * u32::from(ctx.config.sample_count);

    for kind in SensorKind::ALL.iter().copied().cycle() {
        info!("Visitor selects {}", kind);
        ctx.post_input(UiInput::Select(kind));
        Timer::after(TOUCH_PAUSE).await;

        ctx.post_input(UiInput::Start);
        Timer::after(session + TOUCH_PAUSE).await;

        info!("Visitor presses Send");
        ctx.post_input(UiInput::Send);
        Timer::after(TOUCH_PAUSE).await;
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    env_logger::init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid simulator settings: {}", e);
            std::process::exit(2);
        }
    };
    info!("Starting Park It! simulator for {} s", settings.run_for.as_secs());

    let identity = match load_identity(&mut SimIdentity).await {
        Ok(identity) => identity,
        Err(_) => std::process::exit(1),
    };

    let config = Config {
        internet: InternetConfig {
            ssid: "parkit-sim",
            password: "",
        },
        broker: BrokerConfig {
            endpoint: "sim://broker.local",
            ..BrokerConfig::default()
        },
        runtime: settings.runtime,
    };

    static CONTEXT: StaticCell<Context> = StaticCell::new();
    let ctx: &'static Context = match AppContext::new(config, identity) {
        Ok(ctx) => CONTEXT.init(ctx),
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    static BROKER: StaticCell<Shared<LoggingBroker>> = StaticCell::new();
    let broker: &'static Shared<LoggingBroker> =
        BROKER.init(Mutex::new(LoggingBroker::new(ctx.broker.endpoint)));

    static IMU: StaticCell<SharedImu<SimImu>> = StaticCell::new();
    let imu: &'static SharedImu<SimImu> = IMU.init(Mutex::new(Mpu6886::new(SimImu::default())));

    static GSR: StaticCell<Shared<Gsr>> = StaticCell::new();
    let gsr: &'static Shared<Gsr> = GSR.init(Mutex::new(GsrSensor::new(SimAdc)));

    static MIC: StaticCell<Shared<Mic>> = StaticCell::new();
    let mic: &'static Shared<Mic> = MIC.init(Mutex::new(MicSensor::new(
        SimMic::default(),
        ctx.config.mic_capture_budget(),
    )));

    let ui_sensors = SensorSuite::new(
        SharedSensor::new(gsr, SensorKind::Gsr),
        SharedSensor::new(mic, SensorKind::Mic),
        AccelSensor::new(imu),
        GyroSensor::new(imu),
    );

    spawner.must_spawn(gsr_producer(ctx, SharedSensor::new(gsr, SensorKind::Gsr)));
    spawner.must_spawn(mic_producer(ctx, SharedSensor::new(mic, SensorKind::Mic)));
    spawner.must_spawn(accel_producer(ctx, AccelSensor::new(imu)));
    spawner.must_spawn(gyro_producer(ctx, GyroSensor::new(imu)));
    spawner.must_spawn(heartbeat_task(ctx, SharedClient::new(broker)));
    spawner.must_spawn(ui_task(
        ctx,
        ui_sensors,
        SnapshotDisplay::new(settings.snapshot_dir),
        SharedClient::new(broker),
    ));
    spawner.must_spawn(touch_script(ctx));

    Timer::after(settings.run_for).await;
    info!(
        "Run time elapsed after {} batch messages, exiting",
        ctx.sequence.peek()
    );

    // The executor never returns on its own.
    std::process::exit(0);
}
