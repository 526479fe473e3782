//! Full GSR session through the public API: arm, collect 100 samples from an
//! ADC pinned at 2000, send, and check every published message.

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Duration;
use serde_json::Value;

use parkit_core::app_state::{AppContext, UiInput};
use parkit_core::config::{Config, RuntimeConfig};
use parkit_core::display_manager::DisplayModel;
use parkit_core::identity::ClientIdentity;
use parkit_core::publisher::{NetworkClient, PublishError, SharedClient};
use parkit_core::readings::{Reading, SensorKind};
use parkit_core::sampling::TickOutcome;
use parkit_core::sensors::{AnalogInput, GsrSensor, Sensor, SensorError, SensorSuite};
use parkit_core::session::SessionState;
use parkit_core::tasks::{UiController, producer_step};

struct PinnedAdc(u16);

impl AnalogInput for PinnedAdc {
    type Error = ();

    async fn configure(&mut self) -> Result<(), ()> {
        Ok(())
    }

    async fn read_raw(&mut self) -> Result<u16, ()> {
        Ok(self.0)
    }
}

/// Stands in for an adapter the scenario never selects.
struct Unused(SensorKind);

impl Sensor for Unused {
    fn kind(&self) -> SensorKind {
        self.0
    }

    async fn read(&mut self) -> Result<Reading, SensorError> {
        Err(SensorError::NotReady { sensor: self.0 })
    }
}

#[derive(Default)]
struct Broker {
    messages: Vec<(String, Value)>,
}

impl NetworkClient for Broker {
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let value = serde_json::from_slice(payload).map_err(|_| PublishError::Encoding)?;
        self.messages.push((topic.to_owned(), value));
        Ok(())
    }
}

fn context() -> AppContext<'static> {
    AppContext::new(
        Config {
            runtime: RuntimeConfig::default(),
            ..Config::default()
        },
        ClientIdentity::new("kiosk-07").unwrap(),
    )
    .unwrap()
}

#[test]
fn gsr_session_publishes_one_message_per_sample() {
    let ctx = context();
    let broker: Mutex<CriticalSectionRawMutex, Broker> = Mutex::new(Broker::default());
    let sensors = SensorSuite::new(
        GsrSensor::new(PinnedAdc(2000)),
        Unused(SensorKind::Mic),
        Unused(SensorKind::Accel),
        Unused(SensorKind::Gyro),
    );
    let mut display = DisplayModel::new();
    let mut ui = UiController::new(&ctx, sensors, &mut display, SharedClient::new(&broker));

    assert!(ctx.post_input(UiInput::Select(SensorKind::Gsr)));
    assert!(ctx.post_input(UiInput::Start));

    let mut outcome = TickOutcome::Idle;
    for _ in 0..100 {
        outcome = block_on(ui.step());
    }

    assert_eq!(
        outcome,
        TickOutcome::Completed {
            samples: 100,
            early: false
        }
    );
    assert_eq!(ui.collector().average(), Some(2000));
    assert_eq!(
        ui.collector().state(),
        SessionState::Complete {
            kind: SensorKind::Gsr,
            samples: 100
        }
    );
    assert_eq!(ui.collector().batch(SensorKind::Gsr).len(), 100);

    assert!(ctx.post_input(UiInput::Send));
    block_on(ui.step());
    assert_eq!(ui.collector().state(), SessionState::Idle);
    drop(ui);

    assert!(!display.send_enabled());
    assert_eq!(display.summary(), "Sent 100/100 GSR");

    let broker = broker.into_inner();
    assert_eq!(broker.messages.len(), 100);
    for (i, (topic, message)) in broker.messages.iter().enumerate() {
        assert_eq!(topic, "parkit/measurements");
        assert_eq!(message["id"], i.to_string().as_str());
        assert_eq!(message["measurementValue"], 2000);
        assert_eq!(message["measurementType"], "GSR");
        assert_eq!(message["clientID"], "kiosk-07");
    }
}

#[test]
fn second_session_continues_the_id_sequence() {
    let ctx = context();
    let broker: Mutex<CriticalSectionRawMutex, Broker> = Mutex::new(Broker::default());
    let sensors = SensorSuite::new(
        GsrSensor::new(PinnedAdc(1500)),
        Unused(SensorKind::Mic),
        Unused(SensorKind::Accel),
        Unused(SensorKind::Gyro),
    );
    let mut display = DisplayModel::new();
    let mut ui = UiController::new(&ctx, sensors, &mut display, SharedClient::new(&broker));

    for _ in 0..2 {
        ctx.post_input(UiInput::Select(SensorKind::Gsr));
        ctx.post_input(UiInput::Start);
        for _ in 0..100 {
            block_on(ui.step());
        }
        ctx.post_input(UiInput::Send);
        block_on(ui.step());
    }
    drop(ui);

    let broker = broker.into_inner();
    assert_eq!(broker.messages.len(), 200);
    assert_eq!(broker.messages[100].1["id"], "100");
    assert_eq!(broker.messages[199].1["id"], "199");
}

#[test]
fn unselected_sensor_faults_do_not_reach_the_session() {
    let ctx = context();
    let mut mic = Unused(SensorKind::Mic);

    // A failing producer leaves the store untouched.
    assert_eq!(block_on(producer_step(&ctx, &mut mic)), None);
    let snapshot = block_on(ctx.store.read(Duration::from_millis(10))).unwrap();
    assert_eq!(snapshot.writes(), 0);

    let mut gsr = GsrSensor::new(PinnedAdc(2000));
    block_on(producer_step(&ctx, &mut gsr));
    let snapshot = block_on(ctx.store.read(Duration::from_millis(10))).unwrap();
    assert_eq!(snapshot.latest(SensorKind::Gsr), Some(Reading::Gsr(2000)));
}
