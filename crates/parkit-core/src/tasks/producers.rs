use embassy_time::Ticker;
use log::{info, warn};

use super::{ResumeChain, Trigger};
use crate::app_state::AppContext;
use crate::config::ActivationMode;
use crate::readings::{Reading, SensorKind};
use crate::sensors::Sensor;

/// One producer iteration: read, hand off, and pass the baton on after a
/// microphone cycle. Returns the reading if one was taken.
pub async fn producer_step<S: Sensor>(ctx: &AppContext<'_>, sensor: &mut S) -> Option<Reading> {
    let kind = sensor.kind();
    let reading = match sensor.read().await {
        Ok(reading) => Some(reading),
        Err(e) => {
            warn!("{} producer: {}", kind, e);
            None
        }
    };

    if let Some(reading) = reading {
        // Failure already logged; the reading is simply dropped.
        ctx.deliver(reading).await.ok();
    }

    if kind == SensorKind::Mic && ctx.config.activation == ActivationMode::Chained {
        ctx.chain.fire(Trigger::MicAcquired);
    }

    reading
}

/// Producer task body for one sensor.
///
/// Chained producers sleep until resumed; free-running ones (and the
/// gyroscope, always) tick on the producer period.
pub async fn run_producer<S: Sensor>(ctx: &AppContext<'_>, mut sensor: S) -> ! {
    let kind = sensor.kind();
    let chained =
        ctx.config.activation == ActivationMode::Chained && ResumeChain::is_chained(kind);
    let mut ticker = Ticker::every(ctx.config.producer_interval());

    info!(
        "{} producer started ({})",
        kind,
        if chained { "chained" } else { "free-running" }
    );

    loop {
        if chained {
            ctx.chain.wait(kind).await;
        } else {
            ticker.next().await;
        }
        producer_step(ctx, &mut sensor).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RuntimeConfig, ShareMode};
    use crate::identity::ClientIdentity;
    use crate::sensors::SensorError;
    use embassy_futures::block_on;
    use embassy_time::Duration;

    struct Fixed(Result<Reading, SensorError>, SensorKind);

    impl Sensor for Fixed {
        fn kind(&self) -> SensorKind {
            self.1
        }

        async fn read(&mut self) -> Result<Reading, SensorError> {
            self.0
        }
    }

    fn context(share_mode: ShareMode, activation: ActivationMode) -> AppContext<'static> {
        let config = Config {
            runtime: RuntimeConfig {
                share_mode,
                activation,
                ..RuntimeConfig::default()
            },
            ..Config::default()
        };
        AppContext::new(config, ClientIdentity::new("kiosk-01").unwrap()).unwrap()
    }

    #[test]
    fn test_store_mode_writes_store() {
        let ctx = context(ShareMode::Store, ActivationMode::Chained);
        let mut gsr = Fixed(Ok(Reading::Gsr(1800)), SensorKind::Gsr);
        assert_eq!(block_on(producer_step(&ctx, &mut gsr)), Some(Reading::Gsr(1800)));
        assert_eq!(
            ctx.store.try_read().unwrap().latest(SensorKind::Gsr),
            Some(Reading::Gsr(1800))
        );
    }

    #[test]
    fn test_queue_mode_enqueues() {
        let ctx = context(ShareMode::Queue, ActivationMode::FreeRunning);
        let mut accel = Fixed(Ok(Reading::Accel([0.0, 0.0, 1.0])), SensorKind::Accel);
        block_on(producer_step(&ctx, &mut accel));
        assert_eq!(
            block_on(ctx.queue.receive(Duration::from_millis(1))),
            Some(Reading::Accel([0.0, 0.0, 1.0]))
        );
    }

    #[test]
    fn test_mic_cycle_resumes_gsr_and_accel() {
        let ctx = context(ShareMode::Store, ActivationMode::Chained);
        let mut mic = Fixed(Ok(Reading::Mic(40)), SensorKind::Mic);
        block_on(producer_step(&ctx, &mut mic));

        assert!(ctx.chain.is_pending(SensorKind::Gsr));
        assert!(ctx.chain.is_pending(SensorKind::Accel));
        assert!(!ctx.chain.is_pending(SensorKind::Mic));
    }

    #[test]
    fn test_failed_mic_cycle_still_passes_baton() {
        let ctx = context(ShareMode::Store, ActivationMode::Chained);
        let fault = SensorError::Timeout {
            sensor: SensorKind::Mic,
            operation: "read frame",
        };
        let mut mic = Fixed(Err(fault), SensorKind::Mic);
        assert_eq!(block_on(producer_step(&ctx, &mut mic)), None);
        assert!(ctx.chain.is_pending(SensorKind::Gsr));
        assert_eq!(ctx.store.try_read().unwrap().writes(), 0);
    }

    #[test]
    fn test_free_running_mic_does_not_fire_chain() {
        let ctx = context(ShareMode::Store, ActivationMode::FreeRunning);
        let mut mic = Fixed(Ok(Reading::Mic(40)), SensorKind::Mic);
        block_on(producer_step(&ctx, &mut mic));
        assert!(!ctx.chain.is_pending(SensorKind::Gsr));
    }
}
