use embassy_time::Ticker;
use log::{debug, info, warn};

use crate::app_state::{AppContext, UiInput};
use crate::config::{PublishMode, ShareMode};
use crate::display_manager::{DisplaySink, summary_line};
use crate::publisher::{BatchReport, NetworkClient, Publisher};
use crate::sampling::{Collector, TickOutcome};
use crate::sensors::SensorSource;
use crate::session::{SessionError, SessionState};

/// The UI task's state: sole owner of the session, batch buffers and display.
///
/// Inputs are handled only between accumulator ticks, so a reset never
/// cancels an acquisition in flight.
pub struct UiController<'c, S, D, C> {
    ctx: &'c AppContext<'c>,
    sensors: S,
    display: D,
    publisher: Publisher<'c, C>,
    collector: Collector,
}

impl<'c, S, D, C> UiController<'c, S, D, C>
where
    S: SensorSource,
    D: DisplaySink,
    C: NetworkClient,
{
    pub fn new(ctx: &'c AppContext<'c>, sensors: S, mut display: D, client: C) -> Self {
        let publisher = Publisher::new(
            client,
            &ctx.broker,
            ctx.config.publish_timeout(),
            &ctx.sequence,
        );
        let mut collector = Collector::new(ctx.config.sample_count);
        collector.home(&mut display);

        Self {
            ctx,
            sensors,
            display,
            publisher,
            collector,
        }
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// One control-loop tick: refresh live data, apply pending inputs, then
    /// run one accumulator tick.
    pub async fn step(&mut self) -> TickOutcome {
        self.refresh_live().await;

        while let Ok(input) = self.ctx.inputs.try_receive() {
            self.handle_input(input).await;
        }

        let outcome = self
            .collector
            .tick(&mut self.sensors, &mut self.display)
            .await;
        self.display.flush();
        outcome
    }

    /// Pull the latest shared readings. In queue mode one queued reading is
    /// drained and mirrored into the store so every reader sees it.
    async fn refresh_live(&mut self) {
        let config = &self.ctx.config;

        if config.share_mode == ShareMode::Queue {
            if let Some(reading) = self.ctx.queue.receive(config.queue_receive_timeout()).await {
                if let Err(e) = self.ctx.store.write(reading).await {
                    warn!("Live {} not mirrored: {}", reading, e);
                }
            }
        }

        let snapshot = match self.ctx.store.read(config.store_read_wait()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("Live refresh skipped: {}", e);
                return;
            }
        };

        if let SessionState::Armed(kind) = self.collector.state() {
            if let Some(reading) = snapshot.latest(kind) {
                self.display
                    .set_summary_text(&summary_line(format_args!("Live {}", reading)));
            }
        }
    }

    async fn handle_input(&mut self, input: UiInput) {
        debug!("UI input {:?}", input);
        let result = match input {
            UiInput::Select(kind) => self.collector.select(kind, &mut self.display),
            UiInput::Start => self.collector.start(&mut self.display).map(|_| ()),
            UiInput::Home => {
                self.collector.home(&mut self.display);
                Ok(())
            }
            UiInput::Send => self.send().await.map(|_| ()),
        };

        if let Err(e) = result {
            warn!("Ignoring {:?}: {}", input, e);
        }
    }

    async fn send(&mut self) -> Result<Option<BatchReport>, SessionError> {
        if self.ctx.config.publish_mode == PublishMode::Heartbeat {
            self.collector.batch_to_send()?;
            warn!("Batch publishing is disabled; discarding the session");
            self.collector.home(&mut self.display);
            return Ok(None);
        }

        let (kind, batch) = self.collector.batch_to_send()?;
        let report = self
            .publisher
            .publish_batch(batch, kind, &self.ctx.identity)
            .await;

        self.collector.finish_send(&mut self.display)?;
        self.display.set_summary_text(&summary_line(format_args!(
            "Sent {}/{} {}",
            report.sent,
            report.sent + report.failed,
            kind
        )));
        Ok(Some(report))
    }
}

/// UI task body.
pub async fn run_ui<S, D, C>(ctx: &AppContext<'_>, sensors: S, display: D, client: C) -> !
where
    S: SensorSource,
    D: DisplaySink,
    C: NetworkClient,
{
    let mut ui = UiController::new(ctx, sensors, display, client);
    let mut ticker = Ticker::every(ctx.config.tick_interval());
    info!("UI task started, tick every {} ms", ctx.config.tick_interval_ms);

    loop {
        ticker.next().await;
        ui.step().await;
    }
}
