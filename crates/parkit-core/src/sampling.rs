//! Session sample accumulator.
//!
//! [`Collector`] owns the session state, both batch buffers and the running
//! average. Once per control-loop tick, while collecting, it acquires exactly
//! one reading of the selected kind, appends it, and reports progress to the
//! display. Acquisition and append are strictly sequential within a tick.

use log::{debug, warn};

use crate::display_manager::{DisplaySink, summary_line};
use crate::readings::{Reading, SensorKind};
use crate::sensors::{SensorError, SensorSource};
use crate::session::{SampleProgress, Session, SessionError, SessionState};
use crate::storage::{BatchView, ScalarBatch, VectorBatch};

/// O(1) running mean with truncating integer division.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovingAverage {
    sum: i64,
    count: u32,
}

impl MovingAverage {
    pub const fn new() -> Self {
        Self { sum: 0, count: 0 }
    }

    /// Add `value` and return the new average.
    pub fn push(&mut self, value: i32) -> i32 {
        self.sum += i64::from(value);
        self.count += 1;
        (self.sum / i64::from(self.count)) as i32
    }

    pub fn value(&self) -> Option<i32> {
        (self.count > 0).then(|| (self.sum / i64::from(self.count)) as i32)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// What one accumulator tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Not collecting; nothing acquired
    Idle,
    /// One sample appended, session still collecting
    Recorded(SampleProgress),
    /// The session reached Complete on this tick
    Completed { samples: u16, early: bool },
    /// Acquisition failed; no append, no progress
    Skipped(SensorError),
}

/// Per-session accumulator driven by the UI task.
///
/// Holds the [`Session`] state machine, the scalar and vector batch buffers
/// and the running average. A reading whose kind differs from the selected
/// sensor is skipped like a fault, never appended.
pub struct Collector {
    session: Session,
    scalars: ScalarBatch,
    vectors: VectorBatch,
    average: MovingAverage,
}

impl Collector {
    /// Collector for sessions of `sample_count` samples.
    pub const fn new(sample_count: u16) -> Self {
        Self {
            session: Session::new(sample_count),
            scalars: ScalarBatch::new(),
            vectors: VectorBatch::new(),
            average: MovingAverage::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn average(&self) -> Option<i32> {
        self.average.value()
    }

    /// Recorded values for `kind`, in append order.
    pub fn batch(&self, kind: SensorKind) -> BatchView<'_> {
        if kind.is_vector() {
            BatchView::Vectors(self.vectors.as_slice())
        } else {
            BatchView::Scalars(self.scalars.as_slice())
        }
    }

    fn reset_buffers(&mut self) {
        self.scalars.clear();
        self.vectors.clear();
        self.average.reset();
    }

    pub fn select<D: DisplaySink>(
        &mut self,
        kind: SensorKind,
        display: &mut D,
    ) -> Result<(), SessionError> {
        self.session.select(kind)?;
        display.set_summary_text(&summary_line(format_args!("{}: press Start", kind)));
        Ok(())
    }

    /// Begin collecting; clears the previous batch.
    pub fn start<D: DisplaySink>(&mut self, display: &mut D) -> Result<SensorKind, SessionError> {
        let kind = self.session.start()?;
        self.reset_buffers();
        display.set_progress(0);
        display.set_send_enabled(false);
        display.set_summary_text(&summary_line(format_args!("{}: collecting", kind)));
        Ok(kind)
    }

    /// Return to Idle from any state, discarding the batch.
    pub fn home<D: DisplaySink>(&mut self, display: &mut D) {
        self.session.home();
        self.reset_buffers();
        display.set_progress(0);
        display.set_send_enabled(false);
        display.set_summary_text("Select a sensor");
    }

    /// The completed batch, if Send is enabled.
    pub fn batch_to_send(&self) -> Result<(SensorKind, BatchView<'_>), SessionError> {
        let (kind, _) = self.session.ready_to_send()?;
        Ok((kind, self.batch(kind)))
    }

    /// Mark the batch as sent and go back to Idle.
    pub fn finish_send<D: DisplaySink>(&mut self, display: &mut D) -> Result<(), SessionError> {
        self.session.finish_send()?;
        display.set_send_enabled(false);
        display.set_progress(0);
        Ok(())
    }

    /// Run one control-loop tick.
    pub async fn tick<S, D>(&mut self, source: &mut S, display: &mut D) -> TickOutcome
    where
        S: SensorSource,
        D: DisplaySink,
    {
        let SessionState::Collecting { kind, .. } = self.session.state() else {
            return TickOutcome::Idle;
        };

        let reading = match source.acquire(kind).await {
            Ok(reading) => reading,
            Err(e) => {
                warn!("Skipping {} sample: {}", kind, e);
                return TickOutcome::Skipped(e);
            }
        };
        if reading.kind() != kind {
            let e = SensorError::HardwareFault {
                sensor: kind,
                operation: "acquire",
                details: "reading of another kind",
            };
            warn!("Skipping {} sample: got {}", kind, reading.kind());
            return TickOutcome::Skipped(e);
        }

        let appended = match reading {
            Reading::Gsr(v) | Reading::Mic(v) => self.scalars.push(v),
            Reading::Accel(triple) | Reading::Gyro(triple) => self.vectors.push_triple(triple),
        };
        if let Err(e) = appended {
            warn!("{}; completing {} session early", e, kind);
            return match self.session.finish_early() {
                Ok(samples) => {
                    display.set_progress(100);
                    display.set_send_enabled(true);
                    TickOutcome::Completed {
                        samples,
                        early: true,
                    }
                }
                Err(_) => TickOutcome::Idle,
            };
        }

        self.show_sample(reading, display);

        let progress = match self.session.record_sample() {
            Ok(progress) => progress,
            Err(_) => return TickOutcome::Idle,
        };
        debug!("{} sample {}: {}", kind, progress.samples, reading);
        display.set_progress(progress.percent);

        if progress.complete {
            display.set_send_enabled(true);
            TickOutcome::Completed {
                samples: progress.samples,
                early: false,
            }
        } else {
            TickOutcome::Recorded(progress)
        }
    }

    fn show_sample<D: DisplaySink>(&mut self, reading: Reading, display: &mut D) {
        let types = reading.kind().measurement_types();
        match reading {
            Reading::Gsr(v) | Reading::Mic(v) => {
                let avg = self.average.push(v);
                display.push_chart_point(types[0], v as f32);
                display.set_summary_text(&summary_line(format_args!(
                    "{} avg {}",
                    reading.kind(),
                    avg
                )));
            }
            Reading::Accel(triple) | Reading::Gyro(triple) => {
                for (series, value) in types.iter().zip(triple) {
                    display.push_chart_point(*series, value);
                }
                display.set_summary_text(&summary_line(format_args!("{}", reading)));
            }
        }
    }
}
