//! Collection session state machine.
//!
//! ```text
//! Idle -> Armed(kind) -> Collecting(kind, n) -> Complete(kind) -> Idle
//!   ^________________________ Home ______________________________|
//! ```

use log::{debug, info};
use thiserror_no_std::Error;

use crate::readings::SensorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// A sensor is selected, waiting for Start
    Armed(SensorKind),
    /// Appending one sample per tick
    Collecting { kind: SensorKind, samples: u16 },
    /// Batch recorded, Send enabled
    Complete { kind: SensorKind, samples: u16 },
}

impl SessionState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Armed(_) => "Armed",
            Self::Collecting { .. } => "Collecting",
            Self::Complete { .. } => "Complete",
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
}

/// Progress after one recorded sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleProgress {
    pub samples: u16,
    /// 0..=100
    pub percent: u8,
    /// The target count was reached and the session is now Complete.
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    target: u16,
}

impl Session {
    /// New idle session collecting `target` samples per run.
    pub const fn new(target: u16) -> Self {
        Self {
            state: SessionState::Idle,
            target,
        }
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn send_enabled(&self) -> bool {
        matches!(self.state, SessionState::Complete { .. })
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            from: self.state.name(),
            action,
        }
    }

    /// Choose the sensor for the next session.
    pub fn select(&mut self, kind: SensorKind) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle | SessionState::Armed(_) => {
                debug!("Session armed for {}", kind);
                self.state = SessionState::Armed(kind);
                Ok(())
            }
            _ => Err(self.invalid("select a sensor")),
        }
    }

    /// Begin collecting. The caller resets its buffers on success.
    pub fn start(&mut self) -> Result<SensorKind, SessionError> {
        match self.state {
            SessionState::Armed(kind) => {
                info!("Collecting {} samples of {}", self.target, kind);
                self.state = SessionState::Collecting { kind, samples: 0 };
                Ok(kind)
            }
            _ => Err(self.invalid("start")),
        }
    }

    /// Count one appended sample, completing the session at the target.
    pub fn record_sample(&mut self) -> Result<SampleProgress, SessionError> {
        let SessionState::Collecting { kind, samples } = self.state else {
            return Err(self.invalid("record a sample"));
        };

        let samples = samples.saturating_add(1);
        let complete = samples >= self.target;
        self.state = if complete {
            info!("{} session complete with {} samples", kind, samples);
            SessionState::Complete { kind, samples }
        } else {
            SessionState::Collecting { kind, samples }
        };

        Ok(SampleProgress {
            samples,
            percent: percent(samples, self.target),
            complete,
        })
    }

    /// Complete before the target, keeping the samples recorded so far.
    pub fn finish_early(&mut self) -> Result<u16, SessionError> {
        let SessionState::Collecting { kind, samples } = self.state else {
            return Err(self.invalid("finish early"));
        };
        info!("{} session completed early at {} samples", kind, samples);
        self.state = SessionState::Complete { kind, samples };
        Ok(samples)
    }

    /// Kind and sample count of the batch ready to send.
    pub fn ready_to_send(&self) -> Result<(SensorKind, u16), SessionError> {
        match self.state {
            SessionState::Complete { kind, samples } => Ok((kind, samples)),
            _ => Err(self.invalid("send")),
        }
    }

    /// The batch publish has finished.
    pub fn finish_send(&mut self) -> Result<(), SessionError> {
        self.ready_to_send()?;
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Reset to Idle from any state.
    pub fn home(&mut self) {
        if self.state != SessionState::Idle {
            debug!("Session reset from {}", self.state.name());
        }
        self.state = SessionState::Idle;
    }
}

fn percent(samples: u16, target: u16) -> u8 {
    if target == 0 {
        return 100;
    }
    (u32::from(samples.min(target)) * 100 / u32::from(target)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let mut session = Session::new(3);
        session.select(SensorKind::Gsr).unwrap();
        assert_eq!(session.start(), Ok(SensorKind::Gsr));

        assert_eq!(session.record_sample().unwrap().percent, 33);
        assert_eq!(session.record_sample().unwrap().percent, 66);
        let last = session.record_sample().unwrap();
        assert!(last.complete);
        assert_eq!(last.percent, 100);
        assert!(session.send_enabled());

        assert_eq!(session.ready_to_send(), Ok((SensorKind::Gsr, 3)));
        session.finish_send().unwrap();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_start_requires_selection() {
        let mut session = Session::new(100);
        assert_eq!(
            session.start(),
            Err(SessionError::InvalidTransition {
                from: "Idle",
                action: "start"
            })
        );
    }

    #[test]
    fn test_send_disabled_until_complete() {
        let mut session = Session::new(100);
        session.select(SensorKind::Mic).unwrap();
        session.start().unwrap();
        session.record_sample().unwrap();
        assert!(!session.send_enabled());
        assert!(session.ready_to_send().is_err());
        assert!(session.select(SensorKind::Gsr).is_err());
    }

    #[test]
    fn test_home_resets_from_any_state() {
        let mut session = Session::new(2);
        session.select(SensorKind::Gyro).unwrap();
        session.home();
        assert_eq!(session.state(), SessionState::Idle);

        session.select(SensorKind::Gyro).unwrap();
        session.start().unwrap();
        session.record_sample().unwrap();
        session.home();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.record_sample().is_err());
    }

    #[test]
    fn test_finish_early_keeps_count() {
        let mut session = Session::new(100);
        session.select(SensorKind::Accel).unwrap();
        session.start().unwrap();
        session.record_sample().unwrap();
        assert_eq!(session.finish_early(), Ok(1));
        assert_eq!(
            session.state(),
            SessionState::Complete {
                kind: SensorKind::Accel,
                samples: 1
            }
        );
    }
}
