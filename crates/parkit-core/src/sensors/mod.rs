//! Sensor adapters.
//!
//! Each adapter implements [`Sensor`] for exactly one [`SensorKind`].
//! [`SensorSuite`] bundles one adapter per kind behind [`SensorSource`], which
//! is what the session accumulator acquires from.

mod gsr;
mod mic;
mod mpu6886;
mod shared;

pub use gsr::{AnalogInput, GsrSensor};
pub use mic::{MicCapture, MicSensor};
pub use mpu6886::{AccelSensor, GyroSensor, MPU6886_ADDRESS, Mpu6886, SharedImu};
pub use shared::SharedSensor;

use log::warn;
use thiserror_no_std::Error;

use crate::readings::{Reading, SensorKind};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} timed out during {operation}")]
    Timeout {
        sensor: SensorKind,
        operation: &'static str,
    },

    #[error("{sensor} hardware fault during {operation}: {details}")]
    HardwareFault {
        sensor: SensorKind,
        operation: &'static str,
        details: &'static str,
    },

    #[error("{sensor} not ready")]
    NotReady { sensor: SensorKind },
}

impl SensorError {
    pub const fn sensor(&self) -> SensorKind {
        match *self {
            Self::Timeout { sensor, .. }
            | Self::HardwareFault { sensor, .. }
            | Self::NotReady { sensor } => sensor,
        }
    }
}

/// One physical measurement source producing readings of a single kind.
pub trait Sensor {
    fn kind(&self) -> SensorKind;

    /// Take one reading. Failures are reported, never replaced by a zero.
    fn read(&mut self) -> impl Future<Output = Result<Reading, SensorError>>;
}

/// Something that can produce one reading of any requested kind.
pub trait SensorSource {
    fn acquire(&mut self, kind: SensorKind) -> impl Future<Output = Result<Reading, SensorError>>;
}

/// One adapter per sensor kind.
pub struct SensorSuite<G, M, A, Y> {
    pub gsr: G,
    pub mic: M,
    pub accel: A,
    pub gyro: Y,
}

impl<G, M, A, Y> SensorSuite<G, M, A, Y>
where
    G: Sensor,
    M: Sensor,
    A: Sensor,
    Y: Sensor,
{
    pub const fn new(gsr: G, mic: M, accel: A, gyro: Y) -> Self {
        Self {
            gsr,
            mic,
            accel,
            gyro,
        }
    }
}

impl<G, M, A, Y> SensorSource for SensorSuite<G, M, A, Y>
where
    G: Sensor,
    M: Sensor,
    A: Sensor,
    Y: Sensor,
{
    async fn acquire(&mut self, kind: SensorKind) -> Result<Reading, SensorError> {
        let reading = match kind {
            SensorKind::Gsr => self.gsr.read().await?,
            SensorKind::Mic => self.mic.read().await?,
            SensorKind::Accel => self.accel.read().await?,
            SensorKind::Gyro => self.gyro.read().await?,
        };

        if reading.kind() != kind {
            warn!("Adapter for {} produced a {} reading", kind, reading.kind());
            return Err(SensorError::HardwareFault {
                sensor: kind,
                operation: "acquire",
                details: "adapter produced a reading of another kind",
            });
        }

        Ok(reading)
    }
}
