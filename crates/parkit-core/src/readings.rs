//! Sensor kinds and the tagged reading type shared by every task.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Number of distinct sensor kinds.
pub const SENSOR_KIND_COUNT: usize = 4;

/// The sensors fitted to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    /// Galvanic skin response, raw ADC units
    Gsr,
    /// Microphone noise level, mean sample magnitude
    Mic,
    /// Accelerometer, g per axis
    Accel,
    /// Gyroscope, degrees per second as `[roll, yaw, pitch]`
    Gyro,
}

impl SensorKind {
    /// Every kind, in slot order.
    pub const ALL: [SensorKind; SENSOR_KIND_COUNT] =
        [SensorKind::Gsr, SensorKind::Mic, SensorKind::Accel, SensorKind::Gyro];

    /// Slot index of this kind in per-kind tables.
    pub const fn index(self) -> usize {
        match self {
            Self::Gsr => 0,
            Self::Mic => 1,
            Self::Accel => 2,
            Self::Gyro => 3,
        }
    }

    /// Short label for display and logs
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gsr => "GSR",
            Self::Mic => "Mic",
            Self::Accel => "Accel",
            Self::Gyro => "Gyro",
        }
    }

    /// Whether readings of this kind carry a 3-axis vector.
    pub const fn is_vector(self) -> bool {
        matches!(self, Self::Accel | Self::Gyro)
    }

    /// Measurement types published for each value of a reading of this kind.
    ///
    /// Scalar kinds yield one entry, vector kinds one entry per axis in
    /// buffer order.
    pub const fn measurement_types(self) -> &'static [MeasurementType] {
        match self {
            Self::Gsr => &[MeasurementType::Gsr],
            Self::Mic => &[MeasurementType::Mic],
            Self::Accel => &[
                MeasurementType::AccelX,
                MeasurementType::AccelY,
                MeasurementType::AccelZ,
            ],
            Self::Gyro => &[
                MeasurementType::Roll,
                MeasurementType::Yaw,
                MeasurementType::Pitch,
            ],
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Label attached to every published batch value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementType {
    #[serde(rename = "GSR")]
    Gsr,
    Mic,
    Roll,
    Yaw,
    Pitch,
    AccelX,
    AccelY,
    AccelZ,
}

/// Number of distinct measurement types.
pub const MEASUREMENT_TYPE_COUNT: usize = 8;

impl MeasurementType {
    pub const ALL: [MeasurementType; MEASUREMENT_TYPE_COUNT] = [
        MeasurementType::Gsr,
        MeasurementType::Mic,
        MeasurementType::Roll,
        MeasurementType::Yaw,
        MeasurementType::Pitch,
        MeasurementType::AccelX,
        MeasurementType::AccelY,
        MeasurementType::AccelZ,
    ];

    pub const fn index(self) -> usize {
        match self {
            Self::Gsr => 0,
            Self::Mic => 1,
            Self::Roll => 2,
            Self::Yaw => 3,
            Self::Pitch => 4,
            Self::AccelX => 5,
            Self::AccelY => 6,
            Self::AccelZ => 7,
        }
    }

    /// Wire name, as serialized into batch payloads
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gsr => "GSR",
            Self::Mic => "Mic",
            Self::Roll => "Roll",
            Self::Yaw => "Yaw",
            Self::Pitch => "Pitch",
            Self::AccelX => "AccelX",
            Self::AccelY => "AccelY",
            Self::AccelZ => "AccelZ",
        }
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One sample from one sensor.
///
/// The variant is the kind tag, so the scalar and vector payloads can never
/// be confused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Gsr(i32),
    Mic(i32),
    Accel([f32; 3]),
    Gyro([f32; 3]),
}

impl Reading {
    pub const fn kind(&self) -> SensorKind {
        match self {
            Self::Gsr(_) => SensorKind::Gsr,
            Self::Mic(_) => SensorKind::Mic,
            Self::Accel(_) => SensorKind::Accel,
            Self::Gyro(_) => SensorKind::Gyro,
        }
    }

    /// Scalar payload, `None` for vector kinds.
    pub const fn scalar(&self) -> Option<i32> {
        match self {
            Self::Gsr(v) | Self::Mic(v) => Some(*v),
            Self::Accel(_) | Self::Gyro(_) => None,
        }
    }

    /// Vector payload, `None` for scalar kinds.
    pub const fn vector(&self) -> Option<[f32; 3]> {
        match self {
            Self::Accel(v) | Self::Gyro(v) => Some(*v),
            Self::Gsr(_) | Self::Mic(_) => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gsr(v) => write!(f, "GSR {}", v),
            Self::Mic(v) => write!(f, "Mic {}", v),
            Self::Accel([x, y, z]) => write!(f, "Accel {:.2} {:.2} {:.2}", x, y, z),
            Self::Gyro([r, yaw, p]) => {
                write!(f, "Roll {:.1} Yaw {:.1} Pitch {:.1}", r, yaw, p)
            }
        }
    }
}
