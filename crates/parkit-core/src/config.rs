//! Device configuration.
//!
//! [`Config`] is persisted as a postcard blob. [`RuntimeConfig`] selects which
//! of the alternative data-sharing and publishing designs the firmware runs,
//! along with every period and bounded wait used by the tasks.

use alloc::vec::Vec;
use core::str::FromStr;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::readings::SensorKind;

/// Capacity of the producer-to-consumer reading queue
pub const QUEUE_CAPACITY: usize = 10;

/// Samples taken per collection session
pub const DEFAULT_SAMPLE_COUNT: u16 = 100;

/// Batch buffer capacity for scalar kinds (one slot per sample, plus one spare)
pub const SCALAR_BATCH_CAPACITY: usize = 101;

/// Batch buffer capacity for vector kinds (three interleaved slots per sample)
pub const VECTOR_BATCH_CAPACITY: usize = 303;

/// Largest sample count that fits both batch buffers.
pub const MAX_SAMPLE_COUNT: u16 = (VECTOR_BATCH_CAPACITY / 3) as u16 - 1;

/// Raw ADC reads averaged into one GSR sample
pub const GSR_OVERSAMPLE: usize = 10;

/// Samples in one microphone capture frame
pub const MIC_FRAME_SAMPLES: usize = 1024;

/// Capacity of the UI input channel
pub const UI_INPUT_CAPACITY: usize = 4;

#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
    pub broker: BrokerConfig<'a>,
    pub runtime: RuntimeConfig,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct BrokerConfig<'a> {
    pub endpoint: &'a str,
    pub batch_topic: &'a str,
    pub heartbeat_topic: &'a str,
}

impl Default for BrokerConfig<'_> {
    fn default() -> Self {
        Self {
            endpoint: "",
            batch_topic: "parkit/measurements",
            heartbeat_topic: "parkit/heartbeat",
        }
    }
}

impl<'a> Config<'a> {
    /// Encode for persistent storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Encoding)
    }

    /// Decode a stored blob, borrowing strings from `bytes`, and validate it.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Encoding)?;
        config.runtime.validate()?;
        Ok(config)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Sample count {count} outside 1..={max}")]
    SampleCount { count: u16, max: u16 },
    #[error("Period or wait `{field}` must be non-zero")]
    ZeroDuration { field: &'static str },
    #[error("Unknown value `{value}` for {field}")]
    UnknownValue {
        field: &'static str,
        value: heapless::String<16>,
    },
    #[error("Config blob could not be encoded or decoded")]
    Encoding,
}

/// How producer tasks hand readings to the consumer.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShareMode {
    /// Producers write a mutex-guarded record
    #[default]
    Store,
    /// Producers push into the bounded queue
    Queue,
}

/// Slot arrangement of the shared reading store.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotLayout {
    /// One slot per sensor kind
    #[default]
    PerKind,
    /// A single slot holding whichever reading was written last
    LastWritten,
}

/// Which publisher runs. Exactly one is active per configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishMode {
    /// Publish the session batch when the user presses Send
    #[default]
    Batch,
    /// Publish the live store on a fixed cadence
    Heartbeat,
}

/// How producer tasks are woken.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationMode {
    /// Tasks wait for explicit resumes from the activation chain
    #[default]
    Chained,
    /// Every producer polls on its own period
    FreeRunning,
}

/// Parse a lowercase mode name, as used by environment overrides.
fn parse_mode<T: Copy>(
    field: &'static str,
    value: &str,
    table: &[(&str, T)],
) -> Result<T, ConfigError> {
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(value.trim()))
        .map(|(_, mode)| *mode)
        .ok_or_else(|| ConfigError::UnknownValue {
            field,
            value: crate::app_state::truncated(value),
        })
}

impl FromStr for ShareMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mode("share mode", s, &[("store", Self::Store), ("queue", Self::Queue)])
    }
}

impl FromStr for SlotLayout {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mode(
            "slot layout",
            s,
            &[("per-kind", Self::PerKind), ("last-written", Self::LastWritten)],
        )
    }
}

impl FromStr for PublishMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mode(
            "publish mode",
            s,
            &[("batch", Self::Batch), ("heartbeat", Self::Heartbeat)],
        )
    }
}

impl FromStr for ActivationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mode(
            "activation mode",
            s,
            &[("chained", Self::Chained), ("free-running", Self::FreeRunning)],
        )
    }
}

/// Task-level behaviour. All durations are in milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub share_mode: ShareMode,
    pub slot_layout: SlotLayout,
    pub publish_mode: PublishMode,
    pub activation: ActivationMode,
    /// Samples per collection session
    pub sample_count: u16,
    /// UI control-loop period; one accumulator tick per period
    pub tick_interval_ms: u64,
    /// Producer period in free-running mode (and for the gyro task always)
    pub producer_interval_ms: u64,
    /// Heartbeat publish and chain pacing period
    pub heartbeat_interval_ms: u64,
    /// Bounded wait for a queue send before the reading is dropped
    pub queue_send_timeout_ms: u64,
    /// Bounded wait for the consumer's queue receive
    pub queue_receive_timeout_ms: u64,
    /// Bounded wait for a store read
    pub store_read_wait_ms: u64,
    /// Per-message publish timeout
    pub publish_timeout_ms: u64,
    /// Time budget for one microphone frame
    pub mic_capture_budget_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            share_mode: ShareMode::Store,
            slot_layout: SlotLayout::PerKind,
            publish_mode: PublishMode::Batch,
            activation: ActivationMode::Chained,
            sample_count: DEFAULT_SAMPLE_COUNT,
            tick_interval_ms: 50,
            producer_interval_ms: 1000,
            heartbeat_interval_ms: 5000,
            queue_send_timeout_ms: 10,
            queue_receive_timeout_ms: 10,
            store_read_wait_ms: 10,
            publish_timeout_ms: 2000,
            mic_capture_budget_ms: 200,
        }
    }
}

impl RuntimeConfig {
    /// Check the bounds the batch buffers and task loops rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_count == 0 || self.sample_count > MAX_SAMPLE_COUNT {
            return Err(ConfigError::SampleCount {
                count: self.sample_count,
                max: MAX_SAMPLE_COUNT,
            });
        }

        let durations = [
            ("tick_interval_ms", self.tick_interval_ms),
            ("producer_interval_ms", self.producer_interval_ms),
            ("heartbeat_interval_ms", self.heartbeat_interval_ms),
            ("queue_send_timeout_ms", self.queue_send_timeout_ms),
            ("queue_receive_timeout_ms", self.queue_receive_timeout_ms),
            ("store_read_wait_ms", self.store_read_wait_ms),
            ("publish_timeout_ms", self.publish_timeout_ms),
            ("mic_capture_budget_ms", self.mic_capture_budget_ms),
        ];
        if let Some((field, _)) = durations.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::ZeroDuration { field });
        }

        Ok(())
    }

    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub const fn producer_interval(&self) -> Duration {
        Duration::from_millis(self.producer_interval_ms)
    }

    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub const fn queue_send_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_send_timeout_ms)
    }

    pub const fn queue_receive_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_receive_timeout_ms)
    }

    pub const fn store_read_wait(&self) -> Duration {
        Duration::from_millis(self.store_read_wait_ms)
    }

    pub const fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }

    pub const fn mic_capture_budget(&self) -> Duration {
        Duration::from_millis(self.mic_capture_budget_ms)
    }
}

/// Bounded wait for a store write, by writer priority.
///
/// Fast, frequent writers give up sooner than the slow microphone task.
pub const fn store_write_wait(kind: SensorKind) -> Duration {
    match kind {
        SensorKind::Gsr => Duration::from_millis(10),
        SensorKind::Accel | SensorKind::Gyro => Duration::from_millis(20),
        SensorKind::Mic => Duration::from_millis(30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_runtime_is_valid() {
        assert_eq!(RuntimeConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_sample_count_bounded_by_buffers() {
        assert!(MAX_SAMPLE_COUNT as usize <= SCALAR_BATCH_CAPACITY);
        assert!(MAX_SAMPLE_COUNT as usize * 3 <= VECTOR_BATCH_CAPACITY);

        let config = RuntimeConfig {
            sample_count: MAX_SAMPLE_COUNT + 1,
            ..RuntimeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SampleCount { .. })
        ));

        let config = RuntimeConfig {
            sample_count: 0,
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_wait_rejected() {
        let config = RuntimeConfig {
            publish_timeout_ms: 0,
            ..RuntimeConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration {
                field: "publish_timeout_ms"
            })
        );
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("queue".parse::<ShareMode>(), Ok(ShareMode::Queue));
        assert_eq!(" Heartbeat ".parse::<PublishMode>(), Ok(PublishMode::Heartbeat));
        assert_eq!(
            "free-running".parse::<ActivationMode>(),
            Ok(ActivationMode::FreeRunning)
        );
        assert_eq!("last-written".parse::<SlotLayout>(), Ok(SlotLayout::LastWritten));
        assert!(matches!(
            "lossy".parse::<ShareMode>(),
            Err(ConfigError::UnknownValue { field: "share mode", .. })
        ));
    }

    #[test]
    fn test_config_blob_restores_borrowed_strings() {
        let config = Config {
            internet: InternetConfig {
                ssid: "kiosk",
                password: "hunter2",
            },
            broker: BrokerConfig::default(),
            runtime: RuntimeConfig {
                share_mode: ShareMode::Queue,
                sample_count: 50,
                ..RuntimeConfig::default()
            },
        };

        let bytes = config.to_bytes().unwrap();
        let restored = Config::from_bytes(&bytes).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_invalid_blob_rejected() {
        let config = Config {
            runtime: RuntimeConfig {
                sample_count: 500,
                ..RuntimeConfig::default()
            },
            ..Config::default()
        };
        let bytes = config.to_bytes().unwrap();
        assert!(matches!(
            Config::from_bytes(&bytes),
            Err(ConfigError::SampleCount { count: 500, .. })
        ));
    }

    #[test]
    fn test_write_wait_by_priority() {
        assert!(store_write_wait(SensorKind::Gsr) < store_write_wait(SensorKind::Mic));
    }
}
