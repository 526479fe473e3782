//! Simulator settings read from `PARKIT_*` environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use embassy_time::Duration;

use parkit_core::app_state::truncated;
use parkit_core::config::{ConfigError, RuntimeConfig};

const DEFAULT_RUN_SECS: u64 = 60;

#[derive(Debug)]
pub struct Settings {
    pub runtime: RuntimeConfig,
    pub snapshot_dir: Option<PathBuf>,
    pub run_for: Duration,
}

/// Parse `name` if set, otherwise keep `default`.
fn var_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::UnknownValue {
            field: name,
            value: truncated(&value),
        }),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = RuntimeConfig::default();
        let runtime = RuntimeConfig {
            share_mode: var_or("PARKIT_SHARE_MODE", defaults.share_mode)?,
            slot_layout: var_or("PARKIT_SLOTS", defaults.slot_layout)?,
            publish_mode: var_or("PARKIT_PUBLISH_MODE", defaults.publish_mode)?,
            activation: var_or("PARKIT_ACTIVATION", defaults.activation)?,
            ..defaults
        };
        runtime.validate()?;

        let run_secs: u64 = var_or("PARKIT_RUN_SECS", DEFAULT_RUN_SECS)?;
        if run_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "PARKIT_RUN_SECS",
            });
        }

        Ok(Self {
            runtime,
            snapshot_dir: env::var_os("PARKIT_SNAPSHOT_DIR").map(PathBuf::from),
            run_for: Duration::from_secs(run_secs),
        })
    }
}
