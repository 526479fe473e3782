//! Broker connection that logs every message instead of sending it.

use embassy_time::Timer;
use log::{debug, info};

use parkit_core::publisher::{NetworkClient, PublishError};

/// Round trip of one acknowledged publish
const SIMULATED_LATENCY_MS: u64 = 2;

pub struct LoggingBroker {
    endpoint: &'static str,
    published: u32,
}

impl LoggingBroker {
    pub fn new(endpoint: &'static str) -> Self {
        info!("Broker: logging client for {}", endpoint);
        Self {
            endpoint,
            published: 0,
        }
    }
}

impl NetworkClient for LoggingBroker {
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let text = core::str::from_utf8(payload).map_err(|_| PublishError::Encoding)?;
        Timer::after_millis(SIMULATED_LATENCY_MS).await;

        self.published += 1;
        debug!(
            "[{} #{}] {} {}",
            self.endpoint, self.published, topic, text
        );
        Ok(())
    }
}
