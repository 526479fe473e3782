//! Bounded producer-to-consumer reading queue.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, with_timeout};
use log::warn;
use thiserror_no_std::Error;

use crate::config::QUEUE_CAPACITY;
use crate::readings::{Reading, SensorKind};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue stayed full for the whole send timeout; the reading was dropped.
    #[error("Queue full, dropped {kind} reading")]
    Full { kind: SensorKind },
}

/// FIFO of readings with a fixed capacity of [`QUEUE_CAPACITY`].
///
/// A send that cannot complete within its timeout drops the reading. It is
/// never retried or buffered anywhere else; only the drop counter remembers it.
pub struct ReadingQueue {
    channel: Channel<CriticalSectionRawMutex, Reading, QUEUE_CAPACITY>,
    dropped: AtomicU32,
}

impl ReadingQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue `reading`, waiting at most `timeout` for space.
    pub async fn send(&self, reading: Reading, timeout: Duration) -> Result<(), QueueError> {
        match with_timeout(timeout, self.channel.send(reading)).await {
            Ok(()) => Ok(()),
            Err(_) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "Queue full, dropping {} ({} dropped so far)",
                    reading, dropped
                );
                Err(QueueError::Full {
                    kind: reading.kind(),
                })
            }
        }
    }

    /// Dequeue the oldest reading, or `None` if nothing arrived within `timeout`.
    pub async fn receive(&self, timeout: Duration) -> Option<Reading> {
        with_timeout(timeout, self.channel.receive()).await.ok()
    }

    /// Readings currently waiting.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Readings dropped because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for ReadingQueue {
    fn default() -> Self {
        Self::new()
    }
}
