//! Application context shared by every task, and application-wide errors.

use core::fmt::{Display, Write};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};
use thiserror_no_std::Error;

use crate::config::{BrokerConfig, Config, ConfigError, RuntimeConfig, ShareMode, UI_INPUT_CAPACITY};
use crate::identity::{ClientIdentity, IdentityError};
use crate::publisher::MessageSequence;
use crate::readings::{Reading, SensorKind};
use crate::storage::{QueueError, ReadingQueue, ReadingStore, StoreError};
use crate::tasks::ResumeChain;

/// Copy as much of `s` as fits, cutting at a char boundary.
pub fn truncated<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Render `value` into a bounded message, dropping whatever does not fit.
pub fn message<const N: usize>(value: impl Display) -> heapless::String<N> {
    let mut out = heapless::String::new();
    write!(out, "{}", value).ok();
    out
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(heapless::String<64>),
    #[error("Identity error: {0}")]
    Identity(heapless::String<64>),
    #[error("Reading not delivered: {0}")]
    Delivery(heapless::String<64>),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        Self::Config(message(e))
    }
}

impl From<IdentityError> for AppError {
    fn from(e: IdentityError) -> Self {
        Self::Identity(message(e))
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        Self::Delivery(message(e))
    }
}

impl From<QueueError> for AppError {
    fn from(e: QueueError) -> Self {
        Self::Delivery(message(e))
    }
}

/// Touch-layer events for the UI task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiInput {
    Select(SensorKind),
    Start,
    Send,
    Home,
}

/// Everything the tasks share, passed to each task entry point by reference.
///
/// The store is the only part mutated by more than one task. Session state,
/// batch buffers and the display are owned by the UI task alone.
pub struct AppContext<'a> {
    pub config: RuntimeConfig,
    pub broker: BrokerConfig<'a>,
    pub identity: ClientIdentity,
    pub store: ReadingStore,
    pub queue: ReadingQueue,
    pub chain: ResumeChain,
    pub sequence: MessageSequence,
    pub inputs: Channel<CriticalSectionRawMutex, UiInput, UI_INPUT_CAPACITY>,
}

impl<'a> AppContext<'a> {
    /// Build the context from a validated configuration.
    pub fn new(config: Config<'a>, identity: ClientIdentity) -> Result<Self, AppError> {
        config.runtime.validate()?;
        let runtime = config.runtime;

        info!(
            "Context: {:?} sharing, {:?} slots, {:?} publishing, {:?} activation, {} samples",
            runtime.share_mode,
            runtime.slot_layout,
            runtime.publish_mode,
            runtime.activation,
            runtime.sample_count
        );

        Ok(Self {
            config: runtime,
            broker: config.broker,
            identity,
            store: ReadingStore::new(runtime.slot_layout),
            queue: ReadingQueue::new(),
            chain: ResumeChain::new(),
            sequence: MessageSequence::new(),
            inputs: Channel::new(),
        })
    }

    /// Hand a fresh reading to the consumer side: the store or the queue,
    /// depending on the share mode. A failed hand-off drops the reading.
    pub async fn deliver(&self, reading: Reading) -> Result<(), AppError> {
        let result = match self.config.share_mode {
            ShareMode::Store => self.store.write(reading).await.map_err(AppError::from),
            ShareMode::Queue => self
                .queue
                .send(reading, self.config.queue_send_timeout())
                .await
                .map_err(AppError::from),
        };

        if let Err(e) = &result {
            warn!("Dropped {}: {}", reading, e);
        }
        result
    }

    /// Queue a touch event for the UI task. Returns false if the input
    /// channel is full and the event was dropped.
    pub fn post_input(&self, input: UiInput) -> bool {
        match self.inputs.try_send(input) {
            Ok(()) => true,
            Err(_) => {
                warn!("UI input {:?} dropped, channel full", input);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ShareMode, SlotLayout};
    use embassy_futures::block_on;
    use embassy_time::Duration;

    fn context(share_mode: ShareMode) -> AppContext<'static> {
        let config = Config {
            runtime: RuntimeConfig {
                share_mode,
                ..RuntimeConfig::default()
            },
            ..Config::default()
        };
        AppContext::new(config, ClientIdentity::new("kiosk-01").unwrap()).unwrap()
    }

    #[test]
    fn test_truncated_cuts_at_char_boundary() {
        let s: heapless::String<4> = truncated("héllo");
        assert_eq!(s.as_str(), "hél");
        let s: heapless::String<2> = truncated("hé");
        assert_eq!(s.as_str(), "h");
    }

    #[test]
    fn test_deliver_to_store() {
        let ctx = context(ShareMode::Store);
        block_on(ctx.deliver(Reading::Gsr(2000))).unwrap();
        let snapshot = ctx.store.try_read().unwrap();
        assert_eq!(snapshot.latest(SensorKind::Gsr), Some(Reading::Gsr(2000)));
        assert!(ctx.queue.is_empty());
    }

    #[test]
    fn test_deliver_to_queue_drops_when_full() {
        let ctx = context(ShareMode::Queue);
        block_on(async {
            for i in 0..10 {
                ctx.deliver(Reading::Mic(i)).await.unwrap();
            }
            assert!(matches!(
                ctx.deliver(Reading::Mic(10)).await,
                Err(AppError::Delivery(_))
            ));
            assert_eq!(
                ctx.queue.receive(Duration::from_millis(1)).await,
                Some(Reading::Mic(0))
            );
        });
        assert_eq!(ctx.store.try_read().unwrap().writes(), 0);
    }

    #[test]
    fn test_invalid_runtime_rejected() {
        let config = Config {
            runtime: RuntimeConfig {
                sample_count: 0,
                slot_layout: SlotLayout::LastWritten,
                ..RuntimeConfig::default()
            },
            ..Config::default()
        };
        let result = AppContext::new(config, ClientIdentity::new("x").unwrap());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_input_channel_is_bounded() {
        let ctx = context(ShareMode::Store);
        for _ in 0..UI_INPUT_CAPACITY {
            assert!(ctx.post_input(UiInput::Home));
        }
        assert!(!ctx.post_input(UiInput::Start));
    }
}
