//! Cloud publishing: per-value batch messages and periodic heartbeats.
//!
//! Payloads are JSON. Every batch message carries a sequence id drawn from a
//! [`MessageSequence`] shared by all publishers, so ids are unique and
//! increasing across the whole device.

use core::sync::atomic::{AtomicU32, Ordering};

use alloc::vec::Vec;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, with_timeout};
use log::{debug, info, warn};
use serde::{Serialize, Serializer};
use thiserror_no_std::Error;

use crate::config::BrokerConfig;
use crate::identity::ClientIdentity;
use crate::readings::{MeasurementType, SensorKind};
use crate::storage::{BatchView, StoreSnapshot};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    #[error("Publish not acknowledged within {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("Transport error: {details}")]
    Transport { details: &'static str },
    #[error("Payload could not be encoded")]
    Encoding,
}

/// The long-lived broker connection. Connection management is its own concern.
pub trait NetworkClient {
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), PublishError>>;
}

/// Handle to a client shared by several tasks.
pub struct SharedClient<'a, C> {
    client: &'a Mutex<CriticalSectionRawMutex, C>,
}

impl<'a, C: NetworkClient> SharedClient<'a, C> {
    pub const fn new(client: &'a Mutex<CriticalSectionRawMutex, C>) -> Self {
        Self { client }
    }
}

impl<C: NetworkClient> NetworkClient for SharedClient<'_, C> {
    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        let mut client = self.client.lock().await;
        client.publish(topic, payload).await
    }
}

/// Device-wide batch message id counter.
#[derive(Debug, Default)]
pub struct MessageSequence {
    next: AtomicU32,
}

impl MessageSequence {
    pub const fn new() -> Self {
        Self {
            next: AtomicU32::new(0),
        }
    }

    pub fn next_id(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Id the next message will get.
    pub fn peek(&self) -> u32 {
        self.next.load(Ordering::Relaxed)
    }
}

/// Outcome of one batch walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub sent: u16,
    pub failed: u16,
}

fn id_as_string<S: Serializer>(id: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}

#[derive(Serialize, Debug)]
struct MeasurementPayload<'a> {
    #[serde(serialize_with = "id_as_string")]
    id: u32,
    #[serde(rename = "measurementValue")]
    measurement_value: i32,
    #[serde(rename = "measurementType")]
    measurement_type: MeasurementType,
    #[serde(rename = "clientID")]
    client_id: &'a str,
}

#[derive(Serialize, Debug)]
struct HeartbeatPayload<'a> {
    gsr: i32,
    mic: i32,
    #[serde(rename = "accelZero")]
    accel_zero: f32,
    #[serde(rename = "accelOne")]
    accel_one: f32,
    #[serde(rename = "accelTwo")]
    accel_two: f32,
    client_id: &'a str,
}

/// Sends batch and heartbeat messages through one [`NetworkClient`].
///
/// Every publish is bounded by `timeout`. Batch messages take their ids from
/// the shared [`MessageSequence`]; heartbeats do not consume ids.
pub struct Publisher<'a, C> {
    client: C,
    batch_topic: &'a str,
    heartbeat_topic: &'a str,
    timeout: Duration,
    sequence: &'a MessageSequence,
}

impl<'a, C: NetworkClient> Publisher<'a, C> {
    pub const fn new(
        client: C,
        broker: &BrokerConfig<'a>,
        timeout: Duration,
        sequence: &'a MessageSequence,
    ) -> Self {
        Self {
            client,
            batch_topic: broker.batch_topic,
            heartbeat_topic: broker.heartbeat_topic,
            timeout,
            sequence,
        }
    }

    async fn send<P: Serialize>(&mut self, topic: &str, payload: &P) -> Result<(), PublishError> {
        let bytes: Vec<u8> = serde_json::to_vec(payload).map_err(|_| PublishError::Encoding)?;
        match with_timeout(self.timeout, self.client.publish(topic, &bytes)).await {
            Ok(result) => result,
            Err(_) => Err(PublishError::Timeout {
                timeout_ms: self.timeout.as_millis(),
            }),
        }
    }

    /// Publish every recorded value of a session, one message each.
    ///
    /// A message that times out or fails is logged and skipped; the walk
    /// always reaches the end of the batch.
    pub async fn publish_batch(
        &mut self,
        batch: BatchView<'_>,
        kind: SensorKind,
        client_id: &ClientIdentity,
    ) -> BatchReport {
        let topic = self.batch_topic;
        let types = kind.measurement_types();
        let mut report = BatchReport::default();

        for (i, value) in batch.iter_truncated().enumerate() {
            let payload = MeasurementPayload {
                id: self.sequence.next_id(),
                measurement_value: value,
                measurement_type: types[i % types.len()],
                client_id: client_id.as_str(),
            };

            match self.send(topic, &payload).await {
                Ok(()) => {
                    debug!("Published #{} {} = {}", payload.id, payload.measurement_type, value);
                    report.sent += 1;
                }
                Err(e) => {
                    warn!("Message #{} not published: {}", payload.id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "{} batch published: {} sent, {} failed",
            kind, report.sent, report.failed
        );
        report
    }

    /// Publish the latest value of every kind in one message.
    pub async fn publish_heartbeat(
        &mut self,
        snapshot: &StoreSnapshot,
        client_id: &ClientIdentity,
    ) -> Result<(), PublishError> {
        let [accel_zero, accel_one, accel_two] = snapshot.vector_or_zero(SensorKind::Accel);
        let payload = HeartbeatPayload {
            gsr: snapshot.scalar_or_zero(SensorKind::Gsr),
            mic: snapshot.scalar_or_zero(SensorKind::Mic),
            accel_zero,
            accel_one,
            accel_two,
            client_id: client_id.as_str(),
        };

        let topic = self.heartbeat_topic;
        self.send(topic, &payload).await.inspect_err(|e| {
            warn!("Heartbeat not published: {}", e);
        })
    }
}
