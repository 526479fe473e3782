//! Cross-task reading storage.
//!
//! - [`ReadingStore`]: the single mutex-guarded record written by producers
//!   and read by the display and heartbeat publisher
//! - [`queue::ReadingQueue`]: the bounded producer-to-consumer queue used
//!   instead of the store in queue share mode
//! - [`batch::BatchBuffer`]: fixed-capacity per-session recording

pub mod batch;
pub mod queue;

pub use batch::{BatchBuffer, BatchError, BatchView, ScalarBatch, VectorBatch};
pub use queue::{QueueError, ReadingQueue};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, with_timeout};
use log::debug;
use thiserror_no_std::Error;

use crate::config::{SlotLayout, store_write_wait};
use crate::readings::{Reading, SENSOR_KIND_COUNT, SensorKind};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The lock was not acquired within the bounded wait.
    #[error("Store lock not acquired within {waited_ms} ms")]
    Contention { waited_ms: u64 },
}

/// Copy of the store taken under the lock.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StoreSnapshot {
    /// Latest reading per kind (only populated in [`SlotLayout::PerKind`])
    slots: [Option<Reading>; SENSOR_KIND_COUNT],
    /// Whichever reading was written last, any kind
    last: Option<Reading>,
    /// Total accepted writes
    writes: u32,
}

impl StoreSnapshot {
    /// Latest reading of `kind`, if the store holds one.
    pub fn latest(&self, kind: SensorKind) -> Option<Reading> {
        self.slots[kind.index()].or(self.last.filter(|r| r.kind() == kind))
    }

    /// The most recent write of any kind.
    pub fn last(&self) -> Option<Reading> {
        self.last
    }

    pub fn writes(&self) -> u32 {
        self.writes
    }

    /// Latest scalar of `kind`, zero if none has been written yet.
    pub fn scalar_or_zero(&self, kind: SensorKind) -> i32 {
        self.latest(kind).and_then(|r| r.scalar()).unwrap_or(0)
    }

    /// Latest vector of `kind`, zeros if none has been written yet.
    pub fn vector_or_zero(&self, kind: SensorKind) -> [f32; 3] {
        self.latest(kind).and_then(|r| r.vector()).unwrap_or([0.0; 3])
    }
}

/// The shared reading record.
///
/// Every write and every read goes through the same mutex with a bounded
/// wait, so a reader can never observe a half-written reading. A timed-out
/// acquisition is reported to the caller, which drops the update and moves
/// on to its next iteration.
pub struct ReadingStore {
    layout: SlotLayout,
    record: Mutex<CriticalSectionRawMutex, StoreSnapshot>,
}

impl ReadingStore {
    pub const fn new(layout: SlotLayout) -> Self {
        Self {
            layout,
            record: Mutex::new(StoreSnapshot {
                slots: [None; SENSOR_KIND_COUNT],
                last: None,
                writes: 0,
            }),
        }
    }

    /// Store `reading`, waiting at most the writer's priority-dependent bound.
    pub async fn write(&self, reading: Reading) -> Result<(), StoreError> {
        let wait = store_write_wait(reading.kind());
        let mut record = with_timeout(wait, self.record.lock())
            .await
            .map_err(|_| StoreError::Contention {
                waited_ms: wait.as_millis(),
            })?;

        if self.layout == SlotLayout::PerKind {
            record.slots[reading.kind().index()] = Some(reading);
        }
        record.last = Some(reading);
        record.writes = record.writes.wrapping_add(1);
        debug!("Store <- {}", reading);

        Ok(())
    }

    /// Copy the record, waiting at most `wait` for the lock.
    pub async fn read(&self, wait: Duration) -> Result<StoreSnapshot, StoreError> {
        with_timeout(wait, self.record.lock())
            .await
            .map(|record| *record)
            .map_err(|_| StoreError::Contention {
                waited_ms: wait.as_millis(),
            })
    }

    /// Copy the record only if the lock is free right now.
    pub fn try_read(&self) -> Option<StoreSnapshot> {
        self.record.try_lock().ok().map(|record| *record)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use embassy_futures::block_on;
    use std::thread;

    #[test]
    fn test_per_kind_slots_keep_latest_of_each_kind() {
        let store = ReadingStore::new(SlotLayout::PerKind);
        block_on(async {
            store.write(Reading::Gsr(1800)).await.unwrap();
            store.write(Reading::Mic(40)).await.unwrap();
            store.write(Reading::Gsr(1900)).await.unwrap();
        });

        let snapshot = store.try_read().unwrap();
        assert_eq!(snapshot.latest(SensorKind::Gsr), Some(Reading::Gsr(1900)));
        assert_eq!(snapshot.latest(SensorKind::Mic), Some(Reading::Mic(40)));
        assert_eq!(snapshot.latest(SensorKind::Accel), None);
        assert_eq!(snapshot.last(), Some(Reading::Gsr(1900)));
        assert_eq!(snapshot.writes(), 3);
    }

    #[test]
    fn test_last_written_slot_is_shared() {
        let store = ReadingStore::new(SlotLayout::LastWritten);
        block_on(async {
            store.write(Reading::Gsr(1800)).await.unwrap();
            store.write(Reading::Accel([0.0, 0.0, 1.0])).await.unwrap();
        });

        let snapshot = store.try_read().unwrap();
        assert_eq!(snapshot.latest(SensorKind::Gsr), None);
        assert_eq!(
            snapshot.latest(SensorKind::Accel),
            Some(Reading::Accel([0.0, 0.0, 1.0]))
        );
        assert_eq!(snapshot.scalar_or_zero(SensorKind::Gsr), 0);
    }

    #[test]
    fn test_write_times_out_under_contention() {
        let store = ReadingStore::new(SlotLayout::PerKind);
        let guard = store.record.try_lock().unwrap();

        let result = block_on(store.write(Reading::Gsr(5)));
        assert_eq!(result, Err(StoreError::Contention { waited_ms: 10 }));

        let read = block_on(store.read(Duration::from_millis(5)));
        assert!(read.is_err());
        assert!(store.try_read().is_none());

        drop(guard);
        assert_eq!(store.try_read().unwrap().writes(), 0);
    }

    #[test]
    fn test_concurrent_writers_never_tear_a_slot() {
        const WRITES: i32 = 200;
        let store = ReadingStore::new(SlotLayout::PerKind);

        thread::scope(|s| {
            for sign in [1.0f32, -1.0] {
                let store = &store;
                s.spawn(move || {
                    for i in 0..WRITES {
                        let v = sign * i as f32;
                        // Retry until accepted so every write lands.
                        while block_on(store.write(Reading::Accel([v, v, v]))).is_err() {}
                    }
                });
            }
            let store = &store;
            s.spawn(move || {
                for i in 0..WRITES {
                    while block_on(store.write(Reading::Gsr(i))).is_err() {}
                }
            });
            s.spawn(move || {
                for _ in 0..WRITES {
                    if let Ok(snapshot) = block_on(store.read(Duration::from_millis(50))) {
                        let [x, y, z] = snapshot.vector_or_zero(SensorKind::Accel);
                        assert!(x == y && y == z, "torn accel slot: {x} {y} {z}");
                    }
                }
            });
        });

        let snapshot = store.try_read().unwrap();
        let [x, y, z] = snapshot.vector_or_zero(SensorKind::Accel);
        assert!(x == y && y == z);
        assert!(x == (WRITES - 1) as f32 || x == -((WRITES - 1) as f32));
        assert_eq!(snapshot.latest(SensorKind::Gsr), Some(Reading::Gsr(WRITES - 1)));
        assert_eq!(snapshot.writes(), 3 * WRITES as u32);
    }
}
