//! Producer activation chain.
//!
//! In chained mode producers do not poll. They sleep until another task
//! resumes them:
//!
//! ```text
//! heartbeat tick --> accel, mic
//! mic acquired   --> gsr, accel
//! ```
//!
//! The gyroscope is never chained and always runs on its own period.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::{self, raw::CriticalSectionRawMutex};
use embassy_sync::signal::Signal;
use log::trace;

use crate::readings::{SENSOR_KIND_COUNT, SensorKind};

/// Events that resume chained producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A microphone cycle finished
    MicAcquired,
    /// The heartbeat period elapsed
    HeartbeatTick,
}

impl Trigger {
    const ALL: [Self; 2] = [Self::MicAcquired, Self::HeartbeatTick];

    /// Producers resumed by this trigger.
    pub const fn targets(self) -> &'static [SensorKind] {
        match self {
            Self::MicAcquired => &[SensorKind::Gsr, SensorKind::Accel],
            Self::HeartbeatTick => &[SensorKind::Accel, SensorKind::Mic],
        }
    }

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Activation state of one producer.
struct Slot {
    /// One bit per [`Trigger`] not yet consumed
    pending: blocking_mutex::Mutex<CriticalSectionRawMutex, Cell<u8>>,
    wake: Signal<CriticalSectionRawMutex, ()>,
    resumes: AtomicU32,
}

impl Slot {
    const fn new() -> Self {
        Self {
            pending: blocking_mutex::Mutex::new(Cell::new(0)),
            wake: Signal::new(),
            resumes: AtomicU32::new(0),
        }
    }

    /// Clear and return one pending trigger.
    fn take(&self) -> Option<Trigger> {
        self.pending.lock(|pending| {
            let bits = pending.get();
            let trigger = Trigger::ALL.into_iter().find(|t| bits & t.bit() != 0)?;
            pending.set(bits & !trigger.bit());
            Some(trigger)
        })
    }
}

/// Pending triggers and a resume counter per producer.
///
/// Each trigger is tracked separately. Firing the same trigger twice before
/// the producer wakes resumes it once; two different triggers resume it twice.
pub struct ResumeChain {
    slots: [Slot; SENSOR_KIND_COUNT],
}

impl Default for ResumeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ResumeChain {
    pub const fn new() -> Self {
        Self {
            slots: [const { Slot::new() }; SENSOR_KIND_COUNT],
        }
    }

    /// Whether `kind`'s producer waits on this chain at all.
    pub const fn is_chained(kind: SensorKind) -> bool {
        !matches!(kind, SensorKind::Gyro)
    }

    pub fn fire(&self, trigger: Trigger) {
        for target in trigger.targets() {
            trace!("{:?} resumes {}", trigger, target);
            let slot = &self.slots[target.index()];
            slot.pending.lock(|pending| pending.set(pending.get() | trigger.bit()));
            slot.wake.signal(());
        }
    }

    /// Suspend until `kind` is resumed, returning the trigger consumed.
    pub async fn wait(&self, kind: SensorKind) -> Trigger {
        let slot = &self.slots[kind.index()];
        loop {
            if let Some(trigger) = slot.take() {
                slot.resumes.fetch_add(1, Ordering::Relaxed);
                return trigger;
            }
            slot.wake.wait().await;
        }
    }

    /// Whether a resume for `kind` is waiting to be consumed.
    pub fn is_pending(&self, kind: SensorKind) -> bool {
        self.slots[kind.index()].pending.lock(|pending| pending.get() != 0)
    }

    /// Times `kind` has been resumed.
    pub fn resumes(&self, kind: SensorKind) -> u32 {
        self.slots[kind.index()].resumes.load(Ordering::Relaxed)
    }
}
