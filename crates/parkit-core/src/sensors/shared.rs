use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

use super::{Sensor, SensorError};
use crate::readings::{Reading, SensorKind};

/// Handle to a sensor adapter shared between tasks.
///
/// The producer task and the UI task each hold one of these over the same
/// adapter; the async mutex serializes whole reads, so a capture in progress
/// is never interleaved with another caller's.
pub struct SharedSensor<'a, S> {
    sensor: &'a Mutex<CriticalSectionRawMutex, S>,
    kind: SensorKind,
}

impl<'a, S: Sensor> SharedSensor<'a, S> {
    /// `kind` must match the wrapped adapter's kind.
    pub const fn new(sensor: &'a Mutex<CriticalSectionRawMutex, S>, kind: SensorKind) -> Self {
        Self { sensor, kind }
    }
}

impl<S> Clone for SharedSensor<'_, S> {
    fn clone(&self) -> Self {
        Self {
            sensor: self.sensor,
            kind: self.kind,
        }
    }
}

impl<S: Sensor> Sensor for SharedSensor<'_, S> {
    fn kind(&self) -> SensorKind {
        self.kind
    }

    async fn read(&mut self) -> Result<Reading, SensorError> {
        let mut sensor = self.sensor.lock().await;
        sensor.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    struct Counter(i32);

    impl Sensor for Counter {
        fn kind(&self) -> SensorKind {
            SensorKind::Mic
        }

        async fn read(&mut self) -> Result<Reading, SensorError> {
            self.0 += 1;
            Ok(Reading::Mic(self.0))
        }
    }

    #[test]
    fn test_handles_share_one_adapter() {
        let adapter = Mutex::new(Counter(0));
        let mut producer = SharedSensor::new(&adapter, SensorKind::Mic);
        let mut ui = producer.clone();

        block_on(async {
            assert_eq!(producer.read().await, Ok(Reading::Mic(1)));
            assert_eq!(ui.read().await, Ok(Reading::Mic(2)));
        });
        assert_eq!(ui.kind(), SensorKind::Mic);
    }
}
