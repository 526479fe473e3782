use core::fmt::Debug;

use embassy_time::{Duration, with_timeout};
use log::{error, warn};

use super::{Sensor, SensorError};
use crate::config::MIC_FRAME_SAMPLES;
use crate::readings::{Reading, SensorKind};

/// A digital microphone capture peripheral (I2S/PDM).
pub trait MicCapture {
    type Error: Debug;

    fn start(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// Fill `frame` with signed samples, returning how many were written.
    fn read_frame(&mut self, frame: &mut [i16]) -> impl Future<Output = Result<usize, Self::Error>>;

    fn stop(&mut self) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Noise level as the mean magnitude of one captured frame.
///
/// Capture is stopped after every attempt, whether the frame arrived,
/// failed or ran out of time.
pub struct MicSensor<M> {
    mic: M,
    budget: Duration,
    frame: [i16; MIC_FRAME_SAMPLES],
}

impl<M: MicCapture> MicSensor<M> {
    /// `budget` bounds the frame read.
    pub const fn new(mic: M, budget: Duration) -> Self {
        Self {
            mic,
            budget,
            frame: [0; MIC_FRAME_SAMPLES],
        }
    }

    async fn capture(&mut self) -> Result<usize, SensorError> {
        match with_timeout(self.budget, self.mic.read_frame(&mut self.frame)).await {
            Ok(Ok(0)) => Err(SensorError::NotReady {
                sensor: SensorKind::Mic,
            }),
            Ok(Ok(count)) => Ok(count.min(MIC_FRAME_SAMPLES)),
            Ok(Err(e)) => {
                error!("Mic frame read failed: {:?}", e);
                Err(SensorError::HardwareFault {
                    sensor: SensorKind::Mic,
                    operation: "read frame",
                    details: "capture peripheral error",
                })
            }
            Err(_) => Err(SensorError::Timeout {
                sensor: SensorKind::Mic,
                operation: "read frame",
            }),
        }
    }
}

impl<M: MicCapture> Sensor for MicSensor<M> {
    fn kind(&self) -> SensorKind {
        SensorKind::Mic
    }

    async fn read(&mut self) -> Result<Reading, SensorError> {
        self.mic.start().await.map_err(|e| {
            error!("Mic capture start failed: {:?}", e);
            SensorError::HardwareFault {
                sensor: SensorKind::Mic,
                operation: "start capture",
                details: "capture peripheral error",
            }
        })?;

        let captured = self.capture().await;

        if let Err(e) = self.mic.stop().await {
            warn!("Mic capture stop failed: {:?}", e);
        }

        let count = captured?;
        Ok(Reading::Mic(mean_magnitude(&self.frame[..count])))
    }
}

/// Mean of `|sample|`, truncated.
fn mean_magnitude(samples: &[i16]) -> i32 {
    if samples.is_empty() {
        return 0;
    }
    let sum: i64 = samples.iter().map(|s| i64::from(*s).abs()).sum();
    (sum / samples.len() as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[derive(Default)]
    struct FakeMic {
        amplitude: i16,
        hang: bool,
        fail: bool,
        started: usize,
        stopped: usize,
    }

    impl MicCapture for FakeMic {
        type Error = ();

        async fn start(&mut self) -> Result<(), ()> {
            self.started += 1;
            Ok(())
        }

        async fn read_frame(&mut self, frame: &mut [i16]) -> Result<usize, ()> {
            if self.hang {
                core::future::pending::<()>().await;
            }
            if self.fail {
                return Err(());
            }
            for (i, s) in frame.iter_mut().enumerate() {
                *s = if i % 2 == 0 {
                    self.amplitude
                } else {
                    -self.amplitude
                };
            }
            Ok(frame.len())
        }

        async fn stop(&mut self) -> Result<(), ()> {
            self.stopped += 1;
            Ok(())
        }
    }

    fn sensor(mic: FakeMic) -> MicSensor<FakeMic> {
        MicSensor::new(mic, Duration::from_millis(20))
    }

    #[test]
    fn test_noise_level_is_mean_magnitude() {
        let mut mic = sensor(FakeMic {
            amplitude: 300,
            ..FakeMic::default()
        });
        assert_eq!(block_on(mic.read()), Ok(Reading::Mic(300)));
        assert_eq!(mic.mic.stopped, 1);
    }

    #[test]
    fn test_stops_after_timeout() {
        let mut mic = sensor(FakeMic {
            hang: true,
            ..FakeMic::default()
        });
        assert_eq!(
            block_on(mic.read()),
            Err(SensorError::Timeout {
                sensor: SensorKind::Mic,
                operation: "read frame"
            })
        );
        assert_eq!(mic.mic.started, 1);
        assert_eq!(mic.mic.stopped, 1);
    }

    #[test]
    fn test_stops_after_read_error() {
        let mut mic = sensor(FakeMic {
            fail: true,
            ..FakeMic::default()
        });
        assert!(block_on(mic.read()).is_err());
        assert_eq!(mic.mic.stopped, 1);
    }

    #[test]
    fn test_mean_magnitude_of_mixed_signs() {
        assert_eq!(mean_magnitude(&[-10, 10, -20, 20]), 15);
        assert_eq!(mean_magnitude(&[i16::MIN, i16::MAX]), 32767);
    }
}
