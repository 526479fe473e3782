use core::fmt::Debug;

use log::{error, info};

use super::{Sensor, SensorError};
use crate::config::GSR_OVERSAMPLE;
use crate::readings::{Reading, SensorKind};

/// An analog input channel wired to the GSR electrodes.
pub trait AnalogInput {
    type Error: Debug;

    /// Set attenuation and resolution. Called once before the first read.
    fn configure(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// One raw conversion in native ADC units.
    fn read_raw(&mut self) -> impl Future<Output = Result<u16, Self::Error>>;
}

/// Galvanic skin response from an oversampled ADC channel.
pub struct GsrSensor<A> {
    adc: A,
    configured: bool,
}

impl<A: AnalogInput> GsrSensor<A> {
    pub const fn new(adc: A) -> Self {
        Self {
            adc,
            configured: false,
        }
    }

    async fn configure(&mut self) -> Result<(), SensorError> {
        self.adc.configure().await.map_err(|e| {
            error!("GSR analog input configuration failed: {:?}", e);
            SensorError::HardwareFault {
                sensor: SensorKind::Gsr,
                operation: "configure analog input",
                details: "ADC rejected channel configuration",
            }
        })?;

        info!("GSR: analog input configured");
        self.configured = true;

        Ok(())
    }
}

impl<A: AnalogInput> Sensor for GsrSensor<A> {
    fn kind(&self) -> SensorKind {
        SensorKind::Gsr
    }

    async fn read(&mut self) -> Result<Reading, SensorError> {
        if !self.configured {
            self.configure().await?;
        }

        let mut sum: i32 = 0;
        for _ in 0..GSR_OVERSAMPLE {
            let raw = self.adc.read_raw().await.map_err(|e| {
                error!("GSR conversion failed: {:?}", e);
                SensorError::HardwareFault {
                    sensor: SensorKind::Gsr,
                    operation: "read raw conversion",
                    details: "ADC conversion error",
                }
            })?;
            sum += i32::from(raw);
        }

        Ok(Reading::Gsr(sum / GSR_OVERSAMPLE as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    struct FakeAdc {
        values: &'static [u16],
        reads: usize,
        configures: usize,
        fail_at: Option<usize>,
    }

    impl FakeAdc {
        fn new(values: &'static [u16]) -> Self {
            Self {
                values,
                reads: 0,
                configures: 0,
                fail_at: None,
            }
        }
    }

    impl AnalogInput for FakeAdc {
        type Error = ();

        async fn configure(&mut self) -> Result<(), ()> {
            self.configures += 1;
            Ok(())
        }

        async fn read_raw(&mut self) -> Result<u16, ()> {
            if self.fail_at == Some(self.reads) {
                return Err(());
            }
            let v = self.values[self.reads % self.values.len()];
            self.reads += 1;
            Ok(v)
        }
    }

    #[test]
    fn test_averages_ten_raw_reads() {
        let mut gsr = GsrSensor::new(FakeAdc::new(&[2000]));
        assert_eq!(block_on(gsr.read()), Ok(Reading::Gsr(2000)));
        assert_eq!(gsr.adc.reads, GSR_OVERSAMPLE);
    }

    #[test]
    fn test_average_truncates() {
        // 5 * 1 + 5 * 2 = 15, / 10 = 1
        let mut gsr = GsrSensor::new(FakeAdc::new(&[1, 2]));
        assert_eq!(block_on(gsr.read()), Ok(Reading::Gsr(1)));
    }

    #[test]
    fn test_configures_once() {
        let mut gsr = GsrSensor::new(FakeAdc::new(&[100]));
        block_on(async {
            gsr.read().await.unwrap();
            gsr.read().await.unwrap();
        });
        assert_eq!(gsr.adc.configures, 1);
    }

    #[test]
    fn test_conversion_error_is_a_fault_not_zero() {
        let mut adc = FakeAdc::new(&[100]);
        adc.fail_at = Some(3);
        let mut gsr = GsrSensor::new(adc);
        assert!(matches!(
            block_on(gsr.read()),
            Err(SensorError::HardwareFault {
                sensor: SensorKind::Gsr,
                ..
            })
        ));
    }
}
