//! Register-level MPU6886 driver over async I2C.
//!
//! The accelerometer and gyroscope adapters read the same chip from different
//! tasks. Both hold a reference to one [`SharedImu`], so the chip is
//! configured once and each read holds the lock for one burst.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::I2c;
use log::{error, info};

use super::{Sensor, SensorError};
use crate::readings::{Reading, SensorKind};

/// Default 7-bit bus address
pub const MPU6886_ADDRESS: u8 = 0x68;

const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_GYRO_XOUT_H: u8 = 0x43;
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_WHO_AM_I: u8 = 0x75;
const WHO_AM_I_EXPECTED: u8 = 0x19;

/// ±8 g full scale
const ACCEL_FS_8G: u8 = 0x10;
/// ±2000 °/s full scale
const GYRO_FS_2000DPS: u8 = 0x18;

const ACCEL_LSB_PER_G: f32 = 4096.0;
const GYRO_LSB_PER_DPS: f32 = 16.4;

/// MPU6886 six-axis IMU.
///
/// The first read of either half checks WHO_AM_I, wakes the chip and sets
/// the full-scale ranges; a failed bring-up is retried on the next read.
pub struct Mpu6886<I> {
    i2c: I,
    address: u8,
    initialized: bool,
}

impl<I: I2c> Mpu6886<I> {
    pub const fn new(i2c: I) -> Self {
        Self::with_address(i2c, MPU6886_ADDRESS)
    }

    pub const fn with_address(i2c: I, address: u8) -> Self {
        Self {
            i2c,
            address,
            initialized: false,
        }
    }

    /// Check identity, wake from sleep and set both full-scale ranges.
    async fn initialize(&mut self, sensor: SensorKind) -> Result<(), SensorError> {
        let mut who = [0u8; 1];
        self.i2c
            .write_read(self.address, &[REG_WHO_AM_I], &mut who)
            .await
            .map_err(|e| {
                error!("MPU6886 WHO_AM_I read failed: {:?}", e);
                SensorError::HardwareFault {
                    sensor,
                    operation: "read WHO_AM_I",
                    details: "I2C communication error",
                }
            })?;
        if who[0] != WHO_AM_I_EXPECTED {
            error!("MPU6886 unexpected WHO_AM_I {:#04x}", who[0]);
            return Err(SensorError::NotReady { sensor });
        }

        for (register, value) in [
            (REG_PWR_MGMT_1, 0x00),
            (REG_ACCEL_CONFIG, ACCEL_FS_8G),
            (REG_GYRO_CONFIG, GYRO_FS_2000DPS),
        ] {
            self.i2c
                .write(self.address, &[register, value])
                .await
                .map_err(|e| {
                    error!("MPU6886 write to {:#04x} failed: {:?}", register, e);
                    SensorError::HardwareFault {
                        sensor,
                        operation: "configure",
                        details: "I2C communication error",
                    }
                })?;
        }

        info!("MPU6886 initialised (±8g, ±2000°/s)");
        self.initialized = true;

        Ok(())
    }

    async fn read_axes(
        &mut self,
        sensor: SensorKind,
        register: u8,
        lsb_per_unit: f32,
    ) -> Result<[f32; 3], SensorError> {
        if !self.initialized {
            self.initialize(sensor).await?;
        }

        let mut raw = [0u8; 6];
        self.i2c
            .write_read(self.address, &[register], &mut raw)
            .await
            .map_err(|e| {
                error!("MPU6886 burst read at {:#04x} failed: {:?}", register, e);
                SensorError::HardwareFault {
                    sensor,
                    operation: "burst read axes",
                    details: "I2C communication error",
                }
            })?;

        Ok([
            i16::from_be_bytes([raw[0], raw[1]]) as f32 / lsb_per_unit,
            i16::from_be_bytes([raw[2], raw[3]]) as f32 / lsb_per_unit,
            i16::from_be_bytes([raw[4], raw[5]]) as f32 / lsb_per_unit,
        ])
    }

    /// Acceleration in g, `[x, y, z]`.
    pub async fn read_accel(&mut self) -> Result<[f32; 3], SensorError> {
        self.read_axes(SensorKind::Accel, REG_ACCEL_XOUT_H, ACCEL_LSB_PER_G)
            .await
    }

    /// Angular rate in °/s, `[x, y, z]`.
    pub async fn read_gyro(&mut self) -> Result<[f32; 3], SensorError> {
        self.read_axes(SensorKind::Gyro, REG_GYRO_XOUT_H, GYRO_LSB_PER_DPS)
            .await
    }
}

/// One IMU shared by its accelerometer and gyroscope adapters.
pub type SharedImu<I> = Mutex<CriticalSectionRawMutex, Mpu6886<I>>;

/// Accelerometer half of the IMU.
pub struct AccelSensor<'a, I> {
    imu: &'a SharedImu<I>,
}

impl<'a, I: I2c> AccelSensor<'a, I> {
    pub const fn new(imu: &'a SharedImu<I>) -> Self {
        Self { imu }
    }
}

impl<I> Clone for AccelSensor<'_, I> {
    fn clone(&self) -> Self {
        Self { imu: self.imu }
    }
}

impl<I: I2c> Sensor for AccelSensor<'_, I> {
    fn kind(&self) -> SensorKind {
        SensorKind::Accel
    }

    async fn read(&mut self) -> Result<Reading, SensorError> {
        let mut imu = self.imu.lock().await;
        imu.read_accel().await.map(Reading::Accel)
    }
}

/// Gyroscope half of the IMU, reporting `[roll, yaw, pitch]`.
pub struct GyroSensor<'a, I> {
    imu: &'a SharedImu<I>,
}

impl<'a, I: I2c> GyroSensor<'a, I> {
    pub const fn new(imu: &'a SharedImu<I>) -> Self {
        Self { imu }
    }
}

impl<I> Clone for GyroSensor<'_, I> {
    fn clone(&self) -> Self {
        Self { imu: self.imu }
    }
}

impl<I: I2c> Sensor for GyroSensor<'_, I> {
    fn kind(&self) -> SensorKind {
        SensorKind::Gyro
    }

    async fn read(&mut self) -> Result<Reading, SensorError> {
        let mut imu = self.imu.lock().await;
        // roll, yaw, pitch = gyro x, y, z
        let [x, y, z] = imu.read_gyro().await?;
        Ok(Reading::Gyro([x, y, z]))
    }
}
