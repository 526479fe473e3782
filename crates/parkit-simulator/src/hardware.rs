//! Synthetic peripherals standing in for the kiosk's ADC, microphone, IMU and
//! identity store.
//!
//! Every signal is a slow function of embassy time so the live screen and the
//! published batches show plausible, changing values.

use core::convert::Infallible;

use embassy_time::{Instant, Timer};
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};
use log::{debug, trace};

use parkit_core::identity::{ClientIdentity, IdentityError, IdentityProvider};
use parkit_core::sensors::{AnalogInput, MPU6886_ADDRESS, MicCapture};

/// Seconds since the executor started, as a float.
fn seconds() -> f32 {
    Instant::now().as_millis() as f32 / 1000.0
}

/// Skin-conductance ADC: a baseline around 2000 with slow arousal swings.
pub struct SimAdc;

impl AnalogInput for SimAdc {
    type Error = Infallible;

    async fn configure(&mut self) -> Result<(), Infallible> {
        debug!("Sim ADC: 12-bit, 11 dB attenuation");
        Ok(())
    }

    async fn read_raw(&mut self) -> Result<u16, Infallible> {
        let t = seconds();
        let value = 2000.0 + 180.0 * (t / 7.0).sin() + 25.0 * (t * 3.1).sin();
        Ok(value.clamp(0.0, 4095.0) as u16)
    }
}

/// PDM microphone producing a tone whose loudness drifts over time.
#[derive(Default)]
pub struct SimMic {
    running: bool,
    phase: u32,
}

impl MicCapture for SimMic {
    type Error = Infallible;

    async fn start(&mut self) -> Result<(), Infallible> {
        self.running = true;
        Ok(())
    }

    async fn read_frame(&mut self, frame: &mut [i16]) -> Result<usize, Infallible> {
        if !self.running {
            return Ok(0);
        }

        // One frame at 16 kHz takes 64 ms to fill.
        Timer::after_millis(64).await;

        let amplitude = 600.0 + 500.0 * (seconds() / 11.0).sin();
        for sample in frame.iter_mut() {
            let angle = self.phase as f32 * 0.07;
            *sample = (amplitude * angle.sin()) as i16;
            self.phase = self.phase.wrapping_add(1);
        }
        Ok(frame.len())
    }

    async fn stop(&mut self) -> Result<(), Infallible> {
        self.running = false;
        Ok(())
    }
}

const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_GYRO_XOUT_H: u8 = 0x43;
const REG_WHO_AM_I: u8 = 0x75;
const WHO_AM_I: u8 = 0x19;

const ACCEL_LSB_PER_G: f32 = 4096.0;
const GYRO_LSB_PER_DPS: f32 = 16.4;

/// Register model of an MPU6886 resting on a gently rocking kiosk.
///
/// Answers WHO_AM_I, accepts configuration writes and serves six-byte
/// big-endian axis bursts from the accel and gyro data registers.
#[derive(Default)]
pub struct SimImu {
    pointer: u8,
}

impl SimImu {
    fn accel(t: f32) -> [f32; 3] {
        [
            0.05 * (t / 3.0).sin(),
            0.04 * (t / 5.0).cos(),
            1.0 + 0.02 * (t * 2.0).sin(),
        ]
    }

    fn gyro(t: f32) -> [f32; 3] {
        [
            12.0 * (t / 3.0).cos(),
            4.0 * (t / 9.0).sin(),
            -8.0 * (t / 5.0).sin(),
        ]
    }

    fn encode(axes: [f32; 3], lsb_per_unit: f32, out: &mut [u8]) {
        let mut bytes = [0u8; 6];
        for (chunk, value) in bytes.chunks_exact_mut(2).zip(axes) {
            let raw = (value * lsb_per_unit).clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            chunk.copy_from_slice(&raw.to_be_bytes());
        }
        for (dst, src) in out.iter_mut().zip(bytes) {
            *dst = src;
        }
    }

    fn fill(&self, out: &mut [u8]) {
        let t = seconds();
        match self.pointer {
            REG_WHO_AM_I => out.fill(WHO_AM_I),
            REG_ACCEL_XOUT_H => Self::encode(Self::accel(t), ACCEL_LSB_PER_G, out),
            REG_GYRO_XOUT_H => Self::encode(Self::gyro(t), GYRO_LSB_PER_DPS, out),
            _ => out.fill(0),
        }
    }
}

impl ErrorType for SimImu {
    type Error = Infallible;
}

impl I2c for SimImu {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Infallible> {
        if address != MPU6886_ADDRESS {
            trace!("Sim I2C: no device at {:#04x}", address);
            return Ok(());
        }

        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    if let Some((register, rest)) = bytes.split_first() {
                        self.pointer = *register;
                        if !rest.is_empty() {
                            debug!("Sim IMU: {:#04x} <- {:02x?}", register, rest);
                        }
                    }
                }
                Operation::Read(buffer) => self.fill(buffer),
            }
        }
        Ok(())
    }
}

/// Provisioned client id, overridable with `PARKIT_CLIENT_ID`.
pub struct SimIdentity;

impl IdentityProvider for SimIdentity {
    async fn client_id(&mut self) -> Result<ClientIdentity, IdentityError> {
        match std::env::var("PARKIT_CLIENT_ID") {
            Ok(id) => ClientIdentity::new(&id),
            Err(_) => ClientIdentity::new("parkit-sim-01"),
        }
    }
}
