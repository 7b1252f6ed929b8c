//! Bosch BME280 temperature / humidity / pressure sensor over I²C.
//!
//! Generic over [`embedded_hal::i2c::I2c`] so the same driver runs on the
//! ESP-IDF `I2cDriver` and on an in-memory register map in tests.
//!
//! Sampling is fixed at ×16 oversampling on all three channels, normal
//! mode, IIR filter off.  Every read is one 8-byte burst from `0xF7`
//! followed by the floating-point compensation from the datasheet.

use embedded_hal::i2c::I2c;
use log::{debug, info};

use crate::error::SensorError;

/// Default address with SDO tied low.
pub const DEFAULT_ADDRESS: u8 = 0x76;

const CHIP_ID: u8 = 0x60;

const REG_CHIP_ID: u8 = 0xD0;
const REG_CALIB_TP: u8 = 0x88;
const REG_CALIB_H: u8 = 0xE1;
const REG_CTRL_HUM: u8 = 0xF2;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_DATA: u8 = 0xF7;

/// osrs_h = ×16.
const CTRL_HUM_X16: u8 = 0b101;
/// osrs_t = ×16, osrs_p = ×16, mode = normal.
const CTRL_MEAS_X16_NORMAL: u8 = (0b101 << 5) | (0b101 << 2) | 0b11;
/// t_sb = 0.5 ms, filter off, no 3-wire SPI.
const CONFIG_FILTER_OFF: u8 = 0x00;

/// ADC value reported for a skipped 20-bit measurement.
const SKIPPED_20: i32 = 0x80000;
/// ADC value reported for a skipped humidity measurement.
const SKIPPED_16: i32 = 0x8000;

/// Factory trimming parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Calibration {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
    pub h1: u8,
    pub h2: i16,
    pub h3: u8,
    pub h4: i16,
    pub h5: i16,
    pub h6: i8,
}

impl Calibration {
    /// Decode the `0x88..=0xA1` and `0xE1..=0xE7` blocks.
    pub fn from_registers(tp: &[u8; 26], h: &[u8; 7]) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([tp[i], tp[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([tp[i], tp[i + 1]]);
        Self {
            t1: u16_at(0),
            t2: i16_at(2),
            t3: i16_at(4),
            p1: u16_at(6),
            p2: i16_at(8),
            p3: i16_at(10),
            p4: i16_at(12),
            p5: i16_at(14),
            p6: i16_at(16),
            p7: i16_at(18),
            p8: i16_at(20),
            p9: i16_at(22),
            h1: tp[25],
            h2: i16::from_le_bytes([h[0], h[1]]),
            h3: h[2],
            // H4 and H5 are 12-bit signed values sharing the nibbles of 0xE5.
            h4: (i16::from(h[3] as i8) << 4) | i16::from(h[4] & 0x0F),
            h5: (i16::from(h[5] as i8) << 4) | i16::from(h[4] >> 4),
            h6: h[6] as i8,
        }
    }

    /// Fine temperature value shared by the other two compensations.
    pub fn t_fine(&self, adc_t: i32) -> f64 {
        let adc = f64::from(adc_t);
        let t1 = f64::from(self.t1);
        let var1 = (adc / 16_384.0 - t1 / 1_024.0) * f64::from(self.t2);
        let d = adc / 131_072.0 - t1 / 8_192.0;
        let var2 = d * d * f64::from(self.t3);
        var1 + var2
    }

    /// Degrees Celsius.
    pub fn temperature(&self, t_fine: f64) -> f64 {
        t_fine / 5_120.0
    }

    /// Pascals.
    pub fn pressure(&self, t_fine: f64, adc_p: i32) -> f64 {
        let mut var1 = t_fine / 2.0 - 64_000.0;
        let mut var2 = var1 * var1 * f64::from(self.p6) / 32_768.0;
        var2 += var1 * f64::from(self.p5) * 2.0;
        var2 = var2 / 4.0 + f64::from(self.p4) * 65_536.0;
        var1 = (f64::from(self.p3) * var1 * var1 / 524_288.0 + f64::from(self.p2) * var1) / 524_288.0;
        var1 = (1.0 + var1 / 32_768.0) * f64::from(self.p1);
        if var1 == 0.0 {
            return 0.0;
        }
        let mut p = 1_048_576.0 - f64::from(adc_p);
        p = (p - var2 / 4_096.0) * 6_250.0 / var1;
        let var1 = f64::from(self.p9) * p * p / 2_147_483_648.0;
        let var2 = p * f64::from(self.p8) / 32_768.0;
        p + (var1 + var2 + f64::from(self.p7)) / 16.0
    }

    /// Relative humidity in percent, clamped to 0–100.
    pub fn humidity(&self, t_fine: f64, adc_h: i32) -> f64 {
        let x = t_fine - 76_800.0;
        let mut h = (f64::from(adc_h)
            - (f64::from(self.h4) * 64.0 + f64::from(self.h5) / 16_384.0 * x))
            * (f64::from(self.h2) / 65_536.0
                * (1.0
                    + f64::from(self.h6) / 67_108_864.0
                        * x
                        * (1.0 + f64::from(self.h3) / 67_108_864.0 * x)));
        h *= 1.0 - f64::from(self.h1) * h / 524_288.0;
        h.clamp(0.0, 100.0)
    }
}

/// One compensated reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_hpa: f32,
}

pub struct Bme280<I2C> {
    i2c: I2C,
    address: u8,
    calib: Option<Calibration>,
}

impl<I2C: I2c> Bme280<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            calib: None,
        }
    }

    /// Probe the chip ID, load calibration and start normal-mode sampling.
    pub fn init(&mut self) -> Result<(), SensorError> {
        let mut id = [0u8; 1];
        self.read_regs(REG_CHIP_ID, &mut id)?;
        if id[0] != CHIP_ID {
            return Err(SensorError::UnexpectedChipId(id[0]));
        }

        let mut tp = [0u8; 26];
        let mut h = [0u8; 7];
        self.read_regs(REG_CALIB_TP, &mut tp)?;
        self.read_regs(REG_CALIB_H, &mut h)?;
        let calib = Calibration::from_registers(&tp, &h);
        debug!("bme280: calibration {:?}", calib);

        // ctrl_hum only latches after a ctrl_meas write.
        self.write_reg(REG_CTRL_HUM, CTRL_HUM_X16)?;
        self.write_reg(REG_CTRL_MEAS, CTRL_MEAS_X16_NORMAL)?;
        self.write_reg(REG_CONFIG, CONFIG_FILTER_OFF)?;

        self.calib = Some(calib);
        info!("bme280: ready at 0x{:02X}", self.address);
        Ok(())
    }

    pub fn is_initialised(&self) -> bool {
        self.calib.is_some()
    }

    /// Burst-read and compensate all three channels.
    pub fn measure(&mut self) -> Result<Measurement, SensorError> {
        let calib = self.calib.ok_or(SensorError::NotInitialised)?;
        let mut raw = [0u8; 8];
        self.read_regs(REG_DATA, &mut raw)?;

        let adc_p = (i32::from(raw[0]) << 12) | (i32::from(raw[1]) << 4) | (i32::from(raw[2]) >> 4);
        let adc_t = (i32::from(raw[3]) << 12) | (i32::from(raw[4]) << 4) | (i32::from(raw[5]) >> 4);
        let adc_h = (i32::from(raw[6]) << 8) | i32::from(raw[7]);
        if adc_t == SKIPPED_20 || adc_p == SKIPPED_20 || adc_h == SKIPPED_16 {
            return Err(SensorError::NoData);
        }

        let t_fine = calib.t_fine(adc_t);
        Ok(Measurement {
            temperature_c: calib.temperature(t_fine) as f32,
            humidity_pct: calib.humidity(t_fine, adc_h) as f32,
            pressure_hpa: (calib.pressure(t_fine, adc_p) / 100.0) as f32,
        })
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), SensorError> {
        self.i2c
            .write_read(self.address, &[reg], buf)
            .map_err(|_| SensorError::Bus)
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(|_| SensorError::Bus)
    }
}
