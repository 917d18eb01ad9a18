//! Load-cell collaborator
//!
//! The driver exposes a raw reading and a calibration factor; the published
//! weight is `raw / calibration_factor`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::{Result, XaalError};

/// Default factor for the reference HX711 balance
pub const DEFAULT_CALIBRATION_FACTOR: f64 = 2450.0;

pub trait LoadCell {
    /// Raw tared count from the ADC
    fn read_raw(&mut self) -> f64;

    fn calibration_factor(&self) -> f64;

    /// Reading in calibrated units
    fn read_units(&mut self) -> f64 {
        self.read_raw() / self.calibration_factor()
    }
}

/// Software stand-in for a load cell: a fixed load plus uniform noise
#[derive(Debug, Clone)]
pub struct SimulatedLoadCell {
    load_units: f64,
    calibration_factor: f64,
    noise: f64,
    rng: StdRng,
}

impl SimulatedLoadCell {
    /// # Errors
    /// `Config` if the factor is zero or not finite, or `noise` is negative
    pub fn new(calibration_factor: f64, load_units: f64, noise: f64) -> Result<Self> {
        Self::with_rng(calibration_factor, load_units, noise, StdRng::from_entropy())
    }

    /// Deterministic noise for reproducible runs
    pub fn seeded(calibration_factor: f64, load_units: f64, noise: f64, seed: u64) -> Result<Self> {
        Self::with_rng(calibration_factor, load_units, noise, StdRng::seed_from_u64(seed))
    }

    fn with_rng(calibration_factor: f64, load_units: f64, noise: f64, rng: StdRng) -> Result<Self> {
        if !calibration_factor.is_finite() || calibration_factor == 0.0 {
            return Err(XaalError::Config(format!(
                "calibration factor must be finite and non-zero, got {}",
                calibration_factor
            )));
        }
        if !noise.is_finite() || noise < 0.0 {
            return Err(XaalError::Config(format!("noise must be >= 0, got {}", noise)));
        }
        Ok(Self {
            load_units,
            calibration_factor,
            noise,
            rng,
        })
    }

    pub fn set_load(&mut self, load_units: f64) {
        self.load_units = load_units;
    }
}

impl LoadCell for SimulatedLoadCell {
    fn read_raw(&mut self) -> f64 {
        let jitter = if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0.0
        };
        (self.load_units + jitter) * self.calibration_factor
    }

    fn calibration_factor(&self) -> f64 {
        self.calibration_factor
    }
}
