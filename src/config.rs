//! Beacon configuration loader (strict parsing)
//!
//! The bundle is read once at startup and never mutated. Keys and identity
//! are provisioned out of band; nothing here is negotiated on the wire.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use uuid::Uuid;

use crate::aead::Key256;
use crate::device::{DeviceIdentity, DEFAULT_ALIVE_TIMEOUT_SECS};
use crate::errors::{Result, XaalError};
use crate::scheduler::{Intervals, DEFAULT_PRESENCE_INTERVAL_SECS, DEFAULT_STATUS_INTERVAL_SECS};
use crate::sensor::DEFAULT_CALIBRATION_FACTOR;

pub fn load_from_file(path: impl AsRef<Path>) -> Result<BeaconConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| XaalError::Config(format!("read {} failed: {}", path.display(), e)))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<BeaconConfig> {
    let cfg: BeaconConfig =
        toml::from_str(s).map_err(|e| XaalError::Config(format!("invalid toml: {}", e)))?;
    cfg.validate()?;
    Ok(cfg)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconConfig {
    pub device_uuid: Uuid,

    /// 64 hex characters
    pub key: Key256,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_device_type")]
    pub device_type: String,

    #[serde(default = "default_vendor_id")]
    pub vendor_id: String,

    #[serde(default = "default_product_id")]
    pub product_id: String,

    #[serde(default = "default_multicast_ttl")]
    pub multicast_ttl: u32,

    #[serde(default)]
    pub schedule: ScheduleSection,

    #[serde(default)]
    pub sensor: SensorSection,
}

impl BeaconConfig {
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(XaalError::Config("port must not be 0".into()));
        }
        match self.device_type.split_once('.') {
            Some((class, subclass)) if !class.is_empty() && !subclass.is_empty() => {}
            _ => {
                return Err(XaalError::Config(format!(
                    "device_type must be class.subclass, got {:?}",
                    self.device_type
                )))
            }
        }
        if !(1..=255).contains(&self.multicast_ttl) {
            return Err(XaalError::Config("multicast_ttl must be between 1 and 255".into()));
        }

        self.schedule.validate()?;
        self.sensor.validate()?;

        Ok(())
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            address: self.device_uuid,
            device_type: self.device_type.clone(),
            vendor_id: self.vendor_id.clone(),
            product_id: self.product_id.clone(),
            alive_timeout_secs: self.schedule.alive_timeout_secs,
        }
    }

    pub fn intervals(&self) -> Intervals {
        Intervals {
            presence_secs: self.schedule.presence_interval_secs,
            status_secs: self.schedule.status_interval_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleSection {
    #[serde(default = "default_presence_interval_secs")]
    pub presence_interval_secs: u64,

    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,

    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,

    #[serde(default = "default_alive_timeout_secs")]
    pub alive_timeout_secs: u32,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            presence_interval_secs: default_presence_interval_secs(),
            status_interval_secs: default_status_interval_secs(),
            tick_millis: default_tick_millis(),
            alive_timeout_secs: default_alive_timeout_secs(),
        }
    }
}

impl ScheduleSection {
    pub fn validate(&self) -> Result<()> {
        if self.presence_interval_secs == 0 || self.status_interval_secs == 0 {
            return Err(XaalError::Config("schedule intervals must be non-zero".into()));
        }
        if self.tick_millis == 0 {
            return Err(XaalError::Config("schedule.tick_millis must be non-zero".into()));
        }
        // receivers would expire us between two alive messages
        if u64::from(self.alive_timeout_secs) <= self.presence_interval_secs {
            return Err(XaalError::Config(
                "schedule.alive_timeout_secs must be greater than presence_interval_secs".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorSection {
    #[serde(default = "default_calibration_factor")]
    pub calibration_factor: f64,

    /// Simulated load, in calibrated units
    #[serde(default)]
    pub load: f64,

    /// Simulated uniform noise amplitude, in calibrated units
    #[serde(default)]
    pub noise: f64,
}

impl Default for SensorSection {
    fn default() -> Self {
        Self {
            calibration_factor: default_calibration_factor(),
            load: 0.0,
            noise: 0.0,
        }
    }
}

impl SensorSection {
    pub fn validate(&self) -> Result<()> {
        if !self.calibration_factor.is_finite() || self.calibration_factor == 0.0 {
            return Err(XaalError::Config(
                "sensor.calibration_factor must be finite and non-zero".into(),
            ));
        }
        if !self.load.is_finite() {
            return Err(XaalError::Config("sensor.load must be finite".into()));
        }
        if !self.noise.is_finite() || self.noise < 0.0 {
            return Err(XaalError::Config("sensor.noise must be >= 0".into()));
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    crate::DEFAULT_PORT
}
fn default_device_type() -> String {
    "Balance.basic".into()
}
fn default_vendor_id() -> String {
    "Rust".into()
}
fn default_product_id() -> String {
    "xaal-beacon".into()
}
fn default_multicast_ttl() -> u32 {
    10
}
fn default_presence_interval_secs() -> u64 {
    DEFAULT_PRESENCE_INTERVAL_SECS
}
fn default_status_interval_secs() -> u64 {
    DEFAULT_STATUS_INTERVAL_SECS
}
fn default_tick_millis() -> u64 {
    1000
}
fn default_alive_timeout_secs() -> u32 {
    DEFAULT_ALIVE_TIMEOUT_SECS
}
fn default_calibration_factor() -> f64 {
    DEFAULT_CALIBRATION_FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
device_uuid = "00112233-4455-6677-8899-aabbccddeeff"
key = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let cfg = load_from_str(MINIMAL).unwrap();

        assert_eq!(cfg.port, 1236);
        assert_eq!(cfg.device_type, "Balance.basic");
        assert_eq!(cfg.intervals(), Intervals::default());
        assert_eq!(cfg.schedule.alive_timeout_secs, 600);
        assert_eq!(cfg.sensor.calibration_factor, 2450.0);
        assert_eq!(cfg.identity().address.as_bytes()[15], 0xff);
    }

    #[test]
    fn test_full_config() {
        let s = format!(
            "{}port = 1300\ndevice_type = \"scale.kitchen\"\n[schedule]\npresence_interval_secs = 60\nalive_timeout_secs = 120\n[sensor]\ncalibration_factor = 100.0\nload = 2.5\nnoise = 0.01\n",
            MINIMAL
        );
        let cfg = load_from_str(&s).unwrap();

        assert_eq!(cfg.port, 1300);
        assert_eq!(cfg.identity().device_type, "scale.kitchen");
        assert_eq!(cfg.intervals().presence_secs, 60);
        assert_eq!(cfg.sensor.load, 2.5);
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let s = format!("{}ssid = \"home\"\n", MINIMAL);
        assert!(matches!(load_from_str(&s), Err(XaalError::Config(_))));
    }

    #[test]
    fn test_rejects_short_key() {
        let s = "device_uuid = \"00112233-4455-6677-8899-aabbccddeeff\"\nkey = \"0011\"\n";
        assert!(load_from_str(s).is_err());
    }

    #[test]
    fn test_rejects_bad_device_type() {
        let s = format!("{}device_type = \"balance\"\n", MINIMAL);
        assert!(load_from_str(&s).is_err());
    }

    #[test]
    fn test_rejects_alive_timeout_below_presence_interval() {
        let s = format!("{}[schedule]\nalive_timeout_secs = 300\n", MINIMAL);
        assert!(load_from_str(&s).is_err());
    }
}
