/*
 * This file is part of smcfan.
 *
 * Copyright (C) 2025 smcfan contributors
 *
 * smcfan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * smcfan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with smcfan. If not, see <https://www.gnu.org/licenses/>.
 */

//! Sensor key table and bulk snapshot
//!
//! Which controller key belongs to which physical sensor is configuration, not
//! protocol. [`SensorKeys`] carries that mapping (with defaults for a
//! dual-CPU tower) and [`Smc::snapshot`] reads every entry in one pass.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::channel::Channel;
use crate::constants::temperature::celsius_to_fahrenheit;
use crate::protocol::Smc;
use crate::types::Key;

const fn default_key(name: &[u8; 4]) -> Key {
    Key::from_u32(u32::from_be_bytes(*name))
}

/// Controller keys for every sensor in a [`Snapshot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorKeys {
    pub cpu_a_temp: Key,
    pub cpu_a_heatsink_temp: Key,
    pub cpu_b_temp: Key,
    pub cpu_b_heatsink_temp: Key,
    pub northbridge_temp: Key,
    pub northbridge_heatsink_temp: Key,
    pub ambient_temp: Key,
    pub intake_fan: Key,
    pub cpu_a_fan: Key,
    pub cpu_b_fan: Key,
    pub exhaust_fan: Key,
    pub intake_min_speed: Key,
    pub cpu_a_min_speed: Key,
    pub cpu_b_min_speed: Key,
}

impl Default for SensorKeys {
    fn default() -> Self {
        Self {
            cpu_a_temp: default_key(b"TCAD"),
            cpu_a_heatsink_temp: default_key(b"TCAH"),
            cpu_b_temp: default_key(b"TCBD"),
            cpu_b_heatsink_temp: default_key(b"TCBH"),
            northbridge_temp: default_key(b"TN0D"),
            northbridge_heatsink_temp: default_key(b"TN0H"),
            ambient_temp: default_key(b"TA0P"),
            intake_fan: default_key(b"F1Ac"),
            cpu_a_fan: default_key(b"F2Ac"),
            cpu_b_fan: default_key(b"F3Ac"),
            exhaust_fan: default_key(b"F4Ac"),
            intake_min_speed: default_key(b"F1Mn"),
            cpu_a_min_speed: default_key(b"F2Mn"),
            cpu_b_min_speed: default_key(b"F3Mn"),
        }
    }
}

impl SensorKeys {
    /// Temperature keys with their labels
    pub fn temperatures(&self) -> [(&'static str, Key); 7] {
        [
            ("cpu_a", self.cpu_a_temp),
            ("cpu_a_heatsink", self.cpu_a_heatsink_temp),
            ("cpu_b", self.cpu_b_temp),
            ("cpu_b_heatsink", self.cpu_b_heatsink_temp),
            ("northbridge", self.northbridge_temp),
            ("northbridge_heatsink", self.northbridge_heatsink_temp),
            ("ambient", self.ambient_temp),
        ]
    }

    /// Fan speed and minimum speed keys with their labels
    pub fn fans(&self) -> [(&'static str, Key); 7] {
        [
            ("intake", self.intake_fan),
            ("cpu_a", self.cpu_a_fan),
            ("cpu_b", self.cpu_b_fan),
            ("exhaust", self.exhaust_fan),
            ("intake_min", self.intake_min_speed),
            ("cpu_a_min", self.cpu_a_min_speed),
            ("cpu_b_min", self.cpu_b_min_speed),
        ]
    }
}

/// One reading of every configured sensor.
///
/// `None` means the sensor could not be read, which is distinct from a
/// reading of zero. Temperatures are in °C unless converted with
/// [`Snapshot::to_fahrenheit`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub cpu_a_temp: Option<f64>,
    pub cpu_a_heatsink_temp: Option<f64>,
    pub cpu_b_temp: Option<f64>,
    pub cpu_b_heatsink_temp: Option<f64>,
    pub northbridge_temp: Option<f64>,
    pub northbridge_heatsink_temp: Option<f64>,
    pub ambient_temp: Option<f64>,
    pub intake_fan_rpm: Option<u32>,
    pub cpu_a_fan_rpm: Option<u32>,
    pub cpu_b_fan_rpm: Option<u32>,
    pub exhaust_fan_rpm: Option<u32>,
    pub intake_min_speed: Option<u32>,
    pub cpu_a_min_speed: Option<u32>,
    pub cpu_b_min_speed: Option<u32>,
}

impl Snapshot {
    /// Copy with every temperature converted to °F
    pub fn to_fahrenheit(&self) -> Self {
        let f = |t: Option<f64>| t.map(celsius_to_fahrenheit);
        Self {
            cpu_a_temp: f(self.cpu_a_temp),
            cpu_a_heatsink_temp: f(self.cpu_a_heatsink_temp),
            cpu_b_temp: f(self.cpu_b_temp),
            cpu_b_heatsink_temp: f(self.cpu_b_heatsink_temp),
            northbridge_temp: f(self.northbridge_temp),
            northbridge_heatsink_temp: f(self.northbridge_heatsink_temp),
            ambient_temp: f(self.ambient_temp),
            ..self.clone()
        }
    }

    /// Number of sensors that produced a reading
    pub fn readings(&self) -> usize {
        let temps = [
            self.cpu_a_temp,
            self.cpu_a_heatsink_temp,
            self.cpu_b_temp,
            self.cpu_b_heatsink_temp,
            self.northbridge_temp,
            self.northbridge_heatsink_temp,
            self.ambient_temp,
        ];
        let fans = [
            self.intake_fan_rpm,
            self.cpu_a_fan_rpm,
            self.cpu_b_fan_rpm,
            self.exhaust_fan_rpm,
            self.intake_min_speed,
            self.cpu_a_min_speed,
            self.cpu_b_min_speed,
        ];
        temps.iter().filter(|t| t.is_some()).count() + fans.iter().filter(|r| r.is_some()).count()
    }
}

impl<C: Channel> Smc<C> {
    /// Read every sensor in `keys`.
    ///
    /// Each sensor is read independently; one failing key leaves its field
    /// `None` and does not stop the others.
    pub fn snapshot(&self, keys: &SensorKeys) -> Snapshot {
        let temp = |key: Key| self.read_temperature(key).ok();
        let rpm = |key: Key| self.read_fan_rpm(key).ok();

        let snapshot = Snapshot {
            cpu_a_temp: temp(keys.cpu_a_temp),
            cpu_a_heatsink_temp: temp(keys.cpu_a_heatsink_temp),
            cpu_b_temp: temp(keys.cpu_b_temp),
            cpu_b_heatsink_temp: temp(keys.cpu_b_heatsink_temp),
            northbridge_temp: temp(keys.northbridge_temp),
            northbridge_heatsink_temp: temp(keys.northbridge_heatsink_temp),
            ambient_temp: temp(keys.ambient_temp),
            intake_fan_rpm: rpm(keys.intake_fan),
            cpu_a_fan_rpm: rpm(keys.cpu_a_fan),
            cpu_b_fan_rpm: rpm(keys.cpu_b_fan),
            exhaust_fan_rpm: rpm(keys.exhaust_fan),
            intake_min_speed: rpm(keys.intake_min_speed),
            cpu_a_min_speed: rpm(keys.cpu_a_min_speed),
            cpu_b_min_speed: rpm(keys.cpu_b_min_speed),
        };
        debug!(readings = snapshot.readings(), "snapshot taken");
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::FakeController;
    use std::sync::Arc;

    fn full_controller() -> FakeController {
        FakeController::new()
            .with_sp78("TCAD", 48.0)
            .with_sp78("TCAH", 40.5)
            .with_sp78("TCBD", 50.25)
            .with_sp78("TCBH", 41.0)
            .with_sp78("TN0D", 60.0)
            .with_sp78("TN0H", 55.0)
            .with_sp78("TA0P", 22.0)
            .with_fpe2("F1Ac", 600)
            .with_fpe2("F2Ac", 800)
            .with_fpe2("F3Ac", 810)
            .with_fpe2("F4Ac", 650)
            .with_fpe2("F1Mn", 500)
            .with_fpe2("F2Mn", 700)
            .with_fpe2("F3Mn", 700)
    }

    #[test]
    fn test_default_keys() {
        let keys = SensorKeys::default();
        assert_eq!(keys.ambient_temp.to_string(), "TA0P");
        assert_eq!(keys.cpu_b_min_speed.to_string(), "F3Mn");
    }

    #[test]
    fn test_snapshot_reads_every_sensor() {
        let smc = Smc::new(full_controller());
        let snap = smc.snapshot(&SensorKeys::default());

        assert_eq!(snap.cpu_a_temp, Some(48.0));
        assert_eq!(snap.cpu_b_temp, Some(50.25));
        assert_eq!(snap.ambient_temp, Some(22.0));
        assert_eq!(snap.cpu_a_fan_rpm, Some(800));
        assert_eq!(snap.exhaust_fan_rpm, Some(650));
        assert_eq!(snap.intake_min_speed, Some(500));
        assert_eq!(snap.readings(), 14);
    }

    #[test]
    fn test_snapshot_missing_sensor_is_none() {
        let smc = Smc::new(FakeController::new().with_sp78("TA0P", 22.0).with_fpe2("F1Ac", 0));
        let snap = smc.snapshot(&SensorKeys::default());
        assert_eq!(snap.ambient_temp, Some(22.0));
        assert_eq!(snap.intake_fan_rpm, Some(0));
        assert_eq!(snap.cpu_a_temp, None);
        assert_eq!(snap.readings(), 2);
    }

    #[test]
    fn test_snapshot_warms_cache() {
        let fake = Arc::new(full_controller());
        let smc = Smc::new(Arc::clone(&fake));
        let keys = SensorKeys::default();
        smc.snapshot(&keys);
        smc.snapshot(&keys);
        assert_eq!(fake.key_info_calls(), 14);
        assert_eq!(fake.read_calls(), 28);
    }

    #[test]
    fn test_to_fahrenheit() {
        let snap = Snapshot {
            ambient_temp: Some(100.0),
            intake_fan_rpm: Some(600),
            ..Snapshot::default()
        };
        let f = snap.to_fahrenheit();
        assert_eq!(f.ambient_temp, Some(212.0));
        assert_eq!(f.cpu_a_temp, None);
        assert_eq!(f.intake_fan_rpm, Some(600));
    }

    #[test]
    fn test_sensor_keys_partial_json() {
        let keys: SensorKeys = serde_json::from_str(r#"{ "ambient_temp": "TA1P" }"#).unwrap();
        assert_eq!(keys.ambient_temp.to_string(), "TA1P");
        assert_eq!(keys.cpu_a_temp, SensorKeys::default().cpu_a_temp);
    }

    #[test]
    fn test_sensor_keys_reject_bad_json() {
        assert!(serde_json::from_str::<SensorKeys>(r#"{ "ambient_temp": "TA" }"#).is_err());
        assert!(serde_json::from_str::<SensorKeys>(r#"{ "gpu_temp": "TG0P" }"#).is_err());
    }

    #[test]
    fn test_snapshot_json_uses_null() {
        let json = serde_json::to_value(Snapshot::default()).unwrap();
        assert!(json["ambient_temp"].is_null());
    }
}
