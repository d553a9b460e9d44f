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

//! Typed accessors
//!
//! Temperature and fan speed helpers over [`Smc::read_key`] and
//! [`Smc::write_key`].
//!
//! Two families are provided. `read_*` return a `Result` and report a key of
//! the wrong type as [`SmcError::UnsupportedType`]. `get_*` keep the
//! sentinel convention of the fan daemons that consume this crate: `0.0` °C
//! and `-1` RPM mean "no reading", whether the key is missing, unreadable or
//! of another type.

use tracing::debug;

use crate::channel::Channel;
use crate::codec::{decode_fpe2, decode_sp78, encode_fpe2};
use crate::constants::{fan, temperature};
use crate::error::{Result, SmcError};
use crate::protocol::Smc;
use crate::types::{DataType, Key, Value};

fn unsupported(value: &Value) -> SmcError {
    SmcError::UnsupportedType {
        key: value.key.to_string(),
        data_type: value.data_type.to_string(),
        data_size: value.data_size,
    }
}

impl<C: Channel> Smc<C> {
    /// Temperature of an SP78 key in °C
    pub fn read_temperature(&self, key: Key) -> Result<f64> {
        let value = self.read_key(key)?;
        if value.data_type != DataType::SP78 || value.data_size <= 1 {
            return Err(unsupported(&value));
        }
        decode_sp78(value.payload()).ok_or_else(|| unsupported(&value))
    }

    /// Speed of an FPE2 fan key in RPM
    pub fn read_fan_rpm(&self, key: Key) -> Result<u32> {
        let value = self.read_key(key)?;
        if value.data_type != DataType::FPE2 || value.data_size <= 1 {
            return Err(unsupported(&value));
        }
        decode_fpe2(value.payload()).ok_or_else(|| unsupported(&value))
    }

    /// Temperature in °C, or `0.0` when there is no reading
    pub fn get_temperature(&self, key: Key) -> f64 {
        self.read_temperature(key).unwrap_or_else(|e| {
            debug!(%key, error = %e, "no temperature reading");
            temperature::NO_TEMPERATURE
        })
    }

    /// Fan speed in RPM, or `-1` when there is no reading
    pub fn get_fan_rpm(&self, key: Key) -> i32 {
        match self.read_fan_rpm(key) {
            Ok(rpm) => rpm as i32,
            Err(e) => {
                debug!(%key, error = %e, "no fan reading");
                fan::NO_RPM
            }
        }
    }

    /// Write a fan speed as a 2-byte FPE2 value
    pub fn set_fan_rpm(&self, key: Key, rpm: u32) -> Result<()> {
        let bytes = encode_fpe2(rpm)?;
        debug_assert_eq!(bytes.len() as u32, fan::RPM_DATA_SIZE);
        let value = Value::new(key, DataType::FPE2, &bytes)?;
        self.write_key(&value)
    }
}
