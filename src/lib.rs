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

//! smcfan - client for the Apple System Management Controller
//!
//! This library talks the controller's key/value protocol: it opens the
//! kernel channel, reads and writes keys with their runtime-reported size and
//! type, caches key metadata, and offers temperature and fan speed accessors
//! on top.
//!
//! # Example
//!
//! ```no_run
//! use smcfan::{Key, Smc, SmcConnection};
//!
//! let smc = Smc::new(SmcConnection::open()?);
//! let cpu = smc.read_temperature(Key::new("TC0P")?)?;
//! println!("CPU proximity: {:.1} °C", cpu);
//! smc.set_fan_rpm(Key::new("F0Mn")?, 1200)?;
//! # Ok::<(), smcfan::SmcError>(())
//! ```

pub mod accessors;
pub mod cache;
pub mod channel;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod protocol;
pub mod sensors;
pub mod service;
pub mod types;

#[cfg(test)]
pub mod test_utils;

pub use cache::KeyInfoCache;
pub use channel::{Channel, KeyData, SmcConnection};
pub use codec::{
    decode_fixed_point, decode_fpe2, decode_sp78, encode_fpe2, int_to_key, key_to_int, SmcValue,
};
pub use config::{load_config, load_config_from, FanChannelSettings, FanSettings, Metric, SmcConfig};
pub use error::{Result, SmcError};
pub use protocol::Smc;
pub use sensors::{SensorKeys, Snapshot};
pub use service::{FanChannel, FanService, LocalFanService};
pub use types::{DataType, Key, KeyInfo, Value};
