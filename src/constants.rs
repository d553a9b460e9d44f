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

//! Constants for the controller protocol
//!
//! Centralizes the kernel ABI numbers, type tags, and limits used by the
//! protocol client. Add new magic numbers here rather than inline.

/// Kernel service and user-client selectors
pub mod kernel {
    /// IOKit service class name of the controller
    pub const SERVICE_NAME: &str = "AppleSMC";

    /// Struct-method selector of the controller user client
    pub const INDEX_SMC: u32 = 2;

    /// `kIOReturnSuccess`
    pub const RETURN_SUCCESS: i32 = 0;
}

/// Sub-commands carried in the `data8` field of a request
pub mod command {
    pub const READ_BYTES: u8 = 5;
    pub const WRITE_BYTES: u8 = 6;
    pub const READ_INDEX: u8 = 8;
    pub const READ_KEYINFO: u8 = 9;
    pub const READ_PLIMIT: u8 = 11;
    pub const READ_VERS: u8 = 12;
}

/// Controller result codes reported in the `result` byte of a response
pub mod status {
    pub const SUCCESS: u8 = 0x00;
    pub const ERROR: u8 = 0x01;
    pub const KEY_NOT_FOUND: u8 = 0x84;
}

/// Four-character data type tags
pub mod data_type {
    pub const SP78: &str = "sp78";
    pub const FPE2: &str = "fpe2";
    pub const UI8: &str = "ui8 ";
    pub const UI16: &str = "ui16";
    pub const UI32: &str = "ui32";
    pub const FLAG: &str = "flag";
}

/// Payload buffer limits
pub mod buffer {
    /// Size of the fixed payload buffer in every request and response
    pub const BYTES_LEN: usize = 32;

    /// Length of a key or type tag in characters
    pub const KEY_LEN: usize = 4;

    /// Widest field a fixed-point decode accepts
    pub const FIXED_POINT_MAX_LEN: usize = 8;
}

/// Key metadata cache defaults
pub mod cache {
    /// Default number of keys kept before new keys stop being cached
    pub const DEFAULT_CAPACITY: usize = 100;

    /// Upper bound accepted from configuration
    pub const MAX_CAPACITY: usize = 4096;
}

/// Fan speed encoding and limits
pub mod fan {
    /// Fractional bits of the FPE2 layout
    pub const FPE2_FRACTION_BITS: u32 = 2;

    /// Largest RPM representable in a 2-byte FPE2 value
    pub const FPE2_MAX_RPM: u32 = (u16::MAX as u32) >> FPE2_FRACTION_BITS;

    /// Byte width used when writing fan speeds
    pub const RPM_DATA_SIZE: u32 = 2;

    /// Value returned by the sentinel fan accessor when no reading is available
    pub const NO_RPM: i32 = -1;

    /// Default base RPM applied to each fan channel
    pub const DEFAULT_BASE_RPM: u32 = 600;
}

/// Temperature encoding and limits
pub mod temperature {
    /// Bits discarded from a raw SP78 value before scaling
    pub const SP78_SHIFT: u32 = 2;

    /// Divisor applied to the shifted SP78 value
    pub const SP78_DIVISOR: f64 = 64.0;

    /// Value returned by the sentinel temperature accessor when no reading is available
    pub const NO_TEMPERATURE: f64 = 0.0;

    /// Default lower threshold in °C where fans leave base speed
    pub const DEFAULT_LOWER_THRESHOLD: f32 = 50.0;

    /// Default upper threshold in °C where fans reach full speed
    pub const DEFAULT_UPPER_THRESHOLD: f32 = 75.0;

    /// Sane range for configured thresholds in °C
    pub const MIN_THRESHOLD: f32 = 0.0;
    pub const MAX_THRESHOLD: f32 = 120.0;

    /// Convert Celsius to Fahrenheit
    #[inline]
    pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
        celsius * 9.0 / 5.0 + 32.0
    }
}

/// Configuration file locations
pub mod paths {
    /// Environment variable overriding the configuration path
    pub const CONFIG_ENV: &str = "SMCFAN_CONFIG";

    /// Directory name under the user configuration directory
    pub const CONFIG_DIR_NAME: &str = "smcfan";

    /// Configuration file name
    pub const CONFIG_FILE: &str = "config.json";

    /// System-wide configuration file
    pub const SYSTEM_CONFIG: &str = "/etc/smcfan/config.json";

    /// Largest configuration file accepted
    pub const MAX_CONFIG_SIZE: u64 = 64 * 1024;
}
