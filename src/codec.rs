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

//! Key and value encoding
//!
//! Pure conversions between the controller's wire representations and Rust
//! values. Everything is big-endian, most significant byte first.
//!
//! # Layouts
//!
//! - **SP78**: signed 16-bit temperature in °C. The low two bits are dropped
//!   and the remainder divided by 64.
//! - **FPE2**: unsigned fan speed with 2 fractional bits.

use std::fmt;

use serde::Serialize;

use crate::constants::{buffer, fan, temperature};
use crate::error::{Result, SmcError};
use crate::types::DataType;

/// Pack a 4-character key into its big-endian integer form
pub fn key_to_int(key: &str) -> Result<u32> {
    let bytes = key.as_bytes();
    if bytes.len() != buffer::KEY_LEN || !bytes.iter().all(|b| (0x20..=0x7e).contains(b)) {
        return Err(SmcError::InvalidKey(key.to_string()));
    }
    Ok(bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
}

/// Unpack an integer key back into 4 characters
pub fn int_to_key(value: u32) -> String {
    value.to_be_bytes().iter().map(|b| char::from(*b)).collect()
}

/// Interpret the first `size` bytes as a signed two's complement fixed-point
/// number with `fractional_bits` bits of fraction.
///
/// `size` must be 1 to 8 and no longer than `bytes`, and `fractional_bits`
/// cannot exceed the `size * 8` bits available.
pub fn decode_fixed_point(bytes: &[u8], size: usize, fractional_bits: u32) -> Result<f64> {
    if size == 0 || size > buffer::FIXED_POINT_MAX_LEN || size > bytes.len() {
        return Err(SmcError::ValueOutOfRange {
            what: "fixed-point size".to_string(),
            value: size as u64,
            max: bytes.len().min(buffer::FIXED_POINT_MAX_LEN) as u64,
        });
    }
    let bits = (size * 8) as u32;
    if fractional_bits > bits {
        return Err(SmcError::ValueOutOfRange {
            what: "fixed-point fractional bits".to_string(),
            value: u64::from(fractional_bits),
            max: u64::from(bits),
        });
    }
    let raw = bytes[..size].iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    // sign-extend from the top bit of the `size`-byte field
    let unused = 64 - bits;
    let signed = ((raw << unused) as i64) >> unused;
    Ok(signed as f64 / 2f64.powi(fractional_bits as i32))
}

/// Decode an SP78 temperature in °C. Needs at least 2 bytes.
pub fn decode_sp78(bytes: &[u8]) -> Option<f64> {
    if bytes.len() < 2 {
        return None;
    }
    let raw = i16::from_be_bytes([bytes[0], bytes[1]]);
    Some(f64::from(raw >> temperature::SP78_SHIFT) / temperature::SP78_DIVISOR)
}

/// Decode an FPE2 fan speed in RPM. Needs at least 2 bytes.
pub fn decode_fpe2(bytes: &[u8]) -> Option<u32> {
    if bytes.len() < 2 {
        return None;
    }
    let raw = u16::from_be_bytes([bytes[0], bytes[1]]);
    Some(u32::from(raw >> fan::FPE2_FRACTION_BITS))
}

/// Encode an RPM value as 2-byte FPE2, high byte first
pub fn encode_fpe2(rpm: u32) -> Result<[u8; 2]> {
    if rpm > fan::FPE2_MAX_RPM {
        return Err(SmcError::ValueOutOfRange {
            what: "fan rpm".to_string(),
            value: u64::from(rpm),
            max: u64::from(fan::FPE2_MAX_RPM),
        });
    }
    let scaled = (rpm << fan::FPE2_FRACTION_BITS) as u16;
    Ok(scaled.to_be_bytes())
}

/// A key payload interpreted according to its type tag.
///
/// `Unknown` carries the raw bytes of any tag without a decoder, and also of
/// known tags whose payload is too short to decode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SmcValue {
    Sp78(f64),
    Fpe2(u32),
    Ui8(u8),
    Ui16(u16),
    Ui32(u32),
    Flag(bool),
    Unknown { data_type: DataType, bytes: Vec<u8> },
}

impl SmcValue {
    /// Decode a payload by its type tag
    pub fn decode(data_type: DataType, payload: &[u8]) -> Self {
        let decoded = match data_type {
            DataType::SP78 => decode_sp78(payload).map(SmcValue::Sp78),
            DataType::FPE2 => decode_fpe2(payload).map(SmcValue::Fpe2),
            DataType::UI8 if !payload.is_empty() => Some(SmcValue::Ui8(payload[0])),
            DataType::UI16 if payload.len() >= 2 => {
                Some(SmcValue::Ui16(u16::from_be_bytes([payload[0], payload[1]])))
            }
            DataType::UI32 if payload.len() >= 4 => Some(SmcValue::Ui32(u32::from_be_bytes([
                payload[0], payload[1], payload[2], payload[3],
            ]))),
            DataType::FLAG if !payload.is_empty() => Some(SmcValue::Flag(payload[0] != 0)),
            _ => None,
        };
        decoded.unwrap_or_else(|| SmcValue::Unknown {
            data_type,
            bytes: payload.to_vec(),
        })
    }
}

impl fmt::Display for SmcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmcValue::Sp78(c) => write!(f, "{:.2} °C", c),
            SmcValue::Fpe2(rpm) => write!(f, "{} rpm", rpm),
            SmcValue::Ui8(v) => write!(f, "{}", v),
            SmcValue::Ui16(v) => write!(f, "{}", v),
            SmcValue::Ui32(v) => write!(f, "{}", v),
            SmcValue::Flag(v) => write!(f, "{}", v),
            SmcValue::Unknown { data_type, bytes } => {
                write!(f, "[{}]", data_type)?;
                for b in bytes {
                    write!(f, " {:02x}", b)?;
                }
                Ok(())
            }
        }
    }
}
