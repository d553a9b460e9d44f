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

//! Core protocol types
//!
//! Keys and type tags are four ASCII characters on the wire, packed
//! big-endian into a `u32`. Both are kept in integer form and rendered back
//! to text only for display.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::{int_to_key, key_to_int};
use crate::constants::{buffer, data_type};
use crate::error::{Result, SmcError};

/// A controller key such as `TC0P` or `F0Ac`.
///
/// Keys compare by their integer form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(u32);

impl Key {
    /// Parse a key from its 4-character form
    pub fn new(key: &str) -> Result<Self> {
        key_to_int(key).map(Self)
    }

    /// Wrap an already packed key
    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    /// Packed big-endian form sent to the controller
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl FromStr for Key {
    type Err = SmcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&int_to_key(self.0))
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Key::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A four-character data type tag reported by the controller, e.g. `sp78`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DataType(u32);

impl DataType {
    pub const SP78: DataType = DataType::from_tag(data_type::SP78);
    pub const FPE2: DataType = DataType::from_tag(data_type::FPE2);
    pub const UI8: DataType = DataType::from_tag(data_type::UI8);
    pub const UI16: DataType = DataType::from_tag(data_type::UI16);
    pub const UI32: DataType = DataType::from_tag(data_type::UI32);
    pub const FLAG: DataType = DataType::from_tag(data_type::FLAG);

    const fn from_tag(tag: &str) -> Self {
        let b = tag.as_bytes();
        Self(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&int_to_key(self.0))
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Metadata the controller reports for a key.
///
/// Never changes for a given key while the process runs, which is what makes
/// caching it safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyInfo {
    pub data_size: u32,
    pub data_type: DataType,
    pub data_attributes: u8,
}

/// Raw contents of a key: the metadata plus a fixed payload buffer.
///
/// Only the first `data_size` bytes of `bytes` are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Value {
    pub key: Key,
    pub data_size: u32,
    pub data_type: DataType,
    pub bytes: [u8; buffer::BYTES_LEN],
}

impl Value {
    /// Build a value for writing; `data_size` is taken from the payload length
    pub fn new(key: Key, data_type: DataType, payload: &[u8]) -> Result<Self> {
        if payload.len() > buffer::BYTES_LEN {
            return Err(SmcError::ValueOutOfRange {
                what: format!("payload of key '{}'", key),
                value: payload.len() as u64,
                max: buffer::BYTES_LEN as u64,
            });
        }
        let mut bytes = [0u8; buffer::BYTES_LEN];
        bytes[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            key,
            data_size: payload.len() as u32,
            data_type,
            bytes,
        })
    }

    /// The meaningful leading bytes
    pub fn payload(&self) -> &[u8] {
        let len = (self.data_size as usize).min(buffer::BYTES_LEN);
        &self.bytes[..len]
    }
}
