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

//! Key metadata cache
//!
//! Every read needs the key's size and type first. Asking the controller for
//! them on each read doubles the number of round trips, so the answers are
//! kept here for the life of the owning [`crate::Smc`].

use parking_lot::Mutex;
use tracing::debug;

use crate::channel::{smc_call, Channel, KeyData};
use crate::constants::{cache, command};
use crate::error::Result;
use crate::types::{DataType, Key, KeyInfo};

/// Bounded table of key metadata.
///
/// Entries are appended in first-seen order until `capacity` is reached.
/// After that, unseen keys are looked up on every call and never stored.
/// Nothing is evicted or updated.
///
/// # Locking
///
/// One mutex covers the whole lookup-or-insert sequence, including the
/// blocking controller call on a miss. Concurrent lookups are serialized and
/// the controller is asked about a given key at most once while it fits.
#[derive(Debug)]
pub struct KeyInfoCache {
    entries: Mutex<Vec<(Key, KeyInfo)>>,
    capacity: usize,
}

impl KeyInfoCache {
    pub fn new() -> Self {
        Self::with_capacity(cache::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Metadata for `key`, asking the controller on a miss.
    ///
    /// Failures are returned as is and nothing is cached for them.
    pub fn get_key_info<C: Channel + ?Sized>(&self, key: Key, channel: &C) -> Result<KeyInfo> {
        let mut entries = self.entries.lock();

        if let Some((_, info)) = entries.iter().find(|(k, _)| *k == key) {
            return Ok(*info);
        }

        let output = smc_call(channel, &KeyData::request(key, command::READ_KEYINFO))?;
        let info = KeyInfo {
            data_size: output.key_info.data_size,
            data_type: DataType::from_u32(output.key_info.data_type),
            data_attributes: output.key_info.data_attributes,
        };

        if entries.len() < self.capacity {
            entries.push((key, info));
            debug!(%key, data_type = %info.data_type, size = info.data_size, "cached key info");
        } else {
            debug!(%key, capacity = self.capacity, "key info cache full, not caching");
        }
        Ok(info)
    }

    /// Cached metadata for `key` without touching the controller
    pub fn peek(&self, key: Key) -> Option<KeyInfo> {
        self.entries
            .lock()
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, info)| *info)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for KeyInfoCache {
    fn default() -> Self {
        Self::new()
    }
}
