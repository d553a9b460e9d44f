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

//! Key read/write protocol
//!
//! [`Smc`] ties a [`Channel`] to its [`KeyInfoCache`] and implements the two
//! generic operations every typed accessor is built on: read a key and write a
//! key. Neither knows what a key means.

use tracing::warn;

use crate::cache::KeyInfoCache;
use crate::channel::{smc_call, Channel, KeyData};
use crate::codec::SmcValue;
use crate::constants::command;
use crate::error::{Result, SmcError};
use crate::types::{Key, KeyInfo, Value};

/// Controller client over a channel `C`.
///
/// Owns the metadata cache for its channel. All methods block the calling
/// thread for the duration of the controller round trips; none retry.
#[derive(Debug)]
pub struct Smc<C: Channel> {
    channel: C,
    cache: KeyInfoCache,
}

impl<C: Channel> Smc<C> {
    /// Client with a default-sized cache
    pub fn new(channel: C) -> Self {
        Self::with_cache(channel, KeyInfoCache::new())
    }

    /// Client using an explicitly constructed cache
    pub fn with_cache(channel: C, cache: KeyInfoCache) -> Self {
        Self { channel, cache }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn cache(&self) -> &KeyInfoCache {
        &self.cache
    }

    /// Give back the channel, e.g. to close a connection explicitly
    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Size and type of `key`, from the cache when possible
    pub fn key_info(&self, key: Key) -> Result<KeyInfo> {
        self.cache.get_key_info(key, &self.channel)
    }

    /// Read the current contents of `key`.
    ///
    /// The returned size and type are exactly what the cache reports for the
    /// key, and the first `data_size` bytes are the controller's payload.
    pub fn read_key(&self, key: Key) -> Result<Value> {
        let info = self.key_info(key).map_err(|e| {
            warn!(%key, error = %e, "key info lookup failed");
            e
        })?;

        let mut input = KeyData::request(key, command::READ_BYTES);
        input.key_info.data_size = info.data_size;

        let output = smc_call(&self.channel, &input).map_err(|e| {
            warn!(%key, error = %e, "key read failed");
            e
        })?;

        Ok(Value {
            key,
            data_size: info.data_size,
            data_type: info.data_type,
            bytes: output.bytes,
        })
    }

    /// Read `key` and decode it by its reported type
    pub fn read_value(&self, key: Key) -> Result<SmcValue> {
        self.read_decoded(key).map(|(_, decoded)| decoded)
    }

    /// Read `key` once and return the raw value with its decoding
    pub fn read_decoded(&self, key: Key) -> Result<(Value, SmcValue)> {
        let value = self.read_key(key)?;
        let decoded = SmcValue::decode(value.data_type, value.payload());
        Ok((value, decoded))
    }

    /// Write `value` to its key.
    ///
    /// The key is read first and the write is refused with
    /// [`SmcError::SizeMismatch`] unless the value's size equals the size the
    /// controller reports. A mismatched write is never sent.
    pub fn write_key(&self, value: &Value) -> Result<()> {
        let current = self.read_key(value.key)?;
        if current.data_size != value.data_size {
            warn!(
                key = %value.key,
                expected = current.data_size,
                actual = value.data_size,
                "refusing write with mismatched size"
            );
            return Err(SmcError::SizeMismatch {
                key: value.key.to_string(),
                expected: current.data_size,
                actual: value.data_size,
            });
        }

        let mut input = KeyData::request(value.key, command::WRITE_BYTES);
        input.key_info.data_size = value.data_size;
        input.bytes = value.bytes;

        smc_call(&self.channel, &input).map_err(|e| {
            warn!(key = %value.key, error = %e, "key write failed");
            e
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockChannel;
    use crate::test_utils::test_utils::FakeController;
    use crate::types::DataType;
    use std::sync::Arc;

    fn key(s: &str) -> Key {
        Key::new(s).unwrap()
    }

    #[test]
    fn test_read_key_matches_cached_info() {
        let fake = FakeController::new().with_sp78("TC0P", 25.0);
        let smc = Smc::new(fake);

        let value = smc.read_key(key("TC0P")).unwrap();
        let info = smc.cache().peek(key("TC0P")).unwrap();

        assert_eq!(value.key, key("TC0P"));
        assert_eq!(value.data_size, info.data_size);
        assert_eq!(value.data_type, info.data_type);
        assert_eq!(value.payload(), &[0x19, 0x00]);
    }

    #[test]
    fn test_read_key_sends_size_and_command() {
        let mut mock = MockChannel::new();
        mock.expect_call().returning(|_, input| {
            let mut out = KeyData::default();
            match input.data8 {
                command::READ_KEYINFO => {
                    out.key_info.data_size = 1;
                    out.key_info.data_type = DataType::UI8.as_u32();
                }
                command::READ_BYTES => {
                    assert_eq!(input.key_info.data_size, 1);
                    out.bytes[0] = 7;
                }
                other => panic!("unexpected command {}", other),
            }
            Ok(out)
        });
        let smc = Smc::new(mock);
        assert_eq!(smc.read_value(key("FNum")).unwrap(), SmcValue::Ui8(7));
    }

    #[test]
    fn test_read_decoded_is_one_round_trip() {
        let fake = Arc::new(FakeController::new().with_sp78("TC0P", 25.0));
        let smc = Smc::new(Arc::clone(&fake));
        let (raw, decoded) = smc.read_decoded(key("TC0P")).unwrap();
        assert_eq!(raw.data_type, DataType::SP78);
        assert_eq!(raw.data_size, 2);
        assert_eq!(decoded, SmcValue::Sp78(25.0));
        assert_eq!(fake.read_calls(), 1);
    }

    #[test]
    fn test_read_unknown_key_fails() {
        let smc = Smc::new(FakeController::new());
        let err = smc.read_key(key("NOPE")).unwrap_err();
        assert!(matches!(err, SmcError::ControllerStatus { status: 0x84, .. }));
    }

    #[test]
    fn test_read_uses_cache_after_first_call() {
        let fake = Arc::new(FakeController::new().with_fpe2("F0Ac", 1800));
        let smc = Smc::new(Arc::clone(&fake));
        for _ in 0..3 {
            smc.read_key(key("F0Ac")).unwrap();
        }
        assert_eq!(fake.key_info_calls(), 1);
        assert_eq!(fake.read_calls(), 3);
    }

    #[test]
    fn test_write_key_updates_controller() {
        let fake = Arc::new(FakeController::new().with_fpe2("F0Mn", 600));
        let smc = Smc::new(Arc::clone(&fake));

        let value = Value::new(key("F0Mn"), DataType::FPE2, &[0x12, 0xc0]).unwrap();
        smc.write_key(&value).unwrap();

        assert_eq!(fake.bytes_of("F0Mn").unwrap(), vec![0x12, 0xc0]);
        assert_eq!(fake.write_calls(), 1);
        // verifying read happens before the write
        assert_eq!(fake.read_calls(), 1);
    }

    #[test]
    fn test_write_size_mismatch_never_writes() {
        let fake = Arc::new(FakeController::new().with_fpe2("F0Mn", 600));
        let smc = Smc::new(Arc::clone(&fake));

        let value = Value::new(key("F0Mn"), DataType::FPE2, &[0x00, 0x12, 0xc0, 0x00]).unwrap();
        let err = smc.write_key(&value).unwrap_err();

        assert!(matches!(
            err,
            SmcError::SizeMismatch { expected: 2, actual: 4, .. }
        ));
        assert_eq!(fake.write_calls(), 0);
        assert_eq!(fake.bytes_of("F0Mn").unwrap(), vec![0x09, 0x60]);
    }

    #[test]
    fn test_write_mismatch_with_mock_never_sends_write() {
        let mut mock = MockChannel::new();
        mock.expect_call().returning(|_, input| {
            assert_ne!(input.data8, command::WRITE_BYTES, "write must not be sent");
            let mut out = KeyData::default();
            out.key_info.data_size = 4;
            out.key_info.data_type = DataType::UI32.as_u32();
            Ok(out)
        });
        let smc = Smc::new(mock);
        let value = Value::new(key("TEST"), DataType::UI16, &[0x00, 0x01]).unwrap();
        assert!(matches!(smc.write_key(&value), Err(SmcError::SizeMismatch { .. })));
    }

    #[test]
    fn test_write_unknown_key_fails_before_write() {
        let fake = Arc::new(FakeController::new());
        let smc = Smc::new(Arc::clone(&fake));
        let value = Value::new(key("NOPE"), DataType::FPE2, &[0, 0]).unwrap();
        assert!(smc.write_key(&value).unwrap_err().is_call_error());
        assert_eq!(fake.write_calls(), 0);
    }

    #[test]
    fn test_with_cache_injection() {
        let cache = KeyInfoCache::with_capacity(1);
        let fake = FakeController::new()
            .with_sp78("TC0P", 30.0)
            .with_sp78("TC1P", 31.0);
        let smc = Smc::with_cache(fake, cache);
        smc.read_key(key("TC0P")).unwrap();
        smc.read_key(key("TC1P")).unwrap();
        assert_eq!(smc.cache().len(), 1);
        assert_eq!(smc.cache().capacity(), 1);
    }
}
