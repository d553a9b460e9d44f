/*
 * Test utilities and fakes for smcfan
 *
 * This module provides an in-memory controller that speaks the key/value
 * protocol, plus helpers shared by the unit tests of different modules.
 */

#[cfg(test)]
pub mod test_utils {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use crate::channel::{Channel, KeyData};
    use crate::codec::{encode_fpe2, int_to_key};
    use crate::constants::{buffer, command, status};
    use crate::error::{Result, SmcError};
    use crate::types::{DataType, Key};

    #[derive(Debug, Clone)]
    struct FakeKey {
        data_type: DataType,
        data_size: u32,
        bytes: [u8; buffer::BYTES_LEN],
    }

    /// In-memory controller implementing [`Channel`].
    ///
    /// Unknown keys answer with the controller's "key not found" status, keys
    /// registered with [`FakeController::with_kernel_error`] fail at the
    /// kernel level. Every sub-command is counted.
    #[derive(Debug, Default)]
    pub struct FakeController {
        keys: Mutex<HashMap<u32, FakeKey>>,
        kernel_errors: HashMap<u32, i32>,
        key_info_calls: AtomicUsize,
        read_calls: AtomicUsize,
        write_calls: AtomicUsize,
    }

    impl FakeController {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_raw(self, key: &str, data_type: DataType, payload: &[u8]) -> Self {
            let mut bytes = [0u8; buffer::BYTES_LEN];
            bytes[..payload.len()].copy_from_slice(payload);
            self.keys.lock().insert(
                Key::new(key).unwrap().as_u32(),
                FakeKey { data_type, data_size: payload.len() as u32, bytes },
            );
            self
        }

        pub fn with_sp78(self, key: &str, celsius: f64) -> Self {
            let raw = (celsius * 256.0) as i16;
            self.with_raw(key, DataType::SP78, &raw.to_be_bytes())
        }

        pub fn with_fpe2(self, key: &str, rpm: u32) -> Self {
            self.with_raw(key, DataType::FPE2, &encode_fpe2(rpm).unwrap())
        }

        pub fn with_kernel_error(mut self, key: &str, code: i32) -> Self {
            self.kernel_errors.insert(Key::new(key).unwrap().as_u32(), code);
            self
        }

        /// Current payload of a key
        pub fn bytes_of(&self, key: &str) -> Option<Vec<u8>> {
            let keys = self.keys.lock();
            keys.get(&Key::new(key).unwrap().as_u32())
                .map(|k| k.bytes[..k.data_size as usize].to_vec())
        }

        pub fn key_info_calls(&self) -> usize {
            self.key_info_calls.load(Ordering::SeqCst)
        }

        pub fn read_calls(&self) -> usize {
            self.read_calls.load(Ordering::SeqCst)
        }

        pub fn write_calls(&self) -> usize {
            self.write_calls.load(Ordering::SeqCst)
        }
    }

    impl Channel for FakeController {
        fn call(&self, _index: u32, input: &KeyData) -> Result<KeyData> {
            match input.data8 {
                command::READ_KEYINFO => self.key_info_calls.fetch_add(1, Ordering::SeqCst),
                command::READ_BYTES => self.read_calls.fetch_add(1, Ordering::SeqCst),
                command::WRITE_BYTES => self.write_calls.fetch_add(1, Ordering::SeqCst),
                _ => 0,
            };

            if let Some(code) = self.kernel_errors.get(&input.key) {
                return Err(SmcError::call(int_to_key(input.key), *code));
            }

            let mut output = KeyData::default();
            let mut keys = self.keys.lock();
            let Some(entry) = keys.get_mut(&input.key) else {
                output.result = status::KEY_NOT_FOUND;
                return Ok(output);
            };

            match input.data8 {
                command::READ_KEYINFO => {
                    output.key_info.data_size = entry.data_size;
                    output.key_info.data_type = entry.data_type.as_u32();
                }
                command::READ_BYTES => {
                    if input.key_info.data_size != entry.data_size {
                        output.result = status::ERROR;
                    } else {
                        output.bytes = entry.bytes;
                    }
                }
                command::WRITE_BYTES => {
                    if input.key_info.data_size != entry.data_size {
                        output.result = status::ERROR;
                    } else {
                        entry.bytes = input.bytes;
                    }
                }
                _ => output.result = status::ERROR,
            }
            Ok(output)
        }
    }

    /// Asserts that two floating point numbers are approximately equal
    pub fn assert_approx_eq(a: f64, b: f64, tolerance: f64) {
        assert!(
            (a - b).abs() < tolerance,
            "Values {} and {} are not approximately equal (tolerance: {})",
            a, b, tolerance
        );
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use crate::channel::{Channel, KeyData};
    use crate::constants::{command, kernel, status};
    use crate::types::{DataType, Key};

    #[test]
    fn test_fake_reports_key_info() {
        let fake = FakeController::new().with_sp78("TC0P", 40.0);
        let req = KeyData::request(Key::new("TC0P").unwrap(), command::READ_KEYINFO);
        let out = fake.call(kernel::INDEX_SMC, &req).unwrap();
        assert_eq!(out.key_info.data_size, 2);
        assert_eq!(out.key_info.data_type, DataType::SP78.as_u32());
        assert_eq!(fake.key_info_calls(), 1);
    }

    #[test]
    fn test_fake_unknown_key() {
        let fake = FakeController::new();
        let req = KeyData::request(Key::new("XXXX").unwrap(), command::READ_BYTES);
        let out = fake.call(kernel::INDEX_SMC, &req).unwrap();
        assert_eq!(out.result, status::KEY_NOT_FOUND);
        assert_eq!(fake.read_calls(), 1);
    }

    #[test]
    fn test_fake_sp78_encoding() {
        let fake = FakeController::new().with_sp78("TC0P", 25.0);
        assert_eq!(fake.bytes_of("TC0P").unwrap(), vec![0x19, 0x00]);
    }

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(25.0, 25.001, 0.01);
    }

    #[test]
    #[should_panic]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq(1.0, 1.1, 0.01);
    }
}
