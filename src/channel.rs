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

//! Kernel channel to the controller
//!
//! The controller is reached through a single struct-method call on its
//! IOKit user client: a fixed-size [`KeyData`] goes in, a fixed-size
//! [`KeyData`] comes out. The call blocks the calling thread until the kernel
//! answers. There is no timeout and no cancellation.
//!
//! [`Channel`] is the seam between the protocol and the transport. The real
//! transport is [`SmcConnection`]; tests substitute fakes.

use std::sync::Arc;

use tracing::{info, trace};

use crate::codec::int_to_key;
use crate::constants::{buffer, kernel, status};
use crate::error::{Result, SmcError};
use crate::types::Key;

/// Firmware version block of a request
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyDataVers {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
    pub reserved: u8,
    pub release: u16,
}

/// Power limit block of a request
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyDataPLimit {
    pub version: u16,
    pub length: u16,
    pub cpu_p_limit: u32,
    pub gpu_p_limit: u32,
    pub mem_p_limit: u32,
}

/// Key metadata block of a request
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyDataInfo {
    pub data_size: u32,
    pub data_type: u32,
    pub data_attributes: u8,
}

/// Request and response structure exchanged with the controller.
///
/// Layout must match the kernel ABI byte for byte (80 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyData {
    pub key: u32,
    pub vers: KeyDataVers,
    pub p_limit_data: KeyDataPLimit,
    pub key_info: KeyDataInfo,
    pub result: u8,
    pub status: u8,
    pub data8: u8,
    pub data32: u32,
    pub bytes: [u8; buffer::BYTES_LEN],
}

impl KeyData {
    /// A zeroed request for `key` carrying sub-command `command`
    pub fn request(key: Key, command: u8) -> Self {
        Self {
            key: key.as_u32(),
            data8: command,
            ..Self::default()
        }
    }
}

/// Blocking request/response primitive over an open controller handle.
///
/// Implementations must be callable from several threads at once; the
/// protocol does not serialize calls through the same channel.
#[cfg_attr(test, mockall::automock)]
pub trait Channel: Send + Sync {
    /// Send `input` to user-client method `index` and return the response
    fn call(&self, index: u32, input: &KeyData) -> Result<KeyData>;
}

impl<C: Channel + ?Sized> Channel for Arc<C> {
    fn call(&self, index: u32, input: &KeyData) -> Result<KeyData> {
        (**self).call(index, input)
    }
}

impl<C: Channel + ?Sized> Channel for &C {
    fn call(&self, index: u32, input: &KeyData) -> Result<KeyData> {
        (**self).call(index, input)
    }
}

/// Issue a controller call and check the controller's own result byte.
///
/// A kernel-level success can still carry a controller failure such as
/// "key not found"; both come back as call errors.
pub(crate) fn smc_call<C: Channel + ?Sized>(channel: &C, input: &KeyData) -> Result<KeyData> {
    trace!(key = %int_to_key(input.key), command = input.data8, "controller call");
    let output = channel.call(kernel::INDEX_SMC, input)?;
    if output.result != status::SUCCESS {
        return Err(SmcError::ControllerStatus {
            key: int_to_key(input.key),
            status: output.result,
        });
    }
    Ok(output)
}

/// Open connection to the `AppleSMC` kernel service.
///
/// One per process. Not `Clone`; [`SmcConnection::close`] consumes it and a
/// connection that is dropped without an explicit close is released on drop.
#[derive(Debug)]
pub struct SmcConnection {
    handle: u32,
}

impl SmcConnection {
    /// Locate the controller service and open a user-client connection
    pub fn open() -> Result<Self> {
        let handle = platform::open()?;
        info!(service = kernel::SERVICE_NAME, "controller connection opened");
        Ok(Self { handle })
    }

    /// Release the connection
    pub fn close(mut self) -> Result<()> {
        let handle = std::mem::take(&mut self.handle);
        platform::close(handle)?;
        info!(service = kernel::SERVICE_NAME, "controller connection closed");
        Ok(())
    }
}

impl Drop for SmcConnection {
    fn drop(&mut self) {
        if self.handle != 0 {
            let _ = platform::close(self.handle);
        }
    }
}

impl Channel for SmcConnection {
    fn call(&self, index: u32, input: &KeyData) -> Result<KeyData> {
        platform::call(self.handle, index, input)
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use std::ffi::CString;
    use std::mem;

    use libc::{c_char, c_int, c_uint, c_void, size_t};

    use super::KeyData;
    use crate::codec::int_to_key;
    use crate::constants::kernel;
    use crate::error::{Result, SmcError};

    type KernReturn = c_int;
    type MachPort = c_uint;

    /// Passing a null main port selects the default one
    const MACH_PORT_NULL: MachPort = 0;

    #[link(name = "IOKit", kind = "framework")]
    extern "C" {
        fn IOServiceMatching(name: *const c_char) -> *mut c_void;
        fn IOServiceGetMatchingServices(
            main_port: MachPort,
            matching: *mut c_void,
            existing: *mut MachPort,
        ) -> KernReturn;
        fn IOIteratorNext(iterator: MachPort) -> MachPort;
        fn IOObjectRelease(object: MachPort) -> KernReturn;
        fn IOServiceOpen(
            service: MachPort,
            owning_task: MachPort,
            connect_type: u32,
            connect: *mut MachPort,
        ) -> KernReturn;
        fn IOServiceClose(connect: MachPort) -> KernReturn;
        fn IOConnectCallStructMethod(
            connection: MachPort,
            selector: u32,
            input: *const c_void,
            input_size: size_t,
            output: *mut c_void,
            output_size: *mut size_t,
        ) -> KernReturn;
    }

    extern "C" {
        static mach_task_self_: MachPort;
    }

    pub fn open() -> Result<u32> {
        let name = CString::new(kernel::SERVICE_NAME)
            .map_err(|e| SmcError::generic(format!("invalid service name: {}", e)))?;

        // SAFETY: `name` outlives the call; the returned dictionary is consumed
        // by IOServiceGetMatchingServices.
        let matching = unsafe { IOServiceMatching(name.as_ptr()) };
        if matching.is_null() {
            return Err(SmcError::ServiceNotFound(kernel::SERVICE_NAME.to_string()));
        }

        let mut iterator: MachPort = 0;
        // SAFETY: `iterator` is a valid out pointer for the duration of the call.
        let code = unsafe { IOServiceGetMatchingServices(MACH_PORT_NULL, matching, &mut iterator) };
        if code != kernel::RETURN_SUCCESS {
            return Err(SmcError::ServiceOpen {
                service: kernel::SERVICE_NAME.to_string(),
                code,
            });
        }

        // SAFETY: `iterator` was returned by the kernel above and is released once.
        let device = unsafe {
            let device = IOIteratorNext(iterator);
            IOObjectRelease(iterator);
            device
        };
        if device == 0 {
            return Err(SmcError::ServiceNotFound(kernel::SERVICE_NAME.to_string()));
        }

        let mut conn: MachPort = 0;
        // SAFETY: `device` is a live service object, released right after the open.
        let code = unsafe {
            let code = IOServiceOpen(device, mach_task_self_, 0, &mut conn);
            IOObjectRelease(device);
            code
        };
        if code != kernel::RETURN_SUCCESS {
            return Err(SmcError::ServiceOpen {
                service: kernel::SERVICE_NAME.to_string(),
                code,
            });
        }
        Ok(conn)
    }

    pub fn close(conn: u32) -> Result<()> {
        // SAFETY: `conn` came from IOServiceOpen and ownership guarantees a single close.
        let code = unsafe { IOServiceClose(conn) };
        if code != kernel::RETURN_SUCCESS {
            return Err(SmcError::ServiceClose { code });
        }
        Ok(())
    }

    pub fn call(conn: u32, index: u32, input: &KeyData) -> Result<KeyData> {
        let mut output = KeyData::default();
        let mut output_size: size_t = mem::size_of::<KeyData>();
        // SAFETY: both structs are repr(C), sized as the kernel expects, and
        // outlive the synchronous call.
        let code = unsafe {
            IOConnectCallStructMethod(
                conn,
                index,
                input as *const KeyData as *const c_void,
                mem::size_of::<KeyData>(),
                &mut output as *mut KeyData as *mut c_void,
                &mut output_size,
            )
        };
        if code != kernel::RETURN_SUCCESS {
            return Err(SmcError::call(int_to_key(input.key), code));
        }
        Ok(output)
    }
}

#[cfg(not(target_os = "macos"))]
mod platform {
    use super::KeyData;
    use crate::constants::kernel;
    use crate::error::{Result, SmcError};

    fn unsupported() -> SmcError {
        SmcError::NotSupported(format!("{} is only available on macOS", kernel::SERVICE_NAME))
    }

    pub fn open() -> Result<u32> {
        Err(unsupported())
    }

    pub fn close(_conn: u32) -> Result<()> {
        Err(unsupported())
    }

    pub fn call(_conn: u32, _index: u32, _input: &KeyData) -> Result<KeyData> {
        Err(unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::command;
    use mockall::predicate::*;

    #[test]
    fn test_key_data_matches_kernel_layout() {
        assert_eq!(std::mem::size_of::<KeyData>(), 80);
        assert_eq!(std::mem::size_of::<KeyDataVers>(), 6);
        assert_eq!(std::mem::size_of::<KeyDataPLimit>(), 16);
        assert_eq!(std::mem::size_of::<KeyDataInfo>(), 12);
    }

    #[test]
    fn test_request_is_zeroed_except_key_and_command() {
        let key = Key::new("TC0P").unwrap();
        let req = KeyData::request(key, command::READ_KEYINFO);
        assert_eq!(req.key, key.as_u32());
        assert_eq!(req.data8, command::READ_KEYINFO);
        assert_eq!(req.key_info, KeyDataInfo::default());
        assert!(req.bytes.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_smc_call_uses_controller_index() {
        let mut mock = MockChannel::new();
        mock.expect_call()
            .with(eq(kernel::INDEX_SMC), always())
            .times(1)
            .returning(|_, input| Ok(*input));
        let key = Key::new("TC0P").unwrap();
        let out = smc_call(&mock, &KeyData::request(key, command::READ_BYTES)).unwrap();
        assert_eq!(out.key, key.as_u32());
    }

    #[test]
    fn test_smc_call_maps_result_byte() {
        let mut mock = MockChannel::new();
        mock.expect_call().returning(|_, _| {
            Ok(KeyData { result: status::KEY_NOT_FOUND, ..KeyData::default() })
        });
        let key = Key::new("ZZZZ").unwrap();
        let err = smc_call(&mock, &KeyData::request(key, command::READ_KEYINFO)).unwrap_err();
        assert!(matches!(
            err,
            SmcError::ControllerStatus { ref key, status: 0x84 } if key == "ZZZZ"
        ));
        assert!(err.is_call_error());
    }

    #[test]
    fn test_smc_call_propagates_kernel_error() {
        let mut mock = MockChannel::new();
        mock.expect_call().returning(|_, input| Err(SmcError::call(int_to_key(input.key), 0x2c2)));
        let key = Key::new("TC0P").unwrap();
        let err = smc_call(&mock, &KeyData::request(key, command::READ_BYTES)).unwrap_err();
        assert!(matches!(err, SmcError::Call { code: 0x2c2, .. }));
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_open_unsupported_off_macos() {
        let err = SmcConnection::open().unwrap_err();
        assert!(err.is_connection_error());
    }
}
