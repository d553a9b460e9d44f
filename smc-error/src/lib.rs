//! Unified error handling for smcfan
//!
//! A single error type is used by every layer of the controller client, from
//! the kernel channel up to configuration loading. Variants are grouped by the
//! kind of failure so callers can decide per operation whether to retry,
//! skip, or abort.

use std::io;
use std::path::PathBuf;

/// Result type alias using SmcError
pub type Result<T> = std::result::Result<T, SmcError>;

/// Unified error type for all smcfan operations
#[derive(thiserror::Error, Debug)]
pub enum SmcError {
    // ============================================================================
    // Connection Errors
    // ============================================================================
    #[error("Controller service not found: {0}")]
    ServiceNotFound(String),

    #[error("Failed to open controller service {service}: kern_return {code:#010x}")]
    ServiceOpen {
        service: String,
        code: i32,
    },

    #[error("Failed to close controller connection: kern_return {code:#010x}")]
    ServiceClose {
        code: i32,
    },

    // ============================================================================
    // Controller Call Errors
    // ============================================================================
    #[error("Controller call for key '{key}' failed: kern_return {code:#010x}")]
    Call {
        key: String,
        code: i32,
    },

    #[error("Controller rejected key '{key}' with status {status:#04x}")]
    ControllerStatus {
        key: String,
        status: u8,
    },

    #[error("Size mismatch writing key '{key}': controller reports {expected} bytes, value declares {actual}")]
    SizeMismatch {
        key: String,
        expected: u32,
        actual: u32,
    },

    #[error("Key '{key}' has unsupported type '{data_type}' ({data_size} bytes)")]
    UnsupportedType {
        key: String,
        data_type: String,
        data_size: u32,
    },

    // ============================================================================
    // Validation Errors
    // ============================================================================
    #[error("Invalid key {0:?}: keys are exactly 4 printable ASCII characters")]
    InvalidKey(String),

    #[error("Value {value} out of range for {what} (max {max})")]
    ValueOutOfRange {
        what: String,
        value: u64,
        max: u64,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Generic(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl SmcError {
    /// Create a generic error from a string
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create an invalid config error for a named field
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a kernel call error for a key
    pub fn call(key: impl Into<String>, code: i32) -> Self {
        Self::Call {
            key: key.into(),
            code,
        }
    }

    /// True when the controller session could not be established.
    ///
    /// These are fatal to the whole session and surface at startup.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ServiceNotFound(_) | Self::ServiceOpen { .. } | Self::NotSupported(_)
        )
    }

    /// True when a single controller round trip failed.
    pub fn is_call_error(&self) -> bool {
        matches!(self, Self::Call { .. } | Self::ControllerStatus { .. })
    }
}

// Allow converting from String to SmcError
impl From<String> for SmcError {
    fn from(s: String) -> Self {
        Self::Generic(s)
    }
}

// Allow converting from &str to SmcError
impl From<&str> for SmcError {
    fn from(s: &str) -> Self {
        Self::Generic(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_error_classification() {
        assert!(SmcError::ServiceNotFound("AppleSMC".into()).is_connection_error());
        let open = SmcError::ServiceOpen { service: "AppleSMC".into(), code: -536870212 };
        assert!(open.is_connection_error());
        assert!(!SmcError::call("TC0P", 1).is_connection_error());
    }

    #[test]
    fn test_call_error_classification() {
        assert!(SmcError::call("TC0P", 1).is_call_error());
        assert!(SmcError::ControllerStatus { key: "TC0P".into(), status: 0x84 }.is_call_error());
        let mismatch = SmcError::SizeMismatch { key: "F0Mn".into(), expected: 2, actual: 4 };
        assert!(!mismatch.is_call_error());
    }

    #[test]
    fn test_display_messages() {
        let err = SmcError::SizeMismatch { key: "F0Mn".into(), expected: 2, actual: 4 };
        assert_eq!(
            err.to_string(),
            "Size mismatch writing key 'F0Mn': controller reports 2 bytes, value declares 4"
        );

        let err = SmcError::ControllerStatus { key: "XXXX".into(), status: 0x84 };
        assert_eq!(err.to_string(), "Controller rejected key 'XXXX' with status 0x84");

        let err = SmcError::call("TC0P", 0x2c7);
        assert_eq!(
            err.to_string(),
            "Controller call for key 'TC0P' failed: kern_return 0x000002c7"
        );
    }

    #[test]
    fn test_permission_denied_message() {
        let err = SmcError::PermissionDenied("writing controller keys requires root".into());
        assert_eq!(err.to_string(), "Permission denied: writing controller keys requires root");
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_from_string() {
        let err: SmcError = "boom".into();
        assert!(matches!(err, SmcError::Generic(ref s) if s == "boom"));
        let err: SmcError = String::from("bang").into();
        assert_eq!(err.to_string(), "bang");
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: SmcError = parse.unwrap_err().into();
        assert!(matches!(err, SmcError::JsonParse(_)));
    }
}
