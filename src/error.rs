//! Error types
//!
//! Re-exported from the `smc-error` crate so every layer shares one type.

pub use smc_error::{Result, SmcError};
