//! Convenience result type alias for plugkit.

use crate::error::PluginError;

/// A specialized `Result` type for registry and dispatch operations.
///
/// Every fallible engine operation returns this so call sites can use `?`
/// without spelling out `Result<T, PluginError>`.
pub type PluginResult<T> = Result<T, PluginError>;
