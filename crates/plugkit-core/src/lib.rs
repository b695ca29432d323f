//! # plugkit-core
//!
//! Core crate for plugkit. Contains the unified plugin error type,
//! the crate-wide result alias, and the configuration schemas shared by
//! the engine and the host binary.
//!
//! This crate has **no** internal dependencies on other plugkit crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::{ErrorKind, PluginError};
pub use result::PluginResult;
