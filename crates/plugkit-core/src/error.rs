//! Unified plugin error types for plugkit.
//!
//! Registry, dispatch, discovery and configuration failures are all mapped
//! into [`PluginError`] so they propagate through the `?` operator with a
//! single type. Each error optionally names the plugin and hook it concerns.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Error kind categorization used across the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Resolving a discovery target failed.
    Import,
    /// The target is not a plugin, or registering it failed.
    Registration,
    /// An implementation does not match its bound specification.
    Validation,
    /// A specification namespace contributed no specifications.
    NoHooksFound,
    /// A mapping key is not a valid identifier.
    InvalidNamespace,
    /// The canonical name is already registered.
    DuplicateName,
    /// The plugin object is already registered.
    DuplicateIdentity,
    /// A call did not supply a parameter an implementation declares.
    ArgumentMismatch,
    /// A hook was invoked through the wrong entry point.
    HookCall,
    /// An implementation or wrapper returned an error.
    Call,
    /// The requested plugin or hook does not exist.
    NotFound,
    /// A configuration error occurred.
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Import => write!(f, "IMPORT"),
            Self::Registration => write!(f, "REGISTRATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::NoHooksFound => write!(f, "NO_HOOKS_FOUND"),
            Self::InvalidNamespace => write!(f, "INVALID_NAMESPACE"),
            Self::DuplicateName => write!(f, "DUPLICATE_NAME"),
            Self::DuplicateIdentity => write!(f, "DUPLICATE_IDENTITY"),
            Self::ArgumentMismatch => write!(f, "ARGUMENT_MISMATCH"),
            Self::HookCall => write!(f, "HOOK_CALL"),
            Self::Call => write!(f, "CALL"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Configuration => write!(f, "CONFIGURATION"),
        }
    }
}

/// The unified error used throughout plugkit.
///
/// Errors raised by plugin code are attached as the `source`; the plugin
/// and hook names are carried alongside so batch callers can filter a
/// collected error list. Clones share the source.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct PluginError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// The plugin this error concerns, if any.
    pub plugin_name: Option<String>,
    /// The hook this error concerns, if any.
    pub hook_name: Option<String>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl PluginError {
    /// Create a new plugin error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            plugin_name: None,
            hook_name: None,
            source: None,
        }
    }

    /// Create a new plugin error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::new(kind, message).caused_by(source)
    }

    /// Attach the plugin this error concerns.
    pub fn for_plugin(mut self, plugin_name: impl Into<String>) -> Self {
        self.plugin_name = Some(plugin_name.into());
        self
    }

    /// Attach the hook this error concerns.
    pub fn for_hook(mut self, hook_name: impl Into<String>) -> Self {
        self.hook_name = Some(hook_name.into());
        self
    }

    /// Attach an underlying cause.
    pub fn caused_by(mut self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        let source: Box<dyn std::error::Error + Send + Sync> = source.into();
        self.source = Some(Arc::from(source));
        self
    }

    /// Create an import error.
    pub fn import(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Import, message)
    }

    /// Create a registration error.
    pub fn registration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Registration, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a no-hooks-found error.
    pub fn no_hooks_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoHooksFound, message)
    }

    /// Create an invalid-namespace error.
    pub fn invalid_namespace(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidNamespace, message)
    }

    /// Create a duplicate-name error.
    pub fn duplicate_name(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateName, message)
    }

    /// Create a duplicate-identity error.
    pub fn duplicate_identity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateIdentity, message)
    }

    /// Create an argument-mismatch error.
    pub fn argument_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArgumentMismatch, message)
    }

    /// Create a hook-call error.
    pub fn hook_call(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HookCall, message)
    }

    /// Create a call error.
    pub fn call(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Call, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Returns whether this error matches the given filters.
    ///
    /// `None` filters match everything.
    pub fn matches(&self, plugin_name: Option<&str>, kind: Option<ErrorKind>) -> bool {
        let plugin_ok = plugin_name.is_none_or(|name| self.plugin_name.as_deref() == Some(name));
        let kind_ok = kind.is_none_or(|k| self.kind == k);
        plugin_ok && kind_ok
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Call,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for PluginError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = PluginError::validation("bad args");
        assert_eq!(err.to_string(), "VALIDATION: bad args");
    }

    #[test]
    fn test_clone_keeps_source_and_context() {
        let io = std::io::Error::other("boom");
        let err = PluginError::import("failed to load")
            .for_plugin("alpha")
            .for_hook("on_start")
            .caused_by(io);
        assert!(std::error::Error::source(&err).is_some());

        let cloned = err.clone();
        let cause = std::error::Error::source(&cloned).expect("source survives clone");
        assert_eq!(cause.to_string(), "boom");
        assert_eq!(cloned.kind, ErrorKind::Import);
        assert_eq!(cloned.plugin_name.as_deref(), Some("alpha"));
        assert_eq!(cloned.hook_name.as_deref(), Some("on_start"));
    }

    #[test]
    fn test_matches_filters() {
        let err = PluginError::registration("x").for_plugin("alpha");
        assert!(err.matches(None, None));
        assert!(err.matches(Some("alpha"), None));
        assert!(err.matches(Some("alpha"), Some(ErrorKind::Registration)));
        assert!(!err.matches(Some("beta"), None));
        assert!(!err.matches(None, Some(ErrorKind::Import)));
    }
}
