//! Plugin discovery configuration.

use serde::{Deserialize, Serialize};

/// Environment variable that disables every discovery scan.
pub const DISABLE_ALL_PLUGINS: &str = "DISABLE_ALL_PLUGINS";
/// Environment variable that disables entry-point scanning.
pub const DISABLE_ENTRYPOINT_PLUGINS: &str = "DISABLE_ENTRYPOINT_PLUGINS";
/// Environment variable that disables naming-prefix scanning.
pub const DISABLE_PREFIX_PLUGINS: &str = "DISABLE_PREFIX_PLUGINS";

/// Discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Entry-point group searched by default.
    #[serde(default)]
    pub entry_point_group: Option<String>,
    /// Module name prefix searched by default.
    #[serde(default)]
    pub module_prefix: Option<String>,
    /// Whether the first hook lookup triggers a discovery pass.
    #[serde(default = "default_true")]
    pub autodiscover: bool,
    /// Collect per-candidate failures instead of stopping at the first one.
    #[serde(default = "default_true")]
    pub ignore_errors: bool,
    /// Disable every discovery scan.
    #[serde(default)]
    pub disable_all: bool,
    /// Disable entry-point scanning.
    #[serde(default)]
    pub disable_entrypoints: bool,
    /// Disable naming-prefix scanning.
    #[serde(default)]
    pub disable_prefix: bool,
}

/// Effective discovery switches after merging configuration and environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryToggles {
    /// No scan runs at all.
    pub all_disabled: bool,
    /// Entry-point scanning is skipped.
    pub entrypoints_disabled: bool,
    /// Prefix scanning is skipped.
    pub prefix_disabled: bool,
}

impl DiscoveryConfig {
    /// Merge the configured switches with the process environment.
    ///
    /// The environment is read on every call so a host can flip a toggle
    /// between discovery passes.
    pub fn toggles(&self) -> DiscoveryToggles {
        DiscoveryToggles {
            all_disabled: self.disable_all || env_flag(DISABLE_ALL_PLUGINS),
            entrypoints_disabled: self.disable_entrypoints || env_flag(DISABLE_ENTRYPOINT_PLUGINS),
            prefix_disabled: self.disable_prefix || env_flag(DISABLE_PREFIX_PLUGINS),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            entry_point_group: None,
            module_prefix: None,
            autodiscover: true,
            ignore_errors: true,
            disable_all: false,
            disable_entrypoints: false,
            disable_prefix: false,
        }
    }
}

fn env_flag(name: &str) -> bool {
    flag_is_set(std::env::var(name).ok().as_deref())
}

/// Any non-empty value turns a toggle on.
pub fn flag_is_set(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.is_empty())
}

fn default_true() -> bool {
    true
}
