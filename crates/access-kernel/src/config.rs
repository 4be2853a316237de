//! Kernel configuration and bootstrap payload.
//!
//! [`KernelConfig`] holds runtime knobs and is loaded from environment
//! variables with defaults suitable for local development.
//! [`BootstrapPayload`] is the static document an administrative layer hands
//! over at startup: the permission catalog by namespace, the implication
//! rules, and any built-in roles.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AccessError, AccessResult};

/// Runtime configuration for an access-control kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Whether effective permission sets are cached.
    pub cache_enabled: bool,

    /// Maximum number of cached effective permission sets.
    pub cache_capacity: usize,

    /// Whether protected roles also reject permission edits.
    pub lock_protected_roles: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_capacity: 1024,
            lock_protected_roles: false,
        }
    }
}

impl KernelConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ACCESS_CACHE_ENABLED`: Cache effective permissions (default: true)
    /// - `ACCESS_CACHE_CAPACITY`: Maximum cached sets (default: 1024)
    /// - `ACCESS_LOCK_PROTECTED_ROLES`: Reject edits to protected roles (default: false)
    ///
    /// Values that do not parse keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the raw value for a variable name, if set
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        Self {
            cache_enabled: lookup("ACCESS_CACHE_ENABLED")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(default.cache_enabled),
            cache_capacity: lookup("ACCESS_CACHE_CAPACITY")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default.cache_capacity),
            lock_protected_roles: lookup("ACCESS_LOCK_PROTECTED_ROLES")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(default.lock_protected_roles),
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Config`] if caching is enabled with a zero capacity.
    pub fn validate(&self) -> AccessResult<()> {
        if self.cache_enabled && self.cache_capacity == 0 {
            return Err(AccessError::Config(
                "cache_capacity must be greater than zero when caching is enabled".to_string(),
            ));
        }
        Ok(())
    }

    /// Capacity handed to the resolver; zero when caching is off.
    pub fn effective_cache_capacity(&self) -> usize {
        if self.cache_enabled {
            self.cache_capacity
        } else {
            0
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// One catalog entry in a bootstrap payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    /// Permission code.
    pub code: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// One implication rule in a bootstrap payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    /// Granting code.
    pub from: String,
    /// Implied code.
    pub to: String,
}

/// One built-in role in a bootstrap payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Role name.
    pub name: String,
    /// Codes granted by the role.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Whether the role is protected.
    #[serde(default, rename = "protected")]
    pub is_protected: bool,
}

/// Startup configuration document.
///
/// ```json
/// {
///   "namespaces": { "user": [ { "code": "user:view", "description": "View users" } ] },
///   "rules": [ { "from": "user:edit", "to": "user:view" } ],
///   "roles": [ { "name": "SuperAdmin", "permissions": ["user:view"], "protected": true } ]
/// }
/// ```
///
/// Namespaces are registered in document order; codes within a namespace in
/// list order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapPayload {
    /// Catalog entries grouped by namespace.
    pub namespaces: IndexMap<String, Vec<PermissionEntry>>,
    /// Implication rules.
    pub rules: Vec<RuleEntry>,
    /// Built-in roles.
    pub roles: Vec<RoleEntry>,
}

impl BootstrapPayload {
    /// Parse a payload from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Config`] if the JSON does not match the payload shape.
    pub fn from_json_str(json: &str) -> AccessResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a payload from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Config`] if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> AccessResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AccessError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Get the total number of catalog entries.
    pub fn permission_count(&self) -> usize {
        self.namespaces.values().map(Vec::len).sum()
    }
}
