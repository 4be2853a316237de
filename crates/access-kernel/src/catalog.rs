//! # Permission Catalog
//!
//! Registry of every known permission code, grouped by namespace. The catalog
//! is the source of truth for code validity: the implication graph and the
//! role registry both refuse codes it does not contain.
//!
//! Permissions are append-only. Removing one would silently invalidate the
//! roles and rules that reference it, so no deletion is exposed.

use std::collections::HashMap;

use crate::error::{AccessError, AccessResult};
use crate::permissions::{Permission, PermissionCode};

/// Append-only catalog of permissions.
///
/// # Example
///
/// ```
/// use access_kernel::PermissionCatalog;
///
/// let mut catalog = PermissionCatalog::new();
/// catalog.register("user:view", "user", "View users").unwrap();
/// catalog.register("user:edit", "user", "Edit users").unwrap();
///
/// assert!(catalog.exists("user:view"));
/// assert!(catalog.register("user:view", "user", "again").is_err());
///
/// let codes: Vec<&str> = catalog
///     .list_by_namespace("user")
///     .map(|p| p.code.as_str())
///     .collect();
/// assert_eq!(codes, vec!["user:view", "user:edit"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    /// Permissions in registration order.
    permissions: Vec<Permission>,
    /// Code to position in `permissions`.
    index: HashMap<PermissionCode, usize>,
    /// Namespace to positions, each in registration order.
    namespaces: HashMap<String, Vec<usize>>,
    /// Namespaces in first-registration order.
    namespace_order: Vec<String>,
}

impl PermissionCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new permission.
    ///
    /// # Arguments
    ///
    /// * `code` - Unique code; must be well formed and not the `PUBLIC` sentinel
    /// * `namespace` - Grouping used by [`list_by_namespace`](Self::list_by_namespace)
    /// * `description` - Free text for administration screens
    ///
    /// # Returns
    ///
    /// The stored permission entry
    ///
    /// # Errors
    ///
    /// - [`AccessError::InvalidCode`] if `code` is malformed or reserved
    /// - [`AccessError::DuplicateCode`] if `code` is already registered
    pub fn register(
        &mut self,
        code: impl Into<String>,
        namespace: impl Into<String>,
        description: impl Into<String>,
    ) -> AccessResult<&Permission> {
        let code = PermissionCode::new(code)?;
        if self.index.contains_key(&code) {
            return Err(AccessError::DuplicateCode(code.to_string()));
        }

        let namespace = namespace.into();
        let position = self.permissions.len();

        match self.namespaces.get_mut(&namespace) {
            Some(positions) => positions.push(position),
            None => {
                self.namespaces.insert(namespace.clone(), vec![position]);
                self.namespace_order.push(namespace.clone());
            }
        }

        tracing::debug!(code = %code, namespace = %namespace, "Registered permission");

        self.index.insert(code.clone(), position);
        self.permissions
            .push(Permission::new(code, namespace, description));

        Ok(&self.permissions[position])
    }

    /// Check whether a code is registered.
    ///
    /// Malformed strings are never registered, so they report `false`.
    pub fn exists(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    /// Look up a registered permission.
    pub fn get(&self, code: &str) -> Option<&Permission> {
        self.index.get(code).map(|&i| &self.permissions[i])
    }

    /// Resolve a string to its registered code.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::UnknownPermission`] if the code is not registered.
    pub fn require(&self, code: &str) -> AccessResult<&PermissionCode> {
        self.get(code)
            .map(|p| &p.code)
            .ok_or_else(|| AccessError::UnknownPermission(code.to_string()))
    }

    /// List the permissions of a namespace in registration order.
    ///
    /// An unknown namespace yields an empty sequence.
    pub fn list_by_namespace<'a>(
        &'a self,
        namespace: &str,
    ) -> impl Iterator<Item = &'a Permission> + 'a {
        self.namespaces
            .get(namespace)
            .into_iter()
            .flatten()
            .map(move |&i| &self.permissions[i])
    }

    /// Get the namespaces in the order they were first used.
    pub fn namespaces(&self) -> &[String] {
        &self.namespace_order
    }

    /// Iterate over all permissions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.iter()
    }

    /// Get the number of registered permissions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}
