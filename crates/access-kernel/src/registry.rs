//! Role registry
//!
//! This module owns role definitions: a name, a set of permission codes and a
//! protection flag. Protected roles (such as a built-in administrator) can
//! never be deleted or renamed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::assignments::RoleAssignments;
use crate::catalog::PermissionCatalog;
use crate::error::{AccessError, AccessResult};
use crate::permissions::PermissionSet;
use crate::version;

/// A named collection of permissions.
///
/// The stored permission set is exactly what was saved; implied permissions
/// are added when a user's effective permissions are resolved, not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Role {
    /// Unique role ID
    pub id: Uuid,

    /// Display name, unique case-insensitively
    pub name: String,

    /// Permissions granted directly by this role
    pub permissions: PermissionSet,

    /// Protected roles reject deletion and renaming
    pub is_protected: bool,

    /// When the role was created
    pub created_at: DateTime<Utc>,

    /// When the role was last changed
    pub updated_at: DateTime<Utc>,
}

impl Role {
    fn new(name: String, permissions: PermissionSet, is_protected: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name,
            permissions,
            is_protected,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Registry of role definitions.
///
/// # Examples
///
/// ```
/// use access_kernel::{PermissionCatalog, PermissionSet, RoleAssignments, RoleRegistry};
///
/// let mut catalog = PermissionCatalog::new();
/// catalog.register("user:edit", "user", "Edit users").unwrap();
///
/// let mut registry = RoleRegistry::new();
/// let perms = PermissionSet::from_strings(&["user:edit"]).unwrap();
/// let admin_id = registry.create_role(&catalog, "SuperAdmin", perms, true).unwrap().id;
///
/// let assignments = RoleAssignments::new();
/// assert!(registry.delete_role(admin_id, &assignments).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    roles: HashMap<Uuid, Role>,
    /// Normalized name to role ID.
    names: HashMap<String, Uuid>,
    /// Role IDs in creation order.
    order: Vec<Uuid>,
    /// Whether protected roles also reject permission edits.
    lock_protected: bool,
    version: u64,
}

impl RoleRegistry {
    /// Create an empty registry in which protected roles stay editable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether protected roles also reject permission edits.
    pub fn with_protected_lock(mut self, locked: bool) -> Self {
        self.lock_protected = locked;
        self
    }

    /// Create a new role.
    ///
    /// # Arguments
    ///
    /// * `catalog` - Every code in `permissions` must be registered here
    /// * `name` - Display name; trimmed, and unique ignoring case
    /// * `permissions` - Stored as given, without implied codes
    /// * `is_protected` - Protected roles cannot be deleted or renamed
    ///
    /// # Errors
    ///
    /// - [`AccessError::InvalidRoleName`] if the name is blank
    /// - [`AccessError::DuplicateRoleName`] if the name is taken
    /// - [`AccessError::UnknownPermission`] if a code is not in `catalog`
    pub fn create_role(
        &mut self,
        catalog: &PermissionCatalog,
        name: impl Into<String>,
        permissions: PermissionSet,
        is_protected: bool,
    ) -> AccessResult<&Role> {
        let name = name.into();
        let key = self.available_name(&name, None)?;
        validate_permissions(catalog, &permissions)?;

        let role = Role::new(name.trim().to_string(), permissions, is_protected);
        let id = role.id;

        tracing::info!(
            role_id = %id,
            name = %role.name,
            protected = is_protected,
            permissions = role.permissions.len(),
            "Role created"
        );

        self.names.insert(key, id);
        self.order.push(id);
        self.roles.insert(id, role);
        self.version = version::next();

        Ok(&self.roles[&id])
    }

    /// Replace a role's permission set.
    ///
    /// Protected roles may be edited unless the registry was built with
    /// [`RoleRegistry::with_protected_lock`].
    ///
    /// # Errors
    ///
    /// - [`AccessError::UnknownRole`] if the role does not exist
    /// - [`AccessError::ProtectedRole`] if the role is protected and locked
    /// - [`AccessError::UnknownPermission`] if a code is not in `catalog`
    pub fn edit_role(
        &mut self,
        catalog: &PermissionCatalog,
        role_id: Uuid,
        permissions: PermissionSet,
    ) -> AccessResult<&Role> {
        let role = self
            .roles
            .get_mut(&role_id)
            .ok_or(AccessError::UnknownRole(role_id))?;

        if role.is_protected && self.lock_protected {
            tracing::warn!(role_id = %role_id, "Rejected edit of locked protected role");
            return Err(AccessError::ProtectedRole(role_id));
        }
        validate_permissions(catalog, &permissions)?;

        role.permissions = permissions;
        role.updated_at = Utc::now();
        self.version = version::next();

        tracing::info!(
            role_id = %role_id,
            permissions = role.permissions.len(),
            "Role permissions replaced"
        );

        Ok(role)
    }

    /// Rename a role.
    ///
    /// # Errors
    ///
    /// - [`AccessError::UnknownRole`] if the role does not exist
    /// - [`AccessError::ProtectedRole`] if the role is protected
    /// - [`AccessError::InvalidRoleName`] / [`AccessError::DuplicateRoleName`]
    pub fn rename_role(&mut self, role_id: Uuid, name: impl Into<String>) -> AccessResult<&Role> {
        let name = name.into();
        let current = self
            .roles
            .get(&role_id)
            .ok_or(AccessError::UnknownRole(role_id))?;

        if current.is_protected {
            tracing::warn!(role_id = %role_id, "Rejected rename of protected role");
            return Err(AccessError::ProtectedRole(role_id));
        }

        let old_key = normalize(&current.name);
        let key = self.available_name(&name, Some(role_id))?;

        self.names.remove(&old_key);
        self.names.insert(key, role_id);

        let role = self
            .roles
            .get_mut(&role_id)
            .ok_or(AccessError::UnknownRole(role_id))?;
        role.name = name.trim().to_string();
        role.updated_at = Utc::now();
        self.version = version::next();

        Ok(role)
    }

    /// Delete a role.
    ///
    /// Protection is checked first, so a protected role is rejected whether
    /// or not anyone holds it. Assignments are never cascaded: users must be
    /// moved off the role before it can be deleted.
    ///
    /// # Returns
    ///
    /// The removed role
    ///
    /// # Errors
    ///
    /// - [`AccessError::UnknownRole`] if the role does not exist
    /// - [`AccessError::ProtectedRole`] if the role is protected
    /// - [`AccessError::RoleInUse`] if any user still holds the role
    pub fn delete_role(
        &mut self,
        role_id: Uuid,
        assignments: &RoleAssignments,
    ) -> AccessResult<Role> {
        let role = self
            .roles
            .get(&role_id)
            .ok_or(AccessError::UnknownRole(role_id))?;

        if role.is_protected {
            tracing::warn!(role_id = %role_id, "Rejected delete of protected role");
            return Err(AccessError::ProtectedRole(role_id));
        }

        let users = assignments.holder_count(role_id);
        if users > 0 {
            tracing::warn!(role_id = %role_id, users, "Rejected delete of role still in use");
            return Err(AccessError::RoleInUse { role_id, users });
        }

        let role = self
            .roles
            .remove(&role_id)
            .ok_or(AccessError::UnknownRole(role_id))?;
        self.names.remove(&normalize(&role.name));
        self.order.retain(|id| *id != role_id);
        self.version = version::next();

        tracing::info!(role_id = %role_id, name = %role.name, "Role deleted");

        Ok(role)
    }

    /// Get a role by ID.
    pub fn get_role(&self, role_id: Uuid) -> Option<&Role> {
        self.roles.get(&role_id)
    }

    /// Find a role by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<&Role> {
        self.names
            .get(&normalize(name))
            .and_then(|id| self.roles.get(id))
    }

    /// List roles in creation order.
    pub fn list_roles(&self) -> Vec<&Role> {
        self.order
            .iter()
            .filter_map(|id| self.roles.get(id))
            .collect()
    }

    /// Check whether a role exists.
    pub fn contains(&self, role_id: Uuid) -> bool {
        self.roles.contains_key(&role_id)
    }

    /// Get the registry version.
    ///
    /// Zero for an empty registry. Every successful mutation takes a new
    /// process-wide stamp, so a diverged clone never reports the same version
    /// as its source.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Get the number of roles.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Validate a candidate name and return its normalized key.
    fn available_name(&self, name: &str, owner: Option<Uuid>) -> AccessResult<String> {
        let key = normalize(name);
        if key.is_empty() {
            return Err(AccessError::InvalidRoleName(name.to_string()));
        }
        match self.names.get(&key) {
            Some(id) if Some(*id) != owner => {
                Err(AccessError::DuplicateRoleName(name.trim().to_string()))
            }
            _ => Ok(key),
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn validate_permissions(catalog: &PermissionCatalog, permissions: &PermissionSet) -> AccessResult<()> {
    match permissions.sorted().into_iter().find(|code| !catalog.exists(code.as_str())) {
        Some(code) => Err(AccessError::UnknownPermission(code.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PermissionCatalog {
        let mut catalog = PermissionCatalog::new();
        catalog.register("user:view", "user", "View users").unwrap();
        catalog.register("user:edit", "user", "Edit users").unwrap();
        catalog
    }

    fn perms(codes: &[&str]) -> PermissionSet {
        PermissionSet::from_strings(codes).unwrap()
    }

    #[test]
    fn test_create_role() {
        let catalog = catalog();
        let mut registry = RoleRegistry::new();
        let role = registry
            .create_role(&catalog, "  Editor ", perms(&["user:edit"]), false)
            .unwrap();

        assert_eq!(role.name, "Editor");
        assert!(!role.is_protected);
        assert!(role.permissions.has("user:edit"));
        assert_eq!(registry.len(), 1);
        assert!(registry.version() > 0);
    }

    #[test]
    fn test_create_role_duplicate_name() {
        let catalog = catalog();
        let mut registry = RoleRegistry::new();
        registry
            .create_role(&catalog, "Editor", PermissionSet::new(), false)
            .unwrap();
        let version = registry.version();

        let err = registry
            .create_role(&catalog, "editor", PermissionSet::new(), false)
            .unwrap_err();
        assert_eq!(err, AccessError::DuplicateRoleName("editor".into()));
        assert_eq!(registry.version(), version);
    }

    #[test]
    fn test_create_role_unknown_permission() {
        let catalog = catalog();
        let mut registry = RoleRegistry::new();
        let err = registry
            .create_role(&catalog, "Editor", perms(&["user:edit", "user:purge"]), false)
            .unwrap_err();
        assert_eq!(err, AccessError::UnknownPermission("user:purge".into()));
        assert!(registry.is_empty());
        assert!(registry.find_by_name("Editor").is_none());
    }

    #[test]
    fn test_create_role_blank_name() {
        let catalog = catalog();
        let mut registry = RoleRegistry::new();
        assert!(matches!(
            registry.create_role(&catalog, "   ", PermissionSet::new(), false),
            Err(AccessError::InvalidRoleName(_))
        ));
    }

    #[test]
    fn test_edit_protected_role() {
        let catalog = catalog();
        let mut registry = RoleRegistry::new();
        let id = registry
            .create_role(&catalog, "SuperAdmin", perms(&["user:view"]), true)
            .unwrap()
            .id;
        let version = registry.version();

        let role = registry
            .edit_role(&catalog, id, perms(&["user:view", "user:edit"]))
            .unwrap();
        assert_eq!(role.permissions.len(), 2);
        assert!(registry.version() > version);
    }

    #[test]
    fn test_edit_locked_protected_role() {
        let catalog = catalog();
        let mut registry = RoleRegistry::new().with_protected_lock(true);
        let id = registry
            .create_role(&catalog, "SuperAdmin", perms(&["user:view"]), true)
            .unwrap()
            .id;

        assert_eq!(
            registry.edit_role(&catalog, id, PermissionSet::new()).unwrap_err(),
            AccessError::ProtectedRole(id)
        );
        assert!(registry.get_role(id).unwrap().permissions.has("user:view"));
    }

    #[test]
    fn test_edit_role_validation() {
        let catalog = catalog();
        let mut registry = RoleRegistry::new();
        let id = registry
            .create_role(&catalog, "Viewer", perms(&["user:view"]), false)
            .unwrap()
            .id;

        assert!(registry.edit_role(&catalog, id, perms(&["nope"])).is_err());
        assert!(registry.get_role(id).unwrap().permissions.has("user:view"));

        let missing = Uuid::now_v7();
        assert_eq!(
            registry.edit_role(&catalog, missing, PermissionSet::new()).unwrap_err(),
            AccessError::UnknownRole(missing)
        );
    }

    #[test]
    fn test_rename_role() {
        let catalog = catalog();
        let mut registry = RoleRegistry::new();
        let id = registry
            .create_role(&catalog, "Viewer", PermissionSet::new(), false)
            .unwrap()
            .id;
        registry
            .create_role(&catalog, "Editor", PermissionSet::new(), false)
            .unwrap();

        registry.rename_role(id, "Reader").unwrap();
        assert_eq!(registry.find_by_name("reader").unwrap().id, id);
        assert!(registry.find_by_name("Viewer").is_none());

        // Changing only the case of its own name is allowed.
        registry.rename_role(id, "READER").unwrap();
        assert_eq!(registry.get_role(id).unwrap().name, "READER");

        assert!(matches!(
            registry.rename_role(id, "editor"),
            Err(AccessError::DuplicateRoleName(_))
        ));
    }

    #[test]
    fn test_rename_protected_role() {
        let catalog = catalog();
        let mut registry = RoleRegistry::new();
        let id = registry
            .create_role(&catalog, "SuperAdmin", PermissionSet::new(), true)
            .unwrap()
            .id;

        assert_eq!(
            registry.rename_role(id, "Root").unwrap_err(),
            AccessError::ProtectedRole(id)
        );
        assert_eq!(registry.get_role(id).unwrap().name, "SuperAdmin");
    }

    #[test]
    fn test_delete_role() {
        let catalog = catalog();
        let mut registry = RoleRegistry::new();
        let id = registry
            .create_role(&catalog, "Viewer", PermissionSet::new(), false)
            .unwrap()
            .id;

        let assignments = RoleAssignments::new();
        let deleted = registry.delete_role(id, &assignments).unwrap();
        assert_eq!(deleted.name, "Viewer");
        assert!(registry.get_role(id).is_none());
        assert!(registry.list_roles().is_empty());

        // The name is free again.
        registry
            .create_role(&catalog, "Viewer", PermissionSet::new(), false)
            .unwrap();

        assert_eq!(
            registry.delete_role(id, &assignments).unwrap_err(),
            AccessError::UnknownRole(id)
        );
    }

    #[test]
    fn test_delete_protected_role() {
        let catalog = catalog();
        let mut registry = RoleRegistry::new();
        let id = registry
            .create_role(&catalog, "SuperAdmin", PermissionSet::new(), true)
            .unwrap()
            .id;

        let mut assignments = RoleAssignments::new();
        assert_eq!(
            registry.delete_role(id, &assignments).unwrap_err(),
            AccessError::ProtectedRole(id)
        );

        assignments.assign_role(&registry, Uuid::now_v7(), id).unwrap();
        assert_eq!(
            registry.delete_role(id, &assignments).unwrap_err(),
            AccessError::ProtectedRole(id)
        );
    }

    #[test]
    fn test_delete_role_in_use() {
        let catalog = catalog();
        let mut registry = RoleRegistry::new();
        let id = registry
            .create_role(&catalog, "Viewer", PermissionSet::new(), false)
            .unwrap()
            .id;

        let mut assignments = RoleAssignments::new();
        let user = Uuid::now_v7();
        assignments.assign_role(&registry, user, id).unwrap();

        assert_eq!(
            registry.delete_role(id, &assignments).unwrap_err(),
            AccessError::RoleInUse { role_id: id, users: 1 }
        );
        assert!(registry.contains(id));

        assignments.revoke_role(user, id);
        assert!(registry.delete_role(id, &assignments).is_ok());
    }

    #[test]
    fn test_diverged_clones_never_share_a_version() {
        let catalog = catalog();
        let mut original = RoleRegistry::new();
        let id = original
            .create_role(&catalog, "Viewer", perms(&["user:view"]), false)
            .unwrap()
            .id;

        let mut copy = original.clone();
        assert_eq!(copy.version(), original.version());

        original.edit_role(&catalog, id, perms(&["user:edit"])).unwrap();
        copy.edit_role(&catalog, id, perms(&["user:view", "user:edit"])).unwrap();
        assert_ne!(copy.version(), original.version());
    }

    #[test]
    fn test_list_roles_in_creation_order() {
        let catalog = catalog();
        let mut registry = RoleRegistry::new();
        for name in ["Viewer", "Editor", "Admin"] {
            registry
                .create_role(&catalog, name, PermissionSet::new(), false)
                .unwrap();
        }
        let names: Vec<&str> = registry.list_roles().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Viewer", "Editor", "Admin"]);
    }
}
