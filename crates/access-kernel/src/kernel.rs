//! # Access Control
//!
//! [`AccessControl`] ties the catalog, the implication graph, the role
//! registry and the assignment store together behind one read-write lock.
//!
//! Mutations take the write lock, so they are serialized and readers never
//! see a half-applied change. Evaluation takes the read lock and may run on
//! any number of threads at once. Every successful mutation bumps a
//! monotonic kernel version.

use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use crate::assignments::{RoleAssignments, UserRoleAssignment};
use crate::catalog::PermissionCatalog;
use crate::config::{BootstrapPayload, KernelConfig};
use crate::error::AccessResult;
use crate::evaluator::{AccessEvaluator, AccessQuery};
use crate::graph::{ImplicationGraph, ImplicationRule};
use crate::permissions::{Permission, PermissionSet};
use crate::registry::{Role, RoleRegistry};
use crate::resolver::RoleAssignmentResolver;

#[derive(Debug, Clone)]
struct KernelState {
    catalog: PermissionCatalog,
    graph: ImplicationGraph,
    registry: RoleRegistry,
    assignments: RoleAssignments,
    version: u64,
}

impl KernelState {
    fn new(config: &KernelConfig) -> Self {
        Self {
            catalog: PermissionCatalog::new(),
            graph: ImplicationGraph::new(),
            registry: RoleRegistry::new().with_protected_lock(config.lock_protected_roles),
            assignments: RoleAssignments::new(),
            version: 0,
        }
    }

    fn apply(&mut self, payload: &BootstrapPayload) -> AccessResult<()> {
        for (namespace, entries) in &payload.namespaces {
            for entry in entries {
                self.catalog
                    .register(entry.code.as_str(), namespace.as_str(), entry.description.as_str())?;
            }
        }

        for rule in &payload.rules {
            self.graph.add_rule(&self.catalog, &rule.from, &rule.to)?;
        }

        for role in &payload.roles {
            let permissions = role
                .permissions
                .iter()
                .map(|code| self.catalog.require(code).cloned())
                .collect::<AccessResult<PermissionSet>>()?;
            self.registry
                .create_role(&self.catalog, role.name.as_str(), permissions, role.is_protected)?;
        }

        Ok(())
    }
}

/// Thread-safe access-control kernel.
///
/// Share it between request handlers with an [`Arc`].
///
/// # Example
///
/// ```
/// use uuid::Uuid;
/// use access_kernel::{AccessControl, AccessQuery, KernelConfig, PermissionSet};
///
/// let access = AccessControl::new(KernelConfig::default()).unwrap();
/// access.register_permission("user:view", "user", "View users").unwrap();
/// access.register_permission("user:edit", "user", "Edit users").unwrap();
/// access.add_rule("user:edit", "user:view").unwrap();
///
/// let editor = access
///     .create_role("Editor", PermissionSet::from_strings(&["user:edit"]).unwrap(), false)
///     .unwrap();
///
/// let user = Uuid::now_v7();
/// assert!(access.check_user_access(user, &[editor.id], &AccessQuery::single("user:view")));
/// assert!(!access.check_user_access(user, &[], &AccessQuery::single("user:view")));
/// ```
#[derive(Debug)]
pub struct AccessControl {
    state: RwLock<KernelState>,
    resolver: RoleAssignmentResolver,
}

impl AccessControl {
    /// Create an empty kernel.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AccessError::Config`] if the configuration is invalid.
    pub fn new(config: KernelConfig) -> AccessResult<Self> {
        config.validate()?;
        Ok(Self {
            state: RwLock::new(KernelState::new(&config)),
            resolver: RoleAssignmentResolver::new(config.effective_cache_capacity()),
        })
    }

    /// Create a kernel pre-loaded from a bootstrap payload.
    ///
    /// # Errors
    ///
    /// Returns the first configuration, catalog, rule or role error in the payload.
    pub fn from_payload(config: KernelConfig, payload: &BootstrapPayload) -> AccessResult<Self> {
        let access = Self::new(config)?;
        access.apply_payload(payload)?;
        Ok(access)
    }

    /// Load a bootstrap payload into the kernel.
    ///
    /// The payload is applied to a copy of the current state, which replaces
    /// the live state only if every entry succeeds.
    ///
    /// # Errors
    ///
    /// Returns the first catalog, rule or role error in the payload; the
    /// kernel is left unchanged.
    pub fn apply_payload(&self, payload: &BootstrapPayload) -> AccessResult<()> {
        let mut state = self.state.write();
        let mut next = state.clone();
        next.apply(payload)?;
        next.version += 1;
        *state = next;

        tracing::info!(
            permissions = payload.permission_count(),
            rules = payload.rules.len(),
            roles = payload.roles.len(),
            version = state.version,
            "Bootstrap payload applied"
        );
        Ok(())
    }

    /// Get the kernel version, bumped by every successful mutation.
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    // ---- Catalog ----

    /// Register a permission in the catalog.
    ///
    /// # Errors
    ///
    /// See [`PermissionCatalog::register`].
    pub fn register_permission(
        &self,
        code: impl Into<String>,
        namespace: impl Into<String>,
        description: impl Into<String>,
    ) -> AccessResult<Permission> {
        let mut state = self.state.write();
        let permission = state.catalog.register(code, namespace, description)?.clone();
        state.version += 1;
        Ok(permission)
    }

    /// Check whether a code is registered.
    pub fn permission_exists(&self, code: &str) -> bool {
        self.state.read().catalog.exists(code)
    }

    /// List a namespace's permissions in registration order.
    pub fn list_by_namespace(&self, namespace: &str) -> Vec<Permission> {
        self.state
            .read()
            .catalog
            .list_by_namespace(namespace)
            .cloned()
            .collect()
    }

    /// Get the namespaces in first-registration order.
    pub fn namespaces(&self) -> Vec<String> {
        self.state.read().catalog.namespaces().to_vec()
    }

    // ---- Implications ----

    /// Add an implication rule.
    ///
    /// # Errors
    ///
    /// See [`ImplicationGraph::add_rule`].
    pub fn add_rule(&self, from: &str, to: &str) -> AccessResult<bool> {
        let mut state = self.state.write();
        let KernelState { catalog, graph, .. } = &mut *state;
        let inserted = graph.add_rule(catalog, from, to)?;
        if inserted {
            state.version += 1;
        }
        Ok(inserted)
    }

    /// Get all implication rules in insertion order.
    pub fn rules(&self) -> Vec<ImplicationRule> {
        self.state.read().graph.rules().to_vec()
    }

    /// Compute the implication closure of a set of codes.
    pub fn closure(&self, codes: &PermissionSet) -> PermissionSet {
        self.state.read().graph.closure(codes)
    }

    // ---- Roles ----

    /// Create a role.
    ///
    /// # Errors
    ///
    /// See [`RoleRegistry::create_role`].
    pub fn create_role(
        &self,
        name: impl Into<String>,
        permissions: PermissionSet,
        is_protected: bool,
    ) -> AccessResult<Role> {
        let mut state = self.state.write();
        let KernelState {
            catalog, registry, ..
        } = &mut *state;
        let role = registry
            .create_role(catalog, name, permissions, is_protected)?
            .clone();
        state.version += 1;
        Ok(role)
    }

    /// Replace a role's permission set.
    ///
    /// # Errors
    ///
    /// See [`RoleRegistry::edit_role`].
    pub fn edit_role(&self, role_id: Uuid, permissions: PermissionSet) -> AccessResult<Role> {
        let mut state = self.state.write();
        let KernelState {
            catalog, registry, ..
        } = &mut *state;
        let role = registry.edit_role(catalog, role_id, permissions)?.clone();
        state.version += 1;
        Ok(role)
    }

    /// Rename a role.
    ///
    /// # Errors
    ///
    /// See [`RoleRegistry::rename_role`].
    pub fn rename_role(&self, role_id: Uuid, name: impl Into<String>) -> AccessResult<Role> {
        let mut state = self.state.write();
        let role = state.registry.rename_role(role_id, name)?.clone();
        state.version += 1;
        Ok(role)
    }

    /// Delete a role nobody holds.
    ///
    /// # Errors
    ///
    /// See [`RoleRegistry::delete_role`].
    pub fn delete_role(&self, role_id: Uuid) -> AccessResult<Role> {
        let mut state = self.state.write();
        let KernelState {
            registry,
            assignments,
            ..
        } = &mut *state;
        let role = registry.delete_role(role_id, assignments)?;
        state.version += 1;
        Ok(role)
    }

    /// Get a role by ID.
    pub fn get_role(&self, role_id: Uuid) -> Option<Role> {
        self.state.read().registry.get_role(role_id).cloned()
    }

    /// Find a role by name (case-insensitive).
    pub fn find_role(&self, name: &str) -> Option<Role> {
        self.state.read().registry.find_by_name(name).cloned()
    }

    /// List roles in creation order.
    pub fn list_roles(&self) -> Vec<Role> {
        self.state
            .read()
            .registry
            .list_roles()
            .into_iter()
            .cloned()
            .collect()
    }

    // ---- Assignments ----

    /// Give a user a role.
    ///
    /// # Errors
    ///
    /// See [`RoleAssignments::assign_role`].
    pub fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> AccessResult<bool> {
        let mut state = self.state.write();
        let KernelState {
            registry,
            assignments,
            ..
        } = &mut *state;
        let inserted = assignments.assign_role(registry, user_id, role_id)?;
        if inserted {
            state.version += 1;
        }
        Ok(inserted)
    }

    /// Take a role away from a user.
    pub fn revoke_role(&self, user_id: Uuid, role_id: Uuid) -> bool {
        let mut state = self.state.write();
        let removed = state.assignments.revoke_role(user_id, role_id);
        if removed {
            state.version += 1;
        }
        removed
    }

    /// Replace every role a user holds.
    ///
    /// # Errors
    ///
    /// See [`RoleAssignments::set_roles`].
    pub fn set_user_roles(&self, user_id: Uuid, role_ids: &[Uuid]) -> AccessResult<UserRoleAssignment> {
        let mut state = self.state.write();
        let KernelState {
            registry,
            assignments,
            ..
        } = &mut *state;
        let assignment = assignments
            .set_roles(registry, user_id, role_ids.iter().copied())?
            .clone();
        state.version += 1;
        Ok(assignment)
    }

    /// Get the roles a user holds.
    pub fn user_roles(&self, user_id: Uuid) -> Vec<Uuid> {
        self.state.read().assignments.roles_for(user_id)
    }

    /// Get the users holding a role, e.g. to reassign them before a delete.
    pub fn role_holders(&self, role_id: Uuid) -> Vec<Uuid> {
        self.state.read().assignments.users_with_role(role_id)
    }

    // ---- Evaluation ----

    /// Resolve the effective permissions for a user holding `role_ids`.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user being resolved; part of the cache key only
    /// * `role_ids` - Roles to union, in any order and possibly repeated
    ///
    /// # Returns
    ///
    /// The union of the roles' permissions, closed under implication
    ///
    /// # Errors
    ///
    /// Returns [`crate::AccessError::UnknownRole`] if any role does not exist.
    pub fn effective_permissions(
        &self,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> AccessResult<Arc<PermissionSet>> {
        let state = self.state.read();
        self.resolver
            .effective_permissions(&state.registry, &state.graph, user_id, role_ids)
    }

    /// Resolve the effective permissions for a user's stored assignment.
    ///
    /// A user without an assignment has no permissions.
    pub fn user_permissions(&self, user_id: Uuid) -> AccessResult<Arc<PermissionSet>> {
        let state = self.state.read();
        let role_ids = state.assignments.roles_for(user_id);
        self.resolver
            .effective_permissions(&state.registry, &state.graph, user_id, &role_ids)
    }

    /// Check a query against an already-resolved permission set.
    pub fn check_access(&self, query: &AccessQuery, granted: &PermissionSet) -> bool {
        let state = self.state.read();
        AccessEvaluator::new(&state.catalog).check_access(query, granted)
    }

    /// Resolve a user's roles and check a query in one step.
    ///
    /// # Returns
    ///
    /// `true` to allow. Never fails: if the roles cannot be resolved, only
    /// public queries pass.
    pub fn check_user_access(&self, user_id: Uuid, role_ids: &[Uuid], query: &AccessQuery) -> bool {
        if query.is_public() {
            return true;
        }

        let state = self.state.read();
        match self
            .resolver
            .effective_permissions(&state.registry, &state.graph, user_id, role_ids)
        {
            Ok(granted) => AccessEvaluator::new(&state.catalog).check_access(query, &granted),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Denied access: roles could not be resolved");
                false
            }
        }
    }

    /// Check a query against a user's stored assignment.
    pub fn check_assigned_access(&self, user_id: Uuid, query: &AccessQuery) -> bool {
        let role_ids = self.user_roles(user_id);
        self.check_user_access(user_id, &role_ids, query)
    }

    /// Convert raw strings into a permission set of registered codes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AccessError::UnknownPermission`] for the first unregistered code.
    pub fn permission_set(&self, codes: &[&str]) -> AccessResult<PermissionSet> {
        let state = self.state.read();
        codes
            .iter()
            .map(|code| state.catalog.require(code).cloned())
            .collect::<AccessResult<PermissionSet>>()
    }
}

impl Default for AccessControl {
    fn default() -> Self {
        let config = KernelConfig::default();
        Self {
            state: RwLock::new(KernelState::new(&config)),
            resolver: RoleAssignmentResolver::new(config.effective_cache_capacity()),
        }
    }
}
