//! User role assignments
//!
//! This module links users to the roles they hold. A user may hold several
//! roles at once; their effective permissions are the union of every held
//! role, closed under implication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::error::{AccessError, AccessResult};
use crate::registry::RoleRegistry;

/// The set of roles held by one user.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use access_kernel::UserRoleAssignment;
///
/// let user_id = Uuid::now_v7();
/// let assignment = UserRoleAssignment::new(user_id);
/// assert!(assignment.role_ids.is_empty());
/// assert_eq!(assignment.version, 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRoleAssignment {
    /// User ID
    pub user_id: Uuid,

    /// Held roles, kept sorted
    pub role_ids: BTreeSet<Uuid>,

    /// Bumped on every change to this user's roles
    pub version: u64,

    /// When the assignment last changed
    pub updated_at: DateTime<Utc>,
}

impl UserRoleAssignment {
    /// Creates an assignment with no roles.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            role_ids: BTreeSet::new(),
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Check if the user holds a role.
    pub fn has_role(&self, role_id: Uuid) -> bool {
        self.role_ids.contains(&role_id)
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

/// Store of user role assignments.
#[derive(Debug, Clone, Default)]
pub struct RoleAssignments {
    users: HashMap<Uuid, UserRoleAssignment>,
}

impl RoleAssignments {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Give a user a role.
    ///
    /// # Returns
    ///
    /// `true` if the user did not already hold the role
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::UnknownRole`] if the role is not in `registry`.
    pub fn assign_role(
        &mut self,
        registry: &RoleRegistry,
        user_id: Uuid,
        role_id: Uuid,
    ) -> AccessResult<bool> {
        if !registry.contains(role_id) {
            return Err(AccessError::UnknownRole(role_id));
        }

        let assignment = self
            .users
            .entry(user_id)
            .or_insert_with(|| UserRoleAssignment::new(user_id));

        let inserted = assignment.role_ids.insert(role_id);
        if inserted {
            assignment.touch();
            tracing::debug!(user_id = %user_id, role_id = %role_id, "Role assigned");
        }
        Ok(inserted)
    }

    /// Take a role away from a user.
    ///
    /// # Returns
    ///
    /// `true` if the user held the role
    pub fn revoke_role(&mut self, user_id: Uuid, role_id: Uuid) -> bool {
        let Some(assignment) = self.users.get_mut(&user_id) else {
            return false;
        };

        let removed = assignment.role_ids.remove(&role_id);
        if removed {
            assignment.touch();
            tracing::debug!(user_id = %user_id, role_id = %role_id, "Role revoked");
        }
        removed
    }

    /// Replace every role a user holds.
    ///
    /// Nothing changes unless every role exists.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::UnknownRole`] for the first role not in `registry`.
    pub fn set_roles<I>(
        &mut self,
        registry: &RoleRegistry,
        user_id: Uuid,
        role_ids: I,
    ) -> AccessResult<&UserRoleAssignment>
    where
        I: IntoIterator<Item = Uuid>,
    {
        let role_ids: BTreeSet<Uuid> = role_ids.into_iter().collect();
        if let Some(missing) = role_ids.iter().find(|id| !registry.contains(**id)) {
            return Err(AccessError::UnknownRole(*missing));
        }

        let assignment = self
            .users
            .entry(user_id)
            .or_insert_with(|| UserRoleAssignment::new(user_id));

        if assignment.role_ids != role_ids {
            assignment.role_ids = role_ids;
            assignment.touch();
        }
        Ok(assignment)
    }

    /// Get a user's assignment.
    pub fn get(&self, user_id: Uuid) -> Option<&UserRoleAssignment> {
        self.users.get(&user_id)
    }

    /// Get the roles a user holds (empty for unknown users).
    pub fn roles_for(&self, user_id: Uuid) -> Vec<Uuid> {
        self.users
            .get(&user_id)
            .map(|a| a.role_ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Get the users holding a role.
    pub fn users_with_role(&self, role_id: Uuid) -> Vec<Uuid> {
        self.users
            .values()
            .filter(|a| a.has_role(role_id))
            .map(|a| a.user_id)
            .collect()
    }

    /// Count the users holding a role.
    pub fn holder_count(&self, role_id: Uuid) -> usize {
        self.users.values().filter(|a| a.has_role(role_id)).count()
    }

    /// Get the number of users with an assignment record.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PermissionCatalog;
    use crate::permissions::PermissionSet;

    fn registry_with(names: &[&str]) -> (RoleRegistry, Vec<Uuid>) {
        let catalog = PermissionCatalog::new();
        let mut registry = RoleRegistry::new();
        let ids = names
            .iter()
            .map(|name| {
                registry
                    .create_role(&catalog, *name, PermissionSet::new(), false)
                    .unwrap()
                    .id
            })
            .collect();
        (registry, ids)
    }

    #[test]
    fn test_assign_and_revoke() {
        let (registry, ids) = registry_with(&["Viewer", "Editor"]);
        let mut assignments = RoleAssignments::new();
        let user = Uuid::now_v7();

        assert!(assignments.assign_role(&registry, user, ids[0]).unwrap());
        assert!(!assignments.assign_role(&registry, user, ids[0]).unwrap());
        assert!(assignments.assign_role(&registry, user, ids[1]).unwrap());
        assert_eq!(assignments.get(user).unwrap().version, 2);
        assert_eq!(assignments.roles_for(user).len(), 2);

        assert!(assignments.revoke_role(user, ids[0]));
        assert!(!assignments.revoke_role(user, ids[0]));
        assert_eq!(assignments.roles_for(user), vec![ids[1]]);
        assert_eq!(assignments.get(user).unwrap().version, 3);
    }

    #[test]
    fn test_assign_unknown_role() {
        let (registry, _) = registry_with(&[]);
        let mut assignments = RoleAssignments::new();
        let role = Uuid::now_v7();
        assert_eq!(
            assignments
                .assign_role(&registry, Uuid::now_v7(), role)
                .unwrap_err(),
            AccessError::UnknownRole(role)
        );
        assert!(assignments.is_empty());
    }

    #[test]
    fn test_set_roles() {
        let (registry, ids) = registry_with(&["Viewer", "Editor"]);
        let mut assignments = RoleAssignments::new();
        let user = Uuid::now_v7();

        let assignment = assignments
            .set_roles(&registry, user, ids.clone())
            .unwrap();
        assert_eq!(assignment.role_ids.len(), 2);
        assert_eq!(assignment.version, 1);

        // Same set again leaves the version alone.
        let assignment = assignments.set_roles(&registry, user, ids.clone()).unwrap();
        assert_eq!(assignment.version, 1);

        let missing = Uuid::now_v7();
        assert!(assignments
            .set_roles(&registry, user, vec![ids[0], missing])
            .is_err());
        assert_eq!(assignments.roles_for(user).len(), 2);
    }

    #[test]
    fn test_role_usage() {
        let (registry, ids) = registry_with(&["Viewer", "Editor"]);
        let mut assignments = RoleAssignments::new();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();

        assignments.assign_role(&registry, alice, ids[0]).unwrap();
        assignments.assign_role(&registry, bob, ids[0]).unwrap();

        assert_eq!(assignments.holder_count(ids[0]), 2);
        assert_eq!(assignments.holder_count(ids[1]), 0);
        assert_eq!(assignments.users_with_role(ids[0]).len(), 2);
        assert!(assignments.roles_for(Uuid::now_v7()).is_empty());
    }
}
