//! # Access Kernel
//!
//! A small role-based access-control kernel: a permission catalog, an
//! implication graph between permissions, a role registry with protected
//! roles, and an evaluator answering allow/deny queries.
//!
//! ## Overview
//!
//! The access-kernel crate handles:
//! - **Catalog**: Every known permission code, grouped by namespace
//! - **Implications**: "Granting A also grants B" rules, kept acyclic
//! - **Roles**: Named permission sets; protected roles cannot be deleted or renamed
//! - **Assignments**: Which roles each user holds
//! - **Resolution**: A user's effective permissions (union of roles, closed under implication)
//! - **Evaluation**: Public, single-code and any-of queries against a permission set
//!
//! ## Architecture
//!
//! ```text
//! RoleRegistry ─┐
//!               ├─→ RoleAssignmentResolver ─→ effective PermissionSet ─→ AccessEvaluator ─→ bool
//! ImplicationGraph ┘
//!
//! PermissionCatalog validates every code used by the graph and the registry.
//! AccessControl owns all of it behind a single read-write lock.
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use access_kernel::{AccessControl, AccessQuery, KernelConfig, PermissionSet};
//! use uuid::Uuid;
//!
//! let access = AccessControl::new(KernelConfig::default()).unwrap();
//! access.register_permission("user:view", "user", "View users").unwrap();
//! access.register_permission("user:edit", "user", "Edit users").unwrap();
//! access.add_rule("user:edit", "user:view").unwrap();
//!
//! let editor = access
//!     .create_role("Editor", access.permission_set(&["user:edit"]).unwrap(), false)
//!     .unwrap();
//!
//! let user = Uuid::now_v7();
//! let granted = access.effective_permissions(user, &[editor.id]).unwrap();
//! assert!(granted.has("user:view"));
//!
//! assert!(access.check_access(&AccessQuery::single("user:view"), &granted));
//! assert!(access.check_access(&AccessQuery::Public, &PermissionSet::new()));
//! ```
//!
//! ## Implied Permissions
//!
//! Implications are applied when effective permissions are resolved. A role's
//! stored permission set holds exactly what was saved, so a role granting
//! `user:edit` does not list `user:view` even though its holders receive it.
//!
//! ## Access Queries
//!
//! - `PUBLIC` always passes, even with nothing granted; it is reserved and
//!   cannot be registered as a permission code
//! - A single code passes iff it is granted
//! - A list passes iff any code in it is granted; an empty list never passes
//! - Unknown or malformed codes never pass, and evaluation never fails

pub mod assignments;
pub mod catalog;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod kernel;
pub mod permissions;
pub mod registry;
pub mod resolver;
mod version;

// Re-export main types for convenience
pub use assignments::{RoleAssignments, UserRoleAssignment};
pub use catalog::PermissionCatalog;
pub use config::{BootstrapPayload, KernelConfig, PermissionEntry, RoleEntry, RuleEntry};
pub use error::{AccessError, AccessResult};
pub use evaluator::{AccessEvaluator, AccessQuery};
pub use graph::{ImplicationGraph, ImplicationRule};
pub use kernel::AccessControl;
pub use permissions::{Permission, PermissionCode, PermissionSet, PUBLIC};
pub use registry::{Role, RoleRegistry};
pub use resolver::RoleAssignmentResolver;
