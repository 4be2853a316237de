//! Error types for access-control operations
//!
//! Every mutation of the catalog, the implication graph, the role registry or
//! the assignment store reports failures through [`AccessError`]. All of them
//! are permanent, input-driven conditions: retrying the same request will not
//! succeed. Access checks never produce an error.

use thiserror::Error;
use uuid::Uuid;

/// Access-control error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// Permission code is already registered in the catalog
    #[error("Permission code already registered: {0}")]
    DuplicateCode(String),

    /// Permission code string is malformed
    #[error("Invalid permission code: {0:?}")]
    InvalidCode(String),

    /// Permission code is not registered in the catalog
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    /// Adding the implication rule would close a cycle
    #[error("Implication {from} -> {to} would create a cycle")]
    CycleDetected {
        /// Source of the rejected rule
        from: String,
        /// Target of the rejected rule
        to: String,
    },

    /// Another role already uses this name
    #[error("Role name already taken: {0}")]
    DuplicateRoleName(String),

    /// Role name is blank
    #[error("Invalid role name: {0:?}")]
    InvalidRoleName(String),

    /// Operation is not allowed on a protected role
    #[error("Role {0} is protected")]
    ProtectedRole(Uuid),

    /// Role is still assigned to users
    #[error("Role {role_id} is still assigned to {users} user(s)")]
    RoleInUse {
        /// The role that was to be deleted
        role_id: Uuid,
        /// Number of users still holding the role
        users: usize,
    },

    /// Role does not exist in the registry
    #[error("Unknown role: {0}")]
    UnknownRole(Uuid),

    /// Configuration or bootstrap payload error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for access-control operations.
pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// Check if this error was caused by the caller's input.
    ///
    /// Configuration errors happen at startup and are not the administrative
    /// caller's fault; everything else is.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AccessError::Config(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::InvalidCode(_)
            | AccessError::InvalidRoleName(_)
            | AccessError::UnknownPermission(_)
            | AccessError::CycleDetected { .. } => 400,

            AccessError::ProtectedRole(_) => 403,
            AccessError::UnknownRole(_) => 404,

            AccessError::DuplicateCode(_)
            | AccessError::DuplicateRoleName(_)
            | AccessError::RoleInUse { .. } => 409,

            AccessError::Config(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::DuplicateCode(_) => "DUPLICATE_CODE",
            AccessError::InvalidCode(_) => "INVALID_CODE",
            AccessError::UnknownPermission(_) => "UNKNOWN_PERMISSION",
            AccessError::CycleDetected { .. } => "CYCLE_DETECTED",
            AccessError::DuplicateRoleName(_) => "DUPLICATE_ROLE_NAME",
            AccessError::InvalidRoleName(_) => "INVALID_ROLE_NAME",
            AccessError::ProtectedRole(_) => "PROTECTED_ROLE",
            AccessError::RoleInUse { .. } => "ROLE_IN_USE",
            AccessError::UnknownRole(_) => "UNKNOWN_ROLE",
            AccessError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<serde_json::Error> for AccessError {
    fn from(err: serde_json::Error) -> Self {
        AccessError::Config(err.to_string())
    }
}
