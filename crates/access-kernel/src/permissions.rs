//! # Permissions
//!
//! Core permission types: the opaque [`PermissionCode`], the catalog entry
//! [`Permission`], and [`PermissionSet`], the set of codes granted to a role
//! or a user.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use crate::error::{AccessError, AccessResult};

/// Sentinel string marking an access query that anyone may pass.
///
/// Reserved: no permission code may be spelled this way.
pub const PUBLIC: &str = "PUBLIC";

/// An opaque, namespaced permission identifier.
///
/// Codes are validated on construction: they must be non-empty, may not
/// contain whitespace or control characters, and may not be the reserved
/// [`PUBLIC`] sentinel. Any namespacing convention
/// (`"PASSENGERS.GET_PASSENGERS"`, `"user:view"`) is accepted.
///
/// # Example
///
/// ```
/// use access_kernel::PermissionCode;
///
/// let code = PermissionCode::new("user:view").unwrap();
/// assert_eq!(code.as_str(), "user:view");
///
/// assert!(PermissionCode::new("").is_err());
/// assert!(PermissionCode::new("user view").is_err());
/// assert!(PermissionCode::new("PUBLIC").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode(String);

impl PermissionCode {
    /// Create a validated permission code.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvalidCode`] for an empty string, one that
    /// contains whitespace or control characters, or the [`PUBLIC`] sentinel.
    pub fn new(code: impl Into<String>) -> AccessResult<Self> {
        let code = code.into();
        if Self::is_well_formed(&code) {
            Ok(Self(code))
        } else {
            Err(AccessError::InvalidCode(code))
        }
    }

    /// Check whether a string would be accepted as a permission code.
    pub fn is_well_formed(code: &str) -> bool {
        !code.is_empty()
            && code != PUBLIC
            && !code
                .chars()
                .any(|c| c.is_whitespace() || c.is_control())
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PermissionCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PermissionCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = AccessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for PermissionCode {
    type Error = AccessError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionCode> for String {
    fn from(code: PermissionCode) -> Self {
        code.0
    }
}

/// A registered permission: a code plus its namespace and description.
///
/// Permissions are created when the catalog is loaded and are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    /// Unique permission code.
    pub code: PermissionCode,
    /// Namespace the permission is listed under (e.g. `"PASSENGERS"`).
    pub namespace: String,
    /// Human-readable description for administration screens.
    pub description: String,
}

impl Permission {
    /// Create a new permission entry.
    pub fn new(
        code: PermissionCode,
        namespace: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            code,
            namespace: namespace.into(),
            description: description.into(),
        }
    }
}

/// A set of permission codes assigned to a role or granted to a user.
///
/// Lookups accept plain string slices, so callers holding raw codes do not
/// need to validate them first; a malformed string is simply never a member.
///
/// # Example
///
/// ```
/// use access_kernel::PermissionSet;
///
/// let set = PermissionSet::from_strings(&["user:view", "user:edit"]).unwrap();
/// assert!(set.has("user:view"));
/// assert!(!set.has("user:delete"));
/// assert_eq!(set.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    permissions: HashSet<PermissionCode>,
}

impl PermissionSet {
    /// Create a new empty permission set.
    pub fn new() -> Self {
        Self {
            permissions: HashSet::new(),
        }
    }

    /// Add a permission to the set.
    ///
    /// # Returns
    ///
    /// `true` if the code was not already present
    pub fn add(&mut self, code: PermissionCode) -> bool {
        self.permissions.insert(code)
    }

    /// Remove a permission from the set.
    ///
    /// # Returns
    ///
    /// `true` if the permission was present, `false` otherwise
    pub fn remove(&mut self, code: &str) -> bool {
        self.permissions.remove(code)
    }

    /// Check if the set contains a permission code.
    pub fn has(&self, code: &str) -> bool {
        self.permissions.contains(code)
    }

    /// Iterate over the codes in the set (unspecified order).
    pub fn iter(&self) -> impl Iterator<Item = &PermissionCode> {
        self.permissions.iter()
    }

    /// Get all codes sorted lexicographically.
    pub fn sorted(&self) -> Vec<&PermissionCode> {
        let mut codes: Vec<_> = self.permissions.iter().collect();
        codes.sort();
        codes
    }

    /// Merge another permission set into this one.
    ///
    /// # Arguments
    ///
    /// * `other` - Codes to add; `other` itself is left untouched
    pub fn merge(&mut self, other: &PermissionSet) {
        self.permissions.extend(other.permissions.iter().cloned());
    }

    /// Create from a list of code strings.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvalidCode`] for the first malformed code.
    pub fn from_strings(codes: &[&str]) -> AccessResult<Self> {
        codes
            .iter()
            .map(|code| PermissionCode::new(*code))
            .collect()
    }

    /// Get the count of permissions.
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Check if this set contains all permissions from another set.
    ///
    /// # Returns
    ///
    /// `true` if `other` is a subset of this set; an empty `other` always is
    pub fn contains_all(&self, other: &PermissionSet) -> bool {
        other.permissions.is_subset(&self.permissions)
    }

    /// Check if this set contains any permission from another set.
    pub fn contains_any(&self, other: &PermissionSet) -> bool {
        !self.permissions.is_disjoint(&other.permissions)
    }
}

impl FromIterator<PermissionCode> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = PermissionCode>>(iter: T) -> Self {
        Self {
            permissions: iter.into_iter().collect(),
        }
    }
}

impl Extend<PermissionCode> for PermissionSet {
    fn extend<T: IntoIterator<Item = PermissionCode>>(&mut self, iter: T) {
        self.permissions.extend(iter);
    }
}

impl IntoIterator for PermissionSet {
    type Item = PermissionCode;
    type IntoIter = std::collections::hash_set::IntoIter<PermissionCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.permissions.into_iter()
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a PermissionCode;
    type IntoIter = std::collections::hash_set::Iter<'a, PermissionCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.permissions.iter()
    }
}
