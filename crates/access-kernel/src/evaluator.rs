//! # Access Evaluator
//!
//! Answers allow/deny questions against an already-resolved permission set.
//!
//! Queries come from rendering and route-guard code, so evaluation is total:
//! unknown or malformed codes are simply never granted, and nothing here
//! returns an error.

use serde::{Deserialize, Serialize};

use crate::catalog::PermissionCatalog;
use crate::permissions::{PermissionSet, PUBLIC};

/// What a caller needs in order to be allowed through.
///
/// Serialized as the string `"PUBLIC"`, a single code string, or an array of
/// codes. `PUBLIC` is reserved and can never be registered as a code, so the
/// sentinel and a single code never collide.
///
/// # Example
///
/// ```
/// use access_kernel::AccessQuery;
///
/// let query: AccessQuery = serde_json::from_str("\"PUBLIC\"").unwrap();
/// assert_eq!(query, AccessQuery::Public);
///
/// let query: AccessQuery = serde_json::from_str("[\"user:view\", \"user:edit\"]").unwrap();
/// assert_eq!(query, AccessQuery::any_of(["user:view", "user:edit"]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawQuery", into = "RawQuery")]
pub enum AccessQuery {
    /// Always allowed, whatever is granted.
    Public,
    /// Allowed iff this code is granted.
    Single(String),
    /// Allowed iff at least one of these codes is granted. Empty denies.
    AnyOf(Vec<String>),
}

impl AccessQuery {
    /// Query for a single code.
    ///
    /// The [`PUBLIC`] sentinel yields [`AccessQuery::Public`], the same as
    /// parsing it from JSON.
    pub fn single(code: impl Into<String>) -> Self {
        let code: String = code.into();
        code.into()
    }

    /// Query passing if any of the codes is granted.
    pub fn any_of<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AccessQuery::AnyOf(codes.into_iter().map(Into::into).collect())
    }

    /// Check if this is the public sentinel.
    pub fn is_public(&self) -> bool {
        matches!(self, AccessQuery::Public)
    }
}

impl From<&str> for AccessQuery {
    fn from(code: &str) -> Self {
        code.to_string().into()
    }
}

impl From<String> for AccessQuery {
    fn from(code: String) -> Self {
        if code == PUBLIC {
            AccessQuery::Public
        } else {
            AccessQuery::Single(code)
        }
    }
}

impl From<Vec<String>> for AccessQuery {
    fn from(codes: Vec<String>) -> Self {
        AccessQuery::AnyOf(codes)
    }
}

impl From<Vec<&str>> for AccessQuery {
    fn from(codes: Vec<&str>) -> Self {
        AccessQuery::any_of(codes)
    }
}

impl From<&[&str]> for AccessQuery {
    fn from(codes: &[&str]) -> Self {
        AccessQuery::any_of(codes.iter().copied())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawQuery {
    One(String),
    Many(Vec<String>),
}

impl From<RawQuery> for AccessQuery {
    fn from(raw: RawQuery) -> Self {
        match raw {
            RawQuery::One(code) => code.into(),
            RawQuery::Many(codes) => codes.into(),
        }
    }
}

impl From<AccessQuery> for RawQuery {
    fn from(query: AccessQuery) -> Self {
        match query {
            AccessQuery::Public => RawQuery::One(PUBLIC.to_string()),
            AccessQuery::Single(code) => RawQuery::One(code),
            AccessQuery::AnyOf(codes) => RawQuery::Many(codes),
        }
    }
}

/// Evaluates access queries against granted permission sets.
///
/// Only codes registered in the catalog can ever be granted.
///
/// # Example
///
/// ```
/// use access_kernel::{AccessEvaluator, AccessQuery, PermissionCatalog, PermissionSet};
///
/// let mut catalog = PermissionCatalog::new();
/// catalog.register("X", "demo", "").unwrap();
/// catalog.register("Y", "demo", "").unwrap();
///
/// let evaluator = AccessEvaluator::new(&catalog);
/// let granted = PermissionSet::from_strings(&["Y"]).unwrap();
///
/// assert!(evaluator.check_access(&AccessQuery::any_of(["X", "Y"]), &granted));
/// assert!(!evaluator.check_access(&AccessQuery::any_of(["X", "Z"]), &granted));
/// assert!(evaluator.check_access(&AccessQuery::Public, &PermissionSet::new()));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AccessEvaluator<'a> {
    catalog: &'a PermissionCatalog,
}

impl<'a> AccessEvaluator<'a> {
    /// Create an evaluator over a catalog.
    pub fn new(catalog: &'a PermissionCatalog) -> Self {
        Self { catalog }
    }

    /// Decide whether `granted` satisfies `query`.
    ///
    /// - `Public` always allows, even with nothing granted.
    /// - `Single` allows iff the code is granted.
    /// - `AnyOf` allows iff any code is granted, stopping at the first match;
    ///   an empty list denies.
    ///
    /// # Arguments
    ///
    /// * `query` - What the caller needs
    /// * `granted` - An already-resolved set, normally closed under implication
    ///
    /// # Returns
    ///
    /// `true` to allow. Unknown or malformed codes are never granted.
    pub fn check_access(&self, query: &AccessQuery, granted: &PermissionSet) -> bool {
        let allowed = match query {
            AccessQuery::Public => true,
            AccessQuery::Single(code) => self.is_granted(code, granted),
            AccessQuery::AnyOf(codes) => codes.iter().any(|code| self.is_granted(code, granted)),
        };

        tracing::trace!(?query, allowed, "Access evaluated");
        allowed
    }

    fn is_granted(&self, code: &str, granted: &PermissionSet) -> bool {
        self.catalog.exists(code) && granted.has(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PermissionCatalog {
        let mut catalog = PermissionCatalog::new();
        for code in ["X", "Y", "Z"] {
            catalog.register(code, "demo", "").unwrap();
        }
        catalog
    }

    fn granted(codes: &[&str]) -> PermissionSet {
        PermissionSet::from_strings(codes).unwrap()
    }

    #[test]
    fn test_public_always_allows() {
        let catalog = catalog();
        let evaluator = AccessEvaluator::new(&catalog);
        assert!(evaluator.check_access(&AccessQuery::Public, &PermissionSet::new()));
        assert!(evaluator.check_access(&AccessQuery::Public, &granted(&["X"])));
        assert!(evaluator.check_access(&"PUBLIC".into(), &PermissionSet::new()));
    }

    #[test]
    fn test_single_code() {
        let catalog = catalog();
        let evaluator = AccessEvaluator::new(&catalog);
        let set = granted(&["Y"]);
        assert!(evaluator.check_access(&"Y".into(), &set));
        assert!(!evaluator.check_access(&"X".into(), &set));
    }

    #[test]
    fn test_any_of_is_logical_or() {
        let catalog = catalog();
        let evaluator = AccessEvaluator::new(&catalog);
        let set = granted(&["Y"]);
        assert!(evaluator.check_access(&vec!["X", "Y"].into(), &set));
        assert!(evaluator.check_access(&vec!["Y", "X"].into(), &set));
        assert!(!evaluator.check_access(&vec!["X", "Z"].into(), &set));
    }

    #[test]
    fn test_empty_list_denies() {
        let catalog = catalog();
        let evaluator = AccessEvaluator::new(&catalog);
        let empty: Vec<String> = Vec::new();
        assert!(!evaluator.check_access(&empty.into(), &granted(&["X", "Y", "Z"])));
    }

    #[test]
    fn test_unknown_and_malformed_codes_deny() {
        let catalog = catalog();
        let evaluator = AccessEvaluator::new(&catalog);

        // Granted but never registered.
        let set = granted(&["X", "GHOST"]);
        assert!(!evaluator.check_access(&"GHOST".into(), &set));
        assert!(!evaluator.check_access(&"".into(), &set));
        assert!(!evaluator.check_access(&"not a code".into(), &set));
        assert!(evaluator.check_access(&vec!["GHOST", "X"].into(), &set));
    }

    #[test]
    fn test_query_serde() {
        let single: AccessQuery = serde_json::from_str("\"X\"").unwrap();
        assert_eq!(single, AccessQuery::single("X"));

        let empty: AccessQuery = serde_json::from_str("[]").unwrap();
        assert_eq!(empty, AccessQuery::AnyOf(Vec::new()));

        assert_eq!(
            serde_json::to_string(&AccessQuery::Public).unwrap(),
            "\"PUBLIC\""
        );
        assert_eq!(
            serde_json::to_string(&AccessQuery::any_of(["X", "Y"])).unwrap(),
            "[\"X\",\"Y\"]"
        );
        assert!(serde_json::from_str::<AccessQuery>("42").is_err());
    }

    #[test]
    fn test_public_constructors_agree() {
        assert_eq!(AccessQuery::single(PUBLIC), AccessQuery::Public);
        assert_eq!(AccessQuery::from(PUBLIC), AccessQuery::Public);
        assert_eq!(AccessQuery::single("X"), AccessQuery::Single("X".into()));
    }

    #[test]
    fn test_public_decision_survives_serde() {
        let mut catalog = catalog();
        assert_eq!(
            catalog.register(PUBLIC, "demo", "").unwrap_err(),
            crate::error::AccessError::InvalidCode(PUBLIC.into())
        );
        let evaluator = AccessEvaluator::new(&catalog);
        let nothing = PermissionSet::new();

        for query in [AccessQuery::single(PUBLIC), AccessQuery::single("X")] {
            let before = evaluator.check_access(&query, &nothing);
            let json = serde_json::to_string(&query).unwrap();
            let parsed: AccessQuery = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, query);
            assert_eq!(evaluator.check_access(&parsed, &nothing), before);
        }
    }
}
