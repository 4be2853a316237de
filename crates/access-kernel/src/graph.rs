//! # Implication Graph
//!
//! Directed graph of "granting A also grants B" rules over catalog codes.
//! The graph is kept acyclic at insertion time, which keeps the closure both
//! terminating and meaningful.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::catalog::PermissionCatalog;
use crate::error::{AccessError, AccessResult};
use crate::permissions::{PermissionCode, PermissionSet};
use crate::version;

/// A single implication: granting `from` also grants `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImplicationRule {
    /// The granting permission.
    pub from: PermissionCode,
    /// The implied permission.
    pub to: PermissionCode,
}

/// Acyclic implication graph.
///
/// # Example
///
/// ```
/// use access_kernel::{ImplicationGraph, PermissionCatalog, PermissionSet};
///
/// let mut catalog = PermissionCatalog::new();
/// catalog.register("user:view", "user", "View users").unwrap();
/// catalog.register("user:edit", "user", "Edit users").unwrap();
///
/// let mut graph = ImplicationGraph::new();
/// graph.add_rule(&catalog, "user:edit", "user:view").unwrap();
///
/// let seed = PermissionSet::from_strings(&["user:edit"]).unwrap();
/// let closed = graph.closure(&seed);
/// assert!(closed.has("user:edit"));
/// assert!(closed.has("user:view"));
///
/// assert!(graph.add_rule(&catalog, "user:view", "user:edit").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImplicationGraph {
    /// Outgoing edges per code, in insertion order.
    edges: HashMap<PermissionCode, Vec<PermissionCode>>,
    /// All rules in insertion order.
    rules: Vec<ImplicationRule>,
    /// Fresh stamp taken on every inserted rule.
    version: u64,
}

impl ImplicationGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an implication rule.
    ///
    /// Adding a rule that is already present succeeds without changing the
    /// graph.
    ///
    /// # Returns
    ///
    /// `true` if the rule was inserted, `false` if it already existed
    ///
    /// # Errors
    ///
    /// - [`AccessError::UnknownPermission`] if either endpoint is not in `catalog`
    /// - [`AccessError::CycleDetected`] if `from` is reachable from `to`
    pub fn add_rule(
        &mut self,
        catalog: &PermissionCatalog,
        from: &str,
        to: &str,
    ) -> AccessResult<bool> {
        let from = catalog.require(from)?.clone();
        let to = catalog.require(to)?.clone();

        if self
            .edges
            .get(&from)
            .is_some_and(|targets| targets.contains(&to))
        {
            return Ok(false);
        }

        if self.reaches(to.as_str(), from.as_str()) {
            return Err(AccessError::CycleDetected {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        tracing::debug!(from = %from, to = %to, "Added implication rule");

        self.edges.entry(from.clone()).or_default().push(to.clone());
        self.rules.push(ImplicationRule { from, to });
        self.version = version::next();
        Ok(true)
    }

    /// Compute the implication closure of a set of codes.
    ///
    /// Each node is visited at most once, so the cost is linear in the seed
    /// size plus the number of edges reached.
    ///
    /// # Arguments
    ///
    /// * `codes` - The seed set, typically the union of a user's roles
    ///
    /// # Returns
    ///
    /// The smallest superset of `codes` closed under every rule
    pub fn closure(&self, codes: &PermissionSet) -> PermissionSet {
        let mut visited: HashSet<&PermissionCode> = HashSet::with_capacity(codes.len());
        let mut queue: VecDeque<&PermissionCode> = VecDeque::new();

        for code in codes {
            if visited.insert(code) {
                queue.push_back(code);
            }
        }

        while let Some(code) = queue.pop_front() {
            for next in self.edges.get(code).into_iter().flatten() {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        visited.into_iter().cloned().collect()
    }

    /// Check whether granting `from` grants `to`, directly or transitively.
    ///
    /// Every code implies itself.
    pub fn implies(&self, from: &str, to: &str) -> bool {
        self.reaches(from, to)
    }

    /// Get the graph version.
    ///
    /// Zero for an empty graph. Every inserted rule takes a new process-wide
    /// stamp, so versions increase but are not consecutive.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Get all rules in insertion order.
    pub fn rules(&self) -> &[ImplicationRule] {
        &self.rules
    }

    /// Get the number of rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Check if the graph has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn reaches(&self, start: &str, target: &str) -> bool {
        if start == target {
            return true;
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([start]);
        visited.insert(start);

        while let Some(code) = queue.pop_front() {
            for next in self.edges.get(code).into_iter().flatten() {
                let next = next.as_str();
                if next == target {
                    return true;
                }
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(codes: &[&str]) -> PermissionCatalog {
        let mut catalog = PermissionCatalog::new();
        for code in codes {
            catalog.register(*code, "test", "").unwrap();
        }
        catalog
    }

    fn set(codes: &[&str]) -> PermissionSet {
        PermissionSet::from_strings(codes).unwrap()
    }

    #[test]
    fn test_closure_is_reflexive() {
        let catalog = catalog(&["a"]);
        let graph = ImplicationGraph::new();
        assert!(catalog.exists("a"));
        assert_eq!(graph.closure(&set(&["a"])), set(&["a"]));
    }

    #[test]
    fn test_closure_is_transitive() {
        let catalog = catalog(&["a", "b", "c", "d"]);
        let mut graph = ImplicationGraph::new();
        graph.add_rule(&catalog, "a", "b").unwrap();
        graph.add_rule(&catalog, "b", "c").unwrap();

        assert_eq!(graph.closure(&set(&["a"])), set(&["a", "b", "c"]));
        assert_eq!(graph.closure(&set(&["b"])), set(&["b", "c"]));
        assert_eq!(graph.closure(&set(&["d"])), set(&["d"]));
    }

    #[test]
    fn test_closure_diamond() {
        let catalog = catalog(&["admin", "edit", "delete", "view"]);
        let mut graph = ImplicationGraph::new();
        graph.add_rule(&catalog, "admin", "edit").unwrap();
        graph.add_rule(&catalog, "admin", "delete").unwrap();
        graph.add_rule(&catalog, "edit", "view").unwrap();
        graph.add_rule(&catalog, "delete", "view").unwrap();

        assert_eq!(
            graph.closure(&set(&["admin"])),
            set(&["admin", "edit", "delete", "view"])
        );
        assert_eq!(graph.closure(&PermissionSet::new()), PermissionSet::new());
    }

    #[test]
    fn test_cycle_detected() {
        let catalog = catalog(&["a", "b", "c"]);
        let mut graph = ImplicationGraph::new();
        graph.add_rule(&catalog, "a", "b").unwrap();
        graph.add_rule(&catalog, "b", "c").unwrap();

        let err = graph.add_rule(&catalog, "b", "a").unwrap_err();
        assert_eq!(
            err,
            AccessError::CycleDetected {
                from: "b".into(),
                to: "a".into()
            }
        );
        assert!(graph.add_rule(&catalog, "c", "a").is_err());
        assert_eq!(graph.rule_count(), 2);
    }

    #[test]
    fn test_self_loop_rejected() {
        let catalog = catalog(&["a"]);
        let mut graph = ImplicationGraph::new();
        assert!(matches!(
            graph.add_rule(&catalog, "a", "a"),
            Err(AccessError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_unknown_endpoints() {
        let catalog = catalog(&["a"]);
        let mut graph = ImplicationGraph::new();
        assert_eq!(
            graph.add_rule(&catalog, "a", "missing").unwrap_err(),
            AccessError::UnknownPermission("missing".into())
        );
        assert_eq!(
            graph.add_rule(&catalog, "missing", "a").unwrap_err(),
            AccessError::UnknownPermission("missing".into())
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn test_duplicate_rule_is_noop() {
        let catalog = catalog(&["a", "b"]);
        let mut graph = ImplicationGraph::new();
        assert_eq!(graph.version(), 0);
        assert!(graph.add_rule(&catalog, "a", "b").unwrap());
        let version = graph.version();
        assert!(version > 0);
        assert!(!graph.add_rule(&catalog, "a", "b").unwrap());
        assert_eq!(graph.rule_count(), 1);
        assert_eq!(graph.version(), version);
        assert_eq!(graph.rules()[0].from.as_str(), "a");
    }

    #[test]
    fn test_implies() {
        let catalog = catalog(&["a", "b", "c"]);
        let mut graph = ImplicationGraph::new();
        graph.add_rule(&catalog, "a", "b").unwrap();
        graph.add_rule(&catalog, "b", "c").unwrap();

        assert!(graph.implies("a", "c"));
        assert!(graph.implies("c", "c"));
        assert!(!graph.implies("c", "a"));
    }
}
