//! # Role Assignment Resolver
//!
//! Expands the roles a user holds into their effective permission set: the
//! union of every role's stored permissions, closed under the implication
//! graph.
//!
//! Results may be cached. Cache keys carry the registry and graph versions,
//! and the whole cache is dropped as soon as either version moves, so a
//! cached set is never older than the state it was computed from. Entries
//! never expire by time.
//!
//! Versions are process-wide stamps, not per-instance counters: two
//! registries report the same version only if one is an unmodified clone of
//! the other. A resolver handed different registries or graphs over its
//! lifetime therefore never serves one instance's result for another. It
//! does thrash, since each switch clears the cache, so keep one resolver per
//! registry and graph pair.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AccessError, AccessResult};
use crate::graph::ImplicationGraph;
use crate::permissions::PermissionSet;
use crate::registry::RoleRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    user_id: Uuid,
    role_ids: Vec<Uuid>,
    registry_version: u64,
    graph_version: u64,
}

struct ResolverCache {
    entries: LruCache<CacheKey, Arc<PermissionSet>>,
    /// Registry and graph versions the entries were computed against.
    versions: (u64, u64),
}

/// Resolves a user's roles into an effective permission set.
///
/// # Example
///
/// ```
/// use uuid::Uuid;
/// use access_kernel::{
///     ImplicationGraph, PermissionCatalog, PermissionSet, RoleAssignmentResolver, RoleRegistry,
/// };
///
/// let mut catalog = PermissionCatalog::new();
/// catalog.register("user:view", "user", "View users").unwrap();
/// catalog.register("user:edit", "user", "Edit users").unwrap();
///
/// let mut graph = ImplicationGraph::new();
/// graph.add_rule(&catalog, "user:edit", "user:view").unwrap();
///
/// let mut registry = RoleRegistry::new();
/// let editor = registry
///     .create_role(&catalog, "Editor", PermissionSet::from_strings(&["user:edit"]).unwrap(), false)
///     .unwrap()
///     .id;
///
/// let resolver = RoleAssignmentResolver::new(128);
/// let effective = resolver
///     .effective_permissions(&registry, &graph, Uuid::now_v7(), &[editor])
///     .unwrap();
/// assert!(effective.has("user:view"));
/// ```
pub struct RoleAssignmentResolver {
    cache: Option<Mutex<ResolverCache>>,
}

impl RoleAssignmentResolver {
    /// Create a resolver caching up to `capacity` results.
    ///
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        let cache = NonZeroUsize::new(capacity).map(|capacity| {
            Mutex::new(ResolverCache {
                entries: LruCache::new(capacity),
                versions: (0, 0),
            })
        });
        Self { cache }
    }

    /// Create a resolver that recomputes every request.
    pub fn uncached() -> Self {
        Self { cache: None }
    }

    /// Compute a user's effective permissions.
    ///
    /// Role order and duplicates in `role_ids` do not affect the result.
    ///
    /// # Arguments
    ///
    /// * `registry` - Source of each role's stored permissions
    /// * `graph` - Implications applied to the union
    /// * `user_id` - Only used to key the cache
    /// * `role_ids` - Roles the user holds
    ///
    /// # Returns
    ///
    /// A shared, possibly cached, permission set
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::UnknownRole`] if any role is not in `registry`.
    pub fn effective_permissions(
        &self,
        registry: &RoleRegistry,
        graph: &ImplicationGraph,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> AccessResult<Arc<PermissionSet>> {
        let mut role_ids = role_ids.to_vec();
        role_ids.sort_unstable();
        role_ids.dedup();

        let Some(cache) = &self.cache else {
            return resolve(registry, graph, &role_ids).map(Arc::new);
        };

        let versions = (registry.version(), graph.version());
        let key = CacheKey {
            user_id,
            role_ids,
            registry_version: versions.0,
            graph_version: versions.1,
        };

        {
            let mut cache = cache.lock();
            if cache.versions != versions {
                tracing::debug!(
                    registry_version = versions.0,
                    graph_version = versions.1,
                    evicted = cache.entries.len(),
                    "Permission cache invalidated"
                );
                cache.entries.clear();
                cache.versions = versions;
            }
            if let Some(hit) = cache.entries.get(&key) {
                tracing::trace!(user_id = %user_id, "Permission cache hit");
                return Ok(Arc::clone(hit));
            }
        }

        let effective = Arc::new(resolve(registry, graph, &key.role_ids)?);
        tracing::debug!(
            user_id = %user_id,
            roles = key.role_ids.len(),
            permissions = effective.len(),
            "Resolved effective permissions"
        );

        let mut cache = cache.lock();
        if cache.versions == versions {
            cache.entries.put(key, Arc::clone(&effective));
        }
        Ok(effective)
    }

    /// Get the number of cached results.
    pub fn cache_len(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.lock().entries.len())
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().entries.clear();
        }
    }
}

impl std::fmt::Debug for RoleAssignmentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleAssignmentResolver")
            .field("cached", &self.cache.is_some())
            .field("cache_len", &self.cache_len())
            .finish()
    }
}

/// Union the roles' permissions and close the result under implication.
///
/// # Errors
///
/// Returns [`AccessError::UnknownRole`] if any role is not in `registry`.
pub fn resolve(
    registry: &RoleRegistry,
    graph: &ImplicationGraph,
    role_ids: &[Uuid],
) -> AccessResult<PermissionSet> {
    let mut union = PermissionSet::new();
    for role_id in role_ids {
        let role = registry
            .get_role(*role_id)
            .ok_or(AccessError::UnknownRole(*role_id))?;
        union.merge(&role.permissions);
    }
    Ok(graph.closure(&union))
}
