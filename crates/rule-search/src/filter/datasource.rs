//! Resolution of data-source names (as typed in `datasource:` filters) to uids.

use std::collections::HashMap;
use std::sync::Arc;

use moka::sync::Cache;
use parking_lot::RwLock;

use crate::error::Result;

/// Looks up data sources by display name.
pub trait DataSourceRegistry: Send + Sync {
    /// Returns the uid of the named data source, or `None` if it is unknown.
    fn uid_for_name(&self, name: &str) -> Result<Option<String>>;
}

/// Registry backed by a map. Names are matched case-insensitively.
#[derive(Debug, Default)]
pub struct InMemoryDataSourceRegistry {
    by_name: RwLock<HashMap<String, String>>,
}

impl InMemoryDataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, uid: impl Into<String>) {
        let name: String = name.into();
        self.by_name.write().insert(name.to_lowercase(), uid.into());
    }
}

impl DataSourceRegistry for InMemoryDataSourceRegistry {
    fn uid_for_name(&self, name: &str) -> Result<Option<String>> {
        Ok(self.by_name.read().get(&name.to_lowercase()).cloned())
    }
}

/// Maps lists of names to uids, caching each distinct list.
///
/// The cache key is the sorted, de-duplicated name list, so `[a, b]` and
/// `[b, a, a]` share an entry. Failed lookups are not cached.
#[derive(Clone)]
pub struct DataSourceNameResolver {
    registry: Arc<dyn DataSourceRegistry>,
    cache: Cache<String, Arc<Vec<String>>>,
}

impl DataSourceNameResolver {
    pub fn new(registry: Arc<dyn DataSourceRegistry>, capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(capacity.max(1)).build();
        Self { registry, cache }
    }

    /// Resolves `names` to the uids of the data sources that exist.
    ///
    /// Unknown names are skipped; an empty result for a non-empty list means
    /// none of the names are known.
    pub fn resolve(&self, names: &[String]) -> Result<Arc<Vec<String>>> {
        let key = cache_key(names);
        if let Some(uids) = self.cache.get(&key) {
            return Ok(uids);
        }

        let mut uids = Vec::with_capacity(names.len());
        for name in names {
            match self.registry.uid_for_name(name) {
                Ok(Some(uid)) => {
                    if !uids.contains(&uid) {
                        uids.push(uid);
                    }
                }
                Ok(None) => {
                    tracing::debug!(name = name.as_str(), "unknown data source name");
                }
                Err(error) => {
                    tracing::warn!(name = name.as_str(), %error, "data source lookup failed");
                    return Err(error);
                }
            }
        }

        let uids = Arc::new(uids);
        self.cache.insert(key, Arc::clone(&uids));
        Ok(uids)
    }

    #[cfg(test)]
    fn cached_entries(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl std::fmt::Debug for DataSourceNameResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceNameResolver")
            .field("cached", &self.cache.entry_count())
            .finish()
    }
}

fn cache_key(names: &[String]) -> String {
    let mut sorted: Vec<&str> = names.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.join("\u{0}")
}
