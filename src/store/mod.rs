//! # Parameter Store
//!
//! Dictionary-like, read-only access to a hierarchical [`ConfigBackend`].
//!
//! A store is scoped to a prefix (ie. `/prod/`). The first read enumerates
//! every key below that prefix and builds a [`KeyTree`]; after that:
//! - reading a leaf fetches its value once and caches it per [`CacheTtl`]
//! - reading a prefix returns a child store (substore) built from the
//!   already-known subtree, so no further listing is needed
//!
//! ```rust,ignore
//! let backend = Arc::new(SsmBackend::new(Some("eu-west-1"), 50).await);
//! let mut store = ParameterStore::new(backend, Some("/prod"), CacheTtl::from_secs(60));
//! let host = store.get("db").await?.into_store()?.get("host").await?.into_value()?;
//! ```

use crate::backend::ConfigBackend;
use crate::constants::PATH_SEPARATOR;
use crate::error::{Result, StoreError};
use crate::observability::metrics;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info};

mod tree;
mod ttl;
mod value;

pub use tree::{KeyTree, Node, ParameterEntry};
pub use ttl::CacheTtl;
pub use value::ParameterValue;

/// Outcome of resolving a local name
#[derive(Debug)]
pub enum Resolved<'a> {
    /// The name is a parameter; `name` is its absolute key
    Value { name: String, value: ParameterValue },
    /// The name is a prefix; the substore is owned by the parent store
    SubStore(&'a mut ParameterStore),
}

impl<'a> Resolved<'a> {
    /// Unwrap a parameter value, failing if the name was a prefix
    pub fn into_value(self) -> Result<ParameterValue> {
        match self {
            Resolved::Value { value, .. } => Ok(value),
            Resolved::SubStore(store) => Err(StoreError::UnexpectedKind {
                name: store.prefix().to_string(),
                expected: "parameter",
                found: "prefix",
            }),
        }
    }

    /// Unwrap a substore, failing if the name was a parameter
    pub fn into_store(self) -> Result<&'a mut ParameterStore> {
        match self {
            Resolved::SubStore(store) => Ok(store),
            Resolved::Value { name, .. } => Err(StoreError::UnexpectedKind {
                name,
                expected: "prefix",
                found: "parameter",
            }),
        }
    }

    pub fn as_value(&self) -> Option<&ParameterValue> {
        match self {
            Resolved::Value { value, .. } => Some(value),
            Resolved::SubStore(_) => None,
        }
    }

    pub fn is_store(&self) -> bool {
        matches!(self, Resolved::SubStore(_))
    }
}

/// Caching, read-only view over a prefix of a [`ConfigBackend`]
pub struct ParameterStore {
    backend: Arc<dyn ConfigBackend>,
    prefix: String,
    ttl: CacheTtl,
    tree: Option<KeyTree>,
    substores: HashMap<String, ParameterStore>,
}

impl fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterStore")
            .field("prefix", &self.prefix)
            .field("ttl", &self.ttl)
            .field("populated", &self.tree.is_some())
            .field("substores", &self.substores.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ParameterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParameterStore[{}]", self.prefix)
    }
}

impl ParameterStore {
    /// Create an unpopulated store over `prefix` (`None` means the whole hierarchy)
    pub fn new(backend: Arc<dyn ConfigBackend>, prefix: Option<&str>, ttl: CacheTtl) -> Self {
        Self {
            backend,
            prefix: normalize_prefix(prefix.unwrap_or_default()),
            ttl,
            tree: None,
            substores: HashMap::new(),
        }
    }

    /// Create a substore that starts from an already-known subtree
    fn with_tree(
        backend: Arc<dyn ConfigBackend>,
        prefix: &str,
        ttl: CacheTtl,
        tree: KeyTree,
    ) -> Self {
        Self {
            backend,
            prefix: normalize_prefix(prefix),
            ttl,
            tree: Some(tree),
            substores: HashMap::new(),
        }
    }

    /// Absolute prefix, always ending with `/`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ttl(&self) -> CacheTtl {
        self.ttl
    }

    /// Whether the key tree has been built
    pub fn is_populated(&self) -> bool {
        self.tree.is_some()
    }

    /// Re-enumerate every key below the prefix and rebuild the key tree
    ///
    /// The new tree is built completely before the old one is dropped, so a
    /// failed listing leaves the previous tree and substores in place.
    /// On success every cached value and substore is discarded.
    pub async fn refresh(&mut self) -> Result<()> {
        let keys = self.backend.list_keys(&self.prefix).await?;
        let tree = KeyTree::build(&self.prefix, &keys);

        info!(
            "Refreshed {} with {} parameters ({} top-level names)",
            self,
            keys.len(),
            tree.len()
        );
        metrics::increment_refreshes();

        self.tree = Some(tree);
        self.substores.clear();
        Ok(())
    }

    async fn ensure_populated(&mut self) -> Result<()> {
        if self.tree.is_none() {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Top-level names below this store
    pub async fn keys(&mut self) -> Result<BTreeSet<String>> {
        self.ensure_populated().await?;
        Ok(self
            .tree
            .as_ref()
            .map(|tree| tree.names().cloned().collect())
            .unwrap_or_default())
    }

    /// Resolve a local name, failing with `KeyNotFound` if it is absent
    pub async fn get(&mut self, name: &str) -> Result<Resolved<'_>> {
        self.try_get(name)
            .await?
            .ok_or_else(|| StoreError::KeyNotFound(name.to_string()))
    }

    /// Resolve a local name, returning `default` if it is absent
    pub async fn get_or(
        &mut self,
        name: &str,
        default: impl Into<ParameterValue>,
    ) -> Result<Resolved<'_>> {
        let abs_key = format!("{}{}", self.prefix, name);
        Ok(self
            .try_get(name)
            .await?
            .unwrap_or_else(|| Resolved::Value {
                name: abs_key,
                value: default.into(),
            }))
    }

    /// Resolve a local name, returning `None` if it is absent
    pub async fn try_get(&mut self, name: &str) -> Result<Option<Resolved<'_>>> {
        validate_name(name)?;
        self.ensure_populated().await?;

        let Some(tree) = self.tree.as_mut() else {
            return Ok(None);
        };
        let abs_key = format!("{}{}", self.prefix, name);

        match tree.get_mut(name) {
            None => Ok(None),
            Some(Node::Prefix { children }) => {
                let store = match self.substores.entry(abs_key) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => {
                        debug!("Materialising substore for {}", entry.key());
                        let store = ParameterStore::with_tree(
                            Arc::clone(&self.backend),
                            entry.key(),
                            self.ttl,
                            children.clone(),
                        );
                        entry.insert(store)
                    }
                };
                Ok(Some(Resolved::SubStore(store)))
            }
            Some(Node::Parameter(entry)) => {
                let value = fetch_value(self.backend.as_ref(), &abs_key, self.ttl, entry).await?;
                Ok(Some(Resolved::Value {
                    name: abs_key,
                    value,
                }))
            }
        }
    }

    /// Whether `name` resolves; every error, backend failures included, reads as absent
    pub async fn contains(&mut self, name: &str) -> bool {
        let resolved = self.get(name).await.map(|_| ());
        match resolved {
            Ok(()) => true,
            Err(e) => {
                if !e.is_not_found() {
                    debug!("Treating {} in {} as absent after error: {}", name, self, e);
                }
                false
            }
        }
    }

    /// Resolve a relative path such as `db/host` by walking substores
    pub async fn get_path(&mut self, path: &str) -> Result<Resolved<'_>> {
        let segments: Vec<&str> = path
            .split(PATH_SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(StoreError::InvalidName(path.to_string()));
        };

        let mut store = self;
        for segment in parents {
            store = match store.get(segment).await? {
                Resolved::SubStore(child) => child,
                Resolved::Value { name, .. } => {
                    return Err(StoreError::UnexpectedKind {
                        name,
                        expected: "prefix",
                        found: "parameter",
                    })
                }
            };
        }
        store.get(last).await
    }

    /// Every parameter below this store as `(relative path, value)`, sorted by path
    pub async fn walk(&mut self) -> Result<Vec<(String, ParameterValue)>> {
        let mut out = Vec::new();
        let mut pending: Vec<String> = vec![String::new()];

        while let Some(relative) = pending.pop() {
            let store = if relative.is_empty() {
                &mut *self
            } else {
                self.get_path(&relative).await?.into_store()?
            };
            for name in store.keys().await? {
                let path = if relative.is_empty() {
                    name.clone()
                } else {
                    format!("{relative}{PATH_SEPARATOR}{name}")
                };
                match store.get(&name).await? {
                    Resolved::Value { value, .. } => out.push((path, value)),
                    Resolved::SubStore(_) => pending.push(path),
                }
            }
        }

        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    /// Always fails: the store is read-only
    pub fn set(&mut self, _name: &str, _value: impl Into<ParameterValue>) -> Result<()> {
        Err(StoreError::NotImplemented("set"))
    }

    /// Always fails: the store is read-only
    pub fn remove(&mut self, _name: &str) -> Result<()> {
        Err(StoreError::NotImplemented("remove"))
    }
}

/// Read one leaf, applying the TTL policy
async fn fetch_value(
    backend: &dyn ConfigBackend,
    abs_key: &str,
    ttl: CacheTtl,
    entry: &mut ParameterEntry,
) -> Result<ParameterValue> {
    let now = Instant::now();
    if entry.evict_stale(ttl, now) {
        debug!("Evicted cached value for {}", abs_key);
        metrics::increment_cache_evictions();
    }

    if let Some(value) = entry.cached() {
        debug!("Cache hit for {}", abs_key);
        metrics::increment_cache_hits();
        return Ok(value.clone());
    }

    debug!("Cache miss for {}, fetching from backend", abs_key);
    let raw = backend
        .get_value(abs_key, true)
        .await?
        .ok_or_else(|| StoreError::ParameterNotFound(abs_key.to_string()))?;

    Ok(entry
        .store(ParameterValue::from(raw), ttl, Instant::now())
        .clone())
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(PATH_SEPARATOR) {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Strip trailing separators and append exactly one
fn normalize_prefix(prefix: &str) -> String {
    format!(
        "{}{PATH_SEPARATOR}",
        prefix.trim_end_matches(PATH_SEPARATOR)
    )
}
