//! # Key Tree
//!
//! One directory level of the parameter hierarchy, built from a flat listing
//! of absolute keys.
//!
//! Intermediate segments become [`Node::Prefix`] nodes owning their children;
//! the last segment of every key becomes a [`Node::Parameter`] leaf carrying
//! that leaf's cached value.

use crate::constants::PATH_SEPARATOR;
use crate::store::{CacheTtl, ParameterValue};
use std::collections::btree_map;
use std::collections::BTreeMap;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Cache slot for a single parameter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterEntry {
    cached: Option<ParameterValue>,
    expires_at: Option<Instant>,
}

impl ParameterEntry {
    /// Drop the cached value if the policy or its expiry says it is stale
    /// Returns true when a value was evicted
    pub fn evict_stale(&mut self, ttl: CacheTtl, now: Instant) -> bool {
        let expired = ttl == CacheTtl::Disabled
            || self.expires_at.is_some_and(|expires_at| expires_at <= now);
        if expired {
            self.expires_at = None;
            return self.cached.take().is_some();
        }
        false
    }

    /// Cached value, if any
    pub fn cached(&self) -> Option<&ParameterValue> {
        self.cached.as_ref()
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Store a freshly fetched value, stamping its expiry from the policy
    pub fn store(&mut self, value: ParameterValue, ttl: CacheTtl, now: Instant) -> &ParameterValue {
        self.expires_at = ttl.lifetime().map(|lifetime| now + lifetime);
        self.cached.insert(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Prefix { children: KeyTree },
    Parameter(ParameterEntry),
}

impl Node {
    fn prefix() -> Self {
        Node::Prefix {
            children: KeyTree::default(),
        }
    }

    fn parameter() -> Self {
        Node::Parameter(ParameterEntry::default())
    }
}

/// Mapping from local segment name to node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTree {
    nodes: BTreeMap<String, Node>,
}

impl KeyTree {
    /// Build a tree from absolute keys listed below `prefix`
    ///
    /// `prefix` must already be normalised to end with `/`. Keys without a
    /// leading `/` are split as-is; rooted keys outside `prefix` are skipped.
    pub fn build<I, S>(prefix: &str, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = KeyTree::default();
        for key in keys {
            let key = key.as_ref();
            match relative_segments(prefix, key) {
                Some(segments) => tree.insert(&segments),
                None => warn!("Skipping parameter {} outside of prefix {}", key, prefix),
            }
        }
        debug!("Built key tree for {} with {} top-level names", prefix, tree.len());
        tree
    }

    /// Insert one key, given as segments relative to the tree root
    ///
    /// A segment that is already a leaf but must become a prefix (or the
    /// reverse) is overwritten: the last key inserted governs.
    pub fn insert<S: AsRef<str>>(&mut self, segments: &[S]) {
        let Some((leaf, parents)) = segments.split_last() else {
            return;
        };

        let mut current = self;
        for segment in parents {
            let node = current
                .nodes
                .entry(segment.as_ref().to_string())
                .or_insert_with(Node::prefix);
            if matches!(node, Node::Parameter(_)) {
                warn!(
                    "Parameter {} also has nested keys, treating it as a prefix",
                    segment.as_ref()
                );
                *node = Node::prefix();
            }
            let Node::Prefix { children } = node else {
                return;
            };
            current = children;
        }

        let leaf = leaf.as_ref();
        if let Some(Node::Prefix { .. }) = current.nodes.get(leaf) {
            warn!(
                "Prefix {} is also a parameter, dropping its nested keys",
                leaf
            );
        }
        current.nodes.insert(leaf.to_string(), Node::parameter());
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.get_mut(name)
    }

    /// Local names at this level, sorted
    pub fn names(&self) -> btree_map::Keys<'_, String, Node> {
        self.nodes.keys()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Split `key` into segments relative to `prefix`
///
/// Returns `None` for rooted keys outside `prefix` and for keys that name
/// the prefix itself.
pub(crate) fn relative_segments<'a>(prefix: &str, key: &'a str) -> Option<Vec<&'a str>> {
    let relative = match key.strip_prefix(prefix) {
        Some(rest) => rest,
        None if key.starts_with(PATH_SEPARATOR) => return None,
        None => key,
    };

    let segments: Vec<&str> = relative
        .split(PATH_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect();
    (!segments.is_empty()).then_some(segments)
}
