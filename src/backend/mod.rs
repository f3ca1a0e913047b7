//! # Config Backends
//!
//! Hierarchical key-value stores a [`ParameterStore`](crate::ParameterStore)
//! caches over.
//!
//! Each backend implements the `ConfigBackend` trait:
//! - `aws`: AWS Systems Manager Parameter Store
//! - `memory`: in-process map, for tests and local development

use anyhow::Result;
use async_trait::async_trait;

/// How the backend typed a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Plain string (`String` and `SecureString` in SSM)
    Single,
    /// Comma-delimited list (`StringList` in SSM)
    List,
}

/// A value as returned by the backend, before list splitting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawParameter {
    pub value: String,
    pub kind: ValueKind,
}

impl RawParameter {
    pub fn single(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: ValueKind::Single,
        }
    }

    pub fn list(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: ValueKind::List,
        }
    }
}

/// Backend trait for hierarchical config stores
#[async_trait]
pub trait ConfigBackend: Send + Sync {
    /// List every absolute key at or below `prefix`
    /// Implementations exhaust pagination before returning
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Get a single value by absolute key
    /// Returns `None` when the key does not exist
    async fn get_value(&self, key: &str, decrypt: bool) -> Result<Option<RawParameter>>;
}

pub mod aws;
pub mod memory;

pub use aws::SsmBackend;
pub use memory::InMemoryBackend;
