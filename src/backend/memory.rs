//! # In-Memory Backend
//!
//! A map-backed [`ConfigBackend`] for tests and local development.
//!
//! Listing is served in pages of `page_size` keys, the same way the AWS
//! backend drains `DescribeParameters`, and every call is counted so callers
//! can assert how often the cache actually reached the backend.

use crate::backend::{ConfigBackend, RawParameter};
use crate::constants::{MEMORY_BACKEND_LABEL, PATH_SEPARATOR};
use crate::observability::metrics;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    parameters: Mutex<BTreeMap<String, RawParameter>>,
    page_size: Option<usize>,
    fail_requests: AtomicBool,
    list_calls: AtomicUsize,
    page_requests: AtomicUsize,
    get_calls: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve listings in pages of `page_size` keys (minimum 1)
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Builder-style insert
    #[must_use]
    pub fn with_parameter(self, key: &str, parameter: RawParameter) -> Self {
        self.put(key, parameter);
        self
    }

    /// Insert or overwrite a parameter
    pub fn put(&self, key: &str, parameter: RawParameter) {
        self.lock().insert(key.to_string(), parameter);
    }

    /// Remove a parameter, returning whether it existed
    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Make every subsequent call fail, simulating an unavailable service
    pub fn set_unavailable(&self, unavailable: bool) {
        self.fail_requests.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `list_keys` calls served
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of listing pages served across all `list_keys` calls
    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    /// Number of `get_value` calls served
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, RawParameter>> {
        // A poisoned map is still a consistent map
        self.parameters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check_available(&self, operation: &str) -> Result<()> {
        if self.fail_requests.load(Ordering::SeqCst) {
            metrics::increment_backend_errors(MEMORY_BACKEND_LABEL, operation);
            return Err(anyhow::anyhow!(
                "In-memory backend unavailable during {operation}"
            ));
        }
        Ok(())
    }

    /// One page of keys strictly after `after`
    fn page(&self, prefix: &str, after: Option<&str>) -> (Vec<String>, bool) {
        let parameters = self.lock();
        let limit = self.page_size.unwrap_or(usize::MAX);
        let mut matching = parameters
            .keys()
            .filter(|key| is_below(key, prefix))
            .filter(|key| after.is_none_or(|after| key.as_str() > after));

        let page: Vec<String> = matching.by_ref().take(limit).cloned().collect();
        let has_more = matching.next().is_some();
        (page, has_more)
    }
}

/// Whether `key` lies at or below `prefix`, honouring segment boundaries
fn is_below(key: &str, prefix: &str) -> bool {
    let trimmed = prefix.trim_end_matches(PATH_SEPARATOR);
    if trimmed.is_empty() {
        return true;
    }
    key.strip_prefix(trimmed)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(PATH_SEPARATOR))
}

#[async_trait]
impl ConfigBackend for InMemoryBackend {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let start = Instant::now();
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available("list_keys")?;

        let mut keys: Vec<String> = Vec::new();
        loop {
            self.page_requests.fetch_add(1, Ordering::SeqCst);
            let (page, has_more) = self.page(prefix, keys.last().map(String::as_str));
            keys.extend(page);
            if !has_more {
                break;
            }
        }

        debug!("Listed {} in-memory parameters under {}", keys.len(), prefix);
        metrics::record_backend_request(
            MEMORY_BACKEND_LABEL,
            "list_keys",
            start.elapsed().as_secs_f64(),
        );
        Ok(keys)
    }

    async fn get_value(&self, key: &str, _decrypt: bool) -> Result<Option<RawParameter>> {
        let start = Instant::now();
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available("get_value")?;

        let parameter = self.lock().get(key).cloned();
        metrics::record_backend_request(
            MEMORY_BACKEND_LABEL,
            "get_value",
            start.elapsed().as_secs_f64(),
        );
        Ok(parameter)
    }
}
