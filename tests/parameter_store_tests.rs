//! # Parameter Store Tests
//!
//! Behaviour of the caching store against the in-memory backend:
//! - lazy population and key listing
//! - value caching and TTL expiry (paused tokio clock)
//! - substore identity and subtree reuse
//! - list-typed values, missing keys, defaults
//! - refresh semantics, including a failed refresh

use paramstore::{
    CacheTtl, ConfigBackend, InMemoryBackend, ParameterStore, ParameterValue, RawParameter,
    Resolved, StoreError,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

fn scenario_backend() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_parameter("/root/db/host", RawParameter::single("localhost"))
        .with_parameter("/root/db/ports", RawParameter::list("80,443"))
        .with_parameter("/root/flag", RawParameter::single("on"))
}

fn store_over(
    backend: InMemoryBackend,
    prefix: &str,
    ttl: CacheTtl,
) -> (Arc<InMemoryBackend>, ParameterStore) {
    let backend = Arc::new(backend);
    let store = ParameterStore::new(
        Arc::clone(&backend) as Arc<dyn ConfigBackend>,
        Some(prefix),
        ttl,
    );
    (backend, store)
}

fn names(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(ToString::to_string).collect()
}

async fn value(store: &mut ParameterStore, name: &str) -> ParameterValue {
    store
        .get(name)
        .await
        .expect("get should succeed")
        .into_value()
        .expect("name should be a parameter")
}

#[tokio::test]
async fn test_scenario_from_nested_backend() {
    let (_, mut store) = store_over(scenario_backend(), "/root", CacheTtl::Forever);

    assert_eq!(store.keys().await.unwrap(), names(&["db", "flag"]));

    let db = store.get("db").await.unwrap().into_store().unwrap();
    assert_eq!(value(db, "host").await, "localhost");
    assert_eq!(
        value(db, "ports").await,
        ParameterValue::List(vec!["80".to_string(), "443".to_string()])
    );

    assert_eq!(value(&mut store, "flag").await, "on");

    match store.get("missing").await {
        Err(StoreError::KeyNotFound(name)) => assert_eq!(name, "missing"),
        other => panic!("expected KeyNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_keys_are_first_level_names() {
    let backend = InMemoryBackend::new()
        .with_parameter("/app/a/b/c", RawParameter::single("1"))
        .with_parameter("/app/a/d", RawParameter::single("2"))
        .with_parameter("/app/e", RawParameter::single("3"))
        .with_parameter("/app/f/g", RawParameter::single("4"))
        .with_parameter("/application/x", RawParameter::single("5"));
    let (_, mut store) = store_over(backend, "/app/", CacheTtl::Forever);

    store.refresh().await.unwrap();
    assert_eq!(store.keys().await.unwrap(), names(&["a", "e", "f"]));
}

#[tokio::test]
async fn test_paginated_listing_builds_full_tree() {
    let (backend, mut store) = store_over(
        scenario_backend().with_page_size(1),
        "/root",
        CacheTtl::Forever,
    );

    assert_eq!(store.keys().await.unwrap(), names(&["db", "flag"]));
    assert_eq!(backend.list_calls(), 1);
    assert_eq!(backend.page_requests(), 3);
}

#[tokio::test]
async fn test_no_prefix_covers_whole_hierarchy() {
    let backend = Arc::new(scenario_backend());
    let mut store = ParameterStore::new(
        Arc::clone(&backend) as Arc<dyn ConfigBackend>,
        None,
        CacheTtl::Forever,
    );

    assert_eq!(store.prefix(), "/");
    assert_eq!(store.keys().await.unwrap(), names(&["root"]));
    let host = store.get_path("root/db/host").await.unwrap().into_value().unwrap();
    assert_eq!(host, "localhost");
}

#[tokio::test]
async fn test_repeated_get_within_ttl_fetches_once() {
    let (backend, mut store) = store_over(scenario_backend(), "/root", CacheTtl::from_secs(60));

    let first = value(&mut store, "flag").await;
    let second = value(&mut store, "flag").await;

    assert_eq!(first, second);
    assert_eq!(backend.get_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_value_is_refetched_once() {
    let (backend, mut store) = store_over(scenario_backend(), "/root", CacheTtl::from_secs(30));

    assert_eq!(value(&mut store, "flag").await, "on");
    assert_eq!(backend.get_calls(), 1);

    tokio::time::advance(Duration::from_secs(29)).await;
    assert_eq!(value(&mut store, "flag").await, "on");
    assert_eq!(backend.get_calls(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    backend.put("/root/flag", RawParameter::single("off"));
    assert_eq!(value(&mut store, "flag").await, "off");
    assert_eq!(backend.get_calls(), 2);

    assert_eq!(value(&mut store, "flag").await, "off");
    assert_eq!(backend.get_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_forever_ttl_never_expires() {
    let (backend, mut store) = store_over(scenario_backend(), "/root", CacheTtl::Forever);

    value(&mut store, "flag").await;
    tokio::time::advance(Duration::from_secs(7 * 24 * 3600)).await;
    value(&mut store, "flag").await;

    assert_eq!(backend.get_calls(), 1);
}

#[tokio::test]
async fn test_disabled_cache_fetches_every_time() {
    let (backend, mut store) = store_over(scenario_backend(), "/root", CacheTtl::Disabled);

    for expected_calls in 1..=3 {
        assert_eq!(value(&mut store, "flag").await, "on");
        assert_eq!(backend.get_calls(), expected_calls);
    }

    backend.put("/root/flag", RawParameter::single("off"));
    assert_eq!(value(&mut store, "flag").await, "off");
}

#[tokio::test]
async fn test_substore_identity_is_stable() {
    let (backend, mut store) = store_over(scenario_backend(), "/root", CacheTtl::Forever);

    let first: *const ParameterStore = store.get("db").await.unwrap().into_store().unwrap();
    let second: *const ParameterStore = store.get("db").await.unwrap().into_store().unwrap();
    assert!(std::ptr::eq(first, second));

    // The cached substore keeps its own cached leaves across lookups
    let db = store.get("db").await.unwrap().into_store().unwrap();
    value(db, "host").await;
    let db = store.get("db").await.unwrap().into_store().unwrap();
    value(db, "host").await;

    assert_eq!(backend.get_calls(), 1);
    assert_eq!(backend.list_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_substore_inherits_ttl() {
    let (backend, mut store) = store_over(scenario_backend(), "/root", CacheTtl::from_secs(10));

    let db = store.get("db").await.unwrap().into_store().unwrap();
    assert_eq!(db.ttl(), CacheTtl::from_secs(10));
    value(db, "host").await;

    tokio::time::advance(Duration::from_secs(11)).await;
    let db = store.get("db").await.unwrap().into_store().unwrap();
    value(db, "host").await;

    assert_eq!(backend.get_calls(), 2);
}

#[tokio::test]
async fn test_default_is_returned_for_missing_names() {
    let (_, mut store) = store_over(scenario_backend(), "/root", CacheTtl::Forever);

    let resolved = store.get_or("nonexistent", "x").await.unwrap();
    assert_eq!(resolved.as_value(), Some(&ParameterValue::from("x")));

    // Present names ignore the default
    let resolved = store.get_or("flag", "x").await.unwrap();
    assert_eq!(resolved.as_value(), Some(&ParameterValue::from("on")));

    assert!(store.try_get("nonexistent").await.unwrap().is_none());
    assert!(matches!(
        store.get_or("db", "x").await.unwrap(),
        Resolved::SubStore(_)
    ));
}

#[tokio::test]
async fn test_contains() {
    let (backend, mut store) = store_over(scenario_backend(), "/root", CacheTtl::Disabled);

    assert!(store.contains("flag").await);
    assert!(store.contains("db").await);
    assert!(!store.contains("missing").await);
    assert!(!store.contains("db/host").await);

    // Backend failures are reported as absence
    backend.set_unavailable(true);
    assert!(!store.contains("flag").await);
}

#[tokio::test]
async fn test_invalid_names_are_rejected() {
    let (backend, mut store) = store_over(scenario_backend(), "/root", CacheTtl::Forever);

    assert!(matches!(
        store.get("").await,
        Err(StoreError::InvalidName(_))
    ));
    assert!(matches!(
        store.get("db/host").await,
        Err(StoreError::InvalidName(_))
    ));
    assert_eq!(backend.list_calls(), 0);
}

#[tokio::test]
async fn test_refresh_discards_cached_values_and_substores() {
    let (backend, mut store) = store_over(scenario_backend(), "/root", CacheTtl::Forever);

    value(&mut store, "flag").await;
    let db = store.get("db").await.unwrap().into_store().unwrap();
    value(db, "host").await;
    assert_eq!(backend.get_calls(), 2);

    backend.put("/root/flag", RawParameter::single("off"));
    backend.put("/root/new", RawParameter::single("fresh"));
    backend.delete("/root/db/ports");
    store.refresh().await.unwrap();

    assert_eq!(store.keys().await.unwrap(), names(&["db", "flag", "new"]));
    assert_eq!(value(&mut store, "flag").await, "off");

    let db = store.get("db").await.unwrap().into_store().unwrap();
    assert_eq!(db.keys().await.unwrap(), names(&["host"]));
    value(db, "host").await;

    assert_eq!(backend.get_calls(), 4);
    assert_eq!(backend.list_calls(), 2);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_tree() {
    let (backend, mut store) = store_over(scenario_backend(), "/root", CacheTtl::Forever);

    assert_eq!(value(&mut store, "flag").await, "on");

    backend.set_unavailable(true);
    assert!(matches!(store.refresh().await, Err(StoreError::Backend(_))));
    assert!(store.is_populated());
    assert_eq!(store.keys().await.unwrap(), names(&["db", "flag"]));

    // Cached values survive as well
    assert_eq!(value(&mut store, "flag").await, "on");
}

#[tokio::test]
async fn test_backend_errors_propagate_from_get() {
    let (backend, mut store) = store_over(scenario_backend(), "/root", CacheTtl::Forever);

    backend.set_unavailable(true);
    assert!(matches!(store.get("flag").await, Err(StoreError::Backend(_))));
    assert!(!store.is_populated());

    backend.set_unavailable(false);
    store.keys().await.unwrap();
    backend.set_unavailable(true);
    assert!(matches!(store.get("flag").await, Err(StoreError::Backend(_))));
}

#[tokio::test]
async fn test_get_path_walks_substores() {
    let (_, mut store) = store_over(scenario_backend(), "/root", CacheTtl::Forever);

    let host = store.get_path("db/host").await.unwrap().into_value().unwrap();
    assert_eq!(host, "localhost");

    assert!(store.get_path("/db/").await.unwrap().is_store());

    assert!(matches!(
        store.get_path("flag/deeper").await,
        Err(StoreError::UnexpectedKind { ref name, .. }) if name == "/root/flag"
    ));
    assert!(matches!(
        store.get_path("db/missing").await,
        Err(StoreError::KeyNotFound(_))
    ));
    assert!(matches!(
        store.get_path("///").await,
        Err(StoreError::InvalidName(_))
    ));
}

#[tokio::test]
async fn test_walk_collects_every_parameter() {
    let (_, mut store) = store_over(
        scenario_backend().with_parameter("/root/a/b/c", RawParameter::single("deep")),
        "/root",
        CacheTtl::Forever,
    );

    let parameters = store.walk().await.unwrap();
    let paths: Vec<&str> = parameters.iter().map(|(path, _)| path.as_str()).collect();
    assert_eq!(paths, vec!["a/b/c", "db/host", "db/ports", "flag"]);
    assert_eq!(parameters[0].1, "deep");
}

#[tokio::test]
async fn test_exact_and_nested_key_collision_does_not_panic() {
    let backend = InMemoryBackend::new()
        .with_parameter("/root/db", RawParameter::single("standalone"))
        .with_parameter("/root/db/host", RawParameter::single("localhost"));
    let (_, mut store) = store_over(backend, "/root", CacheTtl::Forever);

    // The in-memory backend lists in sorted order, so the nested key is seen last and wins
    let db = store.get("db").await.unwrap().into_store().unwrap();
    assert_eq!(value(db, "host").await, "localhost");
}
