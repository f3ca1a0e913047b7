//! # paramstore
//!
//! A lazily populated, TTL-bounded client-side cache over a hierarchical
//! configuration service such as AWS Systems Manager Parameter Store.
//!
//! - [`ParameterStore`] gives dictionary-like read access below a prefix
//! - [`backend::ConfigBackend`] abstracts the service; [`backend::SsmBackend`]
//!   talks to AWS, [`backend::InMemoryBackend`] serves tests and local runs
//! - [`config::StoreConfig`] loads settings from the environment

pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod observability;
pub mod store;

pub use backend::{ConfigBackend, InMemoryBackend, RawParameter, SsmBackend, ValueKind};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use store::{CacheTtl, ParameterStore, ParameterValue, Resolved};
