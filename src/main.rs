//! # pstore CLI
//!
//! Command-line interface for browsing AWS Parameter Store through the
//! caching [`ParameterStore`].
//!
//! ## Usage
//!
//! ```bash
//! # List top-level names under /prod
//! pstore --prefix /prod keys
//!
//! # Read one parameter (paths are relative to --prefix)
//! pstore --prefix /prod get db/host
//!
//! # Print every parameter below /prod/db as JSON
//! pstore --prefix /prod --json dump db
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paramstore::constants::DEFAULT_LOG_FILTER;
use paramstore::observability::metrics;
use paramstore::{ConfigBackend, ParameterStore, ParameterValue, Resolved, SsmBackend, StoreConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Browse AWS Systems Manager Parameter Store
#[derive(Parser)]
#[command(name = "pstore")]
#[command(
    about = "Browse AWS Systems Manager Parameter Store",
    long_about = None,
    after_help = "\
Settings fall back to PARAMETER_STORE_PREFIX, PARAMETER_STORE_TTL_SECS,
PARAMETER_STORE_CACHE_DISABLED, PARAMETER_STORE_PAGE_SIZE and AWS_REGION
(a .env file in the working directory is loaded first).

Examples:
  pstore --prefix /prod keys
  pstore --prefix /prod get db/host
  pstore --prefix /prod --json dump
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base path for the store (ie. /prod)
    #[arg(short, long, global = true)]
    prefix: Option<String>,

    /// Cache values for this many seconds (0 caches until exit)
    #[arg(long, global = true)]
    ttl: Option<u64>,

    /// Always refetch values from Parameter Store
    #[arg(long, global = true)]
    no_cache: bool,

    /// AWS region (defaults to the SDK provider chain)
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Render output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Print Prometheus metrics to stderr after the command
    #[arg(long, global = true)]
    metrics: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List names directly under a path
    Keys {
        /// Path relative to --prefix
        #[arg(value_name = "PATH")]
        path: Option<String>,
    },
    /// Read the parameter at a path, or list it if it is a prefix
    Get {
        /// Path relative to --prefix (ie. db/host)
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Print every parameter below a path
    Dump {
        /// Path relative to --prefix
        #[arg(value_name = "PATH")]
        path: Option<String>,
    },
}

impl Cli {
    /// Environment configuration with command-line overrides applied
    fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::from_env();
        if let Some(prefix) = &self.prefix {
            config.prefix.clone_from(prefix);
        }
        if self.ttl.is_some() {
            config.ttl_secs = self.ttl;
        }
        if self.no_cache {
            config.cache_disabled = true;
        }
        if let Some(region) = &self.region {
            config.region = Some(region.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("Failed to load .env file");
        }
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.metrics {
        metrics::register_metrics()?;
    }

    let config = cli.store_config();
    debug!("Using configuration: {:?}", config);

    let backend: Arc<dyn ConfigBackend> =
        Arc::new(SsmBackend::new(config.region.as_deref(), config.page_size).await);
    let mut store = ParameterStore::new(backend, Some(&config.prefix), config.cache_ttl());

    match &cli.command {
        Commands::Keys { path } => {
            let store = scoped(&mut store, path.as_deref()).await?;
            let keys = store.keys().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&keys)?);
            } else {
                for key in keys {
                    println!("{key}");
                }
            }
        }
        Commands::Get { path } => match store.get_path(path).await? {
            Resolved::Value { value, .. } => print_value(&value, cli.json)?,
            Resolved::SubStore(substore) => {
                let keys = substore.keys().await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&keys)?);
                } else {
                    for key in keys {
                        println!("{key}/");
                    }
                }
            }
        },
        Commands::Dump { path } => {
            let store = scoped(&mut store, path.as_deref()).await?;
            let parameters = store.walk().await?;
            if cli.json {
                let map: BTreeMap<String, ParameterValue> = parameters.into_iter().collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                for (path, value) in parameters {
                    println!("{path} = {value}");
                }
            }
        }
    }

    if cli.metrics {
        eprint!("{}", metrics::gather_text()?);
    }

    Ok(())
}

/// The store itself, or the substore at `path`
async fn scoped<'a>(
    store: &'a mut ParameterStore,
    path: Option<&str>,
) -> Result<&'a mut ParameterStore> {
    match path.filter(|p| !p.trim_matches('/').is_empty()) {
        None => Ok(store),
        Some(path) => {
            let prefix = format!("{}{}", store.prefix(), path.trim_matches('/'));
            store
                .get_path(path)
                .await?
                .into_store()
                .with_context(|| format!("{prefix} is not a prefix"))
        }
    }
}

fn print_value(value: &ParameterValue, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        match value {
            ParameterValue::Single(value) => println!("{value}"),
            ParameterValue::List(items) => {
                for item in items {
                    println!("{item}");
                }
            }
        }
    }
    Ok(())
}
