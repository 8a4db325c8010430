//! cachectl - operator tool for the magazine cache
//!
//! Connects to the configured store and runs one cache operation, or
//! monitors reachability until interrupted.
//!
//! With `CACHE_BACKEND=memory` the store lives only as long as this process,
//! so only `ping` and `monitor` are accepted.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use magazine_cache::{
    spawn_purge_task, Backend, Config, KeyValueCache, KvStore, MemoryStore, RedisStore,
};

#[derive(Parser, Debug)]
#[command(
    name = "cachectl",
    about = "Inspect and invalidate the magazine cache",
    after_help = "With CACHE_BACKEND=memory only ping and monitor are available."
)]
struct Cli {
    /// Overrides CACHE_NAMESPACE
    #[arg(long, env = "CACHE_NAMESPACE")]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the store answers
    Ping,
    /// List every key in the namespace
    Keys,
    /// Print the JSON value stored under a key
    Get { key: String },
    /// Store a JSON value under a key
    Set {
        key: String,
        /// JSON document
        value: String,
        /// Expiration in seconds
        #[arg(long)]
        ttl: Option<u64>,
    },
    /// Delete a key
    Del { key: String },
    /// Delete every key starting with a prefix
    Invalidate { prefix: String },
    /// Delete every key in the namespace
    Clear {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Ping the store periodically until Ctrl+C
    Monitor {
        /// Seconds between checks
        #[arg(long, default_value_t = 5)]
        interval: u64,
    },
}

impl Command {
    /// Whether the command means anything against a store that is discarded
    /// when the process exits.
    fn runs_on_ephemeral_store(&self) -> bool {
        matches!(self, Command::Ping | Command::Monitor { .. })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "magazine_cache=info,cachectl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(namespace) = cli.namespace.clone() {
        config.namespace = namespace;
    }
    config.validate()?;
    if config.backend == Backend::Memory && !cli.command.runs_on_ephemeral_store() {
        bail!(
            "the memory backend is discarded on exit; {:?} needs CACHE_BACKEND=redis",
            cli.command
        );
    }
    info!(
        "Configuration loaded: backend={:?}, store={}, namespace={}, default_ttl={:?}",
        config.backend,
        config.redis_url(),
        config.namespace,
        config.default_ttl
    );

    let (store, purge_handle) = open_store(&config).await?;
    let cache = KeyValueCache::from_config(store, &config)?;

    let outcome = run(&cache, cli.command).await;

    cache.close().await;
    if let Some(handle) = purge_handle {
        handle.abort();
    }
    outcome
}

/// Builds the configured store; the memory backend also gets its purge task.
async fn open_store(
    config: &Config,
) -> anyhow::Result<(Arc<dyn KvStore>, Option<JoinHandle<()>>)> {
    match config.backend {
        Backend::Redis => {
            let store = RedisStore::connect(&config.redis_url())
                .await
                .with_context(|| format!("connecting to {}", config.redis_url()))?;
            let store: Arc<dyn KvStore> = Arc::new(store);
            Ok((store, None))
        }
        Backend::Memory => {
            warn!("Using in-process memory store; data is lost on exit");
            let store = Arc::new(MemoryStore::new());
            let handle = spawn_purge_task(store.clone(), config.purge_interval);
            let store: Arc<dyn KvStore> = store;
            Ok((store, Some(handle)))
        }
    }
}

async fn run(cache: &KeyValueCache, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Ping => {
            cache.ping().await?;
            print_json(&json!({
                "status": "ok",
                "namespace": cache.namespace(),
                "checked_at": chrono::Utc::now().to_rfc3339(),
            }));
        }
        Command::Keys => {
            let keys = cache.get_all_keys().await?;
            print_json(&json!({ "count": keys.len(), "keys": keys }));
        }
        Command::Get { key } => match cache.get_strict::<Value>(&key).await? {
            Some(value) => print_json(&value),
            None => bail!("key '{key}' not found"),
        },
        Command::Set { key, value, ttl } => {
            let value: Value = serde_json::from_str(&value).context("value must be JSON")?;
            match ttl {
                Some(secs) => cache.set_with_ttl(&key, &value, Duration::from_secs(secs)).await?,
                None => cache.set(&key, &value).await?,
            }
            info!("Stored '{}'", key);
        }
        Command::Del { key } => {
            cache.del(&key).await?;
            info!("Deleted '{}'", key);
        }
        Command::Invalidate { prefix } => {
            let removed = cache.clear_keys_by_prefix(&prefix).await?;
            print_json(&json!({ "prefix": prefix, "removed": removed }));
        }
        Command::Clear { yes } => {
            if !yes {
                bail!(
                    "refusing to clear namespace '{}' without --yes",
                    cache.namespace()
                );
            }
            cache.clear().await?;
            info!("Cleared namespace '{}'", cache.namespace());
        }
        Command::Monitor { interval } => monitor(cache, interval).await,
    }
    Ok(())
}

/// Pings the store every `interval_secs` until a shutdown signal arrives.
async fn monitor(cache: &KeyValueCache, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => match cache.ping().await {
                Ok(()) => info!("Store reachable, namespace '{}'", cache.namespace()),
                Err(err) => warn!("Store check failed: {}", err),
            },
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => warn!("Failed to render output: {}", err),
    }
}
