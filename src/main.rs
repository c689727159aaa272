//! Mini Proxy - a lightweight caching HTTP/1.0 forward proxy
//!
//! Accepts client connections, relays GET requests to origin servers, and
//! caches bounded-size response bodies with LRU eviction.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::RwLock;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_proxy::cache::{CacheStore, MAX_CACHE_SIZE, MAX_OBJECT_SIZE};
use mini_proxy::config::Config;
use mini_proxy::proxy;
use mini_proxy::tasks::spawn_stats_task;

/// Main entry point for the Mini Proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration (environment variables, CLI port override)
/// 3. Create the cache store and wrap it in the shared handle
/// 4. Start the background stats reporting task
/// 5. Bind the listening socket and run the accept loop
/// 6. Handle graceful shutdown on SIGINT/SIGTERM, releasing the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_proxy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mini Proxy");

    // Load configuration; a CLI port argument wins over the environment
    let mut config = Config::from_env();
    if let Some(arg) = std::env::args().nth(1) {
        config.listen_port = arg
            .parse()
            .with_context(|| format!("invalid port argument '{arg}'"))?;
    }
    info!(
        "Configuration loaded: port={}, max_connections={}, stats_interval={}s",
        config.listen_port, config.max_connections, config.stats_interval
    );

    // The cache is constructed here and handed to every connection; there
    // is no global instance.
    let cache = Arc::new(RwLock::new(CacheStore::new(MAX_CACHE_SIZE, MAX_OBJECT_SIZE)));
    info!("Cache store initialized");

    let stats_handle = spawn_stats_task(cache.clone(), config.stats_interval);
    info!("Background stats task started");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Proxy listening on {}", addr);

    tokio::select! {
        result = proxy::serve(listener, cache.clone(), config.max_connections) => {
            result.context("listener failed")?;
        }
        _ = shutdown_signal() => {}
    }

    // Tear down explicitly: stop the reporter, release every entry, and
    // log the final counters.
    stats_handle.abort();
    warn!("Stats task aborted");

    let final_stats = {
        let mut store = cache.write().await;
        let stats = store.stats();
        store.clear();
        stats
    };
    info!(
        hits = final_stats.hits,
        misses = final_stats.misses,
        evictions = final_stats.evictions,
        insertions = final_stats.insertions,
        "Final cache statistics"
    );
    info!("Proxy shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
