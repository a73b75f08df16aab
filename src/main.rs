// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Examtie API Server
//!
//! Serves user profiles through a read-through identity cache and tracks
//! daily activity streaks.

use examtie_core::{
    cache::{KeyValueStore, MemoryStore, RedisStore},
    config::Config,
    db::{FirestoreDb, UserStore},
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often the in-process store drops expired keys.
const MEMORY_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Examtie API");

    // Document store (source of truth)
    let db = FirestoreDb::new(&config.gcp_project_id).await?;
    let users: Arc<dyn UserStore> = Arc::new(db);

    // Key-value cache
    let cache: Arc<dyn KeyValueStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisStore::connect(url).await?),
        None => {
            tracing::warn!("REDIS_URL not set, using in-process cache (single instance only)");
            let store = MemoryStore::new();
            spawn_memory_purge(store.clone());
            Arc::new(store)
        }
    };
    tracing::info!(
        cache_ttl_secs = config.cache_expire_seconds,
        streak_ttl_secs = config.streak_ttl_seconds,
        "Cache initialized"
    );

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), users, cache));

    // Build router
    let app = examtie_core::routes::create_router(state.clone());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Clients close when the last handle drops.
    drop(state);
    tracing::info!("Server stopped");
    Ok(())
}

/// Periodically drop expired keys from the in-process store.
fn spawn_memory_purge(store: MemoryStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MEMORY_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Purged expired cache entries");
            }
        }
    });
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("examtie_core=debug,info")),
        )
        .with(format)
        .init();
}
