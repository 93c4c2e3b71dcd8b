//! Process entrypoint: load configuration, connect to Redis, build the
//! router, and serve (§7 "Startup & shutdown").
//!
//! Mirrors the upstream sidecar's own `main`: config errors abort the
//! process before a socket is bound, and the server binds
//! `0.0.0.0:<PORT>` (defaulting to `8000`) since the sidecar is meant to run
//! behind a reverse proxy or service mesh, not to pick its own port.

mod config;
mod routes;
mod state;
mod upstream_http;

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use config::SidecarConfig;
use sidecar_kvstore::RedisKvStore;
use state::AppState;
use upstream_http::{HttpAdapter, PassthroughParser};

#[tokio::main]
async fn main() {
    let config = match SidecarConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!(
        blockchain = %config.blockchain_id(),
        environment = %config.environment,
        "starting sidecar"
    );

    let store = match RedisKvStore::connect(&format!("redis://{}", config.redis_host)).await {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(error = %err, "failed to connect to redis");
            std::process::exit(1);
        }
    };

    let adapter = HttpAdapter::new(&config.node_url, &config.node_token);
    let parser = PassthroughParser::new(&config.blockchain_id());
    let state = AppState::new(&config, store, adapter, parser);

    let app = routes::build_router(state)
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "failed to bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "listening");

    if let Err(err) = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server error");
        std::process::exit(1);
    }
}

/// Waits for SIGINT (or, on Unix, SIGTERM too) so the process can drain
/// in-flight requests and outstanding background tasks before exiting.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
