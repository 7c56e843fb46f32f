// gemini-chat - Caching chat gateway in front of the Google Gemini API
// Author: kelexine (https://github.com/kelexine)

use anyhow::{Context, Result};
use clap::Parser;
use gemini_chat::cache::{spawn_sweeper, ResponseCache};
use gemini_chat::cli::Args;
use gemini_chat::config::AppConfig;
use gemini_chat::dispatch::Dispatcher;
use gemini_chat::gemini::GeminiClient;
use gemini_chat::server::create_router;
use gemini_chat::utils::logging;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration (.env first, so it feeds the environment layer)
    dotenvy::dotenv().ok();
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting gemini-chat v{}", env!("CARGO_PKG_VERSION"));

    // A missing API key stops start-up here rather than failing every request
    config.validate()?;

    // Phase 3: Build the runtime with the configured worker count
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers)
        .enable_all()
        .build()
        .context("failed to build Tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: AppConfig) -> Result<()> {
    // Phase 4: Backend, cache and dispatcher
    let gemini_client = GeminiClient::new(&config.gemini, &config.performance)?;
    info!(
        "Using Gemini model {} at {}",
        gemini_client.model(),
        gemini_client.base_url()
    );

    let cache = Arc::new(ResponseCache::new());
    let sweeper = config
        .cache
        .sweep_interval()
        .filter(|_| config.cache.enabled)
        .map(|interval| spawn_sweeper(cache.clone(), interval));

    let dispatcher = Dispatcher::new(
        Arc::new(gemini_client),
        cache,
        config.cache.clone(),
        config.dispatch.clone(),
    );

    // Phase 5: Build and start HTTP server
    let app = create_router(&config, dispatcher);
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    // Phase 6: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
