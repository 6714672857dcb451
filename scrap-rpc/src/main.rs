//! Scrapbook RPC server
//!
//! # Environment Variables
//!
//! - `SCRAP_HOST`, `SCRAP_PORT`, `SCRAP_RPC_PATH`: listen address overrides
//! - `SCRAP_SESSION_COOKIE`: name of the session cookie
//! - `RUST_LOG`: tracing filter

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use scrap_core::Config;
use scrap_core::config::CliOverrides;
use scrap_rpc::{
    AppState, ContextFactory, HttpFeedFetcher, StaticSessionResolver, app_router, http_router,
    register_feed_sources,
};
use scrap_store::{MemoryStore, ScrapStore};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "scrap-rpc")]
#[command(about = "Scrapbook procedure server")]
struct Cli {
    /// Config file to load instead of the discovered one.
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Listen host.
    #[arg(long)]
    host: Option<String>,
    /// Listen port.
    #[arg(long)]
    port: Option<u16>,
    /// Path of the batch endpoint.
    #[arg(long)]
    rpc_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scrap_rpc=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).await?;
    config.apply_cli_overrides(CliOverrides {
        host: cli.host,
        port: cli.port,
        rpc_path: cli.rpc_path,
    });
    config.validate()?;

    let store: Arc<dyn ScrapStore> = Arc::new(MemoryStore::new());
    let registered = register_feed_sources(store.as_ref(), &config.feeds).await?;

    let fetcher = HttpFeedFetcher::new(Duration::from_secs(config.feeds.fetch_timeout_secs))?;
    let router = Arc::new(app_router(Arc::new(fetcher))?);

    let resolver = StaticSessionResolver::from_config(&config.auth);
    if resolver.is_empty() {
        tracing::warn!("No sessions configured; every caller will be anonymous");
    }
    let contexts = ContextFactory::new(
        Arc::new(resolver),
        Arc::clone(&store),
        config.auth.session_cookie.clone(),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| format!("Invalid host:port combination: {}", e))?;

    tracing::info!(
        procedures = router.len(),
        feed_sources = registered,
        rpc_path = %config.server.rpc_path,
        "Starting scrapbook RPC server"
    );

    let app = http_router(AppState::new(router, contexts), &config.server.rpc_path)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}
