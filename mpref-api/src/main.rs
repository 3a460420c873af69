//! mpref-api - Music preferences service
//!
//! Users and their favourite tracks, artists, and genres, with catalog ids
//! resolved against the Spotify Web API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mpref_api::services::SpotifyClient;
use mpref_api::AppState;
use mpref_common::config::{
    default_config_path, load_toml_config, resolve_catalog_credentials, CliOverrides,
    ServiceConfig, TomlConfig,
};

/// Command-line arguments for mpref-api
#[derive(Parser, Debug)]
#[command(name = "mpref-api")]
#[command(about = "Music preferences REST service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "MPREF_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, env = "MPREF_DATABASE")]
    database: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "MPREF_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MPREF_PORT")]
    port: Option<u16>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, env = "MPREF_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = match args.config.clone().or_else(default_config_path) {
        Some(path) => load_toml_config(&path).context("Failed to load configuration")?,
        None => TomlConfig::default(),
    };

    let config = ServiceConfig::resolve(
        CliOverrides {
            database_path: args.database,
            host: args.host,
            port: args.port,
            log_level: args.log_level,
        },
        toml_config,
    );

    // Initialize tracing
    let level = &config.log_level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("mpref_api={level},mpref_common={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting mpref-api (music preferences) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database_path.display());

    let db_pool = mpref_common::db::init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    info!("Database connection established");

    let credentials = resolve_catalog_credentials(&config.catalog);
    let catalog = SpotifyClient::new(&config.catalog, credentials)
        .context("Failed to build catalog client")?;

    let state = AppState::new(db_pool, Arc::new(catalog));
    let app = mpref_api::build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
