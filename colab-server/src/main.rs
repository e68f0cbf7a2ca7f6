//! Colab server - main entry point
//!
//! Loads bootstrap configuration, opens the SQLite database and serves the
//! REST API and WebSocket channel until Ctrl+C or SIGTERM.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colab_common::config::{self, CliOverrides, ServerConfig};
use colab_common::db::{self, sessions};
use colab_common::events::EventBus;
use colab_server::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for colab-server
#[derive(Parser, Debug)]
#[command(name = "colab-server")]
#[command(about = "Collaborative research project server")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "COLAB_PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long, env = "COLAB_BIND_ADDRESS")]
    bind: Option<String>,

    /// Root folder holding the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// SQLite database file (defaults to <root>/colab.db)
    #[arg(short, long, env = "COLAB_DATABASE")]
    database: Option<PathBuf>,

    /// TOML bootstrap configuration file
    #[arg(short, long, env = "COLAB_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "COLAB_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let toml_config = config::load_toml_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let overrides = CliOverrides {
        root_folder: args.root_folder,
        database_path: args.database,
        bind_address: args.bind,
        port: args.port,
        log_level: args.log_level,
    };
    let config = ServerConfig::resolve(&overrides, &toml_config)?;

    // Initialize tracing
    let default_filter = format!(
        "colab_server={level},colab_common={level},tower_http={level}",
        level = config.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting colab-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    // Config loading ran before the subscriber existed; repeat its notice
    let (level, notice) = config_notice(&config_path);
    if level == Level::WARN {
        warn!("{}", notice);
    } else {
        info!("{}", notice);
    }
    info!("Root folder: {}", config.root_folder.display());
    info!("Database: {}", config.database_path.display());

    let pool = db::init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let purged = sessions::purge_expired(&pool).await?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    let state = AppState::new(
        pool,
        EventBus::new(config.event_bus_capacity),
        config.session_ttl_hours,
    );
    let app = build_router(state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Startup line describing where bootstrap configuration came from
fn config_notice(path: &Path) -> (Level, String) {
    if path.exists() {
        (Level::INFO, format!("Config file: {}", path.display()))
    } else {
        (
            Level::WARN,
            format!("Config file {} not found, using built-in defaults", path.display()),
        )
    }
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_a_warning() {
        let (level, notice) = config_notice(Path::new("/nonexistent/colab/config.toml"));
        assert_eq!(level, Level::WARN);
        assert!(notice.contains("not found"));

        let present = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
        let (level, _) = config_notice(&present);
        assert_eq!(level, Level::INFO);
    }
}
