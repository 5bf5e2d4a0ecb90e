//! ptra-web - Project Tracking and Reporting web service
//!
//! Serves the server-rendered admin pages, project detail views and the
//! uploaded image gallery from a single process backed by SQLite.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ptra_common::config::{AppConfig, CliOverrides};
use ptra_common::db::{self, users};
use ptra_common::password::generate_password;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use ptra_web::{session, AppState};

const BOOTSTRAP_ADMIN_USERNAME: &str = "admin";
const BOOTSTRAP_ADMIN_EMAIL: &str = "admin@localhost";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Command-line arguments for ptra-web
#[derive(Parser, Debug)]
#[command(name = "ptra-web")]
#[command(about = "Project tracking and reporting web service")]
#[command(version)]
struct Args {
    /// Root folder holding the database and uploads
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:5780
    #[arg(short, long)]
    bind: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Password for the admin account created on first run
    #[arg(long, env = "PTRA_ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Installed before config loading so its messages are kept; the filter
    // is swapped for the configured level once that is known
    let provisional = log_filter(args.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL));
    let (filter_layer, filter_handle) = reload::Layer::new(provisional);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = CliOverrides {
        root_folder: args.root_folder.clone(),
        bind_addr: args.bind.clone(),
        config_file: args.config.clone(),
        log_level: args.log_level.clone(),
    };
    let config = AppConfig::resolve(&cli).context("Failed to load configuration")?;
    filter_handle
        .reload(log_filter(&config.log_level))
        .context("Failed to apply configured log level")?;

    info!("Starting ptra-web v{} [{}]", env!("CARGO_PKG_VERSION"), ptra_web::BUILD_ID);
    info!("Root folder: {}", config.root_folder.display());

    config
        .ensure_directories()
        .context("Failed to initialize root folder")?;

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let pool = db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let (password, generated) = match args.admin_password {
        Some(password) if !password.is_empty() => (password, false),
        _ => (generate_password(), true),
    };
    let created = users::bootstrap_admin(&pool, BOOTSTRAP_ADMIN_USERNAME, BOOTSTRAP_ADMIN_EMAIL, &password)
        .await
        .context("Failed to create bootstrap admin")?;
    if created && generated {
        warn!(
            "Generated password for '{}': {} (change it after first login)",
            BOOTSTRAP_ADMIN_USERNAME, password
        );
    }

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(pool.clone(), config);
    let _purge = session::spawn_purge_task(state.sessions.clone(), state.config.session_timeout());

    let app = ptra_web::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Default directives for our crates at `level`
fn default_directives(level: &str) -> String {
    format!("ptra_web={level},ptra_common={level},tower_http=info", level = level)
}

/// `RUST_LOG` wins; otherwise the given level applies to our crates
fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
    fn test_default_directives_follow_level() {
        let directives = default_directives("debug");
        assert!(directives.contains("ptra_web=debug"));
        assert!(directives.contains("ptra_common=debug"));
        assert!(directives.contains("tower_http=info"));
    }

    #[test]
    fn test_args_accept_log_level() {
        let args = Args::try_parse_from(["ptra-web", "--log-level", "warn", "--bind", "0.0.0.0:8080"]).unwrap();
        assert_eq!(args.log_level.as_deref(), Some("warn"));
        assert_eq!(args.bind.as_deref(), Some("0.0.0.0:8080"));
    }
}
