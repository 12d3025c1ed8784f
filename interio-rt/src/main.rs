//! interio-rt - Ratings service
//!
//! Serves the review/rating HTTP API and provides operator commands for
//! bootstrapping an admin account and reconciling all ratings.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use interio_common::api::load_shared_secret;
use interio_common::config::locate_config_file;
use interio_common::db::models::Role;
use interio_common::db::users;
use interio_rt::config::{Config, ConfigOverrides, TomlConfig};
use interio_rt::services::Aggregator;
use interio_rt::{build_router, AppState};
use sqlx::SqlitePool;
use tokio::signal;
use tracing::{error, info, warn};

/// Command-line arguments for interio-rt
#[derive(Parser, Debug)]
#[command(name = "interio-rt")]
#[command(about = "Review moderation and rating service")]
#[command(version)]
struct Cli {
    /// Path to TOML config file
    #[arg(long, global = true, env = "INTERIO_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on (host:port)
    #[arg(long, global = true, env = "INTERIO_BIND_ADDR")]
    bind_addr: Option<String>,

    /// SQLite database file
    #[arg(long, global = true, env = "INTERIO_DATABASE_PATH")]
    database_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, env = "INTERIO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Maximum time to retry a locked database, in milliseconds
    #[arg(long, global = true, env = "INTERIO_MAX_LOCK_WAIT_MS")]
    max_lock_wait_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create an admin user, or promote an existing user to admin
    CreateAdmin {
        /// Phone number identifying the user
        #[arg(long)]
        phone: String,
    },
    /// Recompute every subject's rating from approved reviews
    RecalcAll,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_config =
        TomlConfig::load(cli.config.as_deref()).context("Failed to load config file")?;
    let overrides = ConfigOverrides {
        bind_addr: cli.bind_addr.clone(),
        database_path: cli.database_path.clone(),
        log_level: cli.log_level.clone(),
        max_lock_wait_ms: cli.max_lock_wait_ms,
    };
    let config = Config::resolve(overrides, file_config).context("Invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    // Build identification first, before any database work
    info!(
        "Starting Interio ratings service (interio-rt) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // Config loading runs before tracing is up, so the outcome is logged here
    match locate_config_file(cli.config.as_deref()) {
        Some(path) if path.exists() => info!("Config file: {}", path.display()),
        Some(path) => warn!("Config file {} not found, using defaults", path.display()),
        None => info!("No config file found, using defaults"),
    }
    info!("Database path: {}", config.database_path.display());

    let pool = interio_rt::db::init_database_pool(&config.database_path)
        .await
        .with_context(|| {
            format!("Failed to open database {}", config.database_path.display())
        })?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(pool, &config).await,
        Command::CreateAdmin { phone } => create_admin(&pool, &phone).await,
        Command::RecalcAll => recalc_all(pool, &config).await,
    }
}

async fn serve(pool: SqlitePool, config: &Config) -> Result<()> {
    let shared_secret = load_shared_secret(&pool)
        .await
        .context("Failed to load API shared secret")?;
    info!("✓ Loaded shared secret for API authentication");

    let state = AppState::new(
        pool,
        shared_secret,
        config.max_lock_wait_ms,
        config.leaderboard,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("interio-rt listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn create_admin(pool: &SqlitePool, phone: &str) -> Result<()> {
    let user_id = bootstrap_admin(pool, phone).await?;
    println!("{}", user_id);
    Ok(())
}

/// Promote (and reactivate) the user with `phone`, or create a new admin
async fn bootstrap_admin(pool: &SqlitePool, phone: &str) -> Result<i64> {
    let existing = users::find_user_by_phone(pool, phone)
        .await
        .context("Failed to look up user")?;

    match existing {
        Some(user) => {
            users::set_user_role(pool, user.id, Role::Admin).await?;
            users::set_user_active(pool, user.id, true).await?;
            info!(user_id = user.id, "Existing user promoted to admin");
            Ok(user.id)
        }
        None => {
            let user = users::insert_user(pool, phone, Role::Admin)
                .await
                .context("Failed to create admin user")?;
            info!(user_id = user.id, "Admin user created");
            Ok(user.id)
        }
    }
}

async fn recalc_all(pool: SqlitePool, config: &Config) -> Result<()> {
    let aggregator = Aggregator::new(pool, config.max_lock_wait_ms);
    let processed = aggregator
        .recompute_all()
        .await
        .context("Rating reconciliation failed")?;
    println!("Recomputed {} ratings", processed);
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
