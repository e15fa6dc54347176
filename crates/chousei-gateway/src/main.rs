use std::net::SocketAddr;
use std::sync::Arc;

use chousei_core::ChouseiConfig;
use clap::Parser;
use tracing::{info, warn};

mod app;
mod auth;
mod error;
mod http;

/// Chousei scheduling gateway.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to chousei.toml. Falls back to $CHOUSEI_CONFIG, then
    /// ~/.chousei/chousei.toml.
    #[arg(long, value_name = "path")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chousei_gateway=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("CHOUSEI_CONFIG").ok());
    let config = ChouseiConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        ChouseiConfig::default()
    });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");
    let db = rusqlite::Connection::open(&db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;

    let state = Arc::new(app::AppState::new(config, db)?);
    info!(
        auth = ?state.config.gateway.auth.mode,
        tz = state.tz.name(),
        "database ready"
    );
    if let Some(warning) = auth::unguarded_identity_warning(&state.config.gateway.auth) {
        warn!("{warning}");
    }
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Chousei gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(path = %parent.display(), error = %e, "could not create database directory");
        }
    }
}
