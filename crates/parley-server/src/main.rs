//! Parley Server
//!
//! Token-authenticated chat server: HTTP account routes plus a websocket
//! relay for live messages.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use parley_core::config::{self, Config};
use parley_core::tracing_init::init_tracing;
use parley_crypto::{CredentialHasher, HashParams};
use parley_server::auth::JwtManager;
use parley_server::http::build_router;
use parley_server::state::AppState;
use parley_server::storage::ChatDatabase;

const PURGE_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Parser, Debug)]
#[command(name = "parley-server")]
#[command(version, about = "Parley chat server - accounts, tokens and realtime relay")]
struct Args {
    /// Address to listen on.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Token signing key. Required; there is no default.
    #[arg(long, env = "PARLEY_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Access token TTL in seconds.
    #[arg(long)]
    access_ttl: Option<i64>,

    /// Refresh token TTL in seconds.
    #[arg(long)]
    refresh_ttl: Option<i64>,

    /// Settings file to use instead of the global one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(addr) = self.addr {
            config.server.addr = addr;
        }
        if let Some(path) = &self.db_path {
            config.server.database_path = Some(path.clone());
        }
        if let Some(ttl) = self.access_ttl {
            config.auth.access_ttl_secs = ttl;
        }
        if let Some(ttl) = self.refresh_ttl {
            config.auth.refresh_ttl_secs = ttl;
        }
        if self.log_json {
            config.server.log_json = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = config::load_config(args.config.as_deref())?;
    args.apply(&mut config);

    init_tracing("parley_server=info", config.server.log_json)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.addr,
        "Starting parley-server"
    );

    let secret = args.jwt_secret.as_deref().unwrap_or_default();
    let jwt = JwtManager::new(
        secret.as_bytes(),
        config.auth.access_ttl_secs,
        config.auth.refresh_ttl_secs,
    )?;

    let db_path = config
        .server
        .database_path
        .clone()
        .or_else(config::database_path)
        .ok_or_else(|| anyhow::anyhow!("Cannot determine database path; pass --db-path"))?;
    info!(path = %db_path.display(), "Opening chat database");
    let db = ChatDatabase::open(&db_path).await?;

    let hasher = CredentialHasher::new(HashParams {
        memory_kib: config.auth.hash_memory_kib,
        iterations: config.auth.hash_iterations,
        parallelism: config.auth.hash_parallelism,
    })?;
    let state = AppState::new(db.clone(), jwt, hasher, config.auth.salt_len);

    // Hourly purge of expired refresh tokens.
    let purge_tokens = state.tokens.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            match purge_tokens.purge_expired().await {
                Ok(removed) if removed > 0 => {
                    info!(removed, "Expired refresh tokens purged");
                }
                Err(e) => {
                    warn!(error = %e, "Refresh token purge failed");
                }
                _ => {}
            }
        }
    });

    let listener = tokio::net::TcpListener::bind(config.server.addr).await?;
    info!(addr = %config.server.addr, "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Received shutdown signal");
        })
        .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}
