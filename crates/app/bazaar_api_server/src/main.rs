//! Bazaar API server binary.
//!
//! Connects to PostgreSQL, applies migrations and serves the auth API.
//! `--in-memory` skips the database entirely, which is handy for local
//! frontend work but loses every account on restart.

use std::sync::Arc;

use bazaar_core::auth::memory::{MemoryTokenLedger, MemoryUserStore};
use bazaar_core::auth::queries::{PgTokenLedger, PgUserStore};
use bazaar_core::auth::{TokenAuthority, TokenLedger, UserStore};
use bazaar_core::config::AuthConfig;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "bazaar_api_server", about = "Bazaar API server")]
struct Args {
    /// Interface to bind.
    #[arg(long, env = "BAZAAR_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on (0 = ephemeral).
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/bazaar"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep users and refresh tokens in process memory instead of PostgreSQL.
    #[arg(long, default_value_t = false)]
    in_memory: bool,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("info,bazaar_api=debug,bazaar_core=debug")
                }),
        )
        .init();

    let args = Args::parse();
    let auth_config = AuthConfig::from_env()?;
    info!(
        access_ttl_secs = auth_config.access_ttl.num_seconds(),
        refresh_ttl_secs = auth_config.refresh_ttl.num_seconds(),
        "loaded auth config"
    );

    let (users, ledger): (Arc<dyn UserStore>, Arc<dyn TokenLedger>) = if args.in_memory {
        warn!("in-memory mode: accounts and sessions are lost on exit");
        (
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryTokenLedger::new()),
        )
    } else {
        info!(
            max_connections = args.max_connections,
            "configuring connection pool"
        );
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(&args.database_url)
            .await?;

        info!("running database migrations");
        bazaar_core::migrate::migrate(&pool).await?;

        (
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgTokenLedger::new(pool)),
        )
    };

    let mut config = bazaar_api::config::ApiConfig::from_env();
    config.bind_addr = format!("{}:{}", args.host, args.port);
    config.database_url = args.database_url;

    let state = bazaar_api::AppState {
        authority: Arc::new(TokenAuthority::new(auth_config, users, ledger)),
        config: config.clone(),
    };
    let app = bazaar_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
