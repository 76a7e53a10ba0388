use anyhow::Result;
use clap::Parser;
use mockable::DefaultClock;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use marketplace_service::api::{self, AppState};
use marketplace_service::blob::LocalBlobStore;
use marketplace_service::config::Args;
use marketplace_service::credentials::Argon2Credentials;
use marketplace_service::{build_pool, run_migrations};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log_filter))
        .init();

    info!("Running database migrations...");
    run_migrations(&args.database_url)?;

    let pool = build_pool(&args.database_url, args.pool_size).await?;

    tokio::fs::create_dir_all(&args.images_dir).await?;
    let state = AppState::new(
        pool,
        Arc::new(DefaultClock),
        Arc::new(Argon2Credentials),
        Arc::new(LocalBlobStore::new(&args.images_dir)),
    );

    let app = api::create_router(state, &args.images_dir);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;

    info!(
        port = args.port,
        images_dir = %args.images_dir.display(),
        "marketplace service listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
