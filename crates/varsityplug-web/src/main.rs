//! Varsity Plug web server
//!
//! Run with: cargo run -p varsityplug-web

use anyhow::Context;
use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use varsityplug_admissions::Catalog;
use varsityplug_config::Config;
use varsityplug_db::{Database, SessionRepository, UniversityRepository};
use varsityplug_web::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("invalid configuration")?;

    let default_filter = if config.server.debug { "info,varsityplug=debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    info!("Starting Varsity Plug v{}", env!("CARGO_PKG_VERSION"));
    if config.server.debug {
        tracing::warn!("DEBUG is on; do not run this configuration in production");
    }

    let db = Database::open(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("could not open database {}", config.database.url))?;
    db.initialize().await?;
    let db = std::sync::Arc::new(db);

    let catalog = Catalog::embedded()?;
    let seeded = UniversityRepository::new(db.clone()).seed(&catalog).await?;
    info!("University catalog seeded ({} entries)", seeded);

    let purged = SessionRepository::new(db.clone()).purge_expired(Utc::now()).await?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    let stats = db.stats().await?;
    info!(
        "Database ready: {} users, {} universities, {} documents, {} payments",
        stats.users, stats.universities, stats.documents, stats.payments
    );

    tokio::fs::create_dir_all(&config.server.media_root)
        .await
        .with_context(|| format!("could not create media root {}", config.server.media_root.display()))?;

    let bind_addr = config.server.bind_addr.clone();
    let state = AppState::new(db, config, catalog)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("could not bind {bind_addr}"))?;
    info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
