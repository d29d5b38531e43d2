//! # Clubhouse API Server
//!
//! Serves the club administration API over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/clubhouse \
//! JWT_SECRET=change-me-to-at-least-32-characters \
//! cargo run -p clubhouse-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines and `RUST_LOG` to override the
//! default filter.

use clubhouse_api::{
    app::{build_router, AppState},
    config::Config,
};
use clubhouse_shared::{
    auth::revocation::{PgRevocationStore, RedisRevocationStore, RevocationStore},
    db::{migrations::run_migrations, pool},
    redis::{RedisClient, RedisConfig},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "clubhouse_api=debug,clubhouse_shared=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    tracing::info!(
        "Clubhouse API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    if config.database.run_migrations {
        run_migrations(&db).await?;
    }

    let redis = match &config.redis {
        Some(settings) => Some(RedisClient::new(RedisConfig::new(settings.url.clone())).await?),
        None => None,
    };

    let revocation: Arc<dyn RevocationStore> = match &redis {
        Some(client) => Arc::new(RedisRevocationStore::new(client.clone())),
        None => Arc::new(PgRevocationStore::new(db.clone())),
    };

    match revocation.purge_expired().await {
        Ok(0) => {}
        Ok(purged) => tracing::info!(purged, "Purged expired token revocations"),
        Err(err) => tracing::warn!(error = %err, "Could not purge expired token revocations"),
    }

    let bind_address = config.bind_address();
    let mut state = AppState::new(db.clone(), config, revocation);
    if let Some(client) = redis {
        state = state.with_redis(client);
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!(address = %bind_address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}
