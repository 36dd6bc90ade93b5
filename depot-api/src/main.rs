//! # Depot API Server
//!
//! Serves projects, users and memberships over HTTP with Basic login and
//! JWT bearer authentication.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p depot-api
//! ```

use depot_api::{
    app::{build_router, AppState},
    config::Config,
};
use depot_shared::db::{
    migrations::run_migrations,
    pool::create_pool,
    store::{Store, StoreKind, StoreSelector},
};
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn connect(config: &Config, url: &str, kind: StoreKind) -> anyhow::Result<PgPool> {
    let pool = create_pool(&config.pool_config(url)).await?;

    if config.database.run_migrations {
        run_migrations(&pool).await?;
    }

    tracing::info!(store = %kind, "Store ready");
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "depot_api=debug,depot_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Depot API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let public_pool = connect(&config, &config.database.url, StoreKind::Public).await?;
    let private_pool = if config.database.private_url == config.database.url {
        public_pool.clone()
    } else {
        connect(&config, &config.database.private_url, StoreKind::Private).await?
    };

    let retry = config.retry_policy();
    let stores = StoreSelector::new(
        Store::new(public_pool, StoreKind::Public, retry.clone()),
        Store::new(private_pool, StoreKind::Private, retry),
    );

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(stores, config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received, exiting...");
        })
        .await?;

    Ok(())
}
