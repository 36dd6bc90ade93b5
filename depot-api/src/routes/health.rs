/// Health check endpoint
///
/// Verifies that the server is running and that both stores answer.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": { "public": "connected", "private": "connected" }
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use depot_shared::db::pool::health_check as ping;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` when every store is connected, `degraded` otherwise
    pub status: String,

    /// Application version
    pub version: String,

    pub database: DatabaseHealth,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseHealth {
    pub public: String,
    pub private: String,
}

async fn store_status(pool: &PgPool) -> String {
    match ping(pool).await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Health check query failed");
            "disconnected".to_string()
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let public = store_status(state.stores.public().pool()).await;
    let private = store_status(state.stores.private().pool()).await;

    let healthy = public == "connected" && private == "connected";

    Ok(Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: DatabaseHealth { public, private },
    }))
}
