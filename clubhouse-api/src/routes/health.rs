/// Health, info and index endpoints
///
/// None of these require authentication.
///
/// # Endpoints
///
/// ```text
/// GET /             # API index
/// GET /api/health   # service and database status
/// GET /api/info     # endpoint groups and version
/// ```
///
/// # Health Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "pool": { "active_connections": 1, "idle_connections": 4, "total_connections": 5 }
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use clubhouse_shared::{
    db::pool::{self, PoolStats},
    redis::RedisStats,
};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: &'static str,

    pub version: &'static str,

    /// "connected" or "disconnected"
    pub database: &'static str,

    pub pool: PoolStats,

    /// Only present when the Redis revocation store is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisStats>,
}

#[derive(Debug, Serialize)]
pub struct EndpointGroup {
    pub prefix: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: &'static [EndpointGroup],
}

const ENDPOINTS: &[EndpointGroup] = &[
    EndpointGroup {
        prefix: "/api/auth",
        description: "Registration, login, tokens and user accounts",
    },
    EndpointGroup {
        prefix: "/api/players",
        description: "Squad roster and player statistics",
    },
    EndpointGroup {
        prefix: "/api/matches",
        description: "Fixtures, results and per-player match statistics",
    },
    EndpointGroup {
        prefix: "/api/trainings",
        description: "Training sessions and attendance",
    },
    EndpointGroup {
        prefix: "/api/finances",
        description: "Club income and expenses",
    },
    EndpointGroup {
        prefix: "/api/news",
        description: "Club news and announcements",
    },
];

/// Health check handler
///
/// Always answers 200; a failed database probe only downgrades `status`.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database = match pool::health_check(&state.db).await {
        Ok(()) => "connected",
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            "disconnected"
        }
    };

    let redis = match &state.redis {
        Some(client) => Some(client.stats().await),
        None => None,
    };
    let redis_ok = redis.as_ref().map_or(true, |stats| stats.healthy);

    Ok(Json(HealthResponse {
        status: if database == "connected" && redis_ok {
            "healthy"
        } else {
            "degraded"
        },
        version: env!("CARGO_PKG_VERSION"),
        database,
        pool: pool::get_pool_stats(&state.db),
        redis,
    }))
}

pub async fn info() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "Clubhouse API",
        version: env!("CARGO_PKG_VERSION"),
        description: "Football club administration backend",
        endpoints: ENDPOINTS,
    })
}

pub async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Clubhouse API",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/api/health",
        "info": "/api/info",
    }))
}
