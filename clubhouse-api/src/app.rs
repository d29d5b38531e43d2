/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use clubhouse_api::{app::AppState, config::Config};
/// use clubhouse_shared::auth::revocation::PgRevocationStore;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let revocation = Arc::new(PgRevocationStore::new(pool.clone()));
/// let state = AppState::new(pool, config, revocation);
/// let app = clubhouse_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use clubhouse_shared::{
    auth::{
        jwt::{JwtError, TokenPair},
        revocation::RevocationStore,
    },
    redis::RedisClient,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,

    /// Revoked token ids, checked on every authenticated request
    pub revocation: Arc<dyn RevocationStore>,

    /// Present when revocations live in Redis; reported by the health check
    pub redis: Option<RedisClient>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, revocation: Arc<dyn RevocationStore>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            revocation,
            redis: None,
        }
    }

    pub fn with_redis(mut self, client: RedisClient) -> Self {
        self.redis = Some(client);
        self
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Issues an access and refresh token with the configured lifetimes
    pub fn issue_tokens(&self, user_id: Uuid) -> Result<TokenPair, JwtError> {
        TokenPair::issue(
            user_id,
            self.jwt_secret(),
            self.config.jwt.access_ttl(),
            self.config.jwt.refresh_ttl(),
        )
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /                               # API index
/// └── /api/
///     ├── /health, /info          # public
///     ├── /auth/                  # register, login, refresh, logout, profile, users
///     ├── /players/               # roster, season stats
///     ├── /matches/               # fixtures, results, per-player stats
///     ├── /trainings/             # sessions, attendance
///     ├── /finances/              # transactions, approval, summary
///     └── /news/                  # articles (public reads)
/// ```
///
/// Authentication is per handler: handlers that take an `AuthContext`
/// argument require a valid bearer token.
///
/// # Middleware Stack
///
/// Applied in order (outermost last):
/// 1. Request tracing (tower-http TraceLayer)
/// 2. Body size limit (16 MiB)
/// 3. Response compression
/// 4. CORS
/// 5. Security headers
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/logout", post(routes::auth::logout))
        .route(
            "/profile",
            get(routes::auth::get_profile).put(routes::auth::update_profile),
        )
        .route("/change-password", post(routes::auth::change_password))
        .route("/users", get(routes::auth::list_users))
        .route("/users/:id/deactivate", post(routes::auth::deactivate_user))
        .route("/users/:id/activate", post(routes::auth::activate_user));

    let player_routes = Router::new()
        .route(
            "/",
            get(routes::players::list_players).post(routes::players::create_player),
        )
        .route("/positions", get(routes::players::list_positions))
        .route(
            "/:id",
            get(routes::players::get_player)
                .put(routes::players::update_player)
                .delete(routes::players::delete_player),
        )
        .route("/:id/stats", get(routes::players::player_stats));

    let match_routes = Router::new()
        .route(
            "/",
            get(routes::matches::list_matches).post(routes::matches::create_match),
        )
        .route("/upcoming", get(routes::matches::upcoming_matches))
        .route("/results", get(routes::matches::recent_results))
        .route(
            "/:id",
            get(routes::matches::get_match)
                .put(routes::matches::update_match)
                .delete(routes::matches::delete_match),
        )
        .route("/:id/result", post(routes::matches::set_result))
        .route(
            "/:id/stats",
            get(routes::matches::match_stats).post(routes::matches::record_stats),
        );

    let training_routes = Router::new()
        .route(
            "/",
            get(routes::trainings::list_trainings).post(routes::trainings::create_training),
        )
        .route("/upcoming", get(routes::trainings::upcoming_trainings))
        .route("/today", get(routes::trainings::todays_trainings))
        .route(
            "/:id",
            get(routes::trainings::get_training)
                .put(routes::trainings::update_training)
                .delete(routes::trainings::delete_training),
        )
        .route(
            "/:id/attendance",
            get(routes::trainings::get_attendance).post(routes::trainings::mark_attendance),
        );

    let finance_routes = Router::new()
        .route(
            "/",
            get(routes::finances::list_finances).post(routes::finances::create_finance),
        )
        .route("/summary", get(routes::finances::financial_summary))
        .route("/categories", get(routes::finances::list_categories))
        .route(
            "/:id",
            get(routes::finances::get_finance)
                .put(routes::finances::update_finance)
                .delete(routes::finances::delete_finance),
        )
        .route("/:id/approve", post(routes::finances::approve_finance))
        .route("/:id/reject", post(routes::finances::reject_finance))
        .route("/:id/complete", post(routes::finances::complete_finance));

    let news_routes = Router::new()
        .route(
            "/",
            get(routes::news::list_news).post(routes::news::create_news),
        )
        .route("/featured", get(routes::news::featured_news))
        .route("/breaking", get(routes::news::breaking_news))
        .route("/recent", get(routes::news::recent_news))
        .route("/search", get(routes::news::search_news))
        .route("/categories", get(routes::news::list_categories))
        .route("/slug/:slug", get(routes::news::get_news_by_slug))
        .route(
            "/:id",
            get(routes::news::get_news)
                .put(routes::news::update_news)
                .delete(routes::news::delete_news),
        )
        .route("/:id/publish", post(routes::news::publish_news))
        .route("/:id/unpublish", post(routes::news::unpublish_news))
        .route("/:id/like", post(routes::news::like_news))
        .route("/:id/unlike", post(routes::news::unlike_news));

    let api_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/info", get(routes::health::info))
        .nest("/auth", auth_routes)
        .nest("/players", player_routes)
        .nest("/matches", match_routes)
        .nest("/trainings", training_routes)
        .nest("/finances", finance_routes)
        .nest("/news", news_routes);

    let cors = cors_layer(&state.config.api.cors_origins);
    let production = state.config.api.production;

    Router::new()
        .route("/", get(routes::health::index))
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}
