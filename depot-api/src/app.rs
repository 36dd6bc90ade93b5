/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use depot_api::{app::{build_router, AppState}, config::Config};
/// use depot_shared::db::store::{Store, StoreKind, StoreSelector};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let store = Store::new(pool, StoreKind::Public, config.retry_policy());
/// let private = Store::new(store.pool().clone(), StoreKind::Private, config.retry_policy());
/// let state = AppState::new(StoreSelector::new(store, private), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use depot_shared::auth::jwt::JwtSettings;
use depot_shared::db::store::{Store, StoreSelector};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Public and private stores
    pub stores: Arc<StoreSelector>,

    /// Token signing and verification settings
    pub jwt: Arc<JwtSettings>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(stores: StoreSelector, config: Config) -> Self {
        Self {
            stores: Arc::new(stores),
            jwt: Arc::new(config.jwt_settings()),
            config: Arc::new(config),
        }
    }

    /// The private store when `private` is set, the public one otherwise
    pub fn store(&self, private: bool) -> &Store {
        self.stores.select(private)
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET    /health
/// ├── GET    /login                                  # Basic -> JWT
/// ├── GET    /projects                               # admin only
/// ├── POST   /projects
/// ├── GET|HEAD|PUT|PATCH|DELETE /projects/:code
/// ├── GET|POST|DELETE /projects/:code/user/:username
/// ├── POST   /users
/// ├── GET|PUT|PATCH|DELETE /users/:username
/// ├── GET    /users/:username/isAdmin
/// ├── GET    /users/:username/projects
/// └── GET    /users/:username/projects/withRole/:role
/// ```
///
/// Every endpoint accepts `?private` to operate on the private store.
/// GET routes answer HEAD with the same status and an empty body.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let project_routes = Router::new()
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:code",
            get(routes::projects::get_project)
                .head(routes::projects::head_project)
                .put(routes::projects::put_project)
                .patch(routes::projects::patch_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/projects/:code/user/:username",
            get(routes::members::get_member)
                .post(routes::members::add_member)
                .delete(routes::members::remove_member),
        );

    let user_routes = Router::new()
        .route("/users", post(routes::users::register))
        .route(
            "/users/:username",
            get(routes::users::get_user)
                .put(routes::users::put_user)
                .patch(routes::users::patch_user)
                .delete(routes::users::delete_user),
        )
        .route("/users/:username/isAdmin", get(routes::users::is_admin))
        .route("/users/:username/projects", get(routes::users::list_projects))
        .route(
            "/users/:username/projects/withRole/:role",
            get(routes::users::list_projects_with_role),
        );

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .expose_headers([header::CONTENT_LOCATION])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/login", get(routes::auth::login))
        .merge(project_routes)
        .merge(user_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
