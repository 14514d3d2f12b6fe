pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod messages;
pub mod projects;
pub mod res;

use axum::{extract::FromRef, routing::get, Router};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult, Json};

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub keys: auth::Keys,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: &config::Config) -> Self {
        Self {
            db_pool,
            keys: auth::Keys::new(config.jwt_secret.as_bytes(), config.token_ttl_hours),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth::router())
        .nest("/api/projects", projects::router())
        .nest("/api/messages", messages::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> &'static str {
    "ok"
}
