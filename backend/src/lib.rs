//! Papelería POS - Backend
//!
//! Point-of-sale and inventory REST API for a stationery shop: catalog,
//! suppliers, customers, purchases, sales and the stock movements they cause.

use axum::{routing::get, Router};
use shared::stock::StockEngine;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub engine: StockEngine,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: Config) -> Result<Self, ::config::ConfigError> {
        let engine = StockEngine::new(config.store.utc_offset()?);
        Ok(Self {
            db,
            config: Arc::new(config),
            engine,
        })
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Papelería POS API v1.0"
}
