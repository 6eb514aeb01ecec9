//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for clients, invoices, fee notes and payments
//! - Authentication and role middleware
//! - Response types

pub mod middleware;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use cobro_shared::JwtService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use sea_orm::DatabaseConnection;

    use cobro_shared::{JwtConfig, JwtService};

    use crate::AppState;

    /// Builds an [`AppState`] over a disconnected pool, for tests that only
    /// exercise routing and never reach the database.
    pub(crate) fn disconnected_state() -> AppState {
        AppState {
            db: Arc::new(DatabaseConnection::Disconnected),
            jwt_service: Arc::new(JwtService::new(JwtConfig::default())),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
