//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::auth_middleware};
use cobro_core::settlement::PayableKind;

pub mod clients;
pub mod health;
pub mod payables;
pub mod payments;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Everything except the health check requires authentication
    let protected_routes = Router::new()
        .merge(clients::routes())
        .nest("/invoices", payables::routes(PayableKind::Invoice))
        .nest("/fee-notes", payables::routes(PayableKind::FeeNote))
        .merge(payments::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new().merge(health::routes()).merge(protected_routes)
}
