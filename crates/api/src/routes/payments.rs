//! Payment routes.
//!
//! Recording and listing payments hang off the parent payable's router
//! (`/invoices/{id}/payments`, `/fee-notes/{id}/payments`); deleting a
//! payment is kind-agnostic and lives at `/payments/{id}`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::delete,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::routes::payables::settlement_error_response;
use crate::{AppState, middleware::AuthUser};
use cobro_db::repositories::payment::{CreatePaymentInput, PaymentError};
use cobro_db::PaymentRepository;

/// Request body for recording a payment.
#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    /// Payment amount; must be positive and within the open balance.
    pub amount: Decimal,
    /// When the payment was made; defaults to now.
    pub paid_at: Option<DateTime<Utc>>,
    /// Free-form note.
    pub note: Option<String>,
}

/// Creates the kind-agnostic payment routes (requires auth middleware applied
/// externally).
pub fn routes() -> Router<AppState> {
    Router::new().route("/payments/{id}", delete(remove_payment))
}

/// POST /{id}/payments - Record a payment and settle the payable.
pub(crate) async fn add_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreatePaymentRequest>,
) -> Response {
    if let Err(forbidden) = auth.require_billing_writer() {
        return forbidden;
    }

    let repo = PaymentRepository::new((*state.db).clone());
    match repo
        .add_payment(CreatePaymentInput {
            payable_id: id,
            amount: payload.amount,
            paid_at: payload.paid_at,
            note: payload.note,
        })
        .await
    {
        Ok((payment, payable)) => {
            info!(
                payment_id = %payment.id,
                payable_id = %payable.id,
                status = ?payable.status,
                "Payment recorded"
            );
            (
                StatusCode::CREATED,
                Json(json!({ "payment": payment, "payable": payable })),
            )
                .into_response()
        }
        Err(e) => payment_error_response(&e),
    }
}

/// GET /{id}/payments - List a payable's payments, newest first.
pub(crate) async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Response {
    let repo = PaymentRepository::new((*state.db).clone());
    match repo.list_for_payable(id).await {
        Ok(payments) => (StatusCode::OK, Json(json!({ "payments": payments }))).into_response(),
        Err(e) => payment_error_response(&e),
    }
}

/// DELETE /payments/{id} - Delete a payment and re-settle the payable.
async fn remove_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Response {
    if let Err(forbidden) = auth.require_billing_writer() {
        return forbidden;
    }

    let repo = PaymentRepository::new((*state.db).clone());
    match repo.remove_payment(id).await {
        Ok(Some(payable)) => {
            info!(
                payment_id = %id,
                payable_id = %payable.id,
                status = ?payable.status,
                "Payment deleted"
            );
            (StatusCode::OK, Json(json!({ "payable": payable }))).into_response()
        }
        Ok(None) => {
            info!(payment_id = %id, "Orphan payment deleted");
            (StatusCode::OK, Json(json!({ "payable": null }))).into_response()
        }
        Err(e) => payment_error_response(&e),
    }
}

/// Maps a repository error onto an HTTP response.
fn payment_error_response(error: &PaymentError) -> Response {
    match error {
        PaymentError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "NOT_FOUND",
                "message": format!("Payment not found: {id}")
            })),
        )
            .into_response(),
        PaymentError::PayableNotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "NOT_FOUND",
                "message": format!("Payable not found: {id}")
            })),
        )
            .into_response(),
        PaymentError::Settlement(e) => settlement_error_response(e),
        PaymentError::Database(e) => {
            error!(error = %e, "Database error in payment operation");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "internal_error",
                    "message": "An error occurred"
                })),
            )
                .into_response()
        }
    }
}
