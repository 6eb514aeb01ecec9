//! Invoice and fee-note routes.
//!
//! Both kinds share one set of handlers; the router is instantiated twice,
//! with the kind injected as an extension. Invoices live under `/invoices`,
//! fee notes under `/fee-notes`.

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{AppState, middleware::AuthUser, routes::payments};
use cobro_core::import::RawRow;
use cobro_core::settlement::{PayableKind, PayableStatus};
use cobro_db::entities::payables;
use cobro_db::repositories::payable::{
    CreatePayableInput, PayableError, PayableFilter, PayableWithOwner, UpdatePayableInput,
};
use cobro_db::PayableRepository;

/// Request body for creating a payable.
#[derive(Debug, Deserialize)]
pub struct CreatePayableRequest {
    /// Document number, required for invoices.
    pub number: Option<String>,
    /// Owning client's tax id.
    pub client_tax_id: String,
    /// Issue date (`YYYY-MM-DD`).
    pub issue_date: NaiveDate,
    /// Amount owed.
    pub amount: Decimal,
}

/// Request body for updating a payable. Omitted fields are left unchanged.
#[derive(Debug, Deserialize, Default)]
pub struct UpdatePayableRequest {
    /// New document number.
    pub number: Option<String>,
    /// New owning client tax id.
    pub client_tax_id: Option<String>,
    /// New issue date.
    pub issue_date: Option<NaiveDate>,
    /// New amount owed.
    pub amount: Option<Decimal>,
    /// Requested target status (`pending` | `partially_paid` | `paid`).
    pub status: Option<String>,
}

/// Query parameters for listing payables.
#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    /// Filter by owning client tax id.
    pub client_tax_id: Option<String>,
    /// Issue date range start (inclusive).
    pub from: Option<NaiveDate>,
    /// Issue date range end (inclusive).
    pub to: Option<NaiveDate>,
    /// Issue year.
    pub year: Option<i32>,
    /// Issue month (1-12), combined with `year`.
    pub month: Option<u32>,
}

/// One CSV record as parsed at the HTTP boundary.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    client_tax_id: String,
    #[serde(default)]
    issue_date: String,
    #[serde(default)]
    paid_date: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    amount: String,
}

/// Creates the payable router for one kind (requires auth middleware applied
/// externally).
pub fn routes(kind: PayableKind) -> Router<AppState> {
    Router::new()
        .route("/", get(list_payables).post(create_payable))
        .route("/import", post(import_payables))
        .route("/by-client/{tax_id}", get(list_by_client))
        .route(
            "/{id}",
            get(get_payable)
                .patch(update_payable)
                .delete(delete_payable),
        )
        .route(
            "/{id}/payments",
            post(payments::add_payment).get(payments::list_payments),
        )
        .layer(Extension(kind))
}

/// GET / - List payables of this kind, with owner names.
async fn list_payables(
    State(state): State<AppState>,
    Extension(kind): Extension<PayableKind>,
    Query(query): Query<ListQuery>,
) -> Response {
    let repo = PayableRepository::new((*state.db).clone());
    let filter = PayableFilter {
        client_tax_id: query.client_tax_id,
        date_from: query.from,
        date_to: query.to,
        year: query.year,
        month: query.month,
    };

    match repo.list(kind, &filter).await {
        Ok(rows) => {
            let body: Vec<_> = rows.iter().map(payable_body).collect();
            (StatusCode::OK, Json(json!({ "payables": body }))).into_response()
        }
        Err(e) => payable_error_response(&e),
    }
}

/// POST / - Create a payable in `pending` status.
async fn create_payable(
    State(state): State<AppState>,
    Extension(kind): Extension<PayableKind>,
    auth: AuthUser,
    Json(payload): Json<CreatePayableRequest>,
) -> Response {
    if let Err(forbidden) = auth.require_billing_writer() {
        return forbidden;
    }

    let repo = PayableRepository::new((*state.db).clone());
    match repo
        .create(CreatePayableInput {
            kind,
            number: payload.number,
            client_tax_id: payload.client_tax_id,
            issue_date: payload.issue_date,
            amount: payload.amount,
        })
        .await
    {
        Ok(created) => {
            info!(id = %created.id, kind = kind.as_str(), "Payable created");
            (StatusCode::CREATED, Json(created)).into_response()
        }
        Err(e) => payable_error_response(&e),
    }
}

/// GET /by-client/{tax_id} - List payables of this kind owned by one client.
async fn list_by_client(
    State(state): State<AppState>,
    Extension(kind): Extension<PayableKind>,
    Path(tax_id): Path<String>,
) -> Response {
    let repo = PayableRepository::new((*state.db).clone());
    let filter = PayableFilter {
        client_tax_id: Some(tax_id),
        ..PayableFilter::default()
    };

    match repo.list(kind, &filter).await {
        Ok(rows) => {
            let body: Vec<_> = rows.iter().map(payable_body).collect();
            (StatusCode::OK, Json(json!({ "payables": body }))).into_response()
        }
        Err(e) => payable_error_response(&e),
    }
}

/// GET /{id} - Fetch a payable with its owner's name.
async fn get_payable(
    State(state): State<AppState>,
    Extension(kind): Extension<PayableKind>,
    Path(id): Path<Uuid>,
) -> Response {
    let repo = PayableRepository::new((*state.db).clone());
    match repo.get(kind, id).await {
        Ok(found) => (StatusCode::OK, Json(payable_body(&found))).into_response(),
        Err(e) => payable_error_response(&e),
    }
}

/// PATCH /{id} - Direct edit, reconciled against the payment history.
async fn update_payable(
    State(state): State<AppState>,
    Extension(kind): Extension<PayableKind>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePayableRequest>,
) -> Response {
    if let Err(forbidden) = auth.require_billing_writer() {
        return forbidden;
    }

    let status = match payload.status.as_deref() {
        None => None,
        Some(raw) => match PayableStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "VALIDATION",
                        "message": format!(
                            "status \"{raw}\" is not one of pending, partially_paid, paid"
                        )
                    })),
                )
                    .into_response();
            }
        },
    };

    let repo = PayableRepository::new((*state.db).clone());
    match repo
        .update(
            kind,
            id,
            UpdatePayableInput {
                number: payload.number,
                client_tax_id: payload.client_tax_id,
                issue_date: payload.issue_date,
                amount: payload.amount,
                status,
            },
        )
        .await
    {
        Ok(updated) => {
            info!(id = %updated.id, status = ?updated.status, "Payable updated");
            (StatusCode::OK, Json(updated)).into_response()
        }
        Err(e) => payable_error_response(&e),
    }
}

/// DELETE /{id} - Delete a payable and its payments.
async fn delete_payable(
    State(state): State<AppState>,
    Extension(kind): Extension<PayableKind>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Response {
    if let Err(forbidden) = auth.require_billing_writer() {
        return forbidden;
    }

    let repo = PayableRepository::new((*state.db).clone());
    match repo.delete(kind, id).await {
        Ok(()) => {
            info!(%id, kind = kind.as_str(), "Payable deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => payable_error_response(&e),
    }
}

/// POST /import - Bulk import payables from a `;`-delimited CSV body.
///
/// All-or-nothing: a single refused row aborts the batch and the response
/// carries every row error collected.
async fn import_payables(
    State(state): State<AppState>,
    Extension(kind): Extension<PayableKind>,
    auth: AuthUser,
    body: String,
) -> Response {
    if let Err(forbidden) = auth.require_billing_writer() {
        return forbidden;
    }

    if body.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "VALIDATION",
                "message": "The request body must contain a CSV document"
            })),
        )
            .into_response();
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    let mut malformed = Vec::new();
    for (index, record) in reader.deserialize::<CsvRecord>().enumerate() {
        let line = index + 1;
        match record {
            Ok(record) => rows.push(RawRow {
                line,
                number: record.number,
                client_tax_id: record.client_tax_id,
                issue_date: record.issue_date,
                paid_date: record.paid_date,
                status: record.status,
                amount: record.amount,
            }),
            Err(e) => malformed.push(json!({
                "line": line,
                "details": [format!("malformed CSV row: {e}")]
            })),
        }
    }

    if !malformed.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "IMPORT_FAILED",
                "message": "One or more rows could not be parsed; nothing was imported",
                "rows": malformed
            })),
        )
            .into_response();
    }

    let repo = PayableRepository::new((*state.db).clone());
    match repo.bulk_import(kind, &rows).await {
        Ok(imported) => {
            info!(count = imported.len(), kind = kind.as_str(), "Bulk import committed");
            (
                StatusCode::OK,
                Json(json!({
                    "imported": imported.len(),
                    "payables": imported
                })),
            )
                .into_response()
        }
        Err(e) => payable_error_response(&e),
    }
}

/// Serializes a payable together with its owner's name.
fn payable_body(row: &PayableWithOwner) -> serde_json::Value {
    flatten_owner(&row.payable, row.client_name.as_deref())
}

fn flatten_owner(payable: &payables::Model, client_name: Option<&str>) -> serde_json::Value {
    let mut value = serde_json::to_value(payable).unwrap_or_default();
    if let serde_json::Value::Object(map) = &mut value {
        map.insert("client_name".to_owned(), json!(client_name));
    }
    value
}

/// Maps a repository error onto an HTTP response.
pub(crate) fn payable_error_response(error: &PayableError) -> Response {
    match error {
        PayableError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "NOT_FOUND",
                "message": format!("Payable not found: {id}")
            })),
        )
            .into_response(),
        PayableError::ClientNotFound(tax_id) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "CLIENT_NOT_FOUND",
                "message": format!("Client not found: {tax_id}")
            })),
        )
            .into_response(),
        PayableError::DuplicateNumber(number) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "DUPLICATE_NUMBER",
                "message": format!("An invoice with number {number} already exists")
            })),
        )
            .into_response(),
        PayableError::MissingNumber => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "VALIDATION",
                "message": "Invoices require a document number"
            })),
        )
            .into_response(),
        PayableError::Settlement(e) => settlement_error_response(e),
        PayableError::Import(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "IMPORT_FAILED",
                "message": format!(
                    "{} import row(s) failed validation; nothing was imported",
                    errors.len()
                ),
                "rows": errors
            })),
        )
            .into_response(),
        PayableError::Database(e) => {
            error!(error = %e, "Database error in payable operation");
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

/// Maps a settlement rule violation onto an HTTP response.
pub(crate) fn settlement_error_response(
    error: &cobro_core::settlement::SettlementError,
) -> Response {
    let status = StatusCode::from_u16(error.http_status_code())
        .unwrap_or(StatusCode::UNPROCESSABLE_ENTITY);
    (
        status,
        Json(json!({
            "error": error.error_code(),
            "message": error.to_string()
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::test_support::disconnected_state;

    fn app(kind: PayableKind) -> Router {
        routes(kind).with_state(disconnected_state())
    }

    #[tokio::test]
    async fn test_update_is_registered_as_patch() {
        let id = Uuid::new_v4();
        let response = app(PayableKind::Invoice)
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/{id}"))
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        // No claims in the extensions, so the extractor rejects with 401;
        // an unregistered method would have been 405.
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_does_not_answer_put() {
        let id = Uuid::new_v4();
        let response = app(PayableKind::Invoice)
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/{id}"))
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_by_client_listing_is_routed_for_both_kinds() {
        for kind in [PayableKind::Invoice, PayableKind::FeeNote] {
            let response = app(kind)
                .oneshot(
                    Request::builder()
                        .uri("/by-client/11111111-1")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            // The disconnected pool turns the lookup into a database error;
            // a missing route would have been 404.
            assert_ne!(response.status(), StatusCode::NOT_FOUND);
            assert_ne!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        }
    }
}
