//! Payable repository for invoice and fee-note database operations.
//!
//! All settlement-field writes (amount, total_paid, status, paid_date) happen
//! inside a transaction holding a `SELECT ... FOR UPDATE` lock on the payable
//! row, so concurrent payments and edits against the same payable serialize.

use chrono::{NaiveDate, NaiveTime, Utc};
use cobro_core::import::{validate_row, RawRow, RowError, ValidRow};
use cobro_core::settlement::{
    PayableKind, PayableState, ProposedEdit, SettlementEngine, SettlementError,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{clients, payables, payments, sea_orm_active_enums};

/// Error types for payable operations.
#[derive(Debug, thiserror::Error)]
pub enum PayableError {
    /// Payable not found.
    #[error("Payable not found: {0}")]
    NotFound(Uuid),

    /// Referenced client not found.
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// An invoice with this number already exists.
    #[error("An invoice with number {0} already exists")]
    DuplicateNumber(String),

    /// Invoices require a document number.
    #[error("Invoices require a document number")]
    MissingNumber,

    /// Settlement rule violation.
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// One or more import rows were refused; nothing was committed.
    #[error("{} import row(s) failed validation", .0.len())]
    Import(Vec<RowError>),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a payable.
///
/// Creation always starts `pending` with a zero paid total; status can only
/// move through payments or a reconciled edit.
#[derive(Debug, Clone)]
pub struct CreatePayableInput {
    /// Invoice or fee note.
    pub kind: PayableKind,
    /// Document number, required for invoices.
    pub number: Option<String>,
    /// Owning client's tax id.
    pub client_tax_id: String,
    /// Issue date.
    pub issue_date: NaiveDate,
    /// Amount owed.
    pub amount: Decimal,
}

/// Input for updating a payable. `None` fields are left unchanged.
///
/// Amount and status changes go through direct-edit reconciliation against
/// the recorded payment history.
#[derive(Debug, Clone, Default)]
pub struct UpdatePayableInput {
    /// New document number.
    pub number: Option<String>,
    /// New owning client tax id.
    pub client_tax_id: Option<String>,
    /// New issue date.
    pub issue_date: Option<NaiveDate>,
    /// New amount owed.
    pub amount: Option<Decimal>,
    /// Requested target status.
    pub status: Option<cobro_core::settlement::PayableStatus>,
}

/// Filter options for listing payables.
#[derive(Debug, Clone, Default)]
pub struct PayableFilter {
    /// Filter by owning client tax id.
    pub client_tax_id: Option<String>,
    /// Filter by issue date range start (inclusive).
    pub date_from: Option<NaiveDate>,
    /// Filter by issue date range end (inclusive).
    pub date_to: Option<NaiveDate>,
    /// Filter by issue year; combines with `month`.
    pub year: Option<i32>,
    /// Filter by issue month (1-12); requires `year`.
    pub month: Option<u32>,
}

/// A payable enriched with its owner's display name.
///
/// `client_name` is `None` when the referenced client no longer exists.
#[derive(Debug, Clone)]
pub struct PayableWithOwner {
    /// The payable row.
    pub payable: payables::Model,
    /// Owning client's display name, if the client still exists.
    pub client_name: Option<String>,
}

/// Writes a settlement state back onto a payable active model.
pub(crate) fn apply_settlement_state(
    active: &mut payables::ActiveModel,
    state: &PayableState,
) {
    active.amount = Set(state.amount);
    active.total_paid = Set(state.total_paid);
    active.status = Set(state.status.into());
    active.paid_date = Set(state.paid_date.map(Into::into));
    active.updated_at = Set(Utc::now().into());
}

/// Sums the payments recorded against a payable, inside the caller's
/// transaction.
pub(crate) async fn recorded_total<C: ConnectionTrait>(
    conn: &C,
    payable_id: Uuid,
) -> Result<Decimal, DbErr> {
    let rows = payments::Entity::find()
        .filter(payments::Column::PayableId.eq(payable_id))
        .all(conn)
        .await?;
    Ok(rows.iter().map(|payment| payment.amount).sum())
}

/// Payable repository for CRUD, reconciliation and bulk import.
#[derive(Debug, Clone)]
pub struct PayableRepository {
    db: DatabaseConnection,
}

impl PayableRepository {
    /// Creates a new payable repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a new payable in `pending` status.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The referenced client does not exist
    /// - The amount is negative
    /// - An invoice is missing its number, or the number is already taken
    pub async fn create(&self, input: CreatePayableInput) -> Result<payables::Model, PayableError> {
        if input.amount < Decimal::ZERO {
            return Err(SettlementError::NegativeAmount(input.amount).into());
        }

        let client = clients::Entity::find()
            .filter(clients::Column::TaxId.eq(&input.client_tax_id))
            .one(&self.db)
            .await?;
        if client.is_none() {
            return Err(PayableError::ClientNotFound(input.client_tax_id));
        }

        let number = match input.kind {
            PayableKind::Invoice => {
                let number = input.number.ok_or(PayableError::MissingNumber)?;
                self.ensure_number_free(&self.db, &number).await?;
                Some(number)
            }
            PayableKind::FeeNote => None,
        };

        let now = Utc::now().into();
        let state = PayableState::new(input.amount);
        let payable = payables::ActiveModel {
            id: Set(Uuid::new_v4()),
            kind: Set(input.kind.into()),
            number: Set(number),
            client_tax_id: Set(input.client_tax_id),
            issue_date: Set(input.issue_date),
            paid_date: Set(None),
            status: Set(state.status.into()),
            amount: Set(state.amount),
            total_paid: Set(state.total_paid),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(payable.insert(&self.db).await?)
    }

    /// Fetches a payable with its owner's name.
    ///
    /// # Errors
    ///
    /// Returns [`PayableError::NotFound`] if no payable of this kind has the
    /// id.
    pub async fn get(
        &self,
        kind: PayableKind,
        id: Uuid,
    ) -> Result<PayableWithOwner, PayableError> {
        let payable = self.find_of_kind(kind, id).await?;
        let client = clients::Entity::find()
            .filter(clients::Column::TaxId.eq(&payable.client_tax_id))
            .one(&self.db)
            .await?;

        Ok(PayableWithOwner {
            payable,
            client_name: client.map(|client| client.name),
        })
    }

    /// Lists payables of a kind, newest issue date first, with owner names.
    ///
    /// Explicit date bounds win over `year`/`month` when both are supplied.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn list(
        &self,
        kind: PayableKind,
        filter: &PayableFilter,
    ) -> Result<Vec<PayableWithOwner>, PayableError> {
        let mut query = payables::Entity::find()
            .filter(payables::Column::Kind.eq(sea_orm_active_enums::PayableKind::from(kind)))
            .order_by_desc(payables::Column::IssueDate);

        if let Some(tax_id) = &filter.client_tax_id {
            query = query.filter(payables::Column::ClientTaxId.eq(tax_id));
        }

        let (from, to) = resolve_date_bounds(filter);
        if let Some(from) = from {
            query = query.filter(payables::Column::IssueDate.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(payables::Column::IssueDate.lte(to));
        }

        let rows = query.all(&self.db).await?;
        self.attach_owner_names(rows).await
    }

    /// Applies a direct edit, reconciling settlement fields against the
    /// recorded payment history.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The payable does not exist
    /// - A new client tax id does not resolve to a client
    /// - A new invoice number is already taken
    /// - Reconciliation refuses the edit (negative amount, or amount below
    ///   the recorded paid total)
    pub async fn update(
        &self,
        kind: PayableKind,
        id: Uuid,
        input: UpdatePayableInput,
    ) -> Result<payables::Model, PayableError> {
        if let Some(tax_id) = &input.client_tax_id {
            let client = clients::Entity::find()
                .filter(clients::Column::TaxId.eq(tax_id))
                .one(&self.db)
                .await?;
            if client.is_none() {
                return Err(PayableError::ClientNotFound(tax_id.clone()));
            }
        }

        let txn = self.db.begin().await?;

        let payable = payables::Entity::find_by_id(id)
            .filter(payables::Column::Kind.eq(
                sea_orm_active_enums::PayableKind::from(kind),
            ))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(PayableError::NotFound(id))?;

        if let Some(number) = &input.number {
            if payable.number.as_deref() != Some(number.as_str()) {
                self.ensure_number_free(&txn, number).await?;
            }
        }

        let total = recorded_total(&txn, payable.id).await?;
        let proposed = ProposedEdit {
            amount: input.amount,
            status: input.status,
        };
        let state = SettlementEngine::reconcile_edit(
            &payable.settlement_state(),
            &proposed,
            total,
            Utc::now(),
        )?;

        let mut active: payables::ActiveModel = payable.into();
        if let Some(number) = input.number {
            active.number = Set(Some(number));
        }
        if let Some(tax_id) = input.client_tax_id {
            active.client_tax_id = Set(tax_id);
        }
        if let Some(issue_date) = input.issue_date {
            active.issue_date = Set(issue_date);
        }
        apply_settlement_state(&mut active, &state);

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        Ok(updated)
    }

    /// Deletes a payable; its payments cascade-delete with it.
    ///
    /// # Errors
    ///
    /// Returns [`PayableError::NotFound`] if no payable of this kind has the
    /// id.
    pub async fn delete(&self, kind: PayableKind, id: Uuid) -> Result<(), PayableError> {
        let payable = self.find_of_kind(kind, id).await?;
        payables::Entity::delete_by_id(payable.id)
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Imports a batch of CSV rows, all-or-nothing.
    ///
    /// Every row is validated (field formats in core, duplicate numbers and
    /// unknown clients here) before anything is written. A single failing row
    /// aborts the whole batch and reports every row error collected.
    ///
    /// # Errors
    ///
    /// Returns [`PayableError::Import`] carrying one entry per refused row,
    /// or a database error.
    pub async fn bulk_import(
        &self,
        kind: PayableKind,
        rows: &[RawRow],
    ) -> Result<Vec<payables::Model>, PayableError> {
        let mut errors = Vec::new();
        let mut valid: Vec<(usize, ValidRow)> = Vec::new();
        for row in rows {
            match validate_row(kind, row) {
                Ok(parsed) => valid.push((row.line, parsed)),
                Err(error) => errors.push(error),
            }
        }

        let txn = self.db.begin().await?;

        let mut seen_numbers: HashSet<String> = HashSet::new();
        for (line, row) in &valid {
            if let Some(number) = &row.number {
                let duplicate = !seen_numbers.insert(number.clone())
                    || self.find_by_number(&txn, number).await?.is_some();
                if duplicate {
                    errors.push(RowError {
                        line: *line,
                        details: vec![format!("an invoice with number {number} already exists")],
                    });
                    continue;
                }
            }

            let client = clients::Entity::find()
                .filter(clients::Column::TaxId.eq(&row.client_tax_id))
                .one(&txn)
                .await?;
            if client.is_none() {
                errors.push(RowError {
                    line: *line,
                    details: vec![format!(
                        "client with tax id {} does not exist",
                        row.client_tax_id
                    )],
                });
            }
        }

        if !errors.is_empty() {
            txn.rollback().await?;
            errors.sort_by_key(|error| error.line);
            return Err(PayableError::Import(errors));
        }

        let now = Utc::now();
        let mut inserted = Vec::with_capacity(valid.len());
        for (_, row) in valid {
            let payable = payables::ActiveModel {
                id: Set(Uuid::new_v4()),
                kind: Set(kind.into()),
                number: Set(row.number),
                client_tax_id: Set(row.client_tax_id),
                issue_date: Set(row.issue_date),
                paid_date: Set(row
                    .paid_date
                    .map(|date| date.and_time(NaiveTime::MIN).and_utc().into())),
                status: Set(row.status.into()),
                amount: Set(row.amount),
                total_paid: Set(row.total_paid),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            };
            inserted.push(payable.insert(&txn).await?);
        }

        txn.commit().await?;
        debug!(count = inserted.len(), kind = kind.as_str(), "Import batch committed");
        Ok(inserted)
    }

    /// Finds a payable by id, checking it has the expected kind.
    async fn find_of_kind(
        &self,
        kind: PayableKind,
        id: Uuid,
    ) -> Result<payables::Model, PayableError> {
        payables::Entity::find_by_id(id)
            .filter(payables::Column::Kind.eq(
                sea_orm_active_enums::PayableKind::from(kind),
            ))
            .one(&self.db)
            .await?
            .ok_or(PayableError::NotFound(id))
    }

    /// Fails if an invoice already uses this number.
    async fn ensure_number_free<C: ConnectionTrait>(
        &self,
        conn: &C,
        number: &str,
    ) -> Result<(), PayableError> {
        if self.find_by_number(conn, number).await?.is_some() {
            return Err(PayableError::DuplicateNumber(number.to_owned()));
        }
        Ok(())
    }

    async fn find_by_number<C: ConnectionTrait>(
        &self,
        conn: &C,
        number: &str,
    ) -> Result<Option<payables::Model>, DbErr> {
        payables::Entity::find()
            .filter(payables::Column::Number.eq(number))
            .one(conn)
            .await
    }

    /// Resolves owner names for a page of payables in one query.
    async fn attach_owner_names(
        &self,
        rows: Vec<payables::Model>,
    ) -> Result<Vec<PayableWithOwner>, PayableError> {
        let tax_ids: Vec<String> = rows
            .iter()
            .map(|payable| payable.client_tax_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let names: HashMap<String, String> = clients::Entity::find()
            .filter(clients::Column::TaxId.is_in(tax_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|client| (client.tax_id, client.name))
            .collect();

        Ok(rows
            .into_iter()
            .map(|payable| {
                let client_name = names.get(&payable.client_tax_id).cloned();
                PayableWithOwner {
                    payable,
                    client_name,
                }
            })
            .collect())
    }
}

/// Resolves a filter's date bounds: explicit bounds win, otherwise
/// `year`/`month` expand to a calendar range.
fn resolve_date_bounds(filter: &PayableFilter) -> (Option<NaiveDate>, Option<NaiveDate>) {
    if filter.date_from.is_some() || filter.date_to.is_some() {
        return (filter.date_from, filter.date_to);
    }

    let Some(year) = filter.year else {
        return (None, None);
    };

    let (from, until) = match filter.month {
        Some(month @ 1..=12) => {
            let from = NaiveDate::from_ymd_opt(year, month, 1);
            let until = if month == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(year, month + 1, 1)
            };
            (from, until)
        }
        _ => (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year + 1, 1, 1),
        ),
    };

    (from, until.and_then(|date| date.pred_opt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_bounds_win_over_year() {
        let filter = PayableFilter {
            date_from: NaiveDate::from_ymd_opt(2024, 2, 1),
            year: Some(2023),
            ..PayableFilter::default()
        };

        let (from, to) = resolve_date_bounds(&filter);
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(to, None);
    }

    #[test]
    fn test_year_expands_to_full_year() {
        let filter = PayableFilter {
            year: Some(2024),
            ..PayableFilter::default()
        };

        let (from, to) = resolve_date_bounds(&filter);
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(to, NaiveDate::from_ymd_opt(2024, 12, 31));
    }

    #[test]
    fn test_year_month_expands_to_calendar_month() {
        let filter = PayableFilter {
            year: Some(2024),
            month: Some(2),
            ..PayableFilter::default()
        };

        let (from, to) = resolve_date_bounds(&filter);
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(to, NaiveDate::from_ymd_opt(2024, 2, 29));
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let filter = PayableFilter {
            year: Some(2024),
            month: Some(12),
            ..PayableFilter::default()
        };

        let (from, to) = resolve_date_bounds(&filter);
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 12, 1));
        assert_eq!(to, NaiveDate::from_ymd_opt(2024, 12, 31));
    }

    #[test]
    fn test_out_of_range_month_falls_back_to_year() {
        let filter = PayableFilter {
            year: Some(2024),
            month: Some(13),
            ..PayableFilter::default()
        };

        let (from, to) = resolve_date_bounds(&filter);
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(to, NaiveDate::from_ymd_opt(2024, 12, 31));
    }
}
