//! Payment repository: recording and deleting payments against payables.
//!
//! Both write paths lock the parent payable row for the duration of the
//! transaction, so two payments racing for the last open balance serialize
//! and the loser sees the settled state.

use chrono::{DateTime, Utc};
use cobro_core::settlement::{SettlementEngine, SettlementError};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{payables, payments};
use crate::repositories::payable::apply_settlement_state;

/// Error types for payment operations.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// Payment not found.
    #[error("Payment not found: {0}")]
    NotFound(Uuid),

    /// Parent payable not found.
    #[error("Payable not found: {0}")]
    PayableNotFound(Uuid),

    /// Settlement rule violation.
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct CreatePaymentInput {
    /// Parent payable id.
    pub payable_id: Uuid,
    /// Payment amount; must be positive and within the open balance.
    pub amount: Decimal,
    /// When the payment was made; defaults to now.
    pub paid_at: Option<DateTime<Utc>>,
    /// Free-form note.
    pub note: Option<String>,
}

/// Payment repository for settlement-coupled payment writes.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    db: DatabaseConnection,
}

impl PaymentRepository {
    /// Creates a new payment repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a payment and settles the parent payable, atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The payable does not exist
    /// - The amount is non-positive, the payable is already settled, or the
    ///   payment would exceed the open balance
    pub async fn add_payment(
        &self,
        input: CreatePaymentInput,
    ) -> Result<(payments::Model, payables::Model), PaymentError> {
        let txn = self.db.begin().await?;

        let payable = lock_payable(&txn, input.payable_id).await?;
        let now = Utc::now();
        let state = SettlementEngine::apply_payment(
            &payable.settlement_state(),
            input.amount,
            now,
        )?;

        let payment = payments::ActiveModel {
            id: Set(Uuid::new_v4()),
            payable_id: Set(payable.id),
            amount: Set(input.amount),
            paid_at: Set(input.paid_at.unwrap_or(now).into()),
            note: Set(input.note),
            created_at: Set(now.into()),
        };
        let payment = payment.insert(&txn).await?;

        let mut active: payables::ActiveModel = payable.into();
        apply_settlement_state(&mut active, &state);
        let payable = active.update(&txn).await?;

        txn.commit().await?;
        debug!(
            payable_id = %payable.id,
            total_paid = %payable.total_paid,
            "Payment applied"
        );
        Ok((payment, payable))
    }

    /// Deletes a payment and settles the parent payable, atomically.
    ///
    /// The payable's status is re-derived from the reduced total; a payable
    /// that was fully paid reopens and loses its paid date. A payment whose
    /// parent no longer exists is deleted as an orphan and `None` is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::NotFound`] if the payment does not exist.
    pub async fn remove_payment(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<payables::Model>, PaymentError> {
        let txn = self.db.begin().await?;

        let payment = payments::Entity::find_by_id(payment_id)
            .one(&txn)
            .await?
            .ok_or(PaymentError::NotFound(payment_id))?;

        let Some(payable) = payables::Entity::find_by_id(payment.payable_id)
            .lock_exclusive()
            .one(&txn)
            .await?
        else {
            // Parent already deleted: remove the orphan and stop.
            let deleted = payments::Entity::delete_by_id(payment.id).exec(&txn).await?;
            if deleted.rows_affected == 0 {
                txn.rollback().await?;
                return Err(PaymentError::NotFound(payment_id));
            }
            txn.commit().await?;
            debug!(payment_id = %payment.id, "Orphan payment removed");
            return Ok(None);
        };

        // The payment was read before the payable lock was acquired; a
        // concurrent removal may have deleted it while this transaction
        // waited. Only revert when this delete actually took the row.
        let deleted = payments::Entity::delete_by_id(payment.id).exec(&txn).await?;
        if deleted.rows_affected == 0 {
            txn.rollback().await?;
            return Err(PaymentError::NotFound(payment_id));
        }

        let state = SettlementEngine::revert_payment(&payable.settlement_state(), payment.amount);

        let mut active: payables::ActiveModel = payable.into();
        apply_settlement_state(&mut active, &state);
        let payable = active.update(&txn).await?;

        txn.commit().await?;
        Ok(Some(payable))
    }

    /// Lists the payments recorded against a payable, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::PayableNotFound`] if the payable does not
    /// exist.
    pub async fn list_for_payable(
        &self,
        payable_id: Uuid,
    ) -> Result<Vec<payments::Model>, PaymentError> {
        let payable = payables::Entity::find_by_id(payable_id)
            .one(&self.db)
            .await?;
        if payable.is_none() {
            return Err(PaymentError::PayableNotFound(payable_id));
        }

        Ok(payments::Entity::find()
            .filter(payments::Column::PayableId.eq(payable_id))
            .order_by_desc(payments::Column::PaidAt)
            .all(&self.db)
            .await?)
    }
}

/// Fetches a payable under a `FOR UPDATE` lock.
async fn lock_payable(
    txn: &DatabaseTransaction,
    payable_id: Uuid,
) -> Result<payables::Model, PaymentError> {
    payables::Entity::find_by_id(payable_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or(PaymentError::PayableNotFound(payable_id))
}
