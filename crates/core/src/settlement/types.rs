//! Settlement domain types.
//!
//! Invoices and fee notes share one state machine, tagged by [`PayableKind`];
//! nothing in the settlement rules differs between the two kinds.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of billable document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayableKind {
    /// Invoice ("factura").
    Invoice,
    /// Professional-fee note ("honorario").
    FeeNote,
}

impl PayableKind {
    /// Returns the snake_case string form used in APIs and storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::FeeNote => "fee_note",
        }
    }
}

/// Payment status of a payable.
///
/// The only valid combinations at rest are:
/// - `Pending` with `total_paid == 0`
/// - `PartiallyPaid` with `0 < total_paid < amount`
/// - `Paid` with `total_paid == amount`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayableStatus {
    /// No payments recorded.
    Pending,
    /// Partially covered by payments.
    PartiallyPaid,
    /// Fully paid.
    Paid,
}

impl PayableStatus {
    /// Returns the snake_case string form used in APIs and storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PartiallyPaid => "partially_paid",
            Self::Paid => "paid",
        }
    }

    /// Parses a status string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "partially_paid" => Some(Self::PartiallyPaid),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// The settlement-relevant state of a payable.
///
/// This is the slice of an invoice/fee-note row the engine reads and
/// rewrites. Identity, owner, and dates other than `paid_date` never change
/// through settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayableState {
    /// Total amount owed.
    pub amount: Decimal,
    /// Sum of recorded payments.
    pub total_paid: Decimal,
    /// Derived payment status.
    pub status: PayableStatus,
    /// When the payable became fully paid, if it is.
    pub paid_date: Option<DateTime<Utc>>,
}

impl PayableState {
    /// A fresh, unpaid payable of the given amount.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self {
            amount,
            total_paid: Decimal::ZERO,
            status: PayableStatus::Pending,
            paid_date: None,
        }
    }

    /// Outstanding balance still owed.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        self.amount - self.total_paid
    }
}

/// A direct edit proposed for a payable, outside the payment flow.
///
/// `None` fields are left unchanged. A supplied `status` is a target the
/// reconciliation may override when the recorded payment history contradicts
/// it.
#[derive(Debug, Clone, Default)]
pub struct ProposedEdit {
    /// New total amount owed.
    pub amount: Option<Decimal>,
    /// Requested target status.
    pub status: Option<PayableStatus>,
}
