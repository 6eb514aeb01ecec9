//! Postgres enum mappings for payable columns.

use cobro_core::settlement;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of billable document (`payable_kind` enum).
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payable_kind")]
#[serde(rename_all = "snake_case")]
pub enum PayableKind {
    /// Invoice ("factura").
    #[sea_orm(string_value = "invoice")]
    Invoice,
    /// Professional-fee note ("honorario").
    #[sea_orm(string_value = "fee_note")]
    FeeNote,
}

/// Payment status of a payable (`payable_status` enum).
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payable_status")]
#[serde(rename_all = "snake_case")]
pub enum PayableStatus {
    /// No payments recorded.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Partially covered by payments.
    #[sea_orm(string_value = "partially_paid")]
    PartiallyPaid,
    /// Fully paid.
    #[sea_orm(string_value = "paid")]
    Paid,
}

impl From<settlement::PayableKind> for PayableKind {
    fn from(kind: settlement::PayableKind) -> Self {
        match kind {
            settlement::PayableKind::Invoice => Self::Invoice,
            settlement::PayableKind::FeeNote => Self::FeeNote,
        }
    }
}

impl From<PayableKind> for settlement::PayableKind {
    fn from(kind: PayableKind) -> Self {
        match kind {
            PayableKind::Invoice => Self::Invoice,
            PayableKind::FeeNote => Self::FeeNote,
        }
    }
}

impl From<settlement::PayableStatus> for PayableStatus {
    fn from(status: settlement::PayableStatus) -> Self {
        match status {
            settlement::PayableStatus::Pending => Self::Pending,
            settlement::PayableStatus::PartiallyPaid => Self::PartiallyPaid,
            settlement::PayableStatus::Paid => Self::Paid,
        }
    }
}

impl From<PayableStatus> for settlement::PayableStatus {
    fn from(status: PayableStatus) -> Self {
        match status {
            PayableStatus::Pending => Self::Pending,
            PayableStatus::PartiallyPaid => Self::PartiallyPaid,
            PayableStatus::Paid => Self::Paid,
        }
    }
}
