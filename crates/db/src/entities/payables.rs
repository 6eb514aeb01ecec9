//! `SeaORM` Entity for payables table.
//!
//! One table holds both invoices and fee notes, tagged by `kind`. The client
//! reference is a loose tax-id string, not a foreign key: deleting a client
//! leaves its payables readable with a null owner name.

use chrono::Utc;
use cobro_core::settlement::PayableState;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{PayableKind, PayableStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "payables")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: PayableKind,
    /// Document number; set for invoices, null for fee notes.
    pub number: Option<String>,
    pub client_tax_id: String,
    pub issue_date: Date,
    pub paid_date: Option<DateTimeWithTimeZone>,
    pub status: PayableStatus,
    pub amount: Decimal,
    pub total_paid: Decimal,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// The slice of this row the settlement engine reads.
    #[must_use]
    pub fn settlement_state(&self) -> PayableState {
        PayableState {
            amount: self.amount,
            total_paid: self.total_paid,
            status: self.status.clone().into(),
            paid_date: self.paid_date.map(|date| date.with_timezone(&Utc)),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
