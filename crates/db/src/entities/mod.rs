//! `SeaORM` entity definitions.

pub mod clients;
pub mod payables;
pub mod payments;
pub mod sea_orm_active_enums;
