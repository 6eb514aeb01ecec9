//! Partial-payment settlement engine.
//!
//! This module keeps a payable's `total_paid`, outstanding balance, and
//! status consistent as payments are added, removed, or the document is
//! edited directly:
//! - Status derivation from `(amount, total_paid)`
//! - Pure next-state computation for add/remove payment
//! - Direct-edit reconciliation against the recorded payment history
//! - Error types for settlement operations
//!
//! All functions here are pure: they read a state, compute the next state,
//! and leave persistence and atomicity to the repository layer.

pub mod engine;
pub mod error;
pub mod types;

#[cfg(test)]
mod props;

pub use engine::{SettlementEngine, derive_status};
pub use error::SettlementError;
pub use types::{PayableKind, PayableState, PayableStatus, ProposedEdit};
