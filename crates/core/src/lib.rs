//! Core business logic for Cobro.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. All domain types, validation rules, and calculations live
//! here.
//!
//! # Modules
//!
//! - `settlement` - Partial-payment settlement engine for invoices and fee notes
//! - `import` - Row validation for CSV bulk import

pub mod import;
pub mod settlement;
