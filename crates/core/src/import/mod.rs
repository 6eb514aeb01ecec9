//! Row validation for CSV bulk import of payables.
//!
//! Parsing the CSV itself happens at the API boundary; this module validates
//! the extracted fields of each row and produces either a typed row ready for
//! insertion or a per-row error report. Nothing here touches the database, so
//! duplicate-number and unknown-client checks live in the repository layer.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::settlement::{PayableKind, PayableStatus};

/// One CSV row as raw strings, before validation.
///
/// `line` is the 1-based data-row index used in error reports. `number` is
/// only meaningful for invoices; fee-note imports carry no document number.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    /// 1-based data-row index.
    pub line: usize,
    /// Document number (invoices only).
    pub number: Option<String>,
    /// Owning client's tax id.
    pub client_tax_id: String,
    /// Issue date, `DD-MM-YYYY` or `MM/DD/YYYY`.
    pub issue_date: String,
    /// Paid date, optional, same formats.
    pub paid_date: String,
    /// Target status; empty defaults to `pending`.
    pub status: String,
    /// Amount owed.
    pub amount: String,
}

/// A row that passed field validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRow {
    /// Document number (invoices only).
    pub number: Option<String>,
    /// Owning client's tax id.
    pub client_tax_id: String,
    /// Parsed issue date.
    pub issue_date: NaiveDate,
    /// Parsed paid date, set only for `paid` rows.
    pub paid_date: Option<NaiveDate>,
    /// Status the row loads with.
    pub status: PayableStatus,
    /// Amount owed.
    pub amount: Decimal,
    /// Paid total the row loads with.
    pub total_paid: Decimal,
}

/// A failed row with the reasons it was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based data-row index.
    pub line: usize,
    /// Human-readable reasons the row was refused.
    pub details: Vec<String>,
}

impl RowError {
    fn new(line: usize, detail: impl Into<String>) -> Self {
        Self {
            line,
            details: vec![detail.into()],
        }
    }
}

/// Parses a date in either `DD-MM-YYYY` or `MM/DD/YYYY` form.
///
/// The separator decides the field order: `-` means day-first, `/` means
/// month-first. Two-digit years are taken as 2000-based. Returns `None` for
/// anything else, including calendar-invalid dates such as `31-02-2024`.
#[must_use]
pub fn parse_flexible_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    let day_first = input.contains('-');
    let sep = if day_first { '-' } else { '/' };

    let mut parts = input.split(sep);
    let a: u32 = parts.next()?.parse().ok()?;
    let b: u32 = parts.next()?.parse().ok()?;
    let mut year: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    if year < 100 {
        year += 2000;
    }

    let (day, month) = if day_first { (a, b) } else { (b, a) };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Validates one raw row for a payable of the given kind.
///
/// Invoices require a document number; both kinds require a client tax id,
/// an issue date and an amount. An empty status defaults to `pending`. Rows
/// declaring `partially_paid` are refused: an import carries no payment
/// records to back a partial total. Rows declaring `paid` load with
/// `total_paid = amount` and a paid date (falling back to the issue date).
///
/// # Errors
///
/// Returns a [`RowError`] listing every missing required field, or the first
/// format problem encountered after the required-field check.
pub fn validate_row(kind: PayableKind, row: &RawRow) -> Result<ValidRow, RowError> {
    let mut missing = Vec::new();
    let number = row.number.as_deref().map(str::trim).unwrap_or_default();
    if kind == PayableKind::Invoice && number.is_empty() {
        missing.push("the \"number\" field is required".to_owned());
    }
    if row.client_tax_id.trim().is_empty() {
        missing.push("the \"client_tax_id\" field is required".to_owned());
    }
    if row.issue_date.trim().is_empty() {
        missing.push("the \"issue_date\" field is required".to_owned());
    }
    if row.amount.trim().is_empty() {
        missing.push("the \"amount\" field is required".to_owned());
    }
    if !missing.is_empty() {
        return Err(RowError {
            line: row.line,
            details: missing,
        });
    }

    let Some(issue_date) = parse_flexible_date(&row.issue_date) else {
        return Err(RowError::new(
            row.line,
            format!(
                "issue date \"{}\" is not a valid DD-MM-YYYY or MM/DD/YYYY date",
                row.issue_date.trim()
            ),
        ));
    };

    let paid_date = match row.paid_date.trim() {
        "" => None,
        raw => match parse_flexible_date(raw) {
            Some(date) => Some(date),
            None => {
                return Err(RowError::new(
                    row.line,
                    format!("paid date \"{raw}\" is not a valid DD-MM-YYYY or MM/DD/YYYY date"),
                ));
            }
        },
    };

    let Ok(amount) = row.amount.trim().parse::<Decimal>() else {
        return Err(RowError::new(
            row.line,
            format!("amount \"{}\" is not a valid number", row.amount.trim()),
        ));
    };
    if amount < Decimal::ZERO {
        return Err(RowError::new(
            row.line,
            format!("amount {amount} must not be negative"),
        ));
    }

    let status = match row.status.trim() {
        "" => PayableStatus::Pending,
        raw => match PayableStatus::parse(raw) {
            Some(status) => status,
            None => {
                return Err(RowError::new(
                    row.line,
                    format!("status \"{raw}\" is not one of pending, partially_paid, paid"),
                ));
            }
        },
    };
    if status == PayableStatus::PartiallyPaid {
        return Err(RowError::new(
            row.line,
            "status partially_paid cannot be imported without payment records".to_owned(),
        ));
    }

    let (total_paid, paid_date) = match status {
        PayableStatus::Paid => (amount, paid_date.or(Some(issue_date))),
        _ => (Decimal::ZERO, None),
    };

    Ok(ValidRow {
        number: (!number.is_empty()).then(|| number.to_owned()),
        client_tax_id: row.client_tax_id.trim().to_owned(),
        issue_date,
        paid_date,
        status,
        amount,
        total_paid,
    })
}
