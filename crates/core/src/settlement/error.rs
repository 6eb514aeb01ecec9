//! Settlement error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during settlement operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    /// Payment amount must be strictly positive.
    #[error("Payment amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// No further payments are accepted on a fully paid payable.
    #[error("Payable is already fully paid")]
    AlreadySettled,

    /// The payment would push `total_paid` past the amount owed.
    #[error("Payment of {payment} exceeds remaining balance of {remaining}")]
    Overpayment {
        /// Rejected payment amount.
        payment: Decimal,
        /// Balance still owed before the payment.
        remaining: Decimal,
    },

    /// An amount edit may never drop below what has been recorded as paid.
    #[error("Amount {amount} is below the recorded paid total {total_paid}")]
    AmountBelowPaid {
        /// Proposed new amount.
        amount: Decimal,
        /// Paid total the edit would strand.
        total_paid: Decimal,
    },

    /// Payable amounts are never negative.
    #[error("Payable amount must not be negative, got {0}")]
    NegativeAmount(Decimal),
}

impl SettlementError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::AlreadySettled => "ALREADY_SETTLED",
            Self::Overpayment { .. } => "OVERPAYMENT_REJECTED",
            Self::AmountBelowPaid { .. } => "INVALID_AMOUNT_EDIT",
            Self::NegativeAmount(_) => "NEGATIVE_AMOUNT",
        }
    }

    /// Returns the HTTP status code for this error.
    ///
    /// All settlement errors are client errors; the store layer adds its own
    /// 5xx-mapped variants.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount(_) | Self::NegativeAmount(_) => 400,
            Self::AlreadySettled | Self::Overpayment { .. } | Self::AmountBelowPaid { .. } => 422,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SettlementError::InvalidAmount(dec!(0)).error_code(),
            "INVALID_AMOUNT"
        );
        assert_eq!(
            SettlementError::AlreadySettled.error_code(),
            "ALREADY_SETTLED"
        );
        assert_eq!(
            SettlementError::Overpayment {
                payment: dec!(600),
                remaining: dec!(500),
            }
            .error_code(),
            "OVERPAYMENT_REJECTED"
        );
        assert_eq!(
            SettlementError::AmountBelowPaid {
                amount: dec!(200),
                total_paid: dec!(300),
            }
            .error_code(),
            "INVALID_AMOUNT_EDIT"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(SettlementError::InvalidAmount(dec!(-1)).http_status_code(), 400);
        assert_eq!(SettlementError::AlreadySettled.http_status_code(), 422);
    }

    #[test]
    fn test_error_display() {
        let err = SettlementError::Overpayment {
            payment: dec!(600),
            remaining: dec!(500),
        };
        assert_eq!(
            err.to_string(),
            "Payment of 600 exceeds remaining balance of 500"
        );
    }
}
