//! Property-based tests for the settlement engine.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::engine::{derive_status, SettlementEngine};
use super::error::SettlementError;
use super::types::{PayableState, PayableStatus, ProposedEdit};

/// Strategy to generate positive decimal amounts (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a payable amount and a sequence of payment amounts.
fn payment_sequence() -> impl Strategy<Value = (Decimal, Vec<Decimal>)> {
    (positive_amount(), prop::collection::vec(positive_amount(), 0..20))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Status is a pure function of (amount, total_paid)
    // =========================================================================

    /// Any state produced by applying a payment satisfies
    /// `status == derive_status(amount, total_paid)`.
    #[test]
    fn prop_applied_state_matches_derived_status(
        amount in positive_amount(),
        payment in positive_amount(),
    ) {
        let state = PayableState::new(amount);
        if let Ok(next) = SettlementEngine::apply_payment(&state, payment, Utc::now()) {
            prop_assert_eq!(next.status, derive_status(next.amount, next.total_paid));
        }
    }

    /// Any state produced by reverting a payment satisfies the same invariant.
    #[test]
    fn prop_reverted_state_matches_derived_status(
        amount in positive_amount(),
        payment in positive_amount(),
        removed in positive_amount(),
    ) {
        let state = PayableState::new(amount);
        if let Ok(paid) = SettlementEngine::apply_payment(&state, payment, Utc::now()) {
            let next = SettlementEngine::revert_payment(&paid, removed);
            prop_assert_eq!(next.status, derive_status(next.amount, next.total_paid));
        }
    }

    // =========================================================================
    // No sequence of accepted payments can overpay
    // =========================================================================

    /// *For any* sequence of payments, accepted ones never push `total_paid`
    /// above `amount`, and a rejected payment leaves the state unchanged.
    #[test]
    fn prop_payment_sequences_never_overpay(
        (amount, payments) in payment_sequence(),
    ) {
        let mut state = PayableState::new(amount);
        for payment in payments {
            match SettlementEngine::apply_payment(&state, payment, Utc::now()) {
                Ok(next) => state = next,
                Err(
                    SettlementError::Overpayment { .. }
                    | SettlementError::AlreadySettled
                    | SettlementError::InvalidAmount(_),
                ) => {}
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
            prop_assert!(state.total_paid <= state.amount);
            prop_assert!(state.total_paid >= Decimal::ZERO);
        }
    }

    /// `paid_date` is set exactly when the status is `Paid`.
    #[test]
    fn prop_paid_date_tracks_paid_status(
        (amount, payments) in payment_sequence(),
    ) {
        let mut state = PayableState::new(amount);
        for payment in payments {
            if let Ok(next) = SettlementEngine::apply_payment(&state, payment, Utc::now()) {
                state = next;
            }
            prop_assert_eq!(state.paid_date.is_some(), state.status == PayableStatus::Paid);
        }
    }

    // =========================================================================
    // Add then remove round-trips
    // =========================================================================

    /// Removing a payment that was just applied restores the prior state
    /// (up to `paid_date`, which is cleared on leaving `Paid`).
    #[test]
    fn prop_add_then_remove_round_trips(
        amount in positive_amount(),
        first in positive_amount(),
        second in positive_amount(),
    ) {
        let state = PayableState::new(amount);
        let Ok(before) = SettlementEngine::apply_payment(&state, first, Utc::now()) else {
            return Ok(());
        };
        let Ok(after) = SettlementEngine::apply_payment(&before, second, Utc::now()) else {
            return Ok(());
        };
        let restored = SettlementEngine::revert_payment(&after, second);

        prop_assert_eq!(restored.amount, before.amount);
        prop_assert_eq!(restored.total_paid, before.total_paid);
        prop_assert_eq!(restored.status, before.status);
    }

    // =========================================================================
    // Direct-edit reconciliation
    // =========================================================================

    /// A successful edit never leaves `total_paid` above `amount`, and the
    /// persisted status always agrees with the derivation.
    #[test]
    fn prop_reconcile_never_exceeds_amount(
        amount in positive_amount(),
        new_amount in positive_amount(),
        recorded in positive_amount(),
    ) {
        let current = PayableState::new(amount);
        let proposed = ProposedEdit {
            amount: Some(new_amount),
            status: None,
        };
        if let Ok(next) =
            SettlementEngine::reconcile_edit(&current, &proposed, recorded, Utc::now())
        {
            prop_assert!(next.total_paid <= next.amount);
            prop_assert_eq!(next.status, derive_status(next.amount, next.total_paid));
        }
    }

    /// Marking paid always yields a fully-covered payable.
    #[test]
    fn prop_mark_paid_pins_total_to_amount(
        amount in positive_amount(),
        recorded in positive_amount(),
    ) {
        let current = PayableState::new(amount);
        let proposed = ProposedEdit {
            amount: None,
            status: Some(PayableStatus::Paid),
        };
        let next = SettlementEngine::reconcile_edit(&current, &proposed, recorded, Utc::now());
        prop_assert!(next.is_ok());
        let next = next.unwrap();
        prop_assert_eq!(next.total_paid, next.amount);
        prop_assert_eq!(next.status, PayableStatus::Paid);
    }
}
