//! Settlement engine: pure next-state computation for payment changes.
//!
//! Every path that touches a payable's `total_paid` or `status` goes through
//! this module. The repository layer wraps each computation in a database
//! transaction; nothing here mutates in place.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::error::SettlementError;
use super::types::{PayableState, PayableStatus, ProposedEdit};

/// Derives the status implied by `(amount, total_paid)`.
///
/// This is the single source of truth for status; no code path may set a
/// status except by deriving it here (the direct-edit "mark paid" override
/// satisfies the same rule by pinning `total_paid = amount` first).
///
/// A `total_paid` at or above `amount` maps to `Paid`; callers that can reach
/// that region legally (payment removal on drifted data) clamp the total down
/// to `amount` before persisting.
#[must_use]
pub fn derive_status(amount: Decimal, total_paid: Decimal) -> PayableStatus {
    if total_paid <= Decimal::ZERO {
        PayableStatus::Pending
    } else if total_paid < amount {
        PayableStatus::PartiallyPaid
    } else {
        PayableStatus::Paid
    }
}

/// Settlement engine for payables.
///
/// Pure business logic with no database dependencies: each operation takes
/// the current [`PayableState`] and returns the state to persist.
pub struct SettlementEngine;

impl SettlementEngine {
    /// Computes the state after recording a payment of `payment` at `now`.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::InvalidAmount`] for a non-positive payment
    /// - [`SettlementError::AlreadySettled`] when the payable is fully paid
    /// - [`SettlementError::Overpayment`] when the payment exceeds the
    ///   remaining balance; nothing may be persisted in that case
    pub fn apply_payment(
        state: &PayableState,
        payment: Decimal,
        now: DateTime<Utc>,
    ) -> Result<PayableState, SettlementError> {
        if payment <= Decimal::ZERO {
            return Err(SettlementError::InvalidAmount(payment));
        }
        if state.status == PayableStatus::Paid {
            return Err(SettlementError::AlreadySettled);
        }

        let candidate = state.total_paid + payment;
        if candidate > state.amount {
            return Err(SettlementError::Overpayment {
                payment,
                remaining: state.outstanding(),
            });
        }

        let status = derive_status(state.amount, candidate);
        Ok(PayableState {
            amount: state.amount,
            total_paid: candidate,
            status,
            paid_date: if status == PayableStatus::Paid {
                Some(now)
            } else {
                None
            },
        })
    }

    /// Computes the state after deleting a payment of `payment`.
    ///
    /// The new total is clamped to `[0, amount]` so that drift from any prior
    /// inconsistency cannot persist a negative total or one above the amount
    /// owed. Leaving `Paid` clears `paid_date` for both payable kinds.
    #[must_use]
    pub fn revert_payment(state: &PayableState, payment: Decimal) -> PayableState {
        let new_total = (state.total_paid - payment).max(Decimal::ZERO);
        let status = derive_status(state.amount, new_total);

        PayableState {
            amount: state.amount,
            total_paid: new_total.min(state.amount),
            status,
            paid_date: if status == PayableStatus::Paid {
                state.paid_date
            } else {
                None
            },
        }
    }

    /// Reconciles a direct edit of a payable against its payment history.
    ///
    /// `recorded_total` is the sum of all payments currently referencing the
    /// payable, recomputed by the caller inside the same transaction; it is
    /// the ground truth and never taken from client input.
    ///
    /// Resolution of a requested target status:
    /// - `Paid` is an administrative override: `total_paid` is pinned to the
    ///   new amount even when payment records do not cover it.
    /// - `PartiallyPaid` and `Pending` yield to the recorded total: the
    ///   status is re-derived from it, escalating upward when payments
    ///   already cover more than the target implies.
    /// - No target recomputes everything from the recorded total.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::NegativeAmount`] for a negative proposed amount
    /// - [`SettlementError::AmountBelowPaid`] when, after resolution, the new
    ///   amount is below the recorded paid total
    pub fn reconcile_edit(
        current: &PayableState,
        proposed: &ProposedEdit,
        recorded_total: Decimal,
        now: DateTime<Utc>,
    ) -> Result<PayableState, SettlementError> {
        let amount = proposed.amount.unwrap_or(current.amount);
        if amount < Decimal::ZERO {
            return Err(SettlementError::NegativeAmount(amount));
        }

        let recorded = recorded_total.max(Decimal::ZERO);

        let (total_paid, status) = match proposed.status {
            Some(PayableStatus::Paid) => (amount, PayableStatus::Paid),
            _ => (recorded, derive_status(amount, recorded)),
        };

        if amount < total_paid {
            return Err(SettlementError::AmountBelowPaid { amount, total_paid });
        }

        let paid_date = if status == PayableStatus::Paid {
            // Keep the original paid date when the payable was already paid.
            if current.status == PayableStatus::Paid {
                current.paid_date.or(Some(now))
            } else {
                Some(now)
            }
        } else {
            None
        };

        Ok(PayableState {
            amount,
            total_paid,
            status,
            paid_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn pending(amount: Decimal) -> PayableState {
        PayableState::new(amount)
    }

    // ========================================================================
    // Status derivation
    // ========================================================================

    #[test]
    fn test_derive_status_pending() {
        assert_eq!(derive_status(dec!(1000), dec!(0)), PayableStatus::Pending);
        assert_eq!(derive_status(dec!(1000), dec!(-5)), PayableStatus::Pending);
    }

    #[test]
    fn test_derive_status_partially_paid() {
        assert_eq!(
            derive_status(dec!(1000), dec!(0.01)),
            PayableStatus::PartiallyPaid
        );
        assert_eq!(
            derive_status(dec!(1000), dec!(999.99)),
            PayableStatus::PartiallyPaid
        );
    }

    #[test]
    fn test_derive_status_paid() {
        assert_eq!(derive_status(dec!(1000), dec!(1000)), PayableStatus::Paid);
        assert_eq!(derive_status(dec!(1000), dec!(1200)), PayableStatus::Paid);
    }

    // ========================================================================
    // Add payment (Scenarios A, B, C, E)
    // ========================================================================

    #[test]
    fn test_partial_payment_moves_to_partially_paid() {
        // Scenario A: 1000 pending, pay 600
        let state = pending(dec!(1000));
        let next = SettlementEngine::apply_payment(&state, dec!(600), now()).unwrap();

        assert_eq!(next.total_paid, dec!(600));
        assert_eq!(next.status, PayableStatus::PartiallyPaid);
        assert!(next.paid_date.is_none());
    }

    #[test]
    fn test_final_payment_moves_to_paid_and_sets_paid_date() {
        // Scenario B: continue A with 400
        let state = pending(dec!(1000));
        let state = SettlementEngine::apply_payment(&state, dec!(600), now()).unwrap();
        let next = SettlementEngine::apply_payment(&state, dec!(400), now()).unwrap();

        assert_eq!(next.total_paid, dec!(1000));
        assert_eq!(next.status, PayableStatus::Paid);
        assert!(next.paid_date.is_some());
    }

    #[test]
    fn test_payment_on_paid_payable_rejected() {
        // Scenario C: any further payment on a paid payable is refused
        let state = pending(dec!(1000));
        let state = SettlementEngine::apply_payment(&state, dec!(1000), now()).unwrap();

        assert_eq!(
            SettlementEngine::apply_payment(&state, dec!(1), now()),
            Err(SettlementError::AlreadySettled)
        );
    }

    #[test]
    fn test_overpayment_rejected_leaves_state_untouched() {
        // Scenario E: 600 against a 500 payable
        let state = pending(dec!(500));
        let result = SettlementEngine::apply_payment(&state, dec!(600), now());

        assert_eq!(
            result,
            Err(SettlementError::Overpayment {
                payment: dec!(600),
                remaining: dec!(500),
            })
        );
        assert_eq!(state.total_paid, dec!(0));
        assert_eq!(state.status, PayableStatus::Pending);
    }

    #[test]
    fn test_overpayment_on_partially_paid() {
        let state = pending(dec!(1000));
        let state = SettlementEngine::apply_payment(&state, dec!(800), now()).unwrap();

        let result = SettlementEngine::apply_payment(&state, dec!(300), now());
        assert_eq!(
            result,
            Err(SettlementError::Overpayment {
                payment: dec!(300),
                remaining: dec!(200),
            })
        );
    }

    #[test]
    fn test_zero_and_negative_payments_rejected() {
        let state = pending(dec!(1000));
        assert_eq!(
            SettlementEngine::apply_payment(&state, dec!(0), now()),
            Err(SettlementError::InvalidAmount(dec!(0)))
        );
        assert_eq!(
            SettlementEngine::apply_payment(&state, dec!(-10), now()),
            Err(SettlementError::InvalidAmount(dec!(-10)))
        );
    }

    #[test]
    fn test_exact_remaining_balance_is_accepted() {
        let state = pending(dec!(1000));
        let state = SettlementEngine::apply_payment(&state, dec!(999.99), now()).unwrap();
        let next = SettlementEngine::apply_payment(&state, dec!(0.01), now()).unwrap();

        assert_eq!(next.status, PayableStatus::Paid);
        assert_eq!(next.total_paid, dec!(1000));
    }

    // ========================================================================
    // Remove payment (Scenario D, round-trip)
    // ========================================================================

    #[test]
    fn test_removing_only_payment_returns_to_pending() {
        // Scenario D: 1000 with a single 600 payment, then remove it
        let state = pending(dec!(1000));
        let state = SettlementEngine::apply_payment(&state, dec!(600), now()).unwrap();
        let next = SettlementEngine::revert_payment(&state, dec!(600));

        assert_eq!(next.total_paid, dec!(0));
        assert_eq!(next.status, PayableStatus::Pending);
        assert!(next.paid_date.is_none());
    }

    #[test]
    fn test_add_then_remove_round_trips() {
        let state = pending(dec!(1000));
        let before = SettlementEngine::apply_payment(&state, dec!(250), now()).unwrap();
        let after_add = SettlementEngine::apply_payment(&before, dec!(300), now()).unwrap();
        let after_remove = SettlementEngine::revert_payment(&after_add, dec!(300));

        assert_eq!(after_remove, before);
    }

    #[test]
    fn test_removing_payment_from_paid_clears_paid_date() {
        let state = pending(dec!(1000));
        let state = SettlementEngine::apply_payment(&state, dec!(1000), now()).unwrap();
        assert!(state.paid_date.is_some());

        let next = SettlementEngine::revert_payment(&state, dec!(400));
        assert_eq!(next.total_paid, dec!(600));
        assert_eq!(next.status, PayableStatus::PartiallyPaid);
        assert!(next.paid_date.is_none());
    }

    #[test]
    fn test_removal_clamps_negative_drift_to_zero() {
        let state = PayableState {
            amount: dec!(1000),
            total_paid: dec!(100),
            status: PayableStatus::PartiallyPaid,
            paid_date: None,
        };
        let next = SettlementEngine::revert_payment(&state, dec!(250));

        assert_eq!(next.total_paid, dec!(0));
        assert_eq!(next.status, PayableStatus::Pending);
    }

    #[test]
    fn test_removal_clamps_excess_drift_to_amount() {
        // A drifted row with total_paid above amount settles back to Paid at
        // exactly the amount owed.
        let state = PayableState {
            amount: dec!(1000),
            total_paid: dec!(1500),
            status: PayableStatus::Paid,
            paid_date: Some(now()),
        };
        let next = SettlementEngine::revert_payment(&state, dec!(100));

        assert_eq!(next.total_paid, dec!(1000));
        assert_eq!(next.status, PayableStatus::Paid);
        assert!(next.paid_date.is_some());
    }

    // ========================================================================
    // Direct-edit reconciliation (Scenario F and target resolution)
    // ========================================================================

    #[test]
    fn test_amount_edit_below_recorded_payments_rejected() {
        // Scenario F: amount 200 proposed while 300 is recorded as paid
        let current = PayableState {
            amount: dec!(1000),
            total_paid: dec!(300),
            status: PayableStatus::PartiallyPaid,
            paid_date: None,
        };
        let proposed = ProposedEdit {
            amount: Some(dec!(200)),
            status: None,
        };

        let result = SettlementEngine::reconcile_edit(&current, &proposed, dec!(300), now());
        assert_eq!(
            result,
            Err(SettlementError::AmountBelowPaid {
                amount: dec!(200),
                total_paid: dec!(300),
            })
        );
    }

    #[test]
    fn test_mark_paid_override_pins_total_to_amount() {
        // Administrative override: mark paid without matching payment history.
        let current = PayableState {
            amount: dec!(1000),
            total_paid: dec!(300),
            status: PayableStatus::PartiallyPaid,
            paid_date: None,
        };
        let proposed = ProposedEdit {
            amount: None,
            status: Some(PayableStatus::Paid),
        };

        let next = SettlementEngine::reconcile_edit(&current, &proposed, dec!(300), now()).unwrap();
        assert_eq!(next.total_paid, dec!(1000));
        assert_eq!(next.status, PayableStatus::Paid);
        assert!(next.paid_date.is_some());
    }

    #[test]
    fn test_force_partial_when_fully_covered_escalates_to_paid() {
        let current = PayableState {
            amount: dec!(500),
            total_paid: dec!(500),
            status: PayableStatus::Paid,
            paid_date: Some(now()),
        };
        let proposed = ProposedEdit {
            amount: None,
            status: Some(PayableStatus::PartiallyPaid),
        };

        let next = SettlementEngine::reconcile_edit(&current, &proposed, dec!(500), now()).unwrap();
        assert_eq!(next.status, PayableStatus::Paid);
        assert_eq!(next.total_paid, dec!(500));
    }

    #[test]
    fn test_force_pending_with_payments_escalates() {
        let current = PayableState {
            amount: dec!(1000),
            total_paid: dec!(400),
            status: PayableStatus::PartiallyPaid,
            paid_date: None,
        };
        let proposed = ProposedEdit {
            amount: None,
            status: Some(PayableStatus::Pending),
        };

        let next = SettlementEngine::reconcile_edit(&current, &proposed, dec!(400), now()).unwrap();
        assert_eq!(next.status, PayableStatus::PartiallyPaid);
        assert_eq!(next.total_paid, dec!(400));
    }

    #[test]
    fn test_force_pending_without_payments_allowed() {
        let current = PayableState {
            amount: dec!(1000),
            total_paid: dec!(1000),
            status: PayableStatus::Paid,
            paid_date: Some(now()),
        };
        let proposed = ProposedEdit {
            amount: None,
            status: Some(PayableStatus::Pending),
        };

        // No payment records back the paid total: an earlier override. The
        // recomputed ground truth is 0, so pending is legal.
        let next = SettlementEngine::reconcile_edit(&current, &proposed, dec!(0), now()).unwrap();
        assert_eq!(next.status, PayableStatus::Pending);
        assert_eq!(next.total_paid, dec!(0));
        assert!(next.paid_date.is_none());
    }

    #[test]
    fn test_edit_recomputes_total_from_payment_records() {
        // Client-supplied totals are ignored; the recorded sum wins.
        let current = PayableState {
            amount: dec!(1000),
            total_paid: dec!(700),
            status: PayableStatus::PartiallyPaid,
            paid_date: None,
        };
        let proposed = ProposedEdit::default();

        let next = SettlementEngine::reconcile_edit(&current, &proposed, dec!(450), now()).unwrap();
        assert_eq!(next.total_paid, dec!(450));
        assert_eq!(next.status, PayableStatus::PartiallyPaid);
    }

    #[test]
    fn test_raising_amount_of_paid_payable_reopens_it() {
        let current = PayableState {
            amount: dec!(500),
            total_paid: dec!(500),
            status: PayableStatus::Paid,
            paid_date: Some(now()),
        };
        let proposed = ProposedEdit {
            amount: Some(dec!(1000)),
            status: None,
        };

        let next = SettlementEngine::reconcile_edit(&current, &proposed, dec!(500), now()).unwrap();
        assert_eq!(next.amount, dec!(1000));
        assert_eq!(next.total_paid, dec!(500));
        assert_eq!(next.status, PayableStatus::PartiallyPaid);
        assert!(next.paid_date.is_none());
    }

    #[test]
    fn test_already_paid_keeps_original_paid_date() {
        let marked = now();
        let current = PayableState {
            amount: dec!(500),
            total_paid: dec!(500),
            status: PayableStatus::Paid,
            paid_date: Some(marked),
        };
        let proposed = ProposedEdit {
            amount: None,
            status: Some(PayableStatus::Paid),
        };

        let next = SettlementEngine::reconcile_edit(&current, &proposed, dec!(500), now()).unwrap();
        assert_eq!(next.paid_date, Some(marked));
    }

    #[test]
    fn test_negative_amount_edit_rejected() {
        let current = pending(dec!(100));
        let proposed = ProposedEdit {
            amount: Some(dec!(-1)),
            status: None,
        };

        assert_eq!(
            SettlementEngine::reconcile_edit(&current, &proposed, dec!(0), now()),
            Err(SettlementError::NegativeAmount(dec!(-1)))
        );
    }
}
