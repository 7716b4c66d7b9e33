//! Transfer state derivation from approval step outcomes.
//!
//! The transfer state is never stored. It is recomputed from the transfer's
//! approval flags and the current set of steps on every read, so concurrent
//! decisions on different steps of the same transfer cannot leave a stale
//! aggregate behind. Timeouts are evaluated lazily against the supplied `now`.

use chrono::{DateTime, Utc};

use crate::models::approval::{ApprovalOutcome, ApprovalStep, ApprovalType};
use crate::models::transfer::{Transfer, TransferState};

use super::planner::ApprovalPlanner;

/// Aggregates step outcomes into a transfer state.
pub struct TransferStateMachine;

impl TransferStateMachine {
    /// Derive the state of `transfer` from its persisted `steps` at `now`.
    ///
    /// Only approval types the transfer declares as required are considered.
    /// A required type with no step yet counts as pending, and steps of
    /// undeclared types are ignored.
    ///
    /// Precedence: any required rejection vetoes the transfer; otherwise all
    /// required steps approved (vacuously true with no flags set) approves
    /// it; otherwise a pending step past its timeout expires it; otherwise it
    /// is still pending.
    #[must_use]
    pub fn derive(
        transfer: &Transfer,
        steps: &[ApprovalStep],
        now: DateTime<Utc>,
    ) -> TransferState {
        let required: Vec<Option<&ApprovalStep>> = ApprovalType::ALL
            .into_iter()
            .filter(|approval_type| ApprovalPlanner::is_required(transfer, *approval_type))
            .map(|approval_type| {
                steps.iter().find(|step| {
                    step.approval_type == approval_type && step.transfer_id == transfer.id
                })
            })
            .collect();

        if required
            .iter()
            .flatten()
            .any(|step| step.outcome == ApprovalOutcome::Rejected)
        {
            return TransferState::Rejected;
        }

        if required
            .iter()
            .all(|step| step.is_some_and(|s| s.outcome == ApprovalOutcome::Approved))
        {
            return TransferState::Approved;
        }

        if required.iter().flatten().any(|step| step.is_timed_out(now)) {
            return TransferState::Expired;
        }

        TransferState::Pending
    }
}
