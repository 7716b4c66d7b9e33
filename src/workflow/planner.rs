//! Approval requirement planner.
//!
//! Turns a transfer's approval flags into the set of independent sign-offs
//! it needs. Entries carry no ordering: source, target and admin steps may
//! be satisfied in any order.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::TimeoutConfig;
use crate::models::approval::{ApprovalRequirement, ApprovalType};
use crate::models::transfer::Transfer;

/// Planned requirements keyed by approval type.
pub type ApprovalPlan = BTreeMap<ApprovalType, ApprovalRequirement>;

/// Computes approval plans for transfers.
pub struct ApprovalPlanner;

impl ApprovalPlanner {
    /// Build the plan for `transfer`: one entry per set approval flag.
    #[must_use]
    pub fn plan(transfer: &Transfer, timeouts: &TimeoutConfig) -> ApprovalPlan {
        let plan: ApprovalPlan = ApprovalType::ALL
            .into_iter()
            .filter(|approval_type| Self::is_required(transfer, *approval_type))
            .map(|approval_type| {
                (
                    approval_type,
                    Self::requirement(transfer, approval_type, timeouts),
                )
            })
            .collect();

        debug!(
            transfer_id = %transfer.id,
            steps = plan.len(),
            "approval plan computed"
        );
        plan
    }

    /// Whether `transfer` declares `approval_type` as required.
    #[must_use]
    pub fn is_required(transfer: &Transfer, approval_type: ApprovalType) -> bool {
        match approval_type {
            ApprovalType::Source => transfer.requires_source_approval,
            ApprovalType::Target => transfer.requires_target_approval,
            ApprovalType::Admin => transfer.requires_admin_approval,
        }
    }

    /// Requirement descriptor for a single approval type.
    ///
    /// Owner steps name the owner on the corresponding side of the transfer;
    /// admin steps are resolved by permission at decision time and carry no
    /// approver identity.
    #[must_use]
    pub fn requirement(
        transfer: &Transfer,
        approval_type: ApprovalType,
        timeouts: &TimeoutConfig,
    ) -> ApprovalRequirement {
        let approver = match approval_type {
            ApprovalType::Source => Some(&transfer.from),
            ApprovalType::Target => Some(&transfer.to),
            ApprovalType::Admin => None,
        };

        ApprovalRequirement {
            required: true,
            approver_type: approver.map(|owner| owner.kind.as_str().to_owned()),
            approver_id: approver.map(|owner| owner.id.clone()),
            timeout_hours: timeouts.hours_for(approval_type),
        }
    }
}
