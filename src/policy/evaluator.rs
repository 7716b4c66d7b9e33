//! Approval policy evaluator.
//!
//! Decides whether an actor may approve or reject one pending approval
//! step. The evaluator is purely step-local: transfer expiry is enforced by
//! the workflow service, not here. Rejection authority mirrors approval
//! authority exactly.

use tracing::{debug, info_span, warn};

use crate::actor::Actor;
use crate::config::DEFAULT_ADMIN_PERMISSION;
use crate::models::approval::{ApprovalStep, ApprovalType};
use crate::models::transfer::Transfer;

/// Evaluates decision authority for approval steps.
#[derive(Debug, Clone)]
pub struct PolicyEvaluator {
    admin_permission: String,
}

impl Default for PolicyEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_PERMISSION)
    }
}

impl PolicyEvaluator {
    /// Build an evaluator that checks `admin_permission` for admin steps.
    #[must_use]
    pub fn new(admin_permission: impl Into<String>) -> Self {
        Self {
            admin_permission: admin_permission.into(),
        }
    }

    /// Permission name checked for admin steps.
    #[must_use]
    pub fn admin_permission(&self) -> &str {
        &self.admin_permission
    }

    /// Whether `actor` may resolve `step` of `transfer`.
    ///
    /// Evaluation order:
    /// 1. Terminal steps are never decidable again.
    /// 2. A step belonging to another transfer is refused.
    /// 3. Dispatch on the approval type.
    #[must_use]
    pub fn can_decide(&self, step: &ApprovalStep, transfer: &Transfer, actor: &dyn Actor) -> bool {
        let _span = info_span!(
            "approval_policy_evaluate",
            step_id = %step.id,
            approval_type = step.approval_type.as_str(),
            actor = %actor.identity(),
        )
        .entered();

        if step.outcome.is_terminal() {
            debug!(outcome = step.outcome.as_str(), "step already resolved");
            return false;
        }

        if step.transfer_id != transfer.id {
            warn!(
                transfer_id = %transfer.id,
                step_transfer_id = %step.transfer_id,
                "step does not belong to the supplied transfer"
            );
            return false;
        }

        let allowed = match step.approval_type {
            ApprovalType::Source => Self::source_allows(transfer, actor),
            ApprovalType::Target => actor.identity() == &transfer.to,
            ApprovalType::Admin => self.admin_allows(actor),
        };

        debug!(allowed, "approval policy evaluated");
        allowed
    }

    /// Whether `actor` may approve `step`.
    #[must_use]
    pub fn can_approve(&self, step: &ApprovalStep, transfer: &Transfer, actor: &dyn Actor) -> bool {
        self.can_decide(step, transfer, actor)
    }

    /// Whether `actor` may reject `step`. Same authority as approval.
    #[must_use]
    pub fn can_reject(&self, step: &ApprovalStep, transfer: &Transfer, actor: &dyn Actor) -> bool {
        self.can_decide(step, transfer, actor)
    }

    /// Identity must match the from-owner; actors that initiate transfers
    /// must additionally still own the license.
    fn source_allows(transfer: &Transfer, actor: &dyn Actor) -> bool {
        if actor.identity() != &transfer.from {
            return false;
        }

        match actor.ownership() {
            Some(ownership) => ownership.owns_license(&transfer.license_id),
            None => true,
        }
    }

    fn admin_allows(&self, actor: &dyn Actor) -> bool {
        actor
            .permissions()
            .is_some_and(|perms| perms.has_permission(&self.admin_permission))
    }
}
