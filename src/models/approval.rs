//! Approval step model for license transfer sign-offs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::owner::{OwnerKind, OwnerRef};

/// Which party must sign off on a transfer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalType {
    /// The current owner of the license.
    Source,
    /// The owner receiving the license.
    Target,
    /// Any holder of the transfer-approval permission.
    Admin,
}

impl ApprovalType {
    /// Every approval type, in planning order.
    pub const ALL: [Self; 3] = [Self::Source, Self::Target, Self::Admin];

    /// Stable storage name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
            Self::Admin => "admin",
        }
    }

    /// Parse a storage name. Returns `None` for unknown types.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "source" => Some(Self::Source),
            "target" => Some(Self::Target),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Outcome of a single approval step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalOutcome {
    /// Awaiting a decision.
    Pending,
    /// Signed off.
    Approved,
    /// Vetoed.
    Rejected,
}

impl ApprovalOutcome {
    /// Stable storage name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a storage name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Whether the outcome can no longer change.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// What the planner requires for one approval type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ApprovalRequirement {
    /// Always `true` for planned entries.
    pub required: bool,
    /// Expected approver kind; `None` for role-based steps.
    pub approver_type: Option<String>,
    /// Expected approver identifier; `None` for role-based steps.
    pub approver_id: Option<String>,
    /// Hours the step may stay pending.
    pub timeout_hours: u32,
}

impl ApprovalRequirement {
    /// Expected approver as an [`OwnerRef`], if identity-based.
    #[must_use]
    pub fn approver(&self) -> Option<OwnerRef> {
        match (&self.approver_type, &self.approver_id) {
            (Some(kind), Some(id)) => Some(OwnerRef::new(OwnerKind::parse(kind), id.clone())),
            _ => None,
        }
    }
}

/// One required sign-off on a transfer. Never deleted; serves as audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ApprovalStep {
    /// Unique record identifier.
    pub id: String,
    /// Owning transfer identifier.
    pub transfer_id: String,
    /// Which party must sign off.
    pub approval_type: ApprovalType,
    /// Expected approver; `None` for admin steps.
    pub approver: Option<OwnerRef>,
    /// Hours the step may stay pending before the transfer expires.
    pub timeout_hours: u32,
    /// Current outcome.
    pub outcome: ApprovalOutcome,
    /// Actor who resolved the step.
    pub resolved_by: Option<OwnerRef>,
    /// Resolution timestamp.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Free-text note recorded with the decision.
    pub notes: Option<String>,
    /// Creation timestamp; the timeout runs from here.
    pub created_at: DateTime<Utc>,
}

impl ApprovalStep {
    /// Construct a new pending step.
    #[must_use]
    pub fn new(
        transfer_id: String,
        approval_type: ApprovalType,
        approver: Option<OwnerRef>,
        timeout_hours: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            transfer_id,
            approval_type,
            approver,
            timeout_hours,
            outcome: ApprovalOutcome::Pending,
            resolved_by: None,
            resolved_at: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    /// Determine whether an outcome transition is permitted.
    #[must_use]
    pub fn can_transition_to(&self, next: ApprovalOutcome) -> bool {
        matches!(
            (self.outcome, next),
            (
                ApprovalOutcome::Pending,
                ApprovalOutcome::Approved | ApprovalOutcome::Rejected
            )
        )
    }

    /// Instant after which a still-pending step expires the transfer.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::hours(i64::from(self.timeout_hours))
    }

    /// Whether the step is pending and past its timeout at `now`.
    #[must_use]
    pub fn is_timed_out(&self, now: DateTime<Utc>) -> bool {
        self.outcome == ApprovalOutcome::Pending && now > self.expires_at()
    }
}
