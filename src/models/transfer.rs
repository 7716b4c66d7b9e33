//! License transfer model and derived transfer state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::owner::OwnerRef;

/// Overall state of a transfer, derived from its approval steps at read time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    /// At least one required step is still open and within its window.
    Pending,
    /// Every required step was approved.
    Approved,
    /// A required step was rejected.
    Rejected,
    /// A required step stayed pending past its timeout.
    Expired,
}

impl TransferState {
    /// Stable display name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

/// Caller-supplied description of a transfer to initiate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct NewTransfer {
    /// License being moved.
    pub license_id: String,
    /// Current owner.
    pub from: OwnerRef,
    /// Receiving owner.
    pub to: OwnerRef,
    /// Current owner must sign off.
    #[serde(default)]
    pub requires_source_approval: bool,
    /// Receiving owner must sign off.
    #[serde(default)]
    pub requires_target_approval: bool,
    /// An administrator must sign off.
    #[serde(default)]
    pub requires_admin_approval: bool,
    /// Optional justification.
    #[serde(default)]
    pub reason: Option<String>,
}

/// A proposed move of a license from one owner to another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Transfer {
    /// Unique record identifier.
    pub id: String,
    /// License being moved.
    pub license_id: String,
    /// Current owner.
    pub from: OwnerRef,
    /// Receiving owner.
    pub to: OwnerRef,
    /// Current owner must sign off.
    pub requires_source_approval: bool,
    /// Receiving owner must sign off.
    pub requires_target_approval: bool,
    /// An administrator must sign off.
    pub requires_admin_approval: bool,
    /// Optional justification.
    pub reason: Option<String>,
    /// Actor who initiated the transfer, if known.
    pub initiated_by: Option<OwnerRef>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Set once the approved transfer has been finalized.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transfer {
    /// Construct a new transfer from a request.
    #[must_use]
    pub fn new(request: NewTransfer, initiated_by: Option<OwnerRef>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            license_id: request.license_id,
            from: request.from,
            to: request.to,
            requires_source_approval: request.requires_source_approval,
            requires_target_approval: request.requires_target_approval,
            requires_admin_approval: request.requires_admin_approval,
            reason: request.reason,
            initiated_by,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Whether no sign-off at all is required.
    #[must_use]
    pub fn requires_no_approval(&self) -> bool {
        !(self.requires_source_approval
            || self.requires_target_approval
            || self.requires_admin_approval)
    }
}
