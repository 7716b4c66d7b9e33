//! Structured audit trail for transfer approval events.
//!
//! Provides the [`AuditLogger`] trait and associated types. The primary
//! implementation, [`JsonlAuditWriter`], appends JSONL records to
//! daily-rotating files. The acting party is always passed explicitly on
//! the entry; nothing is read from ambient authentication state.

pub mod writer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::approval::ApprovalType;
use crate::models::owner::OwnerRef;
use crate::models::transfer::TransferState;

/// Event type classification for audit log entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A transfer was recorded.
    TransferInitiated,
    /// The approval plan for a transfer was persisted.
    ApprovalsPlanned,
    /// A single approval step was created outside a plan.
    StepCreated,
    /// An actor approved a step.
    StepApproved,
    /// An actor rejected a step.
    StepRejected,
    /// An approve/reject attempt was refused.
    DecisionRefused,
    /// An approved transfer was finalized.
    TransferCompleted,
}

/// A structured record of a transfer approval event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// ISO 8601 timestamp with timezone.
    pub timestamp: DateTime<Utc>,
    /// Event classification.
    pub event_type: AuditEventType,
    /// Transfer the event concerns.
    pub transfer_id: Option<String>,
    /// Approval step the event concerns.
    pub step_id: Option<String>,
    /// Approval type of the step.
    pub approval_type: Option<ApprovalType>,
    /// Party that performed (or attempted) the action.
    pub actor: Option<OwnerRef>,
    /// Transfer state after the event.
    pub transfer_state: Option<TransferState>,
    /// Free-text notes recorded with a decision.
    pub notes: Option<String>,
    /// Refusal reason.
    pub reason: Option<String>,
}

impl AuditEntry {
    /// Construct a minimal audit entry for the given event type.
    #[must_use]
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type,
            transfer_id: None,
            step_id: None,
            approval_type: None,
            actor: None,
            transfer_state: None,
            notes: None,
            reason: None,
        }
    }

    /// Set the transfer identifier.
    #[must_use]
    pub fn with_transfer(mut self, transfer_id: impl Into<String>) -> Self {
        self.transfer_id = Some(transfer_id.into());
        self
    }

    /// Set the step identifier and its approval type.
    #[must_use]
    pub fn with_step(mut self, step_id: impl Into<String>, approval_type: ApprovalType) -> Self {
        self.step_id = Some(step_id.into());
        self.approval_type = Some(approval_type);
        self
    }

    /// Set the acting party.
    #[must_use]
    pub fn with_actor(mut self, actor: OwnerRef) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Set the resulting transfer state.
    #[must_use]
    pub fn with_state(mut self, state: TransferState) -> Self {
        self.transfer_state = Some(state);
        self
    }

    /// Set decision notes.
    #[must_use]
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    /// Set the refusal reason.
    #[must_use]
    pub fn with_reason(mut self, reason: String) -> Self {
        self.reason = Some(reason);
        self
    }
}

/// Writes structured audit entries to a persistent store.
///
/// Implementations must be [`Send`] and [`Sync`] to allow sharing across
/// async task boundaries via [`std::sync::Arc`].
pub trait AuditLogger: Send + Sync {
    /// Record a single audit entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write operation fails.
    fn log_entry(&self, entry: AuditEntry) -> crate::Result<()>;
}

pub use writer::JsonlAuditWriter;
