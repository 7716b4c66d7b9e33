//! License transfer approval workflow.
//!
//! - [`planner`] turns transfer flags into required sign-offs.
//! - [`state_machine`] derives the transfer state from its required steps.
//! - [`service`] persists plans and decisions and enforces expiry.

pub mod planner;
pub mod service;
pub mod state_machine;

pub use planner::{ApprovalPlan, ApprovalPlanner};
pub use service::{Decision, TransferService, TransferStatus};
pub use state_machine::TransferStateMachine;
