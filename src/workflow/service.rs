//! Transfer workflow service.
//!
//! The caller-facing layer over the planner, policy evaluator, state
//! machine and repositories. Every decision is evaluated against the
//! currently persisted steps; nothing is cached and nothing is retried.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use crate::actor::Actor;
use crate::audit::{AuditEntry, AuditEventType, AuditLogger};
use crate::config::{GlobalConfig, TimeoutConfig};
use crate::models::approval::{ApprovalOutcome, ApprovalStep, ApprovalType};
use crate::models::owner::OwnerRef;
use crate::models::transfer::{NewTransfer, Transfer, TransferState};
use crate::persistence::approval_repo::ApprovalRepo;
use crate::persistence::db::Database;
use crate::persistence::transfer_repo::TransferRepo;
use crate::policy::PolicyEvaluator;
use crate::{AppError, Result};

use super::planner::{ApprovalPlan, ApprovalPlanner};
use super::state_machine::TransferStateMachine;

/// Result of a successful approve or reject call.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Decision {
    /// The step after resolution.
    pub step: ApprovalStep,
    /// Transfer state recomputed after the decision.
    pub transfer_state: TransferState,
}

/// Snapshot of a transfer with its steps and derived state.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TransferStatus {
    /// The transfer record.
    pub transfer: Transfer,
    /// All approval steps of the transfer.
    pub steps: Vec<ApprovalStep>,
    /// State derived at read time.
    pub state: TransferState,
}

/// Orchestrates the license transfer approval workflow.
#[derive(Clone)]
pub struct TransferService {
    transfers: TransferRepo,
    approvals: ApprovalRepo,
    evaluator: PolicyEvaluator,
    timeouts: TimeoutConfig,
    audit: Option<Arc<dyn AuditLogger>>,
}

impl TransferService {
    /// Build a service over `db` using the timeouts and admin permission
    /// from `config`.
    #[must_use]
    pub fn new(db: Arc<Database>, config: &GlobalConfig) -> Self {
        Self {
            transfers: TransferRepo::new(Arc::clone(&db)),
            approvals: ApprovalRepo::new(db),
            evaluator: PolicyEvaluator::new(config.admin_permission.clone()),
            timeouts: config.timeouts.clone(),
            audit: None,
        }
    }

    /// Attach an audit logger.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Policy evaluator used for decisions.
    #[must_use]
    pub fn evaluator(&self) -> &PolicyEvaluator {
        &self.evaluator
    }

    /// Record a new transfer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if persistence fails.
    pub async fn initiate_transfer(
        &self,
        request: NewTransfer,
        initiated_by: Option<OwnerRef>,
    ) -> Result<Transfer> {
        let transfer = self
            .transfers
            .create(&Transfer::new(request, initiated_by.clone()))
            .await?;

        info!(
            transfer_id = %transfer.id,
            license_id = %transfer.license_id,
            from = %transfer.from,
            to = %transfer.to,
            "transfer initiated"
        );

        let mut entry =
            AuditEntry::new(AuditEventType::TransferInitiated).with_transfer(&transfer.id);
        if let Some(actor) = initiated_by {
            entry = entry.with_actor(actor);
        }
        self.audit(entry);

        Ok(transfer)
    }

    /// Compute the approval plan for `transfer` and persist one pending step
    /// per entry, atomically.
    ///
    /// # Errors
    ///
    /// Returns `AppError::DuplicateStep` if any step already exists (the plan
    /// is computed once per transfer), or `AppError::Db` on other failures.
    pub async fn plan_approvals(&self, transfer: &Transfer) -> Result<ApprovalPlan> {
        let plan = ApprovalPlanner::plan(transfer, &self.timeouts);

        let steps: Vec<ApprovalStep> = plan
            .iter()
            .map(|(approval_type, requirement)| {
                ApprovalStep::new(
                    transfer.id.clone(),
                    *approval_type,
                    requirement.approver(),
                    requirement.timeout_hours,
                )
            })
            .collect();

        self.approvals.create_all(&steps).await?;

        info!(transfer_id = %transfer.id, steps = steps.len(), "approvals planned");
        self.audit(AuditEntry::new(AuditEventType::ApprovalsPlanned).with_transfer(&transfer.id));

        Ok(plan)
    }

    /// Persist a single pending step of `approval_type` for `transfer`.
    ///
    /// `actor`, when given, is recorded in the audit trail as the creator.
    ///
    /// # Errors
    ///
    /// - `AppError::InvalidState` if the transfer does not require an
    ///   approval of that type.
    /// - `AppError::DuplicateStep` if the transfer already has a step of
    ///   that type.
    /// - `AppError::Db` on other failures.
    pub async fn create_approval_step(
        &self,
        transfer: &Transfer,
        approval_type: ApprovalType,
        actor: Option<&dyn Actor>,
    ) -> Result<ApprovalStep> {
        if !ApprovalPlanner::is_required(transfer, approval_type) {
            warn!(
                transfer_id = %transfer.id,
                approval_type = approval_type.as_str(),
                "refusing to create an approval step the transfer does not require"
            );
            return Err(AppError::InvalidState(format!(
                "transfer {} does not require {} approval",
                transfer.id,
                approval_type.as_str()
            )));
        }

        let requirement = ApprovalPlanner::requirement(transfer, approval_type, &self.timeouts);
        let step = self
            .approvals
            .create(&ApprovalStep::new(
                transfer.id.clone(),
                approval_type,
                requirement.approver(),
                requirement.timeout_hours,
            ))
            .await?;

        info!(
            transfer_id = %transfer.id,
            step_id = %step.id,
            approval_type = approval_type.as_str(),
            "approval step created"
        );

        let mut entry = AuditEntry::new(AuditEventType::StepCreated)
            .with_transfer(&transfer.id)
            .with_step(&step.id, approval_type);
        if let Some(actor) = actor {
            entry = entry.with_actor(actor.identity().clone());
        }
        self.audit(entry);

        Ok(step)
    }

    /// Approve a pending step on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// - `AppError::NotFound` if the step or its transfer does not exist.
    /// - `AppError::Expired` if the transfer's approval window elapsed.
    /// - `AppError::AlreadyDecided` if the step is already terminal,
    ///   including when a concurrent decision won the race.
    /// - `AppError::Unauthorized` if the actor may not decide the step.
    /// - `AppError::Db` on persistence failure.
    pub async fn approve(
        &self,
        step_id: &str,
        actor: &dyn Actor,
        notes: Option<String>,
    ) -> Result<Decision> {
        self.decide(step_id, actor, ApprovalOutcome::Approved, notes)
            .await
    }

    /// Reject a pending step on behalf of `actor`. A single rejection vetoes
    /// the whole transfer.
    ///
    /// # Errors
    ///
    /// Same as [`Self::approve`].
    pub async fn reject(
        &self,
        step_id: &str,
        actor: &dyn Actor,
        notes: Option<String>,
    ) -> Result<Decision> {
        self.decide(step_id, actor, ApprovalOutcome::Rejected, notes)
            .await
    }

    async fn decide(
        &self,
        step_id: &str,
        actor: &dyn Actor,
        outcome: ApprovalOutcome,
        notes: Option<String>,
    ) -> Result<Decision> {
        let span = info_span!(
            "transfer_decide",
            step_id,
            outcome = outcome.as_str(),
            actor = %actor.identity(),
        );

        async move {
            let step = self
                .approvals
                .get_by_id(step_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("approval step {step_id} not found")))?;
            let transfer = self.transfers.require(&step.transfer_id).await?;

            let now = Utc::now();
            let steps = self.approvals.list_for_transfer(&transfer.id).await?;
            if TransferStateMachine::derive(&transfer, &steps, now) == TransferState::Expired {
                return Err(self.refuse(
                    &step,
                    actor,
                    AppError::Expired(format!("transfer {} has expired", transfer.id)),
                ));
            }

            if !step.can_transition_to(outcome) {
                return Err(self.refuse(
                    &step,
                    actor,
                    AppError::AlreadyDecided(format!(
                        "approval step {} is already {}",
                        step.id,
                        step.outcome.as_str()
                    )),
                ));
            }

            if !self.evaluator.can_decide(&step, &transfer, actor) {
                return Err(self.refuse(
                    &step,
                    actor,
                    AppError::Unauthorized(format!(
                        "{} may not decide {} approval {}",
                        actor.identity(),
                        step.approval_type.as_str(),
                        step.id
                    )),
                ));
            }

            let resolved = self
                .approvals
                .resolve(&step.id, outcome, actor.identity(), notes.as_deref(), now)
                .await?;
            if !resolved {
                return Err(self.refuse(
                    &step,
                    actor,
                    AppError::AlreadyDecided(format!(
                        "approval step {} was decided concurrently",
                        step.id
                    )),
                ));
            }

            let steps = self.approvals.list_for_transfer(&transfer.id).await?;
            let transfer_state = TransferStateMachine::derive(&transfer, &steps, Utc::now());
            let step = steps
                .into_iter()
                .find(|s| s.id == step.id)
                .ok_or_else(|| AppError::NotFound(format!("approval step {step_id} not found")))?;

            info!(
                transfer_id = %transfer.id,
                approval_type = step.approval_type.as_str(),
                transfer_state = transfer_state.as_str(),
                "approval step decided"
            );

            let event = if outcome == ApprovalOutcome::Approved {
                AuditEventType::StepApproved
            } else {
                AuditEventType::StepRejected
            };
            self.audit(
                AuditEntry::new(event)
                    .with_transfer(&transfer.id)
                    .with_step(&step.id, step.approval_type)
                    .with_actor(actor.identity().clone())
                    .with_state(transfer_state)
                    .with_notes(notes),
            );

            Ok(Decision {
                step,
                transfer_state,
            })
        }
        .instrument(span)
        .await
    }

    /// Current derived state of a transfer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the transfer does not exist, or
    /// `AppError::Db` if the query fails.
    pub async fn transfer_state(&self, transfer_id: &str) -> Result<TransferState> {
        self.transfer_state_at(transfer_id, Utc::now()).await
    }

    /// Derived state of a transfer as of `now`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::transfer_state`].
    pub async fn transfer_state_at(
        &self,
        transfer_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TransferState> {
        Ok(self.status_at(transfer_id, now).await?.state)
    }

    /// Transfer record, steps and derived state.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the transfer does not exist, or
    /// `AppError::Db` if the query fails.
    pub async fn status(&self, transfer_id: &str) -> Result<TransferStatus> {
        self.status_at(transfer_id, Utc::now()).await
    }

    async fn status_at(&self, transfer_id: &str, now: DateTime<Utc>) -> Result<TransferStatus> {
        let transfer = self.transfers.require(transfer_id).await?;
        let steps = self.approvals.list_for_transfer(transfer_id).await?;
        let state = TransferStateMachine::derive(&transfer, &steps, now);
        Ok(TransferStatus {
            transfer,
            steps,
            state,
        })
    }

    /// Every transfer recorded for a license, oldest first, with derived
    /// states.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if a query fails.
    pub async fn transfers_for_license(&self, license_id: &str) -> Result<Vec<TransferStatus>> {
        let now = Utc::now();
        let mut history = Vec::new();
        for transfer in self.transfers.list_for_license(license_id).await? {
            let steps = self.approvals.list_for_transfer(&transfer.id).await?;
            let state = TransferStateMachine::derive(&transfer, &steps, now);
            history.push(TransferStatus {
                transfer,
                steps,
                state,
            });
        }
        Ok(history)
    }

    /// Pending steps `actor` may currently decide, skipping expired
    /// transfers.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if a query fails.
    pub async fn pending_for_actor(&self, actor: &dyn Actor) -> Result<Vec<ApprovalStep>> {
        let now = Utc::now();
        let mut decidable = Vec::new();

        for step in self.approvals.list_pending().await? {
            let Some(transfer) = self.transfers.get_by_id(&step.transfer_id).await? else {
                warn!(step_id = %step.id, "approval step references a missing transfer");
                continue;
            };
            if !ApprovalPlanner::is_required(&transfer, step.approval_type)
                || !self.evaluator.can_decide(&step, &transfer, actor)
            {
                continue;
            }
            let steps = self.approvals.list_for_transfer(&transfer.id).await?;
            if TransferStateMachine::derive(&transfer, &steps, now) == TransferState::Pending {
                decidable.push(step);
            }
        }

        Ok(decidable)
    }

    /// Finalize an approved transfer by stamping its completion time.
    ///
    /// # Errors
    ///
    /// - `AppError::NotFound` if the transfer does not exist.
    /// - `AppError::InvalidState` if the transfer is not approved.
    /// - `AppError::AlreadyDecided` if it was already completed.
    /// - `AppError::Db` on persistence failure.
    pub async fn complete_transfer(&self, transfer_id: &str) -> Result<Transfer> {
        let status = self.status(transfer_id).await?;
        if status.state != TransferState::Approved {
            return Err(AppError::InvalidState(format!(
                "transfer {transfer_id} is {}, not approved",
                status.state.as_str()
            )));
        }

        if !self.transfers.mark_completed(transfer_id, Utc::now()).await? {
            return Err(AppError::AlreadyDecided(format!(
                "transfer {transfer_id} is already completed"
            )));
        }

        info!(transfer_id, "transfer completed");
        self.audit(
            AuditEntry::new(AuditEventType::TransferCompleted)
                .with_transfer(transfer_id)
                .with_state(TransferState::Approved),
        );

        self.transfers.require(transfer_id).await
    }

    fn refuse(&self, step: &ApprovalStep, actor: &dyn Actor, err: AppError) -> AppError {
        warn!(
            step_id = %step.id,
            transfer_id = %step.transfer_id,
            actor = %actor.identity(),
            %err,
            "approval decision refused"
        );
        self.audit(
            AuditEntry::new(AuditEventType::DecisionRefused)
                .with_transfer(&step.transfer_id)
                .with_step(&step.id, step.approval_type)
                .with_actor(actor.identity().clone())
                .with_reason(err.to_string()),
        );
        err
    }

    /// Audit failures never undo a committed decision.
    fn audit(&self, entry: AuditEntry) {
        if let Some(ref logger) = self.audit {
            if let Err(err) = logger.log_entry(entry) {
                warn!(%err, "failed to write audit entry");
            }
        }
    }
}
