//! Integration tests for the transfer approval flow.
//!
//! Validates the end-to-end flow:
//! 1. Initiate transfer and persist its plan
//! 2. Owners and administrators decide their steps
//! 3. Transfer state is recomputed after every decision
//! 4. Approved transfers can be completed exactly once

use licensegate::actor::{Actor, Principal};
use licensegate::audit::AuditEventType;
use licensegate::models::approval::{ApprovalOutcome, ApprovalStep, ApprovalType};
use licensegate::models::owner::OwnerRef;
use licensegate::models::transfer::TransferState;
use licensegate::AppError;

use super::test_helpers::{
    harness, request, source_owner, target_owner, ADMIN_PERMISSION, LICENSE,
};

fn step_of(steps: &[ApprovalStep], approval_type: ApprovalType) -> ApprovalStep {
    steps
        .iter()
        .find(|s| s.approval_type == approval_type)
        .cloned()
        .expect("step of type")
}

fn admin() -> Principal {
    Principal::new(OwnerRef::user("ops-admin")).with_permission(ADMIN_PERMISSION)
}

#[tokio::test]
async fn transfer_without_requirements_is_immediately_approved() {
    let h = harness().await;
    let transfer = h
        .service
        .initiate_transfer(request(false, false, false), None)
        .await
        .expect("initiate");

    let plan = h.service.plan_approvals(&transfer).await.expect("plan");
    assert!(plan.is_empty());
    assert_eq!(
        h.service.transfer_state(&transfer.id).await.expect("state"),
        TransferState::Approved
    );

    let completed = h.service.complete_transfer(&transfer.id).await.expect("complete");
    assert!(completed.completed_at.is_some());
}

#[tokio::test]
async fn plan_persists_one_pending_step_per_flag() {
    let h = harness().await;
    let transfer = h
        .service
        .initiate_transfer(request(true, true, true), Some(source_owner()))
        .await
        .expect("initiate");

    let plan = h.service.plan_approvals(&transfer).await.expect("plan");
    assert_eq!(plan.len(), 3);
    assert_eq!(plan[&ApprovalType::Source].approver(), Some(source_owner()));
    assert_eq!(plan[&ApprovalType::Target].approver(), Some(target_owner()));
    assert_eq!(plan[&ApprovalType::Admin].timeout_hours, 120);

    let status = h.service.status(&transfer.id).await.expect("status");
    assert_eq!(status.steps.len(), 3);
    assert!(status
        .steps
        .iter()
        .all(|s| s.outcome == ApprovalOutcome::Pending));
    assert_eq!(status.state, TransferState::Pending);
    assert_eq!(
        step_of(&status.steps, ApprovalType::Source).approver,
        Some(source_owner())
    );
    assert!(step_of(&status.steps, ApprovalType::Admin).approver.is_none());
}

#[tokio::test]
async fn planning_twice_fails_with_duplicate_step() {
    let h = harness().await;
    let transfer = h
        .service
        .initiate_transfer(request(true, false, true), None)
        .await
        .expect("initiate");
    h.service.plan_approvals(&transfer).await.expect("plan");

    let err = h.service.plan_approvals(&transfer).await.expect_err("replan");
    assert!(matches!(err, AppError::DuplicateStep(_)));
    assert_eq!(h.service.status(&transfer.id).await.expect("status").steps.len(), 2);
}

#[tokio::test]
async fn all_parties_approving_approves_transfer_in_any_order() {
    let h = harness().await;
    let transfer = h
        .service
        .initiate_transfer(request(true, true, true), None)
        .await
        .expect("initiate");
    h.service.plan_approvals(&transfer).await.expect("plan");
    let steps = h.service.status(&transfer.id).await.expect("status").steps;

    let decision = h
        .service
        .approve(&step_of(&steps, ApprovalType::Admin).id, &admin(), None)
        .await
        .expect("admin approves");
    assert_eq!(decision.transfer_state, TransferState::Pending);

    let decision = h
        .service
        .approve(
            &step_of(&steps, ApprovalType::Target).id,
            &Principal::new(target_owner()),
            Some("welcome".into()),
        )
        .await
        .expect("target approves");
    assert_eq!(decision.transfer_state, TransferState::Pending);
    assert_eq!(decision.step.notes.as_deref(), Some("welcome"));
    assert_eq!(decision.step.resolved_by, Some(target_owner()));

    let decision = h
        .service
        .approve(
            &step_of(&steps, ApprovalType::Source).id,
            &Principal::new(source_owner()).owning(LICENSE),
            None,
        )
        .await
        .expect("source approves");
    assert_eq!(decision.step.outcome, ApprovalOutcome::Approved);
    assert!(decision.step.resolved_at.is_some());
    assert_eq!(decision.transfer_state, TransferState::Approved);

    let completed = h.service.complete_transfer(&transfer.id).await.expect("complete");
    assert!(completed.completed_at.is_some());
    let again = h.service.complete_transfer(&transfer.id).await;
    assert!(matches!(again, Err(AppError::AlreadyDecided(_))));

    let events = h.audit.events();
    assert_eq!(
        events
            .iter()
            .filter(|e| **e == AuditEventType::StepApproved)
            .count(),
        3
    );
    assert_eq!(events.last(), Some(&AuditEventType::TransferCompleted));
}

#[tokio::test]
async fn single_rejection_vetoes_transfer() {
    let h = harness().await;
    let transfer = h
        .service
        .initiate_transfer(request(true, true, false), None)
        .await
        .expect("initiate");
    h.service.plan_approvals(&transfer).await.expect("plan");
    let steps = h.service.status(&transfer.id).await.expect("status").steps;

    let decision = h
        .service
        .reject(
            &step_of(&steps, ApprovalType::Source).id,
            &Principal::new(source_owner()),
            Some("changed my mind".into()),
        )
        .await
        .expect("reject");
    assert_eq!(decision.step.outcome, ApprovalOutcome::Rejected);
    assert_eq!(decision.transfer_state, TransferState::Rejected);

    // Target is still pending, the transfer is rejected regardless.
    let status = h.service.status(&transfer.id).await.expect("status");
    assert_eq!(step_of(&status.steps, ApprovalType::Target).outcome, ApprovalOutcome::Pending);
    assert_eq!(status.state, TransferState::Rejected);

    let err = h.service.complete_transfer(&transfer.id).await.expect_err("not approved");
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn re_deciding_resolved_step_is_refused_without_change() {
    let h = harness().await;
    let transfer = h
        .service
        .initiate_transfer(request(false, true, true), None)
        .await
        .expect("initiate");
    h.service.plan_approvals(&transfer).await.expect("plan");
    let steps = h.service.status(&transfer.id).await.expect("status").steps;
    let target_step = step_of(&steps, ApprovalType::Target);
    let target = Principal::new(target_owner());

    h.service
        .approve(&target_step.id, &target, None)
        .await
        .expect("approve");

    let again = h.service.approve(&target_step.id, &target, None).await;
    assert!(matches!(again, Err(AppError::AlreadyDecided(_))));
    let flip = h.service.reject(&target_step.id, &target, None).await;
    assert!(matches!(flip, Err(AppError::AlreadyDecided(_))));

    let status = h.service.status(&transfer.id).await.expect("status");
    assert_eq!(
        step_of(&status.steps, ApprovalType::Target).outcome,
        ApprovalOutcome::Approved
    );
    assert!(h.audit.events().contains(&AuditEventType::DecisionRefused));
}

#[tokio::test]
async fn unauthorized_actor_is_refused_without_change() {
    let h = harness().await;
    let transfer = h
        .service
        .initiate_transfer(request(true, false, true), None)
        .await
        .expect("initiate");
    h.service.plan_approvals(&transfer).await.expect("plan");
    let steps = h.service.status(&transfer.id).await.expect("status").steps;

    let stranger = Principal::new(OwnerRef::user("mallory"));
    let initiator_without_license = Principal::new(source_owner()).initiator();
    let owner_as_admin = Principal::new(source_owner());

    for (step, actor) in [
        (step_of(&steps, ApprovalType::Source), &stranger),
        (step_of(&steps, ApprovalType::Source), &initiator_without_license),
        (step_of(&steps, ApprovalType::Admin), &owner_as_admin),
    ] {
        let err = h
            .service
            .reject(&step.id, actor, None)
            .await
            .expect_err("refused");
        assert!(matches!(err, AppError::Unauthorized(_)), "got {err}");
    }

    let status = h.service.status(&transfer.id).await.expect("status");
    assert!(status
        .steps
        .iter()
        .all(|s| s.outcome == ApprovalOutcome::Pending && s.resolved_by.is_none()));

    let refusal = h
        .audit
        .entries()
        .into_iter()
        .find(|e| e.event_type == AuditEventType::DecisionRefused)
        .expect("refusal audited");
    assert_eq!(refusal.actor, Some(OwnerRef::user("mallory")));
}

#[tokio::test]
async fn deciding_unknown_step_is_not_found() {
    let h = harness().await;
    let err = h
        .service
        .approve("missing", &admin(), None)
        .await
        .expect_err("missing");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn create_approval_step_uses_planner_requirements() {
    let h = harness().await;
    let transfer = h
        .service
        .initiate_transfer(request(false, true, false), None)
        .await
        .expect("initiate");

    let creator = admin();
    let step = h
        .service
        .create_approval_step(&transfer, ApprovalType::Target, Some(&creator as &dyn Actor))
        .await
        .expect("create step");
    assert_eq!(step.approver, Some(target_owner()));
    assert_eq!(step.timeout_hours, 72);
    assert_eq!(step.outcome, ApprovalOutcome::Pending);

    let dup = h
        .service
        .create_approval_step(&transfer, ApprovalType::Target, None)
        .await;
    assert!(matches!(dup, Err(AppError::DuplicateStep(_))));

    let created = h
        .audit
        .entries()
        .into_iter()
        .find(|e| e.event_type == AuditEventType::StepCreated)
        .expect("audited");
    assert_eq!(created.actor, Some(OwnerRef::user("ops-admin")));
    assert_eq!(created.approval_type, Some(ApprovalType::Target));
}

#[tokio::test]
async fn create_approval_step_refuses_undeclared_type() {
    let h = harness().await;
    let transfer = h
        .service
        .initiate_transfer(request(false, false, false), None)
        .await
        .expect("initiate");

    let err = h
        .service
        .create_approval_step(&transfer, ApprovalType::Admin, None)
        .await
        .expect_err("admin not required");
    assert!(matches!(err, AppError::InvalidState(_)), "got {err}");

    let status = h.service.status(&transfer.id).await.expect("status");
    assert!(status.steps.is_empty());
    assert_eq!(status.state, TransferState::Approved);
    assert!(!h.audit.events().contains(&AuditEventType::StepCreated));
}

#[tokio::test]
async fn unplanned_transfer_with_requirements_stays_pending() {
    let h = harness().await;
    let transfer = h
        .service
        .initiate_transfer(request(true, true, true), None)
        .await
        .expect("initiate");

    assert_eq!(
        h.service.transfer_state(&transfer.id).await.expect("state"),
        TransferState::Pending
    );

    let err = h
        .service
        .complete_transfer(&transfer.id)
        .await
        .expect_err("not approved");
    assert!(matches!(err, AppError::InvalidState(_)), "got {err}");
    let status = h.service.status(&transfer.id).await.expect("status");
    assert!(status.transfer.completed_at.is_none());
}

#[tokio::test]
async fn approving_only_created_step_leaves_missing_requirement_pending() {
    let h = harness().await;
    let transfer = h
        .service
        .initiate_transfer(request(true, true, false), None)
        .await
        .expect("initiate");
    let source = h
        .service
        .create_approval_step(&transfer, ApprovalType::Source, None)
        .await
        .expect("create source step");

    let decision = h
        .service
        .approve(&source.id, &Principal::new(source_owner()), None)
        .await
        .expect("approve");
    assert_eq!(decision.transfer_state, TransferState::Pending);

    let err = h
        .service
        .complete_transfer(&transfer.id)
        .await
        .expect_err("target still outstanding");
    assert!(matches!(err, AppError::InvalidState(_)));

    let target = h
        .service
        .create_approval_step(&transfer, ApprovalType::Target, None)
        .await
        .expect("create target step");
    let decision = h
        .service
        .approve(&target.id, &Principal::new(target_owner()), None)
        .await
        .expect("approve");
    assert_eq!(decision.transfer_state, TransferState::Approved);
}

#[tokio::test]
async fn pending_for_actor_lists_only_decidable_steps() {
    let h = harness().await;
    let transfer = h
        .service
        .initiate_transfer(request(true, true, true), None)
        .await
        .expect("initiate");
    h.service.plan_approvals(&transfer).await.expect("plan");

    let for_target = h
        .service
        .pending_for_actor(&Principal::new(target_owner()))
        .await
        .expect("pending");
    assert_eq!(for_target.len(), 1);
    assert_eq!(for_target[0].approval_type, ApprovalType::Target);

    let for_admin = h.service.pending_for_actor(&admin()).await.expect("pending");
    assert_eq!(for_admin.len(), 1);
    assert_eq!(for_admin[0].approval_type, ApprovalType::Admin);

    let for_stranger = h
        .service
        .pending_for_actor(&Principal::new(OwnerRef::user("nobody")))
        .await
        .expect("pending");
    assert!(for_stranger.is_empty());

    // Once the transfer is vetoed nothing is left to decide.
    h.service
        .reject(&for_admin[0].id, &admin(), None)
        .await
        .expect("reject");
    let after_veto = h
        .service
        .pending_for_actor(&Principal::new(target_owner()))
        .await
        .expect("pending");
    assert!(after_veto.is_empty());
}

#[tokio::test]
async fn history_lists_transfers_of_license() {
    let h = harness().await;
    let first = h
        .service
        .initiate_transfer(request(false, false, false), None)
        .await
        .expect("first");
    let second = h
        .service
        .initiate_transfer(request(true, false, false), None)
        .await
        .expect("second");
    h.service.plan_approvals(&second).await.expect("plan");

    let history = h.service.transfers_for_license(LICENSE).await.expect("history");
    assert_eq!(history.len(), 2);
    let states: Vec<_> = history
        .iter()
        .map(|s| (s.transfer.id.clone(), s.state))
        .collect();
    assert!(states.contains(&(first.id, TransferState::Approved)));
    assert!(states.contains(&(second.id, TransferState::Pending)));
}
