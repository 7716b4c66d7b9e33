//! Approval step repository for `SQLite` persistence.
//!
//! Steps are append-only: they are inserted pending and resolved exactly
//! once through a conditional update, never deleted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::approval::{ApprovalOutcome, ApprovalStep, ApprovalType};
use crate::models::owner::OwnerRef;
use crate::{AppError, Result};

use super::db::Database;
use super::{owner_columns, owner_from_columns, parse_optional_timestamp, parse_timestamp};

/// Repository wrapper around `SQLite` for approval step records.
#[derive(Clone)]
pub struct ApprovalRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct ApprovalRow {
    id: String,
    transfer_id: String,
    approval_type: String,
    approver_type: Option<String>,
    approver_id: Option<String>,
    timeout_hours: i64,
    outcome: String,
    resolved_by_type: Option<String>,
    resolved_by_id: Option<String>,
    resolved_at: Option<String>,
    notes: Option<String>,
    created_at: String,
}

impl ApprovalRow {
    /// Convert a database row into the domain model.
    fn into_step(self) -> Result<ApprovalStep> {
        let Some(approval_type) = ApprovalType::parse(&self.approval_type) else {
            warn!(
                step_id = %self.id,
                approval_type = %self.approval_type,
                "invariant violation: unknown approval type in storage"
            );
            return Err(AppError::Db(format!(
                "invalid approval_type: {}",
                self.approval_type
            )));
        };
        let outcome = ApprovalOutcome::parse(&self.outcome)
            .ok_or_else(|| AppError::Db(format!("invalid outcome: {}", self.outcome)))?;
        let timeout_hours = u32::try_from(self.timeout_hours)
            .map_err(|e| AppError::Db(format!("invalid timeout_hours: {e}")))?;
        let created_at = parse_timestamp("created_at", &self.created_at)?;
        let resolved_at = parse_optional_timestamp("resolved_at", self.resolved_at.as_deref())?;

        Ok(ApprovalStep {
            id: self.id,
            transfer_id: self.transfer_id,
            approval_type,
            approver: owner_from_columns(self.approver_type, self.approver_id),
            timeout_hours,
            outcome,
            resolved_by: owner_from_columns(self.resolved_by_type, self.resolved_by_id),
            resolved_at,
            notes: self.notes,
            created_at,
        })
    }
}

/// Map a unique-constraint failure to `AppError::DuplicateStep`.
fn map_insert_error(err: sqlx::Error, step: &ApprovalStep) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::DuplicateStep(format!(
                "transfer {} already has a {} approval step",
                step.transfer_id,
                step.approval_type.as_str()
            ));
        }
    }
    AppError::from(err)
}

const INSERT_STEP: &str = "INSERT INTO transfer_approval (id, transfer_id, approval_type,
     approver_type, approver_id, timeout_hours, outcome, resolved_by_type, resolved_by_id,
     resolved_at, notes, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

async fn insert_step<'e, E>(executor: E, step: &ApprovalStep) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let (approver_type, approver_id) = owner_columns(step.approver.as_ref());
    let (resolved_type, resolved_id) = owner_columns(step.resolved_by.as_ref());

    sqlx::query(INSERT_STEP)
        .bind(&step.id)
        .bind(&step.transfer_id)
        .bind(step.approval_type.as_str())
        .bind(approver_type)
        .bind(approver_id)
        .bind(i64::from(step.timeout_hours))
        .bind(step.outcome.as_str())
        .bind(resolved_type)
        .bind(resolved_id)
        .bind(step.resolved_at.map(|dt| dt.to_rfc3339()))
        .bind(&step.notes)
        .bind(step.created_at.to_rfc3339())
        .execute(executor)
        .await
        .map_err(|err| map_insert_error(err, step))?;

    Ok(())
}

impl ApprovalRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a single approval step.
    ///
    /// # Errors
    ///
    /// Returns `AppError::DuplicateStep` if the transfer already has a step
    /// of the same type, or `AppError::Db` if the insert fails.
    pub async fn create(&self, step: &ApprovalStep) -> Result<ApprovalStep> {
        insert_step(self.db.as_ref(), step).await?;
        Ok(step.clone())
    }

    /// Insert every step of a plan in one transaction.
    ///
    /// Either all steps are persisted or none are.
    ///
    /// # Errors
    ///
    /// Returns `AppError::DuplicateStep` if any step collides with an
    /// existing one, or `AppError::Db` on other failures.
    pub async fn create_all(&self, steps: &[ApprovalStep]) -> Result<()> {
        let mut tx = self.db.begin().await?;
        for step in steps {
            insert_step(&mut *tx, step).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Retrieve an approval step by identifier.
    ///
    /// Returns `Ok(None)` if the step does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<ApprovalStep>> {
        let row: Option<ApprovalRow> =
            sqlx::query_as("SELECT * FROM transfer_approval WHERE id = ?1")
                .bind(id)
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(ApprovalRow::into_step).transpose()
    }

    /// List every step of a transfer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_transfer(&self, transfer_id: &str) -> Result<Vec<ApprovalStep>> {
        let rows: Vec<ApprovalRow> = sqlx::query_as(
            "SELECT * FROM transfer_approval WHERE transfer_id = ?1 ORDER BY created_at",
        )
        .bind(transfer_id)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(ApprovalRow::into_step).collect()
    }

    /// List all pending steps across transfers.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_pending(&self) -> Result<Vec<ApprovalStep>> {
        let rows: Vec<ApprovalRow> = sqlx::query_as(
            "SELECT * FROM transfer_approval WHERE outcome = 'pending' ORDER BY created_at",
        )
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(ApprovalRow::into_step).collect()
    }

    /// Move a pending step to a terminal outcome.
    ///
    /// The update only matches rows still `pending`, so of two concurrent
    /// callers exactly one observes `true`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if `outcome` is not terminal or the update
    /// fails.
    pub async fn resolve(
        &self,
        id: &str,
        outcome: ApprovalOutcome,
        resolved_by: &OwnerRef,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        if !outcome.is_terminal() {
            return Err(AppError::Db(format!(
                "cannot resolve approval step to {}",
                outcome.as_str()
            )));
        }

        let result = sqlx::query(
            "UPDATE transfer_approval
             SET outcome = ?1, resolved_by_type = ?2, resolved_by_id = ?3,
                 resolved_at = ?4, notes = ?5
             WHERE id = ?6 AND outcome = 'pending'",
        )
        .bind(outcome.as_str())
        .bind(resolved_by.kind.as_str())
        .bind(&resolved_by.id)
        .bind(at.to_rfc3339())
        .bind(notes)
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
