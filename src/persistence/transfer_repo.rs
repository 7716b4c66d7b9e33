//! License transfer repository for `SQLite` persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::owner::{OwnerKind, OwnerRef};
use crate::models::transfer::Transfer;
use crate::{AppError, Result};

use super::db::Database;
use super::{owner_columns, owner_from_columns, parse_optional_timestamp, parse_timestamp};

/// Repository wrapper around `SQLite` for transfer records.
#[derive(Clone)]
pub struct TransferRepo {
    db: Arc<Database>,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
struct TransferRow {
    id: String,
    license_id: String,
    from_type: String,
    from_id: String,
    to_type: String,
    to_id: String,
    requires_source_approval: bool,
    requires_target_approval: bool,
    requires_admin_approval: bool,
    reason: Option<String>,
    initiated_by_type: Option<String>,
    initiated_by_id: Option<String>,
    created_at: String,
    completed_at: Option<String>,
}

impl TransferRow {
    /// Convert a database row into the domain model.
    fn into_transfer(self) -> Result<Transfer> {
        let created_at = parse_timestamp("created_at", &self.created_at)?;
        let completed_at = parse_optional_timestamp("completed_at", self.completed_at.as_deref())?;

        Ok(Transfer {
            id: self.id,
            license_id: self.license_id,
            from: OwnerRef::new(OwnerKind::parse(&self.from_type), self.from_id),
            to: OwnerRef::new(OwnerKind::parse(&self.to_type), self.to_id),
            requires_source_approval: self.requires_source_approval,
            requires_target_approval: self.requires_target_approval,
            requires_admin_approval: self.requires_admin_approval,
            reason: self.reason,
            initiated_by: owner_from_columns(self.initiated_by_type, self.initiated_by_id),
            created_at,
            completed_at,
        })
    }
}

impl TransferRepo {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new transfer record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the database insert fails.
    pub async fn create(&self, transfer: &Transfer) -> Result<Transfer> {
        let (initiated_type, initiated_id) = owner_columns(transfer.initiated_by.as_ref());
        let created_at = transfer.created_at.to_rfc3339();
        let completed_at = transfer.completed_at.map(|dt| dt.to_rfc3339());

        sqlx::query(
            "INSERT INTO license_transfer (id, license_id, from_type, from_id, to_type, to_id,
             requires_source_approval, requires_target_approval, requires_admin_approval,
             reason, initiated_by_type, initiated_by_id, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&transfer.id)
        .bind(&transfer.license_id)
        .bind(transfer.from.kind.as_str())
        .bind(&transfer.from.id)
        .bind(transfer.to.kind.as_str())
        .bind(&transfer.to.id)
        .bind(transfer.requires_source_approval)
        .bind(transfer.requires_target_approval)
        .bind(transfer.requires_admin_approval)
        .bind(&transfer.reason)
        .bind(initiated_type)
        .bind(initiated_id)
        .bind(&created_at)
        .bind(&completed_at)
        .execute(self.db.as_ref())
        .await?;

        Ok(transfer.clone())
    }

    /// Retrieve a transfer by identifier.
    ///
    /// Returns `Ok(None)` if the transfer does not exist.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Transfer>> {
        let row: Option<TransferRow> =
            sqlx::query_as("SELECT * FROM license_transfer WHERE id = ?1")
                .bind(id)
                .fetch_optional(self.db.as_ref())
                .await?;

        row.map(TransferRow::into_transfer).transpose()
    }

    /// Retrieve a transfer by identifier, failing if it is missing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the transfer does not exist, or
    /// `AppError::Db` if the query fails.
    pub async fn require(&self, id: &str) -> Result<Transfer> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("transfer {id} not found")))
    }

    /// List transfers for a license, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query fails.
    pub async fn list_for_license(&self, license_id: &str) -> Result<Vec<Transfer>> {
        let rows: Vec<TransferRow> = sqlx::query_as(
            "SELECT * FROM license_transfer WHERE license_id = ?1 ORDER BY created_at",
        )
        .bind(license_id)
        .fetch_all(self.db.as_ref())
        .await?;

        rows.into_iter().map(TransferRow::into_transfer).collect()
    }

    /// Stamp `completed_at` on a transfer that has not been completed yet.
    ///
    /// Returns `false` when the transfer was already completed (or does not
    /// exist); only the first caller wins.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the update fails.
    pub async fn mark_completed(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE license_transfer SET completed_at = ?1 WHERE id = ?2 AND completed_at IS NULL",
        )
        .bind(at.to_rfc3339())
        .bind(id)
        .execute(self.db.as_ref())
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
