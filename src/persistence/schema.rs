//! `SQLite` schema bootstrap logic.
//!
//! All table definitions use `CREATE TABLE IF NOT EXISTS`, so the bootstrap
//! is safe to re-run on every startup.

use sqlx::SqlitePool;

use crate::Result;

/// Apply all table definitions to the connected `SQLite` database.
///
/// # Errors
///
/// Returns `AppError::Db` if any DDL statement fails.
pub async fn bootstrap_schema(pool: &SqlitePool) -> Result<()> {
    let ddl = r"
CREATE TABLE IF NOT EXISTS license_transfer (
    id                        TEXT PRIMARY KEY NOT NULL,
    license_id                TEXT NOT NULL,
    from_type                 TEXT NOT NULL,
    from_id                   TEXT NOT NULL,
    to_type                   TEXT NOT NULL,
    to_id                     TEXT NOT NULL,
    requires_source_approval  INTEGER NOT NULL DEFAULT 0,
    requires_target_approval  INTEGER NOT NULL DEFAULT 0,
    requires_admin_approval   INTEGER NOT NULL DEFAULT 0,
    reason                    TEXT,
    initiated_by_type         TEXT,
    initiated_by_id           TEXT,
    created_at                TEXT NOT NULL,
    completed_at              TEXT
);

CREATE TABLE IF NOT EXISTS transfer_approval (
    id                TEXT PRIMARY KEY NOT NULL,
    transfer_id       TEXT NOT NULL REFERENCES license_transfer(id),
    approval_type     TEXT NOT NULL CHECK(approval_type IN ('source','target','admin')),
    approver_type     TEXT,
    approver_id       TEXT,
    timeout_hours     INTEGER NOT NULL CHECK(timeout_hours > 0),
    outcome           TEXT NOT NULL CHECK(outcome IN ('pending','approved','rejected')),
    resolved_by_type  TEXT,
    resolved_by_id    TEXT,
    resolved_at       TEXT,
    notes             TEXT,
    created_at        TEXT NOT NULL,
    UNIQUE(transfer_id, approval_type)
);

CREATE INDEX IF NOT EXISTS idx_transfer_license ON license_transfer(license_id);
CREATE INDEX IF NOT EXISTS idx_approval_transfer ON transfer_approval(transfer_id);
CREATE INDEX IF NOT EXISTS idx_approval_outcome ON transfer_approval(outcome);
";

    sqlx::raw_sql(ddl).execute(pool).await?;
    Ok(())
}
