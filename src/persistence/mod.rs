//! Persistence layer modules.

use chrono::{DateTime, Utc};

use crate::models::owner::{OwnerKind, OwnerRef};
use crate::{AppError, Result};

pub mod approval_repo;
pub mod db;
pub mod schema;
pub mod transfer_repo;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Db(format!("invalid {column}: {e}")))
}

fn parse_optional_timestamp(column: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_timestamp(column, s)).transpose()
}

/// Rebuild an owner reference from a nullable kind/id column pair.
fn owner_from_columns(kind: Option<String>, id: Option<String>) -> Option<OwnerRef> {
    match (kind, id) {
        (Some(kind), Some(id)) => Some(OwnerRef::new(OwnerKind::parse(&kind), id)),
        _ => None,
    }
}

fn owner_columns(owner: Option<&OwnerRef>) -> (Option<&str>, Option<&str>) {
    owner.map_or((None, None), |o| (Some(o.kind.as_str()), Some(o.id.as_str())))
}
