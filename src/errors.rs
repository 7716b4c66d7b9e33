//! Error types shared across the crate.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// Actor is not allowed to decide the approval step.
    Unauthorized(String),
    /// Approval step (or transfer completion) has already been resolved.
    AlreadyDecided(String),
    /// Decision attempted on a transfer whose approval window elapsed.
    Expired(String),
    /// An approval step of the same type already exists for the transfer.
    DuplicateStep(String),
    /// Operation is not valid in the transfer's current derived state.
    InvalidState(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl AppError {
    /// Whether the error represents a refused decision rather than an
    /// infrastructure failure.
    #[must_use]
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::AlreadyDecided(_) | Self::Expired(_)
        )
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            Self::AlreadyDecided(msg) => write!(f, "already decided: {msg}"),
            Self::Expired(msg) => write!(f, "expired: {msg}"),
            Self::DuplicateStep(msg) => write!(f, "duplicate step: {msg}"),
            Self::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}
