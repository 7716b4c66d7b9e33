//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::models::approval::ApprovalType;
use crate::{AppError, Result};

/// Permission an administrator must hold to decide `admin` approval steps.
pub const DEFAULT_ADMIN_PERMISSION: &str = "approve-license-transfers";

/// Per-approval-type timeout values (hours).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Window for the current owner to sign off.
    #[serde(default = "default_owner_hours")]
    pub source_hours: u32,
    /// Window for the receiving owner to sign off.
    #[serde(default = "default_owner_hours")]
    pub target_hours: u32,
    /// Window for an administrator to sign off.
    #[serde(default = "default_admin_hours")]
    pub admin_hours: u32,
}

fn default_owner_hours() -> u32 {
    72
}

fn default_admin_hours() -> u32 {
    120
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            source_hours: default_owner_hours(),
            target_hours: default_owner_hours(),
            admin_hours: default_admin_hours(),
        }
    }
}

impl TimeoutConfig {
    /// Timeout configured for the given approval type.
    #[must_use]
    pub fn hours_for(&self, approval_type: ApprovalType) -> u32 {
        match approval_type {
            ApprovalType::Source => self.source_hours,
            ApprovalType::Target => self.target_hours,
            ApprovalType::Admin => self.admin_hours,
        }
    }
}

fn default_admin_permission() -> String {
    DEFAULT_ADMIN_PERMISSION.into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("licensegate.db")
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// `SQLite` database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Directory receiving JSONL audit files; auditing is disabled when unset.
    #[serde(default)]
    pub audit_log_dir: Option<PathBuf>,
    /// Permission name checked for `admin` steps.
    #[serde(default = "default_admin_permission")]
    pub admin_permission: String,
    /// Approval windows.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            audit_log_dir: None,
            admin_permission: default_admin_permission(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for approval_type in ApprovalType::ALL {
            if self.timeouts.hours_for(approval_type) == 0 {
                return Err(AppError::Config(format!(
                    "timeouts.{}_hours must be greater than zero",
                    approval_type.as_str()
                )));
            }
        }

        if self.admin_permission.trim().is_empty() {
            return Err(AppError::Config("admin_permission must not be empty".into()));
        }

        Ok(())
    }
}
