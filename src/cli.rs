//! Command-line surface of the `licensegate` binary.
//!
//! Argument parsing and the mapping from command results to process exit
//! codes live here so they can be exercised without spawning the binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::actor::Principal;
use crate::models::owner::{OwnerKind, OwnerRef};
use crate::{AppError, Result};

/// Exit code for a command that completed.
pub const EXIT_OK: u8 = 0;
/// Exit code for configuration, storage, or lookup failures.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for an approve or reject that was refused.
pub const EXIT_REFUSED: u8 = 3;

/// Log output format.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(name = "licensegate", about = "License transfer approvals", version, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the database path from the configuration.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Workflow command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Identity and capabilities of the acting party.
#[derive(Debug, Clone, Args)]
pub struct ActorArgs {
    /// Actor kind (`user`, `team`, `organization`, or a custom kind).
    #[arg(long)]
    pub actor_kind: String,

    /// Actor identifier.
    #[arg(long)]
    pub actor_id: String,

    /// License the actor owns; enables the ownership capability.
    #[arg(long = "owns-license")]
    pub owns_license: Vec<String>,

    /// Enable the ownership capability with no owned license, so source
    /// steps are refused unless `--owns-license` names the license.
    #[arg(long)]
    pub initiator: bool,

    /// Permission the actor holds; enables the permission capability.
    #[arg(long = "permission")]
    pub permissions: Vec<String>,
}

impl ActorArgs {
    /// Build the in-memory actor these flags describe.
    #[must_use]
    pub fn principal(&self) -> Principal {
        let mut principal = Principal::new(OwnerRef::new(
            OwnerKind::parse(&self.actor_kind),
            self.actor_id.clone(),
        ));
        if self.initiator {
            principal = principal.initiator();
        }
        for license in &self.owns_license {
            principal = principal.owning(license.clone());
        }
        for permission in &self.permissions {
            principal = principal.with_permission(permission.clone());
        }
        principal
    }
}

/// Workflow commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a new transfer, optionally planning its approvals right away.
    Initiate {
        /// License being transferred.
        #[arg(long)]
        license: String,
        /// Current owner kind.
        #[arg(long)]
        from_kind: String,
        /// Current owner identifier.
        #[arg(long)]
        from_id: String,
        /// Receiving owner kind.
        #[arg(long)]
        to_kind: String,
        /// Receiving owner identifier.
        #[arg(long)]
        to_id: String,
        /// Require the current owner's sign-off.
        #[arg(long)]
        source: bool,
        /// Require the receiving owner's sign-off.
        #[arg(long)]
        target: bool,
        /// Require an administrator's sign-off.
        #[arg(long)]
        admin: bool,
        /// Justification recorded with the transfer.
        #[arg(long)]
        reason: Option<String>,
        /// Also persist the approval plan.
        #[arg(long)]
        plan: bool,
    },
    /// Persist the approval plan of an existing transfer.
    Plan {
        /// Transfer identifier.
        #[arg(long)]
        transfer: String,
    },
    /// Approve a pending step.
    Approve {
        /// Approval step identifier.
        #[arg(long)]
        step: String,
        /// Note recorded with the decision.
        #[arg(long)]
        notes: Option<String>,
        /// Deciding actor.
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Reject a pending step.
    Reject {
        /// Approval step identifier.
        #[arg(long)]
        step: String,
        /// Note recorded with the decision.
        #[arg(long)]
        notes: Option<String>,
        /// Deciding actor.
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Show a transfer with its steps and derived state.
    Status {
        /// Transfer identifier.
        #[arg(long)]
        transfer: String,
    },
    /// Show every transfer of a license.
    History {
        /// License identifier.
        #[arg(long)]
        license: String,
    },
    /// List pending steps the actor may decide.
    Pending {
        /// Actor whose decidable steps are listed.
        #[command(flatten)]
        actor: ActorArgs,
    },
    /// Finalize an approved transfer.
    Complete {
        /// Transfer identifier.
        #[arg(long)]
        transfer: String,
    },
}

/// Process exit code for the outcome of a command.
#[must_use]
pub fn exit_code(outcome: &Result<()>) -> u8 {
    match outcome {
        Ok(()) => EXIT_OK,
        Err(err) if err.is_refusal() => EXIT_REFUSED,
        Err(_) => EXIT_FAILURE,
    }
}

/// Render a command result as the pretty-printed JSON written to stdout.
///
/// # Errors
///
/// Returns `AppError::Io` if the value cannot be serialized.
pub fn render_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| AppError::Io(format!("failed to render output: {err}")))
}
