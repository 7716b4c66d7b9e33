#![forbid(unsafe_code)]

//! `licensegate`: operator CLI for the license transfer approval workflow.
//!
//! Loads configuration, opens the `SQLite` store, and runs one workflow
//! command, printing the result as JSON.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use licensegate::audit::JsonlAuditWriter;
use licensegate::cli::{self, Cli, Command, LogFormat};
use licensegate::config::GlobalConfig;
use licensegate::models::owner::{OwnerKind, OwnerRef};
use licensegate::models::transfer::NewTransfer;
use licensegate::persistence::db;
use licensegate::workflow::TransferService;
use licensegate::{AppError, Result};

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let outcome = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))
        .and_then(|runtime| runtime.block_on(run(args)));

    let code = cli::exit_code(&outcome);
    match outcome {
        Err(err) if code == cli::EXIT_REFUSED => error!(%err, "decision refused"),
        Err(err) => error!(%err, "command failed"),
        Ok(()) => {}
    }
    ExitCode::from(code)
}

async fn run(args: Cli) -> Result<()> {
    let mut config = match args.config {
        Some(ref path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    if let Some(db_path) = args.db {
        config.db_path = db_path;
    }

    let database = Arc::new(db::connect(&config.db_path).await?);
    info!(db_path = %config.db_path.display(), "database connected");

    let mut service = TransferService::new(database, &config);
    if let Some(ref dir) = config.audit_log_dir {
        service = service.with_audit(Arc::new(JsonlAuditWriter::new(dir.clone())?));
    }

    match args.command {
        Command::Initiate {
            license,
            from_kind,
            from_id,
            to_kind,
            to_id,
            source,
            target,
            admin,
            reason,
            plan,
        } => {
            let request = NewTransfer {
                license_id: license,
                from: OwnerRef::new(OwnerKind::parse(&from_kind), from_id),
                to: OwnerRef::new(OwnerKind::parse(&to_kind), to_id),
                requires_source_approval: source,
                requires_target_approval: target,
                requires_admin_approval: admin,
                reason,
            };
            let transfer = service.initiate_transfer(request, None).await?;
            if plan || transfer.requires_no_approval() {
                service.plan_approvals(&transfer).await?;
            }
            print_json(&service.status(&transfer.id).await?)
        }
        Command::Plan { transfer } => {
            let status = service.status(&transfer).await?;
            print_json(&service.plan_approvals(&status.transfer).await?)
        }
        Command::Approve { step, notes, actor } => {
            print_json(&service.approve(&step, &actor.principal(), notes).await?)
        }
        Command::Reject { step, notes, actor } => {
            print_json(&service.reject(&step, &actor.principal(), notes).await?)
        }
        Command::Status { transfer } => print_json(&service.status(&transfer).await?),
        Command::History { license } => {
            print_json(&service.transfers_for_license(&license).await?)
        }
        Command::Pending { actor } => {
            print_json(&service.pending_for_actor(&actor.principal()).await?)
        }
        Command::Complete { transfer } => print_json(&service.complete_transfer(&transfer).await?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", cli::render_json(value)?);
    Ok(())
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
