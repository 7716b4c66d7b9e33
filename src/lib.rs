#![forbid(unsafe_code)]

//! License transfer approval workflow.
//!
//! Plans the sign-offs a license transfer needs, decides who may approve or
//! reject each step, and derives the transfer's overall state from the
//! persisted step outcomes.

pub mod actor;
pub mod audit;
pub mod cli;
pub mod config;
pub mod errors;
pub mod models;
pub mod persistence;
pub mod policy;
pub mod workflow;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
