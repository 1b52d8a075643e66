//! Feature flag audit CLI library.
//!
//! This crate provides the CLI interface for the audit log reports.

mod cli;
pub mod commands;
mod config;
pub mod output;

pub use cli::{Cli, Commands, FetchArgs};
pub use config::Config;
