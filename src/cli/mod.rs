//! Command-line interface for the Kitchen Hub backend.

mod commands;

use clap::{Parser, Subcommand};

/// Kitchen Hub - restaurant ordering backend
#[derive(Parser)]
#[command(name = "kitchen-hub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server (default)
    Serve,

    /// Create the admin account or reset it to the bootstrap credentials
    #[command(alias = "reset-admin")]
    CreateAdmin(AdminArgs),

    /// Reconcile the admin account and create a demo customer
    Seed,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

/// Overrides for the `[admin]` section of the config file.
#[derive(Debug, Default, clap::Args)]
pub struct AdminArgs {
    /// Admin username
    #[arg(long)]
    pub username: Option<String>,

    /// Admin email
    #[arg(long)]
    pub email: Option<String>,

    /// Admin password (prefer ADMIN_PASSWORD to keep it out of shell history)
    #[arg(long)]
    pub password: Option<String>,

    /// Overwrite the email of an existing admin account
    #[arg(long)]
    pub reset_email: bool,
}

pub use commands::*;
