//! CLI module - Command-line interface for members
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

pub use commands::{cmd_init_config, cmd_list_users, cmd_set_role};

/// Members - session-based signup/login with admin roles
#[derive(Parser)]
#[command(name = "members")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web server (default)
    Serve,

    /// List registered users
    #[command(alias = "ls")]
    Users,

    /// Grant the admin role (use this to create the first admin)
    Promote {
        /// Email of the account to promote
        email: String,
    },

    /// Revoke the admin role
    Demote {
        /// Email of the account to demote
        email: String,
    },

    /// Write a default config.toml if none exists
    InitConfig,
}

impl Commands {
    /// Whether the command reads a config file at all.
    #[must_use]
    pub const fn needs_config(&self) -> bool {
        !matches!(self, Self::InitConfig)
    }

    /// Session and password settings only matter to the web server; the
    /// maintenance commands only need the database path.
    #[must_use]
    pub const fn needs_valid_config(&self) -> bool {
        matches!(self, Self::Serve)
    }
}
