//! Command-line interface: the server plus offline key maintenance.

mod commands;

use clap::{Parser, Subcommand};

/// Keymark - article paywall with redeemable access keys
#[derive(Parser)]
#[command(name = "keymark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Port to listen on, overriding the config file
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Manage access keys
    Keys {
        #[command(subcommand)]
        command: KeyCommands,
    },
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Generate a batch of unused keys
    #[command(alias = "gen")]
    Generate {
        /// Number of keys
        #[arg(long, default_value_t = 1)]
        count: usize,
        /// Validity in hours after first use; -1 never expires
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        duration: i64,
    },

    /// List keys
    #[command(alias = "ls")]
    List {
        /// Sort order: status_asc, status_desc, duration_asc, duration_desc, time_asc or time_desc
        #[arg(long)]
        sort: Option<String>,
    },

    /// Make every key unlimited and revive expired ones
    MakeUnlimited,

    /// Delete keys bound to articles that no longer exist
    PurgeOrphans,
}

pub use commands::*;
