//! CLI command definitions for the `examiner` binary.
//!
//! Uses clap derive macros for argument parsing. Administration follows a
//! noun-verb pattern (e.g., `examiner quota set 7 3600`).

pub mod quota;
pub mod token;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use examiner_observe::tracing_setup::LogFormat;
use examiner_types::identity::UserId;

/// Real-time AI interview server.
#[derive(Parser)]
#[command(name = "examiner", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format: text or json.
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Also export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the interview HTTP/WebSocket server.
    Serve {
        /// Address to bind (overrides `server.host` in config.toml).
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides `server.port` in config.toml).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Inspect or grant interview time.
    Quota {
        #[command(subcommand)]
        action: QuotaAction,
    },

    /// Manage access tokens.
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum QuotaAction {
    /// Show a user's remaining interview time.
    Show {
        /// Numeric user id.
        user_id: UserId,
    },

    /// Set a user's remaining interview time, creating the user if needed.
    Set {
        /// Numeric user id.
        user_id: UserId,

        /// Remaining time in seconds.
        seconds: i64,

        /// Display name (defaults to `user-<id>` for new users).
        #[arg(long)]
        username: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TokenAction {
    /// Issue a new access token for a user (shown once).
    Issue {
        /// Numeric user id.
        user_id: UserId,
    },

    /// Revoke an access token.
    Revoke {
        /// The plaintext token.
        token: String,
    },
}
