//! CLI argument definitions.

use clap::{Parser, Subcommand};

use crate::commands::vote::VoteCommand;

/// Exercise the vote write/toggle subsystem against a mock or real PDS.
#[derive(Parser, Debug)]
#[command(name = "votectl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Vote create/delete/list operations
    Vote(VoteCommand),

    /// Run fresh-vote/toggle-off/flip scenarios against an in-memory mock
    /// PDS, with no network access, for offline smoke-testing.
    Demo,
}
