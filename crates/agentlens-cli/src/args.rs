use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "agentlens", version, about = "Inspect local AI coding-agent session logs")]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv); overridden by RUST_LOG if set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum ProviderKind {
    WorkspaceJsonl,
    RolloutJsonl,
    EmbeddedDb,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List log directories detected for known providers under $HOME.
    Providers,

    /// List sessions a provider finds under a log root, newest first.
    Sessions {
        #[arg(long, value_enum)]
        provider: ProviderKind,
        log_root: PathBuf,
    },

    /// Replay a session file/database row end to end and print its
    /// aggregated metrics as JSON.
    Metrics {
        #[arg(long, value_enum)]
        provider: ProviderKind,
        session_path: PathBuf,
    },

    /// Classify a session file's liveness from its tail bytes and mtime.
    Activity { session_path: PathBuf },

    /// Replay a session and print its repeated tool-call/event patterns.
    Patterns {
        #[arg(long, value_enum)]
        provider: ProviderKind,
        session_path: PathBuf,
    },

    /// Watch a session for new events and print them as they arrive.
    Watch {
        #[arg(long, value_enum)]
        provider: ProviderKind,
        session_path: PathBuf,
        /// Replay the whole session first instead of starting from the end.
        #[arg(long)]
        replay: bool,
    },
}
