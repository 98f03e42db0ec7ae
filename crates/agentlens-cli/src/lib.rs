//! Thin inspection CLI over the ingestion/aggregation core: lists known
//! provider log directories, replays a session into its aggregated metrics,
//! classifies liveness, clusters repeated patterns, and tails a session for
//! live `FollowEvent`s. Presentation (a TUI, a dashboard) is a separate
//! concern this binary deliberately doesn't take on.

mod args;
mod commands;

pub use args::{Cli, Commands, ProviderKind};
pub use commands::run;

/// Installs a `tracing` subscriber reading `RUST_LOG` (or `-v`/`-vv`/`-vvv`
/// as a fallback), writing to stderr.
pub fn init_logging(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}
