//! Workspace-level orchestration: resolves where a provider's logs live,
//! persists resumable snapshots of aggregator state, and drives `Reader`s
//! from file-watch notifications into live `FollowEvent` streams.

mod config;
mod error;
mod snapshot_store;
mod watcher;

pub use config::{resolve_workspace_path, Config, ProviderConfig};
pub use error::{Error, Result};
pub use snapshot_store::{snapshots_dir, SnapshotEnvelope, SnapshotStore, SNAPSHOT_VERSION};
pub use watcher::{database_watcher, jsonl_tail_watcher, ReaderWatcher, SessionWatcher};
