pub mod error;
pub mod traits;

pub mod follow_event;
pub mod normalize;
pub mod reader;
pub mod search;
pub mod tool_summary;

pub mod embedded_db;
pub mod rollout_jsonl;
pub mod workspace_jsonl;

pub use embedded_db::EmbeddedDbProvider;
pub use error::{Error, Result};
pub use follow_event::to_follow_event;
pub use reader::{ByteOffsetReader, TimeCursorReader};
pub use rollout_jsonl::RolloutJsonlProvider;
pub use traits::{Reader, ReaderCursor, SearchHit, SessionFileStats, SessionProvider};
pub use tool_summary::format_tool_input;
pub use workspace_jsonl::WorkspaceJsonlProvider;
