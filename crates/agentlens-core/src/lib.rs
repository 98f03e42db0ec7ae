pub mod path;

pub use path::{
    discover_project_root, expand_tilde, normalize_path, paths_equal, project_hash_from_log_path,
    project_hash_from_root, resolve_effective_project_hash, resolve_workspace_path, Error, Result,
};
