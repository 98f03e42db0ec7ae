use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::time::SystemTime;

const STALE_AFTER: std::time::Duration = std::time::Duration::from_secs(300);
const GRACE_PERIOD: std::time::Duration = std::time::Duration::from_secs(5);
const TAIL_BYTES: u64 = 32 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    Ongoing,
    Ended,
    Stale,
}

/// Classifies a session file as ongoing/ended/stale purely from the tail of
/// its bytes plus mtime, without holding a live reader open on it.
pub fn classify(path: &Path) -> ActivityStatus {
    let Ok(metadata) = std::fs::metadata(path) else {
        return ActivityStatus::Ended;
    };
    let age = metadata.modified().ok().and_then(|m| SystemTime::now().duration_since(m).ok());

    if age.is_some_and(|a| a > STALE_AFTER) {
        return ActivityStatus::Stale;
    }

    let Some(tail) = read_tail(path, metadata.len()) else {
        return ActivityStatus::Ended;
    };
    if tail.trim().is_empty() {
        return ActivityStatus::Ended;
    }

    let lines: Vec<&str> = tail.lines().collect();
    let last_index_matching = |needle: &str| lines.iter().rposition(|l| l.contains(needle));

    if last_index_matching("\"type\":\"result\"").is_some() {
        return ActivityStatus::Ended;
    }

    let last_ending = [r#"stop_reason":"end_turn"#, r#""type":"user""#]
        .iter()
        .filter_map(|m| last_index_matching(m))
        .max();
    let last_ai_activity = [
        r#""type":"assistant""#,
        r#""type":"tool_use""#,
        r#""type":"tool_result""#,
        r#"stop_reason":"tool_use"#,
    ]
    .iter()
    .filter_map(|m| last_index_matching(m))
    .max();

    if let (Some(ai), Some(ending)) = (last_ai_activity, last_ending) {
        if ai > ending {
            return ActivityStatus::Ongoing;
        }
    } else if last_ai_activity.is_some() {
        return ActivityStatus::Ongoing;
    }

    if last_ending.is_some() {
        return if age.is_some_and(|a| a < GRACE_PERIOD) {
            ActivityStatus::Ongoing
        } else {
            ActivityStatus::Ended
        };
    }

    if age.is_some_and(|a| a < GRACE_PERIOD) {
        ActivityStatus::Ongoing
    } else {
        ActivityStatus::Ended
    }
}

fn read_tail(path: &Path, file_len: u64) -> Option<String> {
    let mut file = File::open(path).ok()?;
    let start = file_len.saturating_sub(TAIL_BYTES);
    file.seek(SeekFrom::Start(start)).ok()?;
    let mut buf = Vec::with_capacity((file_len - start) as usize);
    file.read_to_end(&mut buf).ok()?;
    Some(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(contents: &str) -> tempfile::TempPath {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f.into_temp_path()
    }

    #[test]
    fn empty_file_is_ended() {
        let path = write_file("");
        assert_eq!(classify(&path), ActivityStatus::Ended);
    }

    #[test]
    fn terminal_result_marker_is_ended() {
        let path = write_file("{\"type\":\"assistant\"}\n{\"type\":\"result\"}\n");
        assert_eq!(classify(&path), ActivityStatus::Ended);
    }

    #[test]
    fn trailing_tool_use_after_user_is_ongoing() {
        let path = write_file("{\"type\":\"user\"}\n{\"type\":\"tool_use\"}\n");
        assert_eq!(classify(&path), ActivityStatus::Ongoing);
    }

    #[test]
    fn stale_mtime_overrides_content() {
        let path = write_file("{\"type\":\"tool_use\"}\n");
        let old = filetime::FileTime::from_unix_time(0, 0);
        filetime::set_file_mtime(&path, old).unwrap();
        assert_eq!(classify(&path), ActivityStatus::Stale);
    }
}
