use std::sync::OnceLock;

use regex::Regex;

/// Ordered regex -> display-name markers. First match wins.
fn markers() -> &'static [(Regex, &'static str)] {
    static MARKERS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    MARKERS
        .get_or_init(|| {
            vec![
                (Regex::new(r"(?i)response truncated").unwrap(), "Response truncated"),
                (
                    Regex::new(r"(?i)tool output was truncated").unwrap(),
                    "Tool output was truncated",
                ),
                (Regex::new(r"(?i)content_too_long").unwrap(), "content_too_long"),
                (
                    Regex::new(r"(?i)<response clipped>").unwrap(),
                    "<response clipped>",
                ),
                (
                    Regex::new(r"(?i)\[content truncated").unwrap(),
                    "[Content truncated",
                ),
                (Regex::new(r"(?i)\[\.\.\.truncated").unwrap(), "[...truncated"),
            ]
        })
        .as_slice()
}

/// First matching marker's display name, if any.
pub fn detect(text: &str) -> Option<&'static str> {
    markers().iter().find(|(re, _)| re.is_match(text)).map(|(_, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_markers() {
        assert_eq!(detect("Error: content_too_long exceeded"), Some("content_too_long"));
        assert_eq!(detect("...[...truncated"), Some("[...truncated"));
    }

    #[test]
    fn returns_none_for_normal_output() {
        assert_eq!(detect("everything went fine"), None);
    }
}
