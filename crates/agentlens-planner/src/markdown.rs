use std::sync::OnceLock;

use agentlens_types::{Complexity, PlanStep, StepStatus};
use regex::Regex;

const MIN_BULLET_LEN: usize = 3;

const HIGH_COMPLEXITY_WORDS: &[&str] =
    &["refactor", "migrate", "rewrite", "redesign", "overhaul", "rearchitect"];
const LOW_COMPLEXITY_WORDS: &[&str] = &["update", "fix", "tweak", "rename", "adjust", "bump", "typo"];

fn checkbox_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-*]\s*\[( |x|X)\]\s*(.+)$").expect("static regex"))
}

fn numbered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+[.)]\s*(.+)$").expect("static regex"))
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-*+]\s+(.+)$").expect("static regex"))
}

fn phase_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^##\s*phase\s*\d+\s*:\s*(.+)$").expect("static regex"))
}

fn title_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#{1,2}\s+(.+)$").expect("static regex"))
}

fn bold_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\*\*([^*]+)\*\*:\s*(.*)$").expect("static regex"))
}

fn bracket_complexity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)[\[(](high|medium|low|simple)[\])]").expect("static regex"))
}

/// One shared parser used by every provider's plan-source dispatcher.
#[derive(Debug, Default)]
pub struct ParsedPlan {
    pub title: Option<String>,
    pub steps: Vec<PlanStep>,
}

/// Parses a checkbox/numbered/bullet list with optional phase and title
/// headers. Non-item lines that don't match a recognized header are ignored.
pub fn parse(markdown: &str) -> ParsedPlan {
    let mut title = None;
    let mut current_phase: Option<String> = None;
    let mut steps = Vec::new();

    for raw_line in markdown.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = phase_header_re().captures(line) {
            current_phase = Some(caps[1].trim().to_string());
            continue;
        }

        if title.is_none() {
            if let Some(caps) = title_header_re().captures(line) {
                title = Some(caps[1].trim().to_string());
                continue;
            }
        } else if title_header_re().is_match(line) {
            continue;
        }

        if let Some(caps) = checkbox_re().captures(line) {
            let checked = caps[1].eq_ignore_ascii_case("x");
            let desc = normalize_bold_label(caps[2].trim());
            if desc.len() <= MIN_BULLET_LEN {
                continue;
            }
            steps.push(make_step(steps.len(), &desc, current_phase.clone(), checked));
            continue;
        }

        if let Some(caps) = numbered_re().captures(line) {
            let desc = normalize_bold_label(caps[1].trim());
            if desc.len() <= MIN_BULLET_LEN {
                continue;
            }
            steps.push(make_step(steps.len(), &desc, current_phase.clone(), false));
            continue;
        }

        if let Some(caps) = bullet_re().captures(line) {
            let desc = normalize_bold_label(caps[1].trim());
            if desc.len() <= MIN_BULLET_LEN {
                continue;
            }
            steps.push(make_step(steps.len(), &desc, current_phase.clone(), false));
        }
    }

    ParsedPlan { title, steps }
}

fn make_step(id: usize, description: &str, phase: Option<String>, checked: bool) -> PlanStep {
    PlanStep {
        id,
        description: description.to_string(),
        status: if checked { StepStatus::Completed } else { StepStatus::Pending },
        phase,
        complexity: infer_complexity(description),
    }
}

fn normalize_bold_label(line: &str) -> String {
    if let Some(caps) = bold_label_re().captures(line) {
        format!("{}: {}", caps[1].trim(), caps[2].trim())
    } else {
        line.to_string()
    }
}

fn infer_complexity(description: &str) -> Option<Complexity> {
    if let Some(caps) = bracket_complexity_re().captures(description) {
        return match caps[1].to_lowercase().as_str() {
            "high" => Some(Complexity::High),
            "medium" => Some(Complexity::Medium),
            "low" | "simple" => Some(Complexity::Low),
            _ => None,
        };
    }
    let lower = description.to_lowercase();
    if HIGH_COMPLEXITY_WORDS.iter().any(|w| lower.contains(w)) {
        return Some(Complexity::High);
    }
    if LOW_COMPLEXITY_WORDS.iter().any(|w| lower.contains(w)) {
        return Some(Complexity::Low);
    }
    None
}

/// Computed as `completed / total`, 0.0 when there are no steps.
pub fn completion_rate(steps: &[PlanStep]) -> f64 {
    if steps.is_empty() {
        return 0.0;
    }
    let completed = steps.iter().filter(|s| s.status == StepStatus::Completed).count();
    completed as f64 / steps.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_checkboxes_and_title() {
        let md = "# Add retry support\n- [x] Write the retry wrapper\n- [ ] Wire it into the client\n";
        let plan = parse(md);
        assert_eq!(plan.title.as_deref(), Some("Add retry support"));
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].status, StepStatus::Completed);
        assert_eq!(plan.steps[1].status, StepStatus::Pending);
    }

    #[test]
    fn groups_steps_under_phase_headers() {
        let md = "## Phase 1: Setup\n- [ ] Install dependencies\n## Phase 2: Build\n- [ ] Compile the crate\n";
        let plan = parse(md);
        assert_eq!(plan.steps[0].phase.as_deref(), Some("Setup"));
        assert_eq!(plan.steps[1].phase.as_deref(), Some("Build"));
    }

    #[test]
    fn skips_trivially_short_bullets() {
        let md = "- [ ] ok\n- [ ] Add comprehensive integration tests\n";
        let plan = parse(md);
        assert_eq!(plan.steps.len(), 1);
    }

    #[test]
    fn infers_high_complexity_from_keyword() {
        let md = "- [ ] Refactor the aggregator into smaller modules\n";
        let plan = parse(md);
        assert_eq!(plan.steps[0].complexity, Some(Complexity::High));
    }

    #[test]
    fn infers_complexity_from_bracket_marker() {
        let md = "- [ ] Tune the cache eviction policy [high]\n";
        let plan = parse(md);
        assert_eq!(plan.steps[0].complexity, Some(Complexity::High));
    }

    #[test]
    fn normalizes_bold_label_prefix() {
        let md = "- [ ] **Goal**: ship the release\n";
        let plan = parse(md);
        assert_eq!(plan.steps[0].description, "Goal: ship the release");
    }
}
