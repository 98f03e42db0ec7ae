use agentlens_types::{PlanState, SessionEvent};

/// Hook the plan extractor (`agentlens-planner`) implements so the
/// aggregator can feed it events without depending on that crate.
///
/// Takes the full `SessionEvent` rather than the lossy `FollowEvent`: plan
/// bodies (a `Write` to a plan file, an `UpdatePlan.input.plan` array) run
/// well past the 80-char tool-input-preview cap, so truncated previews would
/// corrupt multi-step plans before the parser ever sees them.
pub trait PlanTracker: Send {
    fn on_session_event(&mut self, event: &SessionEvent);
    fn snapshot(&self) -> Option<PlanState>;
    fn reset(&mut self);
}
