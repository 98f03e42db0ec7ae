use std::collections::VecDeque;

use agentlens_types::{LatencyStats, ResponseLatency};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
struct PendingUserRequest {
    timestamp: DateTime<Utc>,
    first_response_received: bool,
    first_response_timestamp: Option<DateTime<Utc>>,
    first_token_latency_ms: Option<i64>,
}

/// Tracks first-token and total response latency across one user/assistant
/// exchange at a time (spec §4.4.1).
#[derive(Debug, Default)]
pub struct LatencyTracker {
    pending: Option<PendingUserRequest>,
    records: VecDeque<ResponseLatency>,
}

impl LatencyTracker {
    pub fn on_user_text(&mut self, timestamp: DateTime<Utc>) {
        self.pending = Some(PendingUserRequest {
            timestamp,
            first_response_received: false,
            first_response_timestamp: None,
            first_token_latency_ms: None,
        });
    }

    /// `has_usage` marks the assistant turn as complete (carries token usage).
    pub fn on_assistant(&mut self, timestamp: DateTime<Utc>, has_text: bool, has_usage: bool, cap: usize) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };

        if !pending.first_response_received && has_text {
            pending.first_response_received = true;
            pending.first_response_timestamp = Some(timestamp);
            pending.first_token_latency_ms = Some((timestamp - pending.timestamp).num_milliseconds());
        }

        if has_usage && pending.first_response_received {
            let record = ResponseLatency {
                first_token_latency_ms: pending.first_token_latency_ms.unwrap_or(0),
                total_response_time_ms: (timestamp - pending.timestamp).num_milliseconds(),
                request_timestamp: pending.timestamp,
            };
            self.records.push_back(record);
            while self.records.len() > cap {
                self.records.pop_front();
            }
            self.pending = None;
        }
    }

    pub fn snapshot(&self) -> LatencyStats {
        let records: Vec<ResponseLatency> = self.records.iter().copied().collect();
        LatencyStats::from_records(&records)
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.records.clear();
    }

    pub fn restore(&mut self, records: Vec<ResponseLatency>, cap: usize) {
        self.records = records.into();
        while self.records.len() > cap {
            self.records.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn records_latency_once_usage_arrives() {
        let mut tracker = LatencyTracker::default();
        let t0 = Utc::now();
        tracker.on_user_text(t0);
        let t1 = t0 + Duration::milliseconds(500);
        tracker.on_assistant(t1, true, false, 100);
        let t2 = t1 + Duration::milliseconds(200);
        tracker.on_assistant(t2, true, true, 100);

        let stats = tracker.snapshot();
        assert_eq!(stats.recent.len(), 1);
        assert_eq!(stats.recent[0].first_token_latency_ms, 500);
        assert_eq!(stats.recent[0].total_response_time_ms, 700);
    }

    #[test]
    fn drops_oldest_beyond_cap() {
        let mut tracker = LatencyTracker::default();
        for i in 0..5 {
            let t0 = Utc::now() + Duration::seconds(i);
            tracker.on_user_text(t0);
            tracker.on_assistant(t0, true, true, 3);
        }
        assert_eq!(tracker.snapshot().recent.len(), 3);
    }
}
