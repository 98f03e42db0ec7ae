use agentlens_types::{BurnRateInfo, BurnSample};
use chrono::{DateTime, Utc};

/// Sliding-window tokens/minute tracker (spec §4.4.9).
#[derive(Debug, Default)]
pub struct BurnRateTracker {
    samples: Vec<BurnSample>,
    last_sample_time: Option<DateTime<Utc>>,
    tokens_since_last_sample: u64,
}

impl BurnRateTracker {
    pub fn record_tokens(&mut self, now: DateTime<Utc>, tokens: u64, sample_ms: i64, window_ms: i64) {
        self.tokens_since_last_sample += tokens;

        let Some(last) = self.last_sample_time else {
            self.last_sample_time = Some(now);
            return;
        };

        let elapsed_ms = (now - last).num_milliseconds();
        if elapsed_ms < sample_ms {
            return;
        }

        // Clamp the denominator to a minimum of one minute so a single
        // fast-arriving event doesn't produce a wildly inflated rate.
        let denom_ms = elapsed_ms.max(60_000) as f64;
        let tokens_per_minute = ((self.tokens_since_last_sample as f64 / denom_ms) * 60_000.0).round() as u64;

        self.samples.push(BurnSample { time_ms: now.timestamp_millis(), tokens_per_minute });
        self.tokens_since_last_sample = 0;
        self.last_sample_time = Some(now);

        let cutoff = now.timestamp_millis() - window_ms;
        self.samples.retain(|s| s.time_ms >= cutoff);
    }

    pub fn snapshot(&self) -> BurnRateInfo {
        BurnRateInfo {
            tokens_per_minute: self.samples.last().map(|s| s.tokens_per_minute).unwrap_or(0),
            samples: self.samples.clone(),
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.last_sample_time = None;
        self.tokens_since_last_sample = 0;
    }

    pub fn last_sample_time(&self) -> Option<DateTime<Utc>> {
        self.last_sample_time
    }

    pub fn tokens_since_last_sample(&self) -> u64 {
        self.tokens_since_last_sample
    }

    pub fn restore(&mut self, samples: Vec<BurnSample>, last_sample_time: Option<DateTime<Utc>>, tokens_since_last_sample: u64) {
        self.samples = samples;
        self.last_sample_time = last_sample_time;
        self.tokens_since_last_sample = tokens_since_last_sample;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn reports_zero_before_any_sample_is_taken() {
        let tracker = BurnRateTracker::default();
        assert_eq!(tracker.snapshot().tokens_per_minute, 0);
    }

    #[test]
    fn samples_after_sample_interval_elapses() {
        let mut tracker = BurnRateTracker::default();
        let t0 = Utc::now();
        tracker.record_tokens(t0, 100, 10_000, 300_000);
        assert_eq!(tracker.snapshot().tokens_per_minute, 0);

        let t1 = t0 + Duration::milliseconds(15_000);
        tracker.record_tokens(t1, 50, 10_000, 300_000);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.samples.len(), 1);
        assert!(snapshot.tokens_per_minute > 0);
    }
}
