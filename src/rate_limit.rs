use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Sliding-window limiter for webhook deliveries, keyed by job name
#[derive(Default)]
pub struct RateLimiter {
    /// delivery timestamps per job
    requests: HashMap<String, Vec<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if the given job has exceeded `max` deliveries within the window.
    /// Returns `true` if the rate limit is exceeded, `false` otherwise (and records the delivery).
    pub fn check_rate_limit(&mut self, job_name: &str, max: usize, window_secs: u64) -> bool {
        self.check_at(job_name, max, Duration::from_secs(window_secs), Instant::now())
    }

    /// Drop the delivery history of every job not named in `job_names`.
    pub fn retain_jobs(&mut self, job_names: &[&str]) {
        self.requests
            .retain(|job, _| job_names.contains(&job.as_str()));
    }

    pub fn tracked_jobs(&self) -> usize {
        self.requests.len()
    }

    fn check_at(&mut self, job_name: &str, max: usize, window: Duration, now: Instant) -> bool {
        let timestamps = self.requests.entry(job_name.to_string()).or_default();

        // Forget deliveries older than the window
        timestamps.retain(|&t| now.duration_since(t) < window);

        if timestamps.len() < max {
            timestamps.push(now);
            false
        } else {
            true
        }
    }
}
