//! Rolling-window request limiter keyed by client identifier.
//!
//! Each client keeps the timestamps of its recent requests. Timestamps that
//! have left the window are dropped before every count, and a request that is
//! admitted is recorded immediately, so it counts toward the quota even if a
//! later gate turns it away.

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;

const MILLIS_PER_MINUTE: i64 = 60_000;

#[derive(Debug)]
pub struct RateWindow {
    max_requests: usize,
    window_ms: i64,
    clients: DashMap<String, VecDeque<i64>>,
}

impl RateWindow {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window_ms: window.as_millis() as i64,
            clients: DashMap::new(),
        }
    }

    /// Admits and records a request at `now_ms`, or returns the number of
    /// whole minutes (rounded up) until the oldest counted request leaves the
    /// window.
    pub fn check_and_record(&self, client: &str, now_ms: i64) -> Result<(), u64> {
        let mut entry = self.clients.entry(client.to_string()).or_default();
        let timestamps = entry.value_mut();

        while let Some(&oldest) = timestamps.front() {
            if now_ms - oldest < self.window_ms {
                break;
            }
            timestamps.pop_front();
        }

        if timestamps.len() >= self.max_requests {
            let oldest = timestamps.front().copied().unwrap_or(now_ms);
            let remaining_ms = self.window_ms - (now_ms - oldest);
            return Err(ceil_minutes(remaining_ms));
        }

        timestamps.push_back(now_ms);
        Ok(())
    }

    /// Number of requests from `client` still inside the window at `now_ms`.
    pub fn count(&self, client: &str, now_ms: i64) -> usize {
        self.clients
            .get(client)
            .map(|ts| ts.iter().filter(|&&t| now_ms - t < self.window_ms).count())
            .unwrap_or(0)
    }

    /// Drops clients whose every timestamp has left the window. Returns how
    /// many were removed.
    pub fn sweep(&self, now_ms: i64) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, timestamps| {
            timestamps.retain(|&t| now_ms - t < self.window_ms);
            !timestamps.is_empty()
        });
        before.saturating_sub(self.clients.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

fn ceil_minutes(ms: i64) -> u64 {
    if ms <= 0 {
        return 0;
    }
    ((ms + MILLIS_PER_MINUTE - 1) / MILLIS_PER_MINUTE) as u64
}
