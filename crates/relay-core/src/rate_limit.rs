use std::{collections::VecDeque, time::Duration};

use crate::utils::now_millis;

// ============== Broadcast Window (sliding log) ==============

/// Sliding-window cap on room broadcasts.
///
/// Keeps one timestamp per accepted broadcast. Every admission check first
/// drops timestamps older than the window, then admits only while fewer than
/// `limit` remain.
#[derive(Clone, Debug)]
pub struct BroadcastWindow {
    limit: usize,
    window_ms: i64,
    sent: VecDeque<i64>,
}

impl BroadcastWindow {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
            sent: VecDeque::new(),
        }
    }

    pub fn admit(&mut self) -> bool {
        self.admit_at(now_millis())
    }

    /// Admit a broadcast at `now_ms`. A rejected call leaves the log untouched.
    pub fn admit_at(&mut self, now_ms: i64) -> bool {
        self.prune(now_ms);
        if self.sent.len() >= self.limit {
            return false;
        }
        self.sent.push_back(now_ms);
        true
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms.max(0) as u64)
    }

    /// Number of broadcasts currently counted against the cap.
    pub fn in_window(&self) -> usize {
        self.sent.len()
    }

    fn prune(&mut self, now_ms: i64) {
        let cutoff = now_ms.saturating_sub(self.window_ms);
        while self.sent.front().is_some_and(|&ts| ts < cutoff) {
            self.sent.pop_front();
        }
    }
}
