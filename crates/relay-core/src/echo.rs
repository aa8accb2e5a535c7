use std::{collections::VecDeque, time::Duration};

use crate::utils::now_millis;

#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingEcho {
    name: String,
    message: String,
    recorded_at: i64,
}

/// FIFO of broadcasts the relay itself posted and expects to see again in the room.
///
/// Bounded by `capacity` (oldest evicted first) and `ttl`, since an echo that
/// never arrives would otherwise sit here forever.
#[derive(Clone, Debug)]
pub struct EchoSuppressor {
    pending: VecDeque<PendingEcho>,
    capacity: usize,
    ttl_ms: i64,
}

impl EchoSuppressor {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            capacity: capacity.max(1),
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn record(&mut self, name: &str, message: &str) {
        self.record_at(name, message, now_millis());
    }

    pub fn record_at(&mut self, name: &str, message: &str, now_ms: i64) {
        self.expire(now_ms);
        while self.pending.len() >= self.capacity {
            self.pending.pop_front();
        }
        self.pending.push_back(PendingEcho {
            name: name.to_string(),
            message: message.to_string(),
            recorded_at: now_ms,
        });
    }

    /// Returns `true` (and forgets one entry) if `(name, message)` is an echo.
    pub fn try_consume(&mut self, name: &str, message: &str) -> bool {
        self.try_consume_at(name, message, now_millis())
    }

    pub fn try_consume_at(&mut self, name: &str, message: &str, now_ms: i64) -> bool {
        self.expire(now_ms);
        let Some(idx) = self
            .pending
            .iter()
            .position(|e| e.name == name && e.message == message)
        else {
            return false;
        };
        self.pending.remove(idx);
        true
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn expire(&mut self, now_ms: i64) {
        let cutoff = now_ms.saturating_sub(self.ttl_ms);
        while self.pending.front().is_some_and(|e| e.recorded_at < cutoff) {
            self.pending.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suppressor() -> EchoSuppressor {
        EchoSuppressor::new(16, Duration::from_secs(600))
    }

    #[test]
    fn recorded_echo_is_consumed_exactly_once() {
        let mut echoes = suppressor();
        echoes.record_at("Bob", "hi", 0);
        assert!(echoes.try_consume_at("Bob", "hi", 10));
        assert!(!echoes.try_consume_at("Bob", "hi", 20));
    }

    #[test]
    fn match_requires_both_fields() {
        let mut echoes = suppressor();
        echoes.record_at("Bob", "hi", 0);
        assert!(!echoes.try_consume_at("Alice", "hi", 1));
        assert!(!echoes.try_consume_at("Bob", "hi!", 1));
        assert_eq!(echoes.len(), 1);
    }

    #[test]
    fn duplicates_are_removed_one_at_a_time() {
        let mut echoes = suppressor();
        echoes.record_at("Bob", "hi", 0);
        echoes.record_at("Eve", "yo", 1);
        echoes.record_at("Bob", "hi", 2);

        assert!(echoes.try_consume_at("Bob", "hi", 3));
        assert_eq!(echoes.len(), 2);
        assert!(echoes.try_consume_at("Bob", "hi", 4));
        assert!(!echoes.try_consume_at("Bob", "hi", 5));
        assert!(echoes.try_consume_at("Eve", "yo", 6));
        assert!(echoes.is_empty());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut echoes = EchoSuppressor::new(2, Duration::from_secs(600));
        echoes.record_at("a", "1", 0);
        echoes.record_at("b", "2", 1);
        echoes.record_at("c", "3", 2);
        assert_eq!(echoes.len(), 2);
        assert!(!echoes.try_consume_at("a", "1", 3));
        assert!(echoes.try_consume_at("c", "3", 3));
    }

    #[test]
    fn expired_echoes_are_not_matched() {
        let mut echoes = EchoSuppressor::new(8, Duration::from_millis(1000));
        echoes.record_at("Bob", "hi", 0);
        assert!(!echoes.try_consume_at("Bob", "hi", 1001));
        assert!(echoes.is_empty());
    }
}
