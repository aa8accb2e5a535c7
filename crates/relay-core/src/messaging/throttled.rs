use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{domain::UserId, messaging::port::ChatPort, Result};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* outbound chat calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between calls to the same destination (room or user).
    pub per_target_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_target_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Target {
    Room,
    User(UserId),
}

/// ChatPort decorator that spaces out outbound sends.
///
/// Backend outputs can fan out into many room and private messages at once;
/// this keeps the relay under typical chat-network flood limits.
pub struct ThrottledChat {
    inner: Arc<dyn ChatPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_target: Mutex<HashMap<Target, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledChat {
    pub fn new(inner: Arc<dyn ChatPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_target: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for(&self, target: Target) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_target.lock().await;
        // A limiter whose slot has passed behaves like a fresh one.
        let now = Instant::now();
        map.retain(|_, lim| {
            Arc::strong_count(lim) > 1 || lim.try_lock().map_or(true, |l| l.next > now)
        });
        map.entry(target)
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_target_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle(&self, target: Target) {
        let global_wait = { self.global.lock().await.reserve() };
        let target_wait = {
            let lim = self.limiter_for(target).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(target_wait);
        if wait > Duration::ZERO {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl ChatPort for ThrottledChat {
    async fn send_room(&self, text: &str) -> Result<()> {
        self.throttle(Target::Room).await;
        self.inner.send_room(text).await
    }

    async fn send_private(&self, user: &UserId, text: &str) -> Result<()> {
        self.throttle(Target::User(user.clone())).await;
        self.inner.send_private(user, text).await
    }
}
