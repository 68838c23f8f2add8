//! Per-user sliding-window limiter for the chat endpoint.
//!
//! Lives in process memory, so limits reset on restart and are not shared
//! between instances.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct ChatRateLimiter {
    limit: usize,
    window: Duration,
    hits: Mutex<HashMap<i64, VecDeque<Instant>>>,
}

impl ChatRateLimiter {
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit: limit as usize, window, hits: Mutex::new(HashMap::new()) }
    }

    /// Record a request for `user_id`; false when it is over the limit.
    pub fn check(&self, user_id: i64) -> bool {
        self.check_at(user_id, Instant::now())
    }

    pub fn check_at(&self, user_id: i64, now: Instant) -> bool {
        let mut hits = match self.hits.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let queue = hits.entry(user_id).or_default();
        while queue
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= self.window)
        {
            queue.pop_front();
        }
        if queue.len() >= self.limit {
            tracing::warn!("Chat rate limit hit for user {}", user_id);
            return false;
        }
        queue.push_back(now);
        true
    }
}
