//! Sliding-window rate limiting per (actor, action class).
//!
//! Each key owns a queue of admission timestamps. A check prunes entries
//! older than the window, admits only while the remaining count is below the
//! class limit, and records the new timestamp only on admission. The prune,
//! count and append run under one lock.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use warden_contracts::config::RateLimitSettings;

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Admitted,
    /// Over budget. `retry_after` is when the oldest counted request leaves
    /// the window.
    Rejected { retry_after: Duration },
}

impl RateDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

type WindowKey = (String, String);

pub struct RateLimiter {
    window: Duration,
    limits: BTreeMap<String, u32>,
    enabled: bool,
    state: Mutex<HashMap<WindowKey, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, limits: BTreeMap<String, u32>) -> Self {
        Self {
            window,
            limits,
            enabled: true,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.window(), settings.limits.clone())
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The configured limit for `action_class`, if any.
    pub fn limit_for(&self, action_class: &str) -> Option<u32> {
        self.limits.get(action_class).copied()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<WindowKey, VecDeque<Instant>>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Check and, on admission, charge one request to `(actor_id, action_class)`.
    ///
    /// Unconfigured classes are always admitted. A disabled limiter admits
    /// without touching its state.
    pub fn check(&self, actor_id: &str, action_class: &str) -> RateDecision {
        if !self.enabled {
            return RateDecision::Admitted;
        }

        let Some(limit) = self.limit_for(action_class) else {
            debug!(actor_id, action_class, "no limit configured for class; admitting");
            return RateDecision::Admitted;
        };

        let now = Instant::now();
        let cutoff = now.checked_sub(self.window);

        let mut state = self.lock();
        let window = state
            .entry((actor_id.to_string(), action_class.to_string()))
            .or_default();

        if let Some(cutoff) = cutoff {
            while window.front().is_some_and(|t| *t <= cutoff) {
                window.pop_front();
            }
        }

        if window.len() < limit as usize {
            window.push_back(now);
            RateDecision::Admitted
        } else {
            let retry_after = window
                .front()
                .map(|oldest| match oldest.checked_add(self.window) {
                    Some(reopens) => reopens.saturating_duration_since(now),
                    None => Duration::MAX,
                })
                .unwrap_or_default();
            warn!(
                actor_id,
                action_class,
                limit,
                retry_after_ms = retry_after.as_millis() as u64,
                "rate limit exceeded"
            );
            RateDecision::Rejected { retry_after }
        }
    }

    /// Requests currently counted against `(actor_id, action_class)`,
    /// without pruning.
    pub fn in_window(&self, actor_id: &str, action_class: &str) -> usize {
        self.lock()
            .get(&(actor_id.to_string(), action_class.to_string()))
            .map_or(0, VecDeque::len)
    }
}
