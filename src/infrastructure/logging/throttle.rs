//! Rate limiting for repetitive warnings.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Default quiet period between two warnings with the same key.
pub const DEFAULT_WARN_WINDOW: Duration = Duration::from_secs(60);

/// Lets a given warning through at most once per window.
///
/// Keys are free-form, e.g. `"overview/42"` or `"shape/narratives"`.
#[derive(Debug)]
pub struct WarnThrottle {
    window: Duration,
    last_emitted: Mutex<HashMap<String, Instant>>,
}

impl Default for WarnThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_WINDOW)
    }
}

impl WarnThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_emitted: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true if a warning for `key` should be emitted now, and if so
    /// starts a new quiet period for it.
    pub fn should_log(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut last = self
            .last_emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match last.get(key) {
            Some(at) if now.duration_since(*at) < self.window => false,
            _ => {
                last.insert(key.to_string(), now);
                true
            }
        }
    }
}
