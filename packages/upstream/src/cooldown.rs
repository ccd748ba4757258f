//! Cooldown after failed requests.
//!
//! Once a request signature fails, the same signature is refused for a
//! fixed window so a broken upstream is not hammered by repeated viewport
//! changes. A success clears the signature immediately.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::cache::Clock;

/// Tracks failed request signatures.
#[derive(Debug)]
pub struct RequestCooldown {
    window: Duration,
    clock: Arc<dyn Clock>,
    failures: Mutex<BTreeMap<String, Instant>>,
}

impl RequestCooldown {
    /// Creates a tracker that refuses a failed signature for `window`.
    #[must_use]
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            failures: Mutex::new(BTreeMap::new()),
        }
    }

    /// The configured cooldown window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// How long `signature` must still wait, or `None` if it may be sent.
    #[must_use]
    pub fn remaining(&self, signature: &str) -> Option<Duration> {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let failed_at = *failures.get(signature)?;
        let elapsed = self.clock.now().saturating_duration_since(failed_at);

        if elapsed >= self.window {
            failures.remove(signature);
            return None;
        }

        Some(self.window - elapsed)
    }

    /// Starts the cooldown window for `signature`.
    ///
    /// Signatures whose window has already passed are dropped at the same
    /// time, so the map only holds failures that still block something.
    pub fn record_failure(&self, signature: &str) {
        log::warn!(
            "Request '{signature}' failed, cooling down for {:?}",
            self.window
        );
        let now = self.clock.now();
        let window = self.window;
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);

        let before = failures.len();
        failures.retain(|_, failed_at| now.saturating_duration_since(*failed_at) < window);
        let expired = before - failures.len();
        if expired > 0 {
            log::debug!("Dropped {expired} expired cooldown entries");
        }

        failures.insert(signature.to_string(), now);
    }

    /// Clears any cooldown for `signature`.
    pub fn record_success(&self, signature: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(signature);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;

    const WINDOW: Duration = Duration::from_secs(30);

    #[test]
    fn unknown_signature_is_allowed() {
        let cooldown = RequestCooldown::new(WINDOW, Arc::new(ManualClock::new()));
        assert_eq!(cooldown.remaining("updates?zoom=12"), None);
    }

    #[test]
    fn failure_blocks_until_window_passes() {
        let clock = Arc::new(ManualClock::new());
        let cooldown = RequestCooldown::new(WINDOW, clock.clone());

        cooldown.record_failure("updates?zoom=12");
        assert_eq!(cooldown.remaining("updates?zoom=12"), Some(WINDOW));
        assert_eq!(cooldown.remaining("updates?zoom=13"), None);

        clock.advance(Duration::from_secs(20));
        assert_eq!(
            cooldown.remaining("updates?zoom=12"),
            Some(Duration::from_secs(10))
        );

        clock.advance(Duration::from_secs(10));
        assert_eq!(cooldown.remaining("updates?zoom=12"), None);
    }

    #[test]
    fn expired_failures_are_dropped_on_next_failure() {
        let clock = Arc::new(ManualClock::new());
        let cooldown = RequestCooldown::new(WINDOW, clock.clone());

        for zoom in 0..1000 {
            cooldown.record_failure(&format!("updates?zoom={zoom}"));
        }
        clock.advance(Duration::from_secs(3600));
        cooldown.record_failure("updates?zoom=-1");

        let failures = cooldown.failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert!(failures.contains_key("updates?zoom=-1"));
    }

    #[test]
    fn live_failures_survive_pruning() {
        let clock = Arc::new(ManualClock::new());
        let cooldown = RequestCooldown::new(WINDOW, clock.clone());

        cooldown.record_failure("oboapp?zoom=10");
        clock.advance(Duration::from_secs(10));
        cooldown.record_failure("oboapp?zoom=11");

        assert_eq!(
            cooldown.remaining("oboapp?zoom=10"),
            Some(Duration::from_secs(20))
        );
        assert_eq!(cooldown.remaining("oboapp?zoom=11"), Some(WINDOW));
    }

    #[test]
    fn success_clears_cooldown() {
        let cooldown = RequestCooldown::new(WINDOW, Arc::new(ManualClock::new()));
        cooldown.record_failure("oboapp?");
        cooldown.record_success("oboapp?");
        assert_eq!(cooldown.remaining("oboapp?"), None);
        assert_eq!(cooldown.window(), WINDOW);
    }
}
