//! Chord-release debounce
//!
//! When several held keys are let go in quick succession only the first
//! release re-evaluates the chord; later ones inside the window are absorbed.

use std::time::{Duration, Instant};

/// Default minimum interval between accepted settling events
pub const DEFAULT_SETTLE_THRESHOLD: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct DebounceGate {
    threshold: Duration,
    last_settle: Option<Instant>,
}

impl DebounceGate {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_settle: None,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Time of the last accepted settling event
    pub fn last_settle(&self) -> Option<Instant> {
        self.last_settle
    }

    /// Decide whether a settling event at `now` may trigger resolution.
    ///
    /// Accepted only when strictly more than the threshold has passed since
    /// the last accepted one; acceptance moves the settle timestamp to `now`.
    /// Suppressed events leave it untouched.
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last_settle {
            Some(last) if now.saturating_duration_since(last) <= self.threshold => false,
            _ => {
                self.last_settle = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_settle = None;
    }
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_THRESHOLD)
    }
}
