//! Shared passthrough switch for special keys
//!
//! Written by the pointer-movement detector, read by the tap callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether special-key events are forwarded to the OS
///
/// Clones share the same flag. Defaults to allowed.
#[derive(Debug, Clone)]
pub struct PassthroughFlag {
    allowed: Arc<AtomicBool>,
}

impl PassthroughFlag {
    pub fn new() -> Self {
        Self {
            allowed: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed.load(Ordering::Acquire)
    }

    pub fn set(&self, allowed: bool) {
        self.allowed.store(allowed, Ordering::Release);
    }

    pub fn allow(&self) {
        self.set(true);
    }

    pub fn deny(&self) {
        self.set(false);
    }

    /// Back to the default (allowed)
    pub fn reset(&self) {
        self.allow();
    }
}

impl Default for PassthroughFlag {
    fn default() -> Self {
        Self::new()
    }
}
