//! Fallback for platforms without an event tap backend

use std::sync::Arc;

use tracing::warn;

use super::{EventTap, PermissionGate, TapError, TapHandler};

/// Event tap that can never be installed
#[derive(Debug, Default)]
pub struct UnsupportedTap;

impl EventTap for UnsupportedTap {
    fn install(&mut self, _handler: Arc<dyn TapHandler>) -> Result<(), TapError> {
        warn!(os = std::env::consts::OS, "global keyboard events are not available");
        Err(TapError::Unsupported)
    }

    fn uninstall(&mut self) {}
}

/// No permission prompt exists on this platform
#[derive(Debug, Default)]
pub struct AlwaysGranted;

impl PermissionGate for AlwaysGranted {
    fn is_granted(&self) -> bool {
        true
    }
}
