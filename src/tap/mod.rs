//! Event tap abstraction
//!
//! An [`EventTap`] owns the OS-level keyboard subscription. It delivers one
//! [`KeyEvent`] at a time to a [`TapHandler`] on its own callback context and
//! applies the returned [`Verdict`] to the native event.

use std::sync::Arc;
use std::time::Instant;

use crate::keys::{KeyCode, ModifierFlags};

mod passthrough;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(not(target_os = "macos"))]
mod unsupported;

pub use passthrough::PassthroughFlag;

#[cfg(target_os = "macos")]
pub use macos::{AccessibilityPermission as PlatformPermission, CgEventTap as PlatformTap};

#[cfg(not(target_os = "macos"))]
pub use unsupported::{AlwaysGranted as PlatformPermission, UnsupportedTap as PlatformTap};

/// What happened to the key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Key pressed; `repeat` is set for auto-repeat events while held
    KeyDown { repeat: bool },
    /// Key released
    KeyUp,
    /// A modifier key changed; `flags` is the full modifier state afterwards
    FlagsChanged { flags: ModifierFlags },
}

/// A keyboard event as seen by the keybind monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Raw (not normalized) key code
    pub key: KeyCode,
    pub kind: EventKind,
    /// Monotonic time the event reached the tap
    pub timestamp: Instant,
}

impl KeyEvent {
    pub fn key_down(key: KeyCode, timestamp: Instant) -> Self {
        Self {
            key,
            kind: EventKind::KeyDown { repeat: false },
            timestamp,
        }
    }

    pub fn key_repeat(key: KeyCode, timestamp: Instant) -> Self {
        Self {
            key,
            kind: EventKind::KeyDown { repeat: true },
            timestamp,
        }
    }

    pub fn key_up(key: KeyCode, timestamp: Instant) -> Self {
        Self {
            key,
            kind: EventKind::KeyUp,
            timestamp,
        }
    }

    pub fn flags_changed(key: KeyCode, flags: ModifierFlags, timestamp: Instant) -> Self {
        Self {
            key,
            kind: EventKind::FlagsChanged { flags },
            timestamp,
        }
    }
}

/// Per-event decision returned to the tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict<E> {
    /// Consume the event; nothing else in the OS sees it
    Swallow,
    /// Deliver the event unchanged
    Forward(E),
}

impl<E> Verdict<E> {
    pub fn is_swallow(&self) -> bool {
        matches!(self, Verdict::Swallow)
    }

    pub fn is_forward(&self) -> bool {
        matches!(self, Verdict::Forward(_))
    }
}

/// Receives events on the tap's callback context
///
/// Implementations must return quickly and never block: a slow callback
/// gets the whole tap disabled by the OS.
pub trait TapHandler: Send + Sync {
    fn handle(&self, event: KeyEvent) -> Verdict<KeyEvent>;
}

/// OS keyboard subscription
///
/// `install` sets up both the key-down/key-up and the flags-changed
/// subscriptions. After `uninstall` returns, the handler is never invoked
/// again.
pub trait EventTap: Send {
    fn install(&mut self, handler: Arc<dyn TapHandler>) -> Result<(), TapError>;
    fn uninstall(&mut self);
}

/// Whether the process may install an event tap
pub trait PermissionGate: Send + Sync {
    fn is_granted(&self) -> bool;
}

impl<F> PermissionGate for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_granted(&self) -> bool {
        self()
    }
}

/// Errors that can occur installing the event tap
#[derive(Debug, thiserror::Error)]
pub enum TapError {
    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to attach event tap to run loop")]
    RunLoopSource,

    #[error("failed to spawn event tap thread: {0}")]
    ThreadSpawn(String),

    #[error("event tap thread exited before reporting readiness")]
    ThreadExited,

    #[error("no event tap backend on this platform")]
    Unsupported,
}
