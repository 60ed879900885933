//! Keybind monitor lifecycle
//!
//! Owns the event tap installation and wires tap callbacks through the
//! [`KeybindEngine`] to the resolver and the signal registry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::engine::{KeybindEngine, MonitorSettings};
use super::resolver::ActionResolver;
use super::signals::SignalRegistry;
use crate::keys::KeyCode;
use crate::tap::{EventTap, KeyEvent, PassthroughFlag, PermissionGate, TapError, TapHandler, Verdict};

/// Whether the monitor currently holds the event tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Running,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Stopped => write!(f, "Stopped"),
            LifecycleState::Running => write!(f, "Running"),
        }
    }
}

/// State reached from the tap callback
struct Shared<R: ActionResolver> {
    engine: Mutex<KeybindEngine>,
    resolver: R,
    signals: SignalRegistry<R::Action>,
    passthrough: PassthroughFlag,
}

impl<R: ActionResolver> Shared<R> {
    fn engine(&self) -> MutexGuard<'_, KeybindEngine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: ActionResolver> TapHandler for Shared<R> {
    fn handle(&self, event: KeyEvent) -> Verdict<KeyEvent> {
        // Events arrive serialized, so this lock only ever meets start/stop
        let outcome = self
            .engine()
            .process(event, self.passthrough.is_allowed(), &self.resolver);

        if let Some(signal) = &outcome.signal {
            self.signals.dispatch(signal);
        }
        outcome.verdict
    }
}

/// The installed-or-not event tap, guarded as one unit
struct Installation<T> {
    tap: T,
    state: LifecycleState,
}

/// Global keybind monitor
///
/// `start` and `stop` may be called from any thread. Installing and removing
/// the tap happens under one lock, and the tap guarantees no callback runs
/// after removal, so nothing is processed after `stop` returns.
///
/// Signal handlers run on the tap thread while `stop` may be holding the
/// installation lock, so they must not call `start` or `stop`. Every other
/// method is lock-free with respect to the installation and safe to call
/// from a handler.
pub struct KeybindMonitor<T: EventTap, R: ActionResolver> {
    installation: Mutex<Installation<T>>,
    /// Mirror of `Installation::state`, readable without the lock
    running: AtomicBool,
    shared: Arc<Shared<R>>,
    permission: Box<dyn PermissionGate>,
}

impl<T: EventTap, R: ActionResolver> KeybindMonitor<T, R> {
    /// Create a stopped monitor
    pub fn new<P>(tap: T, permission: P, resolver: R, settings: MonitorSettings) -> Self
    where
        P: PermissionGate + 'static,
    {
        Self {
            installation: Mutex::new(Installation {
                tap,
                state: LifecycleState::Stopped,
            }),
            running: AtomicBool::new(false),
            shared: Arc::new(Shared {
                engine: Mutex::new(KeybindEngine::new(settings)),
                resolver,
                signals: SignalRegistry::new(),
                passthrough: PassthroughFlag::new(),
            }),
            permission: Box::new(permission),
        }
    }

    /// Install the event tap.
    ///
    /// A no-op when already running or when accessibility permission is
    /// missing. If the OS refuses the tap the monitor stays stopped and the
    /// error is returned; calling `start` again retries.
    pub fn start(&self) -> Result<(), TapError> {
        let mut installation = self.installation();
        if installation.state == LifecycleState::Running {
            debug!("keybind monitor already running");
            return Ok(());
        }

        if !self.permission.is_granted() {
            warn!("accessibility permission not granted, keybind monitor not started");
            return Ok(());
        }

        let handler: Arc<dyn TapHandler> = self.shared.clone();
        installation.tap.install(handler)?;
        installation.state = LifecycleState::Running;
        self.running.store(true, Ordering::SeqCst);

        info!("keybind monitor started");
        Ok(())
    }

    /// Remove the event tap and forget all key state.
    ///
    /// Key state and the passthrough flag are reset even when the monitor
    /// is already stopped, since the flag can be written at any time.
    pub fn stop(&self) {
        let mut installation = self.installation();
        if installation.state == LifecycleState::Running {
            installation.tap.uninstall();
            installation.state = LifecycleState::Stopped;
            self.running.store(false, Ordering::SeqCst);
            info!("keybind monitor stopped");
        } else {
            debug!("keybind monitor already stopped");
        }

        self.shared.engine().reset();
        self.shared.passthrough.reset();
    }

    /// Forget every held key without touching the tap
    pub fn reset_pressed_keys(&self) {
        self.shared.engine().reset_pressed_keys();
        debug!("pressed keys cleared");
    }

    pub fn state(&self) -> LifecycleState {
        if self.is_running() {
            LifecycleState::Running
        } else {
            LifecycleState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Registry for force-cancel and action-triggered handlers
    pub fn signals(&self) -> &SignalRegistry<R::Action> {
        &self.shared.signals
    }

    /// Handle for the pointer-movement detector to toggle special-key passthrough
    pub fn passthrough(&self) -> PassthroughFlag {
        self.shared.passthrough.clone()
    }

    /// Snapshot of the held base keys
    pub fn pressed_keys(&self) -> Vec<KeyCode> {
        self.shared.engine().pressed().to_sorted_vec()
    }

    fn installation(&self) -> MutexGuard<'_, Installation<T>> {
        self.installation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: EventTap, R: ActionResolver> Drop for KeybindMonitor<T, R> {
    fn drop(&mut self) {
        self.stop();
    }
}
