//! Global keyboard tap using macOS CGEventTap
//!
//! Runs two filtering taps (key-down/key-up and flags-changed) on a
//! dedicated thread with its own CFRunLoop. Callbacks only ever run on that
//! thread, so joining it is the point after which no callback can fire.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap as NativeTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
    CGEventTapProxy, CGEventType, EventField,
};
use tracing::{debug, error, info, warn};

use super::{EventTap, KeyEvent, PermissionGate, TapError, TapHandler, Verdict};
use crate::keys::{KeyCode, ModifierFlags};

/// How long the run loop waits before re-checking the running flag
const RUN_LOOP_SLICE: Duration = Duration::from_millis(100);

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;
}

/// Accessibility permission, required to create a filtering tap
#[derive(Debug, Default)]
pub struct AccessibilityPermission;

impl PermissionGate for AccessibilityPermission {
    fn is_granted(&self) -> bool {
        unsafe { AXIsProcessTrusted() }
    }
}

/// CGEventTap-backed implementation of [`EventTap`]
#[derive(Debug, Default)]
pub struct CgEventTap {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EventTap for CgEventTap {
    fn install(&mut self, handler: Arc<dyn TapHandler>) -> Result<(), TapError> {
        if self.thread.is_some() {
            return Ok(());
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let (ready_tx, ready_rx) = std_mpsc::channel();

        let spawned = thread::Builder::new()
            .name("keybind-tap".to_string())
            .spawn(move || {
                info!("event tap thread started");
                run_event_loop(handler, running, ready_tx);
                info!("event tap thread stopped");
            });

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(TapError::ThreadSpawn(e.to_string()));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.thread = Some(thread);
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = thread.join();
                Err(TapError::ThreadExited)
            }
        }
    }

    fn uninstall(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("event tap thread panicked");
            }
        }
    }
}

impl Drop for CgEventTap {
    fn drop(&mut self) {
        self.uninstall();
    }
}

/// Create both taps, report readiness, then pump the run loop until stopped
fn run_event_loop(
    handler: Arc<dyn TapHandler>,
    running: Arc<AtomicBool>,
    ready_tx: std_mpsc::Sender<Result<(), TapError>>,
) {
    // Set from a callback when the system turns the taps off
    let disabled = Arc::new(AtomicBool::new(false));

    let key_handler = Arc::clone(&handler);
    let key_disabled = Arc::clone(&disabled);
    let key_tap = NativeTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::Default,
        vec![CGEventType::KeyDown, CGEventType::KeyUp],
        move |proxy, event_type, event| {
            dispatch(&*key_handler, &key_disabled, proxy, event_type, event)
        },
    );
    let key_tap = match key_tap {
        Ok(tap) => tap,
        Err(()) => {
            error!("failed to create key event tap - is Accessibility permission granted?");
            let _ = ready_tx.send(Err(TapError::EventTapCreation));
            return;
        }
    };

    let flags_handler = Arc::clone(&handler);
    let flags_disabled = Arc::clone(&disabled);
    let flags_tap = NativeTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::Default,
        vec![CGEventType::FlagsChanged],
        move |proxy, event_type, event| {
            dispatch(&*flags_handler, &flags_disabled, proxy, event_type, event)
        },
    );
    let flags_tap = match flags_tap {
        Ok(tap) => tap,
        Err(()) => {
            error!("failed to create modifier event tap");
            let _ = ready_tx.send(Err(TapError::EventTapCreation));
            return;
        }
    };

    let sources = key_tap
        .mach_port
        .create_runloop_source(0)
        .and_then(|key| flags_tap.mach_port.create_runloop_source(0).map(|flags| (key, flags)));
    let (key_source, flags_source) = match sources {
        Ok(sources) => sources,
        Err(()) => {
            error!("failed to create run loop source for event tap");
            let _ = ready_tx.send(Err(TapError::RunLoopSource));
            return;
        }
    };

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&key_source, kCFRunLoopCommonModes);
        run_loop.add_source(&flags_source, kCFRunLoopCommonModes);
    }

    key_tap.enable();
    flags_tap.enable();
    info!("event taps created and enabled");

    if ready_tx.send(Ok(())).is_err() {
        // Installer went away; nothing will ever stop us otherwise
        running.store(false, Ordering::SeqCst);
    }

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, RUN_LOOP_SLICE, true);
        }

        if disabled.swap(false, Ordering::SeqCst) && running.load(Ordering::SeqCst) {
            key_tap.enable();
            flags_tap.enable();
            info!("event taps re-enabled");
        }
    }

    unsafe {
        run_loop.remove_source(&key_source, kCFRunLoopCommonModes);
        run_loop.remove_source(&flags_source, kCFRunLoopCommonModes);
    }
    debug!("event taps removed from run loop");
    // Taps are released when they go out of scope
}

/// CGEventTap callback - must be fast and non-blocking
fn dispatch(
    handler: &dyn TapHandler,
    disabled: &AtomicBool,
    _proxy: CGEventTapProxy,
    event_type: CGEventType,
    event: &CGEvent,
) -> Option<CGEvent> {
    if is_disable_notice(event_type) {
        warn!(?event_type, "event tap disabled by the system, keybinds inactive until re-enabled");
        disabled.store(true, Ordering::SeqCst);
        return Some(event.clone());
    }

    match translate(event_type, event) {
        Some(key_event) => match handler.handle(key_event) {
            Verdict::Swallow => None,
            Verdict::Forward(_) => Some(event.clone()),
        },
        None => Some(event.clone()),
    }
}

/// The system turned the tap off (slow callback or secure input)
fn is_disable_notice(event_type: CGEventType) -> bool {
    matches!(
        event_type,
        CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput
    )
}

fn translate(event_type: CGEventType, event: &CGEvent) -> Option<KeyEvent> {
    let now = Instant::now();
    let key = || KeyCode(event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE) as u16);

    match event_type {
        CGEventType::KeyDown => {
            let repeat = event.get_integer_value_field(EventField::KEYBOARD_EVENT_AUTOREPEAT) != 0;
            Some(if repeat {
                KeyEvent::key_repeat(key(), now)
            } else {
                KeyEvent::key_down(key(), now)
            })
        }
        CGEventType::KeyUp => Some(KeyEvent::key_up(key(), now)),
        CGEventType::FlagsChanged => {
            let flags = ModifierFlags::from_bits(event.get_flags().bits());
            Some(KeyEvent::flags_changed(key(), flags, now))
        }
        _ => None,
    }
}
