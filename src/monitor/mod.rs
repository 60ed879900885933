//! Keybind monitor
//!
//! Turns raw key events into debounced window-action signals and decides,
//! per event, whether the event is swallowed or forwarded to the OS.

mod debounce;
mod engine;
mod keybind;
mod resolver;
mod signals;

pub use debounce::{DebounceGate, DEFAULT_SETTLE_THRESHOLD};
pub use engine::{KeybindEngine, MonitorSettings, Outcome};
pub use keybind::{KeybindMonitor, LifecycleState};
pub use resolver::ActionResolver;
pub use signals::{forward_to_channel, Signal, SignalRegistry, SubscriptionId};
