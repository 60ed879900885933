//! Key codes, modifiers and pressed-key tracking
//!
//! Everything here is platform independent; the event tap backend
//! translates native events into these types.

mod codes;
mod modifiers;
mod tracker;

pub use codes::{normalize, KeyCode, UnknownKey};
pub use modifiers::{flags, Modifier, ModifierFlags};
pub use tracker::{KeyStateTracker, PressedKeySet, SpecialKeys, TriggerKeys};
