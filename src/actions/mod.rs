//! Window actions and the keybind table that resolves them
//!
//! The table is the daemon's [`ActionResolver`]: a held key set resolves to
//! an action only when it is exactly one of the configured chords.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::keys::{normalize, KeyCode, PressedKeySet};
use crate::monitor::ActionResolver;

/// Where a window should go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowDirection {
    Maximize,
    Center,
    LeftHalf,
    RightHalf,
    TopHalf,
    BottomHalf,
    TopLeftQuarter,
    TopRightQuarter,
    BottomLeftQuarter,
    BottomRightQuarter,
    LeftThird,
    CenterThird,
    RightThird,
    NextScreen,
    PreviousScreen,
    Larger,
    Smaller,
}

impl fmt::Display for WindowDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowDirection::Maximize => "maximize",
            WindowDirection::Center => "center",
            WindowDirection::LeftHalf => "left half",
            WindowDirection::RightHalf => "right half",
            WindowDirection::TopHalf => "top half",
            WindowDirection::BottomHalf => "bottom half",
            WindowDirection::TopLeftQuarter => "top left quarter",
            WindowDirection::TopRightQuarter => "top right quarter",
            WindowDirection::BottomLeftQuarter => "bottom left quarter",
            WindowDirection::BottomRightQuarter => "bottom right quarter",
            WindowDirection::LeftThird => "left third",
            WindowDirection::CenterThird => "center third",
            WindowDirection::RightThird => "right third",
            WindowDirection::NextScreen => "next screen",
            WindowDirection::PreviousScreen => "previous screen",
            WindowDirection::Larger => "larger",
            WindowDirection::Smaller => "smaller",
        };
        f.write_str(name)
    }
}

/// One configured chord
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keybind {
    pub keys: Vec<KeyCode>,
    pub action: WindowDirection,
}

impl Keybind {
    pub fn new(keys: impl IntoIterator<Item = KeyCode>, action: WindowDirection) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            action,
        }
    }
}

/// Exact-match chord table
#[derive(Debug, Clone, Default)]
pub struct KeybindTable {
    /// Normalized, sorted, deduplicated key sets
    chords: Vec<(Vec<KeyCode>, WindowDirection)>,
}

impl KeybindTable {
    /// Build a table; empty chords are dropped and a later duplicate chord
    /// replaces an earlier one.
    pub fn new(keybinds: impl IntoIterator<Item = Keybind>) -> Self {
        let mut chords: Vec<(Vec<KeyCode>, WindowDirection)> = Vec::new();

        for keybind in keybinds {
            let mut keys: Vec<KeyCode> = keybind.keys.into_iter().map(normalize).collect();
            keys.sort_unstable();
            keys.dedup();
            if keys.is_empty() {
                continue;
            }

            match chords.iter_mut().find(|(existing, _)| *existing == keys) {
                Some(entry) => {
                    debug!(?keys, old = %entry.1, new = %keybind.action, "keybind replaced");
                    entry.1 = keybind.action;
                }
                None => chords.push((keys, keybind.action)),
            }
        }

        Self { chords }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (Vec<KeyCode>, WindowDirection)>) -> Self {
        Self::new(pairs.into_iter().map(|(keys, action)| Keybind::new(keys, action)))
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }
}

impl ActionResolver for KeybindTable {
    type Action = WindowDirection;

    fn resolve(&self, pressed: &PressedKeySet) -> Option<WindowDirection> {
        self.chords
            .iter()
            .find(|(keys, _)| keys.len() == pressed.len() && keys.iter().all(|&key| pressed.contains(key)))
            .map(|&(_, action)| action)
    }
}

/// Built-in chords: option+command with arrows and a few extras
pub fn default_keybinds() -> Vec<Keybind> {
    use WindowDirection::*;

    let chord = |key: KeyCode, action| Keybind::new([KeyCode::OPTION, KeyCode::COMMAND, key], action);
    vec![
        chord(KeyCode::LEFT_ARROW, LeftHalf),
        chord(KeyCode::RIGHT_ARROW, RightHalf),
        chord(KeyCode::UP_ARROW, TopHalf),
        chord(KeyCode::DOWN_ARROW, BottomHalf),
        chord(KeyCode::RETURN, Maximize),
        chord(KeyCode(8), Center),
        chord(KeyCode(24), Larger),
        chord(KeyCode(27), Smaller),
        Keybind::new([KeyCode::OPTION, KeyCode::COMMAND, KeyCode::SHIFT, KeyCode::RIGHT_ARROW], NextScreen),
        Keybind::new([KeyCode::OPTION, KeyCode::COMMAND, KeyCode::SHIFT, KeyCode::LEFT_ARROW], PreviousScreen),
    ]
}
