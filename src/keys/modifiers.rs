//! Modifier key definitions and flag masks
//!
//! Flag bit values mirror the device-independent bits of macOS
//! `CGEventFlags`, so a raw flag word from the event tap can be used as-is.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use super::codes::{normalize, KeyCode};

/// Modifier flag masks from macOS CGEventFlags
pub mod flags {
    use super::ModifierFlags;

    /// Shift key modifier flag
    pub const SHIFT: ModifierFlags = ModifierFlags(0x0002_0000);
    /// Control key modifier flag
    pub const CONTROL: ModifierFlags = ModifierFlags(0x0004_0000);
    /// Option/Alt key modifier flag
    pub const OPTION: ModifierFlags = ModifierFlags(0x0008_0000);
    /// Command key modifier flag
    pub const COMMAND: ModifierFlags = ModifierFlags(0x0010_0000);
    /// Function (secondary fn) modifier flag
    pub const FUNCTION: ModifierFlags = ModifierFlags(0x0080_0000);
}

/// Raw modifier flag word carried by a flags-changed event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ModifierFlags(pub u64);

impl ModifierFlags {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// True if every bit of `other` is set
    pub const fn contains(self, other: ModifierFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ModifierFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A logical modifier key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Shift,
    Control,
    #[serde(alias = "alt", alias = "opt")]
    Option,
    #[serde(alias = "cmd")]
    Command,
    #[serde(alias = "fn")]
    Function,
}

impl Modifier {
    /// Modifiers whose held state is synthesized into the pressed key set
    pub const TRACKED: [Modifier; 4] = [
        Modifier::Shift,
        Modifier::Command,
        Modifier::Option,
        Modifier::Function,
    ];

    /// Base key code of this modifier
    pub fn key(self) -> KeyCode {
        match self {
            Modifier::Shift => KeyCode::SHIFT,
            Modifier::Control => KeyCode::CONTROL,
            Modifier::Option => KeyCode::OPTION,
            Modifier::Command => KeyCode::COMMAND,
            Modifier::Function => KeyCode::FUNCTION,
        }
    }

    /// Flag bit reported while this modifier is held
    pub fn flag(self) -> ModifierFlags {
        match self {
            Modifier::Shift => flags::SHIFT,
            Modifier::Control => flags::CONTROL,
            Modifier::Option => flags::OPTION,
            Modifier::Command => flags::COMMAND,
            Modifier::Function => flags::FUNCTION,
        }
    }

    /// The modifier a raw key code belongs to, either side
    pub fn for_key(code: KeyCode) -> Option<Modifier> {
        match normalize(code) {
            KeyCode::SHIFT => Some(Modifier::Shift),
            KeyCode::CONTROL => Some(Modifier::Control),
            KeyCode::OPTION => Some(Modifier::Option),
            KeyCode::COMMAND => Some(Modifier::Command),
            KeyCode::FUNCTION => Some(Modifier::Function),
            _ => None,
        }
    }

    /// Whether `flags` shows this modifier held
    pub fn is_active(self, flags: ModifierFlags) -> bool {
        flags.contains(self.flag())
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Shift => write!(f, "shift"),
            Modifier::Control => write!(f, "control"),
            Modifier::Option => write!(f, "option"),
            Modifier::Command => write!(f, "command"),
            Modifier::Function => write!(f, "function"),
        }
    }
}
