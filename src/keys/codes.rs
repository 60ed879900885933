//! Virtual key codes and normalization
//!
//! Codes are macOS virtual key codes (the `kVK_*` values reported by
//! CGEvent). Right-hand modifier codes collapse onto their left-hand
//! counterparts so set membership never depends on which side was pressed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A hardware virtual key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "KeySpec", into = "u16")]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const RETURN: KeyCode = KeyCode(36);
    pub const TAB: KeyCode = KeyCode(48);
    pub const SPACE: KeyCode = KeyCode(49);
    pub const DELETE: KeyCode = KeyCode(51);
    pub const ESCAPE: KeyCode = KeyCode(53);
    pub const RIGHT_COMMAND: KeyCode = KeyCode(54);
    pub const COMMAND: KeyCode = KeyCode(55);
    pub const SHIFT: KeyCode = KeyCode(56);
    pub const CAPS_LOCK: KeyCode = KeyCode(57);
    pub const OPTION: KeyCode = KeyCode(58);
    pub const CONTROL: KeyCode = KeyCode(59);
    pub const RIGHT_SHIFT: KeyCode = KeyCode(60);
    pub const RIGHT_OPTION: KeyCode = KeyCode(61);
    pub const RIGHT_CONTROL: KeyCode = KeyCode(62);
    pub const FUNCTION: KeyCode = KeyCode(63);
    pub const LEFT_ARROW: KeyCode = KeyCode(123);
    pub const RIGHT_ARROW: KeyCode = KeyCode(124);
    pub const DOWN_ARROW: KeyCode = KeyCode(125);
    pub const UP_ARROW: KeyCode = KeyCode(126);
    /// Globe key, which doubles as the emoji picker key
    pub const GLOBE: KeyCode = KeyCode(179);

    /// Look up a key by its configuration name
    pub fn from_name(name: &str) -> Option<KeyCode> {
        let name = name.trim().to_ascii_lowercase();
        let name = match name.as_str() {
            "esc" => "escape",
            "enter" => "return",
            "cmd" => "command",
            "alt" | "opt" => "option",
            "ctrl" => "control",
            "fn" => "function",
            "left" => "left_arrow",
            "right" => "right_arrow",
            "up" => "up_arrow",
            "down" => "down_arrow",
            other => other,
        };
        KEY_NAMES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|&(_, code)| code)
    }

    /// Configuration name of this key, if it has one
    pub fn name(self) -> Option<&'static str> {
        KEY_NAMES
            .iter()
            .find(|(_, code)| *code == self)
            .map(|&(name, _)| name)
    }
}

/// Map a raw key code to its canonical base code
pub fn normalize(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::RIGHT_SHIFT => KeyCode::SHIFT,
        KeyCode::RIGHT_COMMAND => KeyCode::COMMAND,
        KeyCode::RIGHT_OPTION => KeyCode::OPTION,
        KeyCode::RIGHT_CONTROL => KeyCode::CONTROL,
        other => other,
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "key({})", self.0),
        }
    }
}

impl From<KeyCode> for u16 {
    fn from(code: KeyCode) -> Self {
        code.0
    }
}

/// Key name that is not in the key table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key name: {0:?}")]
pub struct UnknownKey(pub String);

impl FromStr for KeyCode {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyCode::from_name(s).ok_or_else(|| UnknownKey(s.to_string()))
    }
}

/// Keys may be written in configuration as a name or a raw code
#[derive(Deserialize)]
#[serde(untagged)]
enum KeySpec {
    Code(u16),
    Name(String),
}

impl TryFrom<KeySpec> for KeyCode {
    type Error = UnknownKey;

    fn try_from(spec: KeySpec) -> Result<Self, Self::Error> {
        match spec {
            KeySpec::Code(code) => Ok(KeyCode(code)),
            KeySpec::Name(name) => name.parse(),
        }
    }
}

const KEY_NAMES: &[(&str, KeyCode)] = &[
    ("a", KeyCode(0)),
    ("s", KeyCode(1)),
    ("d", KeyCode(2)),
    ("f", KeyCode(3)),
    ("h", KeyCode(4)),
    ("g", KeyCode(5)),
    ("z", KeyCode(6)),
    ("x", KeyCode(7)),
    ("c", KeyCode(8)),
    ("v", KeyCode(9)),
    ("b", KeyCode(11)),
    ("q", KeyCode(12)),
    ("w", KeyCode(13)),
    ("e", KeyCode(14)),
    ("r", KeyCode(15)),
    ("y", KeyCode(16)),
    ("t", KeyCode(17)),
    ("1", KeyCode(18)),
    ("2", KeyCode(19)),
    ("3", KeyCode(20)),
    ("4", KeyCode(21)),
    ("6", KeyCode(22)),
    ("5", KeyCode(23)),
    ("equal", KeyCode(24)),
    ("9", KeyCode(25)),
    ("7", KeyCode(26)),
    ("minus", KeyCode(27)),
    ("8", KeyCode(28)),
    ("0", KeyCode(29)),
    ("right_bracket", KeyCode(30)),
    ("o", KeyCode(31)),
    ("u", KeyCode(32)),
    ("left_bracket", KeyCode(33)),
    ("i", KeyCode(34)),
    ("p", KeyCode(35)),
    ("return", KeyCode::RETURN),
    ("l", KeyCode(37)),
    ("j", KeyCode(38)),
    ("quote", KeyCode(39)),
    ("k", KeyCode(40)),
    ("semicolon", KeyCode(41)),
    ("backslash", KeyCode(42)),
    ("comma", KeyCode(43)),
    ("slash", KeyCode(44)),
    ("n", KeyCode(45)),
    ("m", KeyCode(46)),
    ("period", KeyCode(47)),
    ("tab", KeyCode::TAB),
    ("space", KeyCode::SPACE),
    ("grave", KeyCode(50)),
    ("delete", KeyCode::DELETE),
    ("escape", KeyCode::ESCAPE),
    ("right_command", KeyCode::RIGHT_COMMAND),
    ("command", KeyCode::COMMAND),
    ("shift", KeyCode::SHIFT),
    ("caps_lock", KeyCode::CAPS_LOCK),
    ("option", KeyCode::OPTION),
    ("control", KeyCode::CONTROL),
    ("right_shift", KeyCode::RIGHT_SHIFT),
    ("right_option", KeyCode::RIGHT_OPTION),
    ("right_control", KeyCode::RIGHT_CONTROL),
    ("function", KeyCode::FUNCTION),
    ("left_arrow", KeyCode::LEFT_ARROW),
    ("right_arrow", KeyCode::RIGHT_ARROW),
    ("down_arrow", KeyCode::DOWN_ARROW),
    ("up_arrow", KeyCode::UP_ARROW),
    ("globe", KeyCode::GLOBE),
];
