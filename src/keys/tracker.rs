//! Pressed key tracking
//!
//! Holds the set of base keys currently held down. Only the event tap
//! callback mutates it, one event at a time.

use std::collections::HashSet;

use tracing::trace;

use super::codes::{normalize, KeyCode};
use super::modifiers::{Modifier, ModifierFlags};

/// Enough room for any realistic chord without rehashing in the callback
const PRESSED_CAPACITY: usize = 16;

/// Set of currently held base key codes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PressedKeySet {
    keys: HashSet<KeyCode>,
}

impl PressedKeySet {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: HashSet::with_capacity(capacity),
        }
    }

    /// Whether `key` (raw or base) is held
    pub fn contains(&self, key: KeyCode) -> bool {
        self.keys.contains(&normalize(key))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.keys.iter().copied()
    }

    /// Held keys in ascending code order
    pub fn to_sorted_vec(&self) -> Vec<KeyCode> {
        let mut keys: Vec<_> = self.iter().collect();
        keys.sort_unstable();
        keys
    }

    fn insert(&mut self, key: KeyCode) {
        self.keys.insert(normalize(key));
    }

    fn remove(&mut self, key: KeyCode) {
        self.keys.remove(&normalize(key));
    }

    fn clear(&mut self) {
        self.keys.clear();
    }
}

/// Modifiers configured as the activation combo
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerKeys(Vec<Modifier>);

impl TriggerKeys {
    pub fn new(modifiers: impl IntoIterator<Item = Modifier>) -> Self {
        let mut keys: Vec<Modifier> = Vec::new();
        for modifier in modifiers {
            if !keys.contains(&modifier) {
                keys.push(modifier);
            }
        }
        Self(keys)
    }

    pub fn contains(&self, modifier: Modifier) -> bool {
        self.0.contains(&modifier)
    }

    /// Whether a raw key belongs to one of the trigger modifiers
    pub fn contains_key(&self, key: KeyCode) -> bool {
        Modifier::for_key(key).is_some_and(|modifier| self.contains(modifier))
    }
}

/// Dual-purpose keys that bypass chord tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialKeys(Vec<KeyCode>);

impl SpecialKeys {
    pub fn new(keys: impl IntoIterator<Item = KeyCode>) -> Self {
        Self(keys.into_iter().map(normalize).collect())
    }

    pub fn contains(&self, key: KeyCode) -> bool {
        self.0.contains(&normalize(key))
    }
}

impl Default for SpecialKeys {
    fn default() -> Self {
        Self::new([KeyCode::GLOBE])
    }
}

/// Applies key-down, key-up and modifier changes to the pressed key set
#[derive(Debug, Clone)]
pub struct KeyStateTracker {
    pressed: PressedKeySet,
    triggers: TriggerKeys,
}

impl KeyStateTracker {
    pub fn new(triggers: TriggerKeys) -> Self {
        Self {
            pressed: PressedKeySet::with_capacity(PRESSED_CAPACITY),
            triggers,
        }
    }

    pub fn pressed(&self) -> &PressedKeySet {
        &self.pressed
    }

    /// Record a (non-repeat) key press
    pub fn key_down(&mut self, key: KeyCode) {
        self.pressed.insert(key);
        trace!(%key, held = self.pressed.len(), "key down");
    }

    /// Record a key release
    pub fn key_up(&mut self, key: KeyCode) {
        self.pressed.remove(key);
        trace!(%key, held = self.pressed.len(), "key up");
    }

    /// Bring tracked, non-trigger modifiers in line with a flag word
    pub fn sync_modifiers(&mut self, flags: ModifierFlags) {
        for modifier in Modifier::TRACKED {
            if self.triggers.contains(modifier) {
                continue;
            }
            if modifier.is_active(flags) {
                self.pressed.insert(modifier.key());
            } else {
                self.pressed.remove(modifier.key());
            }
        }
        trace!(flags = flags.bits(), held = self.pressed.len(), "modifiers synced");
    }

    /// Whether `key` is one of the configured trigger modifiers
    pub fn is_trigger_key(&self, key: KeyCode) -> bool {
        self.triggers.contains_key(key)
    }

    /// Forget every held key
    pub fn reset(&mut self) {
        self.pressed.clear();
    }
}
