//! Mapping from held keys to an action

use std::fmt;

use crate::keys::PressedKeySet;

/// Resolves the currently held keys to an action, if they form one.
///
/// Called from the event tap callback: implementations must be pure and
/// must not block.
pub trait ActionResolver: Send + Sync + 'static {
    type Action: Clone + fmt::Debug + fmt::Display + Send + Sync + 'static;

    fn resolve(&self, pressed: &PressedKeySet) -> Option<Self::Action>;
}
