//! Global keybind monitor for window management
//!
//! The library holds the platform independent keybind core ([`keys`],
//! [`monitor`], [`actions`]), the event tap backends ([`tap`]) and the
//! daemon plumbing ([`config`], [`lifecycle`]). The `keybind-daemon`
//! binary wires them together.
//!
//! Window placement itself and all UI live outside this crate.

pub mod actions;
pub mod config;
pub mod keys;
pub mod lifecycle;
pub mod monitor;
pub mod tap;
