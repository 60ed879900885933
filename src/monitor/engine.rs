//! Per-event keybind decision
//!
//! [`KeybindEngine::process`] applies one event to the tracked key state and
//! decides whether the event is swallowed or forwarded, and which signal (if
//! any) it produces. It has no side effects beyond its own state.

use std::time::Duration;

use tracing::{debug, trace};

use super::debounce::{DebounceGate, DEFAULT_SETTLE_THRESHOLD};
use super::resolver::ActionResolver;
use super::signals::Signal;
use crate::keys::{KeyCode, KeyStateTracker, Modifier, ModifierFlags, PressedKeySet, SpecialKeys, TriggerKeys};
use crate::tap::{EventKind, KeyEvent, Verdict};

/// Tuning and key configuration for a monitor instance
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Modifiers that form the activation combo; never synthesized into chords
    pub triggers: TriggerKeys,
    /// Dual-purpose keys handled by passthrough only
    pub specials: SpecialKeys,
    /// Minimum interval between accepted settling events
    pub settle_threshold: Duration,
    /// Whether releasing shift counts as a settling event
    pub shift_release_settles: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            triggers: TriggerKeys::default(),
            specials: SpecialKeys::default(),
            settle_threshold: DEFAULT_SETTLE_THRESHOLD,
            shift_release_settles: false,
        }
    }
}

/// Result of processing one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<A> {
    pub verdict: Verdict<KeyEvent>,
    pub signal: Option<Signal<A>>,
}

impl<A> Outcome<A> {
    fn forward(event: KeyEvent) -> Self {
        Self {
            verdict: Verdict::Forward(event),
            signal: None,
        }
    }

    fn swallow() -> Self {
        Self {
            verdict: Verdict::Swallow,
            signal: None,
        }
    }
}

/// Key state, debounce state and the rules that tie them together
#[derive(Debug, Clone)]
pub struct KeybindEngine {
    tracker: KeyStateTracker,
    gate: DebounceGate,
    specials: SpecialKeys,
    shift_release_settles: bool,
}

impl KeybindEngine {
    pub fn new(settings: MonitorSettings) -> Self {
        Self {
            tracker: KeyStateTracker::new(settings.triggers),
            gate: DebounceGate::new(settings.settle_threshold),
            specials: settings.specials,
            shift_release_settles: settings.shift_release_settles,
        }
    }

    pub fn pressed(&self) -> &PressedKeySet {
        self.tracker.pressed()
    }

    /// Back to the state of a freshly stopped monitor
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.gate.reset();
    }

    /// Forget held keys but keep the debounce history
    pub fn reset_pressed_keys(&mut self) {
        self.tracker.reset();
    }

    /// Process one event from the tap
    pub fn process<R: ActionResolver>(
        &mut self,
        event: KeyEvent,
        passthrough_allowed: bool,
        resolver: &R,
    ) -> Outcome<R::Action> {
        let settling = match event.kind {
            EventKind::KeyDown { repeat: true } => {
                trace!(key = %event.key, "ignoring auto-repeat");
                return Outcome::forward(event);
            }
            EventKind::KeyDown { .. } | EventKind::KeyUp if self.specials.contains(event.key) => {
                trace!(key = %event.key, passthrough_allowed, "special key");
                return if passthrough_allowed {
                    Outcome::forward(event)
                } else {
                    Outcome::swallow()
                };
            }
            EventKind::KeyDown { .. } => {
                self.tracker.key_down(event.key);
                false
            }
            EventKind::KeyUp => {
                self.tracker.key_up(event.key);
                true
            }
            EventKind::FlagsChanged { flags } => {
                self.tracker.sync_modifiers(flags);
                if self.tracker.is_trigger_key(event.key) {
                    trace!(key = %event.key, "trigger modifier changed");
                    return Outcome::forward(event);
                }
                self.clears_settling_modifier(event.key, flags)
            }
        };

        if settling && !self.gate.admit(event.timestamp) {
            debug!(key = %event.key, "release within debounce window, not re-resolving");
            return Outcome::forward(event);
        }

        let pressed = self.tracker.pressed();
        let signal = if pressed.contains(KeyCode::ESCAPE) {
            Some(Signal::ForceCancel)
        } else {
            resolver
                .resolve(pressed)
                .map(|action| Signal::ActionTriggered { action })
        };

        let verdict = match (&signal, event.kind) {
            (None, _) => Verdict::Forward(event),
            // Modifier changes always reach the OS so it never sees one stuck
            (Some(_), EventKind::FlagsChanged { .. }) => Verdict::Forward(event),
            (Some(_), _) => Verdict::Swallow,
        };

        if let Some(signal) = &signal {
            debug!(?signal, held = ?pressed.to_sorted_vec(), "keybind matched");
        }

        Outcome { verdict, signal }
    }

    /// A flags change settles when it releases a modifier other than shift
    fn clears_settling_modifier(&self, key: KeyCode, flags: ModifierFlags) -> bool {
        match Modifier::for_key(key) {
            Some(Modifier::Shift) if !self.shift_release_settles => false,
            Some(modifier) => !modifier.is_active(flags),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use crate::actions::{KeybindTable, WindowDirection};
    use crate::keys::flags;

    /// Resolves any non-empty set to the same action
    struct Always;

    impl ActionResolver for Always {
        type Action = WindowDirection;

        fn resolve(&self, pressed: &PressedKeySet) -> Option<WindowDirection> {
            (!pressed.is_empty()).then_some(WindowDirection::Maximize)
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn table() -> KeybindTable {
        KeybindTable::from_pairs([
            (vec![KeyCode::RIGHT_ARROW], WindowDirection::RightHalf),
            (vec![KeyCode::LEFT_ARROW], WindowDirection::LeftHalf),
            (vec![KeyCode::RIGHT_ARROW, KeyCode::UP_ARROW], WindowDirection::TopRightQuarter),
            (vec![KeyCode::SHIFT, KeyCode::RIGHT_ARROW], WindowDirection::RightThird),
        ])
    }

    fn engine() -> KeybindEngine {
        KeybindEngine::new(MonitorSettings::default())
    }

    #[test]
    fn test_unbound_key_forwarded_without_signal() {
        let mut engine = engine();
        let event = KeyEvent::key_down(KeyCode(0), Instant::now());
        let outcome = engine.process(event, true, &table());
        assert_eq!(outcome.verdict, Verdict::Forward(event));
        assert_eq!(outcome.signal, None);
        assert!(engine.pressed().contains(KeyCode(0)));
    }

    #[test]
    fn test_bound_key_swallowed_with_action() {
        let mut engine = engine();
        let outcome = engine.process(KeyEvent::key_down(KeyCode::RIGHT_ARROW, Instant::now()), true, &table());
        assert_eq!(outcome.verdict, Verdict::Swallow);
        assert_eq!(
            outcome.signal,
            Some(Signal::ActionTriggered { action: WindowDirection::RightHalf })
        );
    }

    #[test]
    fn test_escape_beats_resolver() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.process(KeyEvent::key_down(KeyCode::RIGHT_ARROW, t0), true, &Always);
        let outcome = engine.process(KeyEvent::key_down(KeyCode::ESCAPE, t0 + ms(5)), true, &Always);
        assert_eq!(outcome.verdict, Verdict::Swallow);
        assert_eq!(outcome.signal, Some(Signal::ForceCancel));
    }

    #[test]
    fn test_repeat_does_not_touch_state() {
        let mut engine = engine();
        let t0 = Instant::now();
        let repeat = KeyEvent::key_repeat(KeyCode::RIGHT_ARROW, t0);
        let outcome = engine.process(repeat, true, &table());
        assert_eq!(outcome.verdict, Verdict::Forward(repeat));
        assert_eq!(outcome.signal, None);
        assert!(engine.pressed().is_empty());

        engine.process(KeyEvent::key_down(KeyCode::LEFT_ARROW, t0), true, &table());
        engine.process(KeyEvent::key_repeat(KeyCode::RIGHT_ARROW, t0 + ms(1)), true, &table());
        assert_eq!(engine.pressed().to_sorted_vec(), vec![KeyCode::LEFT_ARROW]);
    }

    #[test]
    fn test_special_key_follows_passthrough() {
        let mut engine = engine();
        let now = Instant::now();
        let down = KeyEvent::key_down(KeyCode::GLOBE, now);

        assert_eq!(engine.process(down, true, &Always).verdict, Verdict::Forward(down));
        let outcome = engine.process(down, false, &Always);
        assert_eq!(outcome.verdict, Verdict::Swallow);
        assert_eq!(outcome.signal, None);

        let up = KeyEvent::key_up(KeyCode::GLOBE, now);
        assert_eq!(engine.process(up, false, &Always).verdict, Verdict::Swallow);
        assert!(engine.pressed().is_empty());
    }

    #[test]
    fn test_release_debounce_collapses_chord_release() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.process(KeyEvent::key_down(KeyCode::RIGHT_ARROW, t0), true, &table());
        let both = engine.process(KeyEvent::key_down(KeyCode::UP_ARROW, t0 + ms(10)), true, &table());
        assert_eq!(
            both.signal,
            Some(Signal::ActionTriggered { action: WindowDirection::TopRightQuarter })
        );

        // First release is accepted and re-resolves what is still held
        let first = engine.process(KeyEvent::key_up(KeyCode::UP_ARROW, t0 + ms(500)), true, &table());
        assert_eq!(
            first.signal,
            Some(Signal::ActionTriggered { action: WindowDirection::RightHalf })
        );

        // Second release 30ms later is absorbed but still updates state
        let release = KeyEvent::key_up(KeyCode::RIGHT_ARROW, t0 + ms(530));
        let second = engine.process(release, true, &table());
        assert_eq!(second.signal, None);
        assert_eq!(second.verdict, Verdict::Forward(release));
        assert!(engine.pressed().is_empty());
    }

    #[test]
    fn test_suppressed_release_keeps_window_anchor() {
        let mut engine = engine();
        let t0 = Instant::now();
        for key in [KeyCode::RIGHT_ARROW, KeyCode::UP_ARROW, KeyCode::LEFT_ARROW] {
            engine.process(KeyEvent::key_down(key, t0), true, &Always);
        }
        assert!(engine.process(KeyEvent::key_up(KeyCode::RIGHT_ARROW, t0 + ms(200)), true, &Always).signal.is_some());
        assert!(engine.process(KeyEvent::key_up(KeyCode::UP_ARROW, t0 + ms(260)), true, &Always).signal.is_none());
        // 101ms after the accepted release, not after the suppressed one
        assert!(engine.process(KeyEvent::key_up(KeyCode::LEFT_ARROW, t0 + ms(301)), true, &Always).verdict.is_forward());
        assert_eq!(engine.gate.last_settle(), Some(t0 + ms(301)));
    }

    #[test]
    fn test_spaced_releases_both_resolve() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.process(KeyEvent::key_down(KeyCode::RIGHT_ARROW, t0), true, &Always);
        engine.process(KeyEvent::key_down(KeyCode::UP_ARROW, t0), true, &Always);
        engine.process(KeyEvent::key_down(KeyCode::LEFT_ARROW, t0), true, &Always);

        let first = engine.process(KeyEvent::key_up(KeyCode::RIGHT_ARROW, t0 + ms(200)), true, &Always);
        let second = engine.process(KeyEvent::key_up(KeyCode::UP_ARROW, t0 + ms(350)), true, &Always);
        assert!(first.signal.is_some());
        assert!(second.signal.is_some());
        assert_eq!(second.verdict, Verdict::Swallow);
    }

    #[test]
    fn test_key_down_never_debounced() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.process(KeyEvent::key_down(KeyCode(0), t0), true, &table());
        engine.process(KeyEvent::key_up(KeyCode(0), t0 + ms(1)), true, &table());
        let outcome = engine.process(KeyEvent::key_down(KeyCode::LEFT_ARROW, t0 + ms(2)), true, &table());
        assert_eq!(
            outcome.signal,
            Some(Signal::ActionTriggered { action: WindowDirection::LeftHalf })
        );
    }

    #[test]
    fn test_modifier_joins_chord_via_flags() {
        let mut engine = engine();
        let t0 = Instant::now();
        let shift = KeyEvent::flags_changed(KeyCode::RIGHT_SHIFT, flags::SHIFT, t0);
        let outcome = engine.process(shift, true, &table());
        assert_eq!(outcome.verdict, Verdict::Forward(shift));
        assert!(engine.pressed().contains(KeyCode::SHIFT));

        let outcome = engine.process(KeyEvent::key_down(KeyCode::RIGHT_ARROW, t0 + ms(5)), true, &table());
        assert_eq!(
            outcome.signal,
            Some(Signal::ActionTriggered { action: WindowDirection::RightThird })
        );
    }

    #[test]
    fn test_flags_change_with_action_is_still_forwarded() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.process(KeyEvent::key_down(KeyCode::RIGHT_ARROW, t0), true, &table());
        let shift = KeyEvent::flags_changed(KeyCode::SHIFT, flags::SHIFT, t0 + ms(5));
        let outcome = engine.process(shift, true, &table());
        assert_eq!(outcome.verdict, Verdict::Forward(shift));
        assert_eq!(
            outcome.signal,
            Some(Signal::ActionTriggered { action: WindowDirection::RightThird })
        );
    }

    #[test]
    fn test_shift_release_is_not_settling() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.process(KeyEvent::key_down(KeyCode::RIGHT_ARROW, t0), true, &table());
        engine.process(KeyEvent::flags_changed(KeyCode::SHIFT, flags::SHIFT, t0), true, &table());
        engine.process(KeyEvent::key_up(KeyCode(0), t0 + ms(200)), true, &table());

        // Within the window of the key-up above, yet shift release still resolves
        let outcome = engine.process(
            KeyEvent::flags_changed(KeyCode::SHIFT, ModifierFlags::empty(), t0 + ms(210)),
            true,
            &table(),
        );
        assert_eq!(
            outcome.signal,
            Some(Signal::ActionTriggered { action: WindowDirection::RightHalf })
        );
    }

    #[test]
    fn test_shift_release_settles_when_configured() {
        let mut engine = KeybindEngine::new(MonitorSettings {
            shift_release_settles: true,
            ..MonitorSettings::default()
        });
        let t0 = Instant::now();
        engine.process(KeyEvent::key_down(KeyCode::RIGHT_ARROW, t0), true, &table());
        engine.process(KeyEvent::flags_changed(KeyCode::SHIFT, flags::SHIFT, t0), true, &table());
        engine.process(KeyEvent::key_up(KeyCode(0), t0 + ms(200)), true, &table());

        let outcome = engine.process(
            KeyEvent::flags_changed(KeyCode::SHIFT, ModifierFlags::empty(), t0 + ms(210)),
            true,
            &table(),
        );
        assert_eq!(outcome.signal, None);
        assert!(!engine.pressed().contains(KeyCode::SHIFT));
    }

    #[test]
    fn test_option_release_is_settling() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.process(KeyEvent::flags_changed(KeyCode::OPTION, flags::OPTION, t0), true, &Always);
        engine.process(KeyEvent::key_down(KeyCode::RIGHT_ARROW, t0), true, &Always);
        engine.process(KeyEvent::key_up(KeyCode::RIGHT_ARROW, t0 + ms(200)), true, &Always);

        let outcome = engine.process(
            KeyEvent::flags_changed(KeyCode::OPTION, ModifierFlags::empty(), t0 + ms(250)),
            true,
            &Always,
        );
        assert_eq!(outcome.signal, None);
        assert!(engine.pressed().is_empty());
    }

    #[test]
    fn test_trigger_modifier_excluded_and_skipped() {
        let mut engine = KeybindEngine::new(MonitorSettings {
            triggers: TriggerKeys::new([Modifier::Command]),
            ..MonitorSettings::default()
        });
        let t0 = Instant::now();
        let command = KeyEvent::flags_changed(KeyCode::COMMAND, flags::COMMAND, t0);
        let outcome = engine.process(command, true, &Always);
        assert_eq!(outcome.verdict, Verdict::Forward(command));
        assert_eq!(outcome.signal, None);
        assert!(engine.pressed().is_empty());

        let outcome = engine.process(KeyEvent::key_down(KeyCode::RIGHT_ARROW, t0 + ms(20)), true, &table());
        assert_eq!(outcome.verdict, Verdict::Swallow);
        assert_eq!(
            outcome.signal,
            Some(Signal::ActionTriggered { action: WindowDirection::RightHalf })
        );
        assert_eq!(engine.pressed().to_sorted_vec(), vec![KeyCode::RIGHT_ARROW]);
    }

    #[test]
    fn test_reset_clears_keys_and_gate() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.process(KeyEvent::key_down(KeyCode::RIGHT_ARROW, t0), true, &table());
        engine.process(KeyEvent::key_up(KeyCode(0), t0), true, &table());
        engine.reset();
        assert!(engine.pressed().is_empty());
        assert_eq!(engine.gate.last_settle(), None);
    }

    #[test]
    fn test_reset_pressed_keys_keeps_gate() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.process(KeyEvent::key_down(KeyCode::RIGHT_ARROW, t0), true, &table());
        engine.process(KeyEvent::key_up(KeyCode(0), t0), true, &table());
        engine.reset_pressed_keys();
        assert!(engine.pressed().is_empty());
        assert_eq!(engine.gate.last_settle(), Some(t0));
    }

    #[test]
    fn test_pressed_set_matches_down_up_semantics() {
        let mut engine = engine();
        let t0 = Instant::now();
        let script = [
            (KeyCode::RIGHT_SHIFT, true),
            (KeyCode(0), true),
            (KeyCode::SHIFT, true),
            (KeyCode(1), true),
            (KeyCode(0), false),
            (KeyCode(2), false),
            (KeyCode::RIGHT_SHIFT, false),
        ];
        for (i, (key, down)) in script.into_iter().enumerate() {
            let at = t0 + ms(i as u64 * 3);
            let event = if down {
                KeyEvent::key_down(key, at)
            } else {
                KeyEvent::key_up(key, at)
            };
            engine.process(event, true, &table());
        }
        assert_eq!(engine.pressed().to_sorted_vec(), vec![KeyCode(1)]);
    }
}
