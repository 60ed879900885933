//! Outbound keybind signals
//!
//! Consumers register typed handlers with a [`SignalRegistry`]. Handlers run
//! synchronously on the event tap callback context, right after the event
//! that produced the signal has been processed.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Signals emitted by the keybind monitor, at most one per event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal<A> {
    /// Escape is held: close whatever the keybinds are driving
    ForceCancel,

    /// The held keys resolved to an action
    ActionTriggered {
        /// The resolved action
        action: A,
    },
}

impl<A: fmt::Display> fmt::Display for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::ForceCancel => write!(f, "FORCE_CANCEL"),
            Signal::ActionTriggered { action } => write!(f, "ACTION_TRIGGERED ({})", action),
        }
    }
}

/// Handle returned by the `on_*` methods, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum Subscriber<A> {
    ForceCancel(Box<dyn Fn() + Send + Sync>),
    Action(Box<dyn Fn(&A) + Send + Sync>),
    Any(Box<dyn Fn(&Signal<A>) + Send + Sync>),
}

/// Registry of signal handlers
///
/// Handlers must not subscribe or unsubscribe from inside a handler, and
/// must be as quick as the tap callback they run in.
pub struct SignalRegistry<A> {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber<A>)>>,
}

impl<A> SignalRegistry<A> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Run `handler` on every force-cancel signal
    pub fn on_force_cancel<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(Subscriber::ForceCancel(Box::new(handler)))
    }

    /// Run `handler` with the action of every action-triggered signal
    pub fn on_action<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.subscribe(Subscriber::Action(Box::new(handler)))
    }

    /// Run `handler` on every signal
    pub fn on_signal<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Signal<A>) + Send + Sync + 'static,
    {
        self.subscribe(Subscriber::Any(Box::new(handler)))
    }

    /// Remove a handler. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `signal` to matching handlers in subscription order
    pub fn dispatch(&self, signal: &Signal<A>) {
        let subscribers = self.subscribers.read().unwrap_or_else(PoisonError::into_inner);
        trace!(subscribers = subscribers.len(), "dispatching signal");

        for (_, subscriber) in subscribers.iter() {
            match (subscriber, signal) {
                (Subscriber::ForceCancel(handler), Signal::ForceCancel) => handler(),
                (Subscriber::Action(handler), Signal::ActionTriggered { action }) => handler(action),
                (Subscriber::Any(handler), _) => handler(signal),
                _ => {}
            }
        }
    }

    fn subscribe(&self, subscriber: Subscriber<A>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, subscriber));
        id
    }
}

impl<A> Default for SignalRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for SignalRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Fan signals out to a broadcast channel for async consumers
///
/// Sending never blocks; with no receivers the signal is dropped.
pub fn forward_to_channel<A>(
    registry: &SignalRegistry<A>,
    tx: broadcast::Sender<Signal<A>>,
) -> SubscriptionId
where
    A: Clone + Send + Sync + 'static,
{
    registry.on_signal(move |signal| {
        let _ = tx.send(signal.clone());
    })
}
