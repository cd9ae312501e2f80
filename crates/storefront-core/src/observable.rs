//! ============================================================================
//! Observable - Explicit observer registries for store publications
//! ============================================================================
//! Two flavours of named stream:
//! - `Publication<T>`: holds a current value, replays it to every new
//!   subscriber and delivers every later change
//! - `Broadcast<T>`: no current value, delivers each message once to the
//!   subscribers registered at publish time, drops it when nobody listens
//!
//! Handlers are called outside the registry lock, so a handler may read
//! from (or mutate) the store that published the value.
//! ============================================================================

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Registered callbacks keyed by a monotonically increasing id
struct Registry<T> {
    next_id: u64,
    handlers: Vec<(u64, Handler<T>)>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
        }
    }

    fn insert(&mut self, handler: Handler<T>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    fn remove(&mut self, id: u64) {
        self.handlers.retain(|(existing, _)| *existing != id);
    }

    fn snapshot(&self) -> Vec<Handler<T>> {
        self.handlers.iter().map(|(_, h)| Arc::clone(h)).collect()
    }
}

/// Release handle returned by `subscribe`.
///
/// Dropping the handle does NOT unsubscribe; the owner calls `release` on
/// teardown.
#[must_use = "keep the handle and call release() on teardown"]
pub struct Subscription {
    release: Box<dyn FnOnce() + Send + Sync>,
}

impl Subscription {
    fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Box::new(release),
        }
    }

    /// Stop receiving values
    pub fn release(self) {
        (self.release)()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

struct PublicationState<T> {
    current: T,
    revision: u64,
    registry: Registry<T>,
}

/// Replay-last-value stream
pub struct Publication<T> {
    state: Arc<Mutex<PublicationState<T>>>,
}

impl<T> Publication<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(PublicationState {
                current: initial,
                revision: 0,
                registry: Registry::new(),
            })),
        }
    }

    /// Current value
    pub fn get(&self) -> T {
        self.state.lock().current.clone()
    }

    /// Register a handler; it receives the current value immediately
    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let handler: Handler<T> = Arc::new(handler);
        let (id, revision, current) = {
            let mut state = self.state.lock();
            let id = state.registry.insert(Arc::clone(&handler));
            (id, state.revision, state.current.clone())
        };

        // A publish that slipped in after registration already reached us
        if self.is_current(revision) {
            handler(&current);
        }

        let weak: Weak<Mutex<PublicationState<T>>> = Arc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = weak.upgrade() {
                state.lock().registry.remove(id);
            }
        })
    }

    /// Replace the current value and notify every subscriber
    pub fn publish(&self, value: T) {
        let (revision, handlers) = {
            let mut state = self.state.lock();
            state.revision += 1;
            state.current = value.clone();
            (state.revision, state.registry.snapshot())
        };

        self.deliver(revision, handlers, &value);
    }

    /// Publish a value derived under the caller's lock at `revision`.
    ///
    /// Values older than the last published revision are discarded, so a
    /// writer that lost a race never overwrites a newer snapshot.
    pub fn publish_revision(&self, revision: u64, value: T) -> bool {
        let handlers = {
            let mut state = self.state.lock();
            if revision <= state.revision {
                return false;
            }
            state.revision = revision;
            state.current = value.clone();
            state.registry.snapshot()
        };

        self.deliver(revision, handlers, &value);
        true
    }

    /// Call each handler unless a newer value has been published meanwhile.
    ///
    /// A handler that mutates the store triggers a nested publish, which
    /// delivers the newer value to every subscriber; the remaining
    /// handlers must not receive the older one afterwards.
    fn deliver(&self, revision: u64, handlers: Vec<Handler<T>>, value: &T) {
        for handler in handlers {
            if !self.is_current(revision) {
                break;
            }
            handler(value);
        }
    }

    fn is_current(&self, revision: u64) -> bool {
        self.state.lock().revision == revision
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().registry.handlers.len()
    }
}

/// Fire-and-forget stream without replay
pub struct Broadcast<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Broadcast<T>
where
    T: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::new())),
        }
    }

    /// Register a handler for every message published from now on
    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.registry.lock().insert(Arc::new(handler));

        let weak = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = weak.upgrade() {
                registry.lock().remove(id);
            }
        })
    }

    /// Deliver to the current subscribers; returns how many received it
    pub fn publish(&self, message: T) -> usize {
        let handlers = self.registry.lock().snapshot();
        for handler in &handlers {
            handler(&message);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().handlers.len()
    }
}

impl<T> Default for Broadcast<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
