//! Synchronous broadcast subjects: the engine's observer registry.
//!
//! # Design
//! - Each output of the engine is a [`Subject`] owning its subscriber list.
//! - Dispatch is synchronous fan-out on the caller's thread; there is no
//!   async runtime and no cross-thread delivery.
//! - Subjects created with [`Subject::replaying`] cache the most recent value
//!   and hand it to new subscribers immediately, so a late subscriber to a
//!   sensor stream does not wait for the next sample.
//!
//! Subscribers must not call back into engine mutators synchronously; a
//! subscriber that needs to mutate posts its work through the host event loop.

/// A broadcast stream with synchronous fan-out and optional latest-value
/// replay for new subscribers.
pub struct Subject<T: Clone> {
    subscribers: Vec<Box<dyn FnMut(&T)>>,
    latest: Option<T>,
    replay_latest: bool,
    closed: bool,
}

impl<T: Clone> Subject<T> {
    /// A plain subject: subscribers only see values emitted after they join.
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            latest: None,
            replay_latest: false,
            closed: false,
        }
    }

    /// A replaying subject: a new subscriber immediately observes the most
    /// recent value, if any was emitted.
    pub fn replaying() -> Self {
        Self {
            replay_latest: true,
            ..Self::new()
        }
    }

    /// Register a subscriber. On a replaying subject the callback fires
    /// immediately with the cached latest value.
    pub fn subscribe(&mut self, mut f: impl FnMut(&T) + 'static) {
        if self.closed {
            return;
        }
        if self.replay_latest {
            if let Some(v) = &self.latest {
                f(v);
            }
        }
        self.subscribers.push(Box::new(f));
    }

    /// Emit a value to all current subscribers, then cache it as latest.
    pub fn emit(&mut self, value: T) {
        if self.closed {
            return;
        }
        for s in &mut self.subscribers {
            s(&value);
        }
        self.latest = Some(value);
    }

    /// Most recent emitted value, if any.
    pub fn latest(&self) -> Option<&T> {
        self.latest.as_ref()
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Close the subject: drop all subscribers and the cached value.
    /// Further emits and subscribes are no-ops. Idempotent.
    pub fn close(&mut self) {
        self.closed = true;
        self.subscribers.clear();
        self.latest = None;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<T: Clone> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
