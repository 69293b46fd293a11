//! Typed callback lists used to publish results between components

use crossbeam_channel::{unbounded, Receiver};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Returns false once it wants to be disconnected
type Listener<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Handle returned by [`Signal::connect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// A list of listeners called with every emitted value
///
/// Listeners run on the emitting thread, in connection order, without the
/// listener lock held, so a listener may connect or disconnect others.
pub struct Signal<T> {
    listeners: Mutex<Vec<(ConnectionId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register `listener`
    pub fn connect<F>(&self, listener: F) -> ConnectionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.connect_while(move |value| {
            listener(value);
            true
        })
    }

    /// Register `listener`, dropped after the first call that returns false
    fn connect_while<F>(&self, listener: F) -> ConnectionId
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener; returns false if it was not connected
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(other, _)| *other != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Call every listener with `value`
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<(ConnectionId, Listener<T>)> = self
            .listeners
            .lock()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();
        let dead: Vec<ConnectionId> = snapshot
            .into_iter()
            .filter_map(|(id, listener)| (!listener(value)).then_some(id))
            .collect();
        if !dead.is_empty() {
            self.listeners.lock().retain(|(id, _)| !dead.contains(id));
            tracing::debug!(count = dead.len(), "disconnected closed subscribers");
        }
    }
}

impl<T: Clone + Send + 'static> Signal<T> {
    /// Receive every emitted value on a channel
    ///
    /// The connection is removed on the first emit after the receiver is
    /// dropped.
    pub fn subscribe(&self) -> (ConnectionId, Receiver<T>) {
        let (tx, rx) = unbounded();
        let id = self.connect_while(move |value: &T| tx.send(value.clone()).is_ok());
        (id, rx)
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
