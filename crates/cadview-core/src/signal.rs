//! Thread-safe observer lists.
//!
//! Slots run synchronously on the emitting thread, in connection order. The
//! slot list is copied before any slot runs and the lock is released first, so
//! a slot may connect, disconnect or emit again without deadlocking. A slot
//! disconnected during an emission still receives that emission.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Handle returned by [`Signal::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

type Slot<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A list of callbacks invoked with every emitted value.
pub struct Signal<T> {
    slots: Mutex<Vec<(SlotId, Slot<T>)>>,
    next_id: AtomicU64,
}

impl<T> Signal<T> {
    /// Creates a signal with no slots.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Vec<(SlotId, Slot<T>)>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connects a slot; it runs after every slot connected before it.
    pub fn connect<F>(&self, slot: F) -> SlotId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SlotId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots().push((id, Arc::new(slot)));
        id
    }

    /// Disconnects a slot. Returns false if it was not connected.
    pub fn disconnect(&self, id: SlotId) -> bool {
        let mut slots = self.slots();
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id);
        slots.len() != before
    }

    /// Disconnects every slot.
    pub fn disconnect_all(&self) {
        self.slots().clear();
    }

    /// Invokes every connected slot with `value`.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Slot<T>> = self.slots().iter().map(|(_, slot)| Arc::clone(slot)).collect();
        for slot in snapshot {
            slot(value);
        }
    }

    /// Returns the number of connected slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    /// Returns true if no slot is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").field("slots", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_in_connection_order() {
        let signal = Signal::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            signal.connect(move |v| log.lock().unwrap().push(format!("{tag}{v}")));
        }
        signal.emit(&7);
        assert_eq!(*log.lock().unwrap(), vec!["a7", "b7", "c7"]);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::<()>::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let id = signal.connect(move |()| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        signal.emit(&());
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(&());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(signal.is_empty());
    }

    #[test]
    fn test_disconnect_during_emission_does_not_deadlock() {
        let signal = Arc::new(Signal::<()>::new());
        let count = Arc::new(AtomicUsize::new(0));
        let own_id = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&signal);
        let id_cell = Arc::clone(&own_id);
        let counter = Arc::clone(&count);
        let id = signal.connect(move |()| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let (Some(signal), Some(id)) = (weak.upgrade(), *id_cell.lock().unwrap()) {
                signal.disconnect(id);
            }
        });
        *own_id.lock().unwrap() = Some(id);

        signal.emit(&());
        signal.emit(&());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(signal.len(), 0);
    }

    #[test]
    fn test_reentrant_emit() {
        let signal = Arc::new(Signal::<u32>::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let weak = Arc::downgrade(&signal);
        let log = Arc::clone(&seen);
        signal.connect(move |v| {
            log.lock().unwrap().push(*v);
            if *v > 0 {
                if let Some(signal) = weak.upgrade() {
                    signal.emit(&(v - 1));
                }
            }
        });
        signal.emit(&2);
        assert_eq!(*seen.lock().unwrap(), vec![2, 1, 0]);
    }
}
