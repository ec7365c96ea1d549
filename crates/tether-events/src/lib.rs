//! Event listener registry for Tether.
//!
//! Every addressable entity in the engine (the socket, each namespace)
//! *owns* an [`Emitter`] rather than inheriting emitter behavior from a
//! base type. Composition keeps listener state local and makes ownership
//! obvious: dropping the entity drops its listeners.
//!
//! Dispatch is synchronous and in subscription order — `emit` returns
//! only after every listener has run. There is no queue, no thread
//! hand-off, and no re-entrancy: listeners observe events, they do not
//! get a handle back into the emitting entity.

use std::fmt;

/// Handle returned by [`Emitter::on`] / [`Emitter::once`], used to
/// unsubscribe with [`Emitter::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

enum Callback<E> {
    /// Invoked on every emit until removed.
    Repeating(Box<dyn FnMut(&E)>),
    /// Invoked on the next emit only, then discarded. The `Option` lets
    /// us move the `FnOnce` out during dispatch.
    Once(Option<Box<dyn FnOnce(&E)>>),
}

struct Entry<E> {
    id: ListenerId,
    callback: Callback<E>,
}

/// An owned registry of event listeners.
///
/// Generic over the event type `E`; listeners receive `&E`, so events
/// need not be `Clone` to be broadcast to many listeners.
pub struct Emitter<E> {
    entries: Vec<Entry<E>>,
    next_id: u64,
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Emitter<E> {
    /// Creates an empty emitter.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Subscribes a listener invoked on every emitted event.
    pub fn on(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerId {
        self.push(Callback::Repeating(Box::new(listener)))
    }

    /// Subscribes a listener invoked on the next emitted event only.
    pub fn once(&mut self, listener: impl FnOnce(&E) + 'static) -> ListenerId {
        self.push(Callback::Once(Some(Box::new(listener))))
    }

    /// Removes a listener. Returns `false` if the id is unknown (already
    /// removed, or spent by a `once` dispatch).
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Removes every listener.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Invokes all listeners with `event`, in subscription order, on the
    /// calling thread. Spent `once` listeners are removed afterwards.
    pub fn emit(&mut self, event: &E) {
        tracing::trace!(listeners = self.entries.len(), "dispatching event");
        for entry in &mut self.entries {
            match &mut entry.callback {
                Callback::Repeating(listener) => listener(event),
                Callback::Once(slot) => {
                    if let Some(listener) = slot.take() {
                        listener(event);
                    }
                }
            }
        }
        self.entries
            .retain(|entry| !matches!(entry.callback, Callback::Once(None)));
    }

    /// Number of live listeners.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, callback: Callback<E>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, callback });
        id
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.entries.len())
            .finish()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Collects emitted values so tests can assert on dispatch order.
    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn FnMut(&u32)>) {
        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let log = Rc::clone(&log);
            move |tag: &str| -> Box<dyn FnMut(&u32)> {
                let log = Rc::clone(&log);
                let tag = tag.to_string();
                Box::new(move |event: &u32| {
                    log.borrow_mut().push(format!("{tag}:{event}"));
                })
            }
        };
        (log, make)
    }

    #[test]
    fn test_emit_invokes_listeners_in_subscription_order() {
        let (log, make) = recorder();
        let mut emitter = Emitter::new();
        emitter.on(make("a"));
        emitter.on(make("b"));

        emitter.emit(&1);

        assert_eq!(*log.borrow(), vec!["a:1", "b:1"]);
    }

    #[test]
    fn test_emit_with_no_listeners_is_a_noop() {
        let mut emitter: Emitter<u32> = Emitter::new();
        emitter.emit(&1);
        assert!(emitter.is_empty());
    }

    #[test]
    fn test_once_listener_fires_exactly_once() {
        let (log, make) = recorder();
        let mut emitter = Emitter::new();
        let mut fused = make("once");
        emitter.once(move |e: &u32| fused(e));
        emitter.on(make("always"));

        emitter.emit(&1);
        emitter.emit(&2);

        assert_eq!(*log.borrow(), vec!["once:1", "always:1", "always:2"]);
        assert_eq!(emitter.len(), 1);
    }

    #[test]
    fn test_off_removes_listener() {
        let (log, make) = recorder();
        let mut emitter = Emitter::new();
        let id = emitter.on(make("a"));
        emitter.on(make("b"));

        assert!(emitter.off(id));
        emitter.emit(&1);

        assert_eq!(*log.borrow(), vec!["b:1"]);
    }

    #[test]
    fn test_off_unknown_id_returns_false() {
        let mut emitter: Emitter<u32> = Emitter::new();
        let id = emitter.on(|_| {});
        assert!(emitter.off(id));
        // Second removal of the same id finds nothing.
        assert!(!emitter.off(id));
    }

    #[test]
    fn test_clear_removes_everything() {
        let (log, make) = recorder();
        let mut emitter = Emitter::new();
        emitter.on(make("a"));
        emitter.once(|_: &u32| {});

        emitter.clear();
        emitter.emit(&1);

        assert!(log.borrow().is_empty());
        assert!(emitter.is_empty());
    }

    #[test]
    fn test_listener_ids_are_unique_across_removals() {
        let mut emitter: Emitter<u32> = Emitter::new();
        let a = emitter.on(|_| {});
        emitter.off(a);
        let b = emitter.on(|_| {});
        assert_ne!(a, b, "ids must never be reused");
    }
}
