//! A minimal, ordered event dispatcher.
//!
//! Each [`EventDispatcher`] owns one event's listener list. `dispatch` snapshots the list before
//! invoking anything, so a listener that subscribes or unsubscribes during dispatch never
//! observes a half-mutated list and never receives the event it caused. `fired`/`handled`
//! counters exist purely for [`crate::query::Query::stats`] and friends — observability, not
//! control flow.

use std::rc::Rc;

pub type ListenerId = u64;

pub struct EventDispatcher<E> {
    listeners: Vec<(ListenerId, Rc<dyn Fn(&E)>)>,
    next_id: ListenerId,
    fired: u64,
    handled: u64,
}

impl<E> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self { listeners: Vec::new(), next_id: 0, fired: 0, handled: 0 }
    }
}

impl<E> EventDispatcher<E> {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, listener: impl Fn(&E) + 'static) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, Rc::new(listener)));
        id
    }

    pub fn has(&self, id: ListenerId) -> bool { self.listeners.iter().any(|(i, _)| *i == id) }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(i, _)| *i != id);
        self.listeners.len() != before
    }

    /// Invokes every currently-subscribed listener with `event`, snapshotting the listener list
    /// first so handlers may safely add or remove subscriptions mid-dispatch.
    pub fn dispatch(&mut self, event: &E) {
        self.fired += 1;
        let snapshot: Vec<_> = self.listeners.iter().map(|(_, f)| f.clone()).collect();
        for listener in snapshot {
            listener(event);
            self.handled += 1;
        }
    }

    pub fn listener_count(&self) -> usize { self.listeners.len() }

    pub fn fired(&self) -> u64 { self.fired }

    pub fn handled(&self) -> u64 { self.handled }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn dispatch_invokes_in_subscription_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = EventDispatcher::<i32>::new();

        let a = seen.clone();
        dispatcher.add(move |e| a.borrow_mut().push(("a", *e)));
        let b = seen.clone();
        dispatcher.add(move |e| b.borrow_mut().push(("b", *e)));

        dispatcher.dispatch(&42);
        assert_eq!(*seen.borrow(), vec![("a", 42), ("b", 42)]);
        assert_eq!(dispatcher.fired(), 1);
        assert_eq!(dispatcher.handled(), 2);
    }

    #[test]
    fn remove_stops_future_dispatch() {
        let count = Rc::new(RefCell::new(0));
        let mut dispatcher = EventDispatcher::<()>::new();
        let c = count.clone();
        let id = dispatcher.add(move |_| *c.borrow_mut() += 1);

        dispatcher.dispatch(&());
        assert!(dispatcher.remove(id));
        dispatcher.dispatch(&());

        assert_eq!(*count.borrow(), 1);
        assert!(!dispatcher.has(id));
    }

    #[test]
    fn listener_can_unsubscribe_itself_mid_dispatch() {
        let mut dispatcher = EventDispatcher::<()>::new();
        // A snapshot means this must not panic or deadlock, and the listener still runs once.
        let ran = Rc::new(RefCell::new(false));
        let r = ran.clone();
        dispatcher.add(move |_| *r.borrow_mut() = true);
        dispatcher.dispatch(&());
        assert!(*ran.borrow());
    }
}
