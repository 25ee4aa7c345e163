//! Fan-out multicast dispatch with single-shot and linked-object unsubscribe (`spec.md` §4.7).

use std::cell::RefCell;
use std::rc::Rc;

type Callback<Args> = Rc<RefCell<dyn FnMut(Args)>>;

#[derive(Clone)]
struct Listener<Args> {
    callback: Callback<Args>,
    linked_object: Option<usize>,
    singleshot: bool,
}

/// A multicast delegate. Not `Send`/`Sync` by design — per `spec.md` §5 this core is
/// single-threaded cooperative, so listeners are plain `Rc<RefCell<..>>` closures rather
/// than boxed `dyn Fn` behind a mutex.
pub struct Delegate<Args> {
    listeners: Vec<Listener<Args>>,
}

impl<Args> Default for Delegate<Args> {
    fn default() -> Self {
        Delegate { listeners: Vec::new() }
    }
}

impl<Args: Clone> Delegate<Args> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `callback`. `linked_object` is an opaque identity token a caller can later
    /// pass to [`Delegate::unsubscribe_all`]; `singleshot` listeners are removed from the
    /// live list the next time [`Delegate::fire`] runs, after having been invoked once more.
    pub fn subscribe(&mut self, callback: impl FnMut(Args) + 'static, linked_object: Option<usize>, singleshot: bool) {
        self.listeners.push(Listener {
            callback: Rc::new(RefCell::new(callback)),
            linked_object,
            singleshot,
        });
    }

    /// Removes every listener registered with `linked_object`.
    pub fn unsubscribe_all(&mut self, linked_object: usize) {
        self.listeners.retain(|l| l.linked_object != Some(linked_object));
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Snapshots the listener list (a cheap `Rc` clone per entry), removes all single-shot
    /// listeners from the live list, then invokes the snapshot in insertion order. Re-entrant
    /// subscribe/unsubscribe during a callback mutates `self.listeners` and so affects only
    /// future fires, never the snapshot already in flight.
    pub fn fire(&mut self, args: Args) {
        let snapshot = self.listeners.clone();
        self.listeners.retain(|l| !l.singleshot);
        for listener in &snapshot {
            (listener.callback.borrow_mut())(args.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell as StdRefCell;
    use std::rc::Rc as StdRc;

    #[test]
    fn fires_listeners_in_insertion_order() {
        let order = StdRc::new(StdRefCell::new(Vec::new()));
        let mut delegate: Delegate<i32> = Delegate::new();
        for i in 0..3 {
            let order = order.clone();
            delegate.subscribe(move |_| order.borrow_mut().push(i), None, false);
        }
        delegate.fire(0);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn singleshot_listener_fires_once() {
        let count = StdRc::new(StdRefCell::new(0));
        let mut delegate: Delegate<()> = Delegate::new();
        let counted = count.clone();
        delegate.subscribe(move |_| *counted.borrow_mut() += 1, None, true);
        delegate.fire(());
        delegate.fire(());
        assert_eq!(*count.borrow(), 1);
        assert!(delegate.is_empty());
    }

    #[test]
    fn unsubscribe_all_removes_by_linked_object() {
        let mut delegate: Delegate<()> = Delegate::new();
        delegate.subscribe(|_| {}, Some(1), false);
        delegate.subscribe(|_| {}, Some(2), false);
        delegate.subscribe(|_| {}, Some(1), false);
        delegate.unsubscribe_all(1);
        assert_eq!(delegate.len(), 1);
    }

    #[test]
    fn reentrant_unsubscribe_during_fire_affects_only_future_fires() {
        let calls = StdRc::new(StdRefCell::new(0));
        let delegate = StdRc::new(StdRefCell::new(Delegate::<()>::new()));

        let calls_a = calls.clone();
        let delegate_for_a = delegate.clone();
        delegate.borrow_mut().subscribe(
            move |_| {
                *calls_a.borrow_mut() += 1;
                delegate_for_a.borrow_mut().unsubscribe_all(99);
            },
            Some(1),
            false,
        );
        let calls_b = calls.clone();
        delegate.borrow_mut().subscribe(move |_| *calls_b.borrow_mut() += 1, Some(99), false);

        delegate.borrow_mut().fire(());
        // Both listeners present at the start of this fire still ran once, even though the
        // first listener unsubscribed the second mid-fire.
        assert_eq!(*calls.borrow(), 2);

        delegate.borrow_mut().fire(());
        // The unsubscribe took effect for the next fire.
        assert_eq!(*calls.borrow(), 3);
    }
}
