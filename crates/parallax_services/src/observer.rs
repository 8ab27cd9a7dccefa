//! Listener registry with drop-to-deregister subscriptions.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<A> = Rc<RefCell<dyn FnMut(&A)>>;

struct Registry<A> {
    next_id: u64,
    entries: Vec<(u64, Callback<A>)>,
}

/// Single-threaded publish/subscribe list.
pub struct Listeners<A> {
    registry: Rc<RefCell<Registry<A>>>,
}

impl<A: 'static> Listeners<A> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register `callback` until the returned [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&A) + 'static,
    {
        let callback: Callback<A> = Rc::new(RefCell::new(callback));
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push((id, callback));
            id
        };

        let registry: Weak<RefCell<Registry<A>>> = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            let Some(registry) = registry.upgrade() else {
                return;
            };
            // Dropped outside the borrow: the callback may own other
            // subscriptions on this registry.
            let removed = {
                let mut registry = registry.borrow_mut();
                registry
                    .entries
                    .iter()
                    .position(|(entry, _)| *entry == id)
                    .map(|index| registry.entries.remove(index))
            };
            drop(removed);
        })
    }

    /// Invoke every live listener with `value`.
    ///
    /// Listeners may subscribe or drop subscriptions while being notified.
    /// A listener dropped mid-dispatch is not called again; a listener that
    /// re-enters `notify` from its own callback is skipped for the nested call.
    pub fn notify(&self, value: &A) {
        let snapshot: Vec<(u64, Callback<A>)> = self
            .registry
            .borrow()
            .entries
            .iter()
            .map(|(id, callback)| (*id, Rc::clone(callback)))
            .collect();

        for (id, callback) in snapshot {
            if !self.is_registered(id) {
                continue;
            }
            match callback.try_borrow_mut() {
                Ok(mut callback) => (&mut *callback)(value),
                Err(_) => tracing::debug!(listener = id, "listener re-entered, skipping nested notify"),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_registered(&self, id: u64) -> bool {
        self.registry
            .borrow()
            .entries
            .iter()
            .any(|(entry, _)| *entry == id)
    }
}

impl<A: 'static> Default for Listeners<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> fmt::Debug for Listeners<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.registry.borrow().entries.len())
            .finish()
    }
}

/// Keeps a listener registered. Dropping it deregisters the listener.
#[must_use = "dropping a Subscription immediately deregisters the listener"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    fn new(detach: impl FnOnce() + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Deregister now. Same as dropping.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}
