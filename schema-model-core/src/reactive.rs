//! Reactive handles.
//!
//! A [`Reactive`] is a shared, observable slot: every clone points at the same
//! value, writes replace it, and subscribers are woken on each change. UI
//! layers subscribe to re-render; the model layer only reads and replaces.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use crate::model::Instance;

/// Shared observable value.
pub struct Reactive<T> {
    inner: Arc<watch::Sender<T>>,
}

impl<T> Clone for Reactive<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Reactive<T> {
    pub fn new(value: T) -> Self {
        let (tx, _) = watch::channel(value);
        Self {
            inner: Arc::new(tx),
        }
    }

    /// Runs `f` against the current value.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Replaces the value and notifies subscribers. Returns the old value.
    pub fn set(&self, value: T) -> T {
        self.inner.send_replace(value)
    }

    /// Mutates the value in place and notifies subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.inner.send_modify(f);
    }

    /// A receiver that observes every subsequent change.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.inner.subscribe()
    }

    /// True if both handles share the same underlying slot.
    pub fn same_handle(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> Reactive<T> {
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }
}

impl<T: fmt::Debug> fmt::Debug for Reactive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reactive").field(&*self.inner.borrow()).finish()
    }
}

fn same_id(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

impl Reactive<Vec<Instance>> {
    /// First instance whose `id` field equals `id`. Numbers compare by
    /// value, so `1` matches `1.0`.
    pub fn find_by_id(&self, id: impl Into<Value>) -> Option<Instance> {
        let id = id.into();
        self.read(|items| {
            items
                .iter()
                .find(|item| item.id().is_some_and(|own| same_id(own, &id)))
                .cloned()
        })
    }

    pub fn len(&self) -> usize {
        self.read(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read(Vec::is_empty)
    }
}
