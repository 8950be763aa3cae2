//! Reactive value cells.
//!
//! A [`ValueCell<T>`] is a shared, observable value. Style rules hold their
//! value in a cell so that a value can be replaced in place: everyone holding
//! a clone of the cell observes the update, and subscribers are notified
//! through the cell's [`Signal`].
//!
//! Clones share storage. Cell identity (see [`ValueCell::ptr_eq`]) is what
//! the cascade engine uses to tell whether the rule that wins resolution
//! actually changed.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::logging::targets;
use crate::signal::{ConnectionGuard, Signal};

struct CellInner<T> {
    value: RwLock<T>,
    changed: Arc<Signal<T>>,
}

/// A shared reactive value with change notification.
///
/// # Example
///
/// ```
/// use horizon_cascade_core::ValueCell;
///
/// let cell = ValueCell::new(42);
/// let alias = cell.clone();
///
/// // Setting the same value reports no change
/// assert!(!cell.set(42));
///
/// // Both handles observe the new value
/// assert!(cell.set(100));
/// assert_eq!(alias.get(), 100);
/// ```
pub struct ValueCell<T> {
    inner: Arc<CellInner<T>>,
}

impl<T> Clone for ValueCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ValueCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCell")
            .field("value", &*self.inner.value.read())
            .field("subscribers", &self.inner.changed.connection_count())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> ValueCell<T> {
    /// Create a new cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(CellInner {
                value: RwLock::new(value),
                changed: Arc::new(Signal::new()),
            }),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.inner.value.read())
    }

    /// Overwrite the value without notifying subscribers.
    pub fn set_silent(&self, value: T) {
        *self.inner.value.write() = value;
    }

    /// Subscribe to value changes.
    ///
    /// The slot receives the new value. The returned guard disconnects the
    /// slot when dropped.
    pub fn subscribe<F>(&self, slot: F) -> ConnectionGuard<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.inner.changed.connect_scoped(slot)
    }

    /// The signal emitted after every effective change.
    pub fn changed(&self) -> &Arc<Signal<T>> {
        &self.inner.changed
    }

    /// Returns `true` if both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ValueCell<T> {
    /// Set the value, returning `true` if it changed.
    ///
    /// Subscribers are notified after the write lock is released.
    pub fn set(&self, value: T) -> bool {
        self.replace(value).is_some()
    }

    /// Set the value, returning the previous value if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let old = {
            let mut current = self.inner.value.write();
            if *current == value {
                return None;
            }
            std::mem::replace(&mut *current, value.clone())
        };
        tracing::trace!(target: targets::CELL, "value cell changed");
        self.inner.changed.emit(value);
        Some(old)
    }
}
