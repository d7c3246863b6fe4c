//! Owning and non-owning handles over `RefCounted` objects
//!
//! - `Ref<T>`: an API-visible owner. For objects with an external count it
//!   counts as an external owner.
//! - `InternalRef<T>`: an engine-held owner (events, parent objects). It never
//!   touches the external count, so holding one does not delay
//!   `will_drop_last_external_ref`.
//! - `WeakRef<T>`: does not own; upgrades to an `InternalRef` while the object
//!   is alive.
//!
//! Memory is held by an `Arc`; the explicit counts decide when the object's
//! hooks run. Rust moves transfer ownership without touching any count.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use crate::traits::{
    add_external, add_internal, release_external, release_internal, try_add_external,
    try_add_internal, Counts, RefCounted,
};

// ============================================================================
// Ref<T> - external owner
// ============================================================================

/// API-visible owning handle
///
/// # Example
///
/// ```rust
/// use refcount::{Counts, Ref, RefCount, RefCounted};
///
/// struct Queue {
///     refs: RefCount,
/// }
///
/// impl RefCounted for Queue {
///     fn counts(&self) -> Counts<'_> {
///         Counts::Single(&self.refs)
///     }
/// }
///
/// let queue = Ref::new(Queue { refs: RefCount::new() });
/// let second = queue.clone();
/// assert_eq!(Ref::total_count(&queue), 2);
/// drop(second);
/// assert_eq!(Ref::total_count(&queue), 1);
/// ```
pub struct Ref<T: RefCounted> {
    inner: Arc<T>,
}

impl<T: RefCounted> Ref<T> {
    /// Wrap a freshly created object, adopting the reference its counters
    /// start with
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Wrap a freshly created object that needs a weak reference to itself
    pub fn new_cyclic(build: impl FnOnce(WeakRef<T>) -> T) -> Self {
        Self {
            inner: Arc::new_cyclic(|weak| {
                build(WeakRef {
                    inner: weak.clone(),
                })
            }),
        }
    }

    /// Create an internal reference to the same object
    pub fn to_internal(this: &Self) -> InternalRef<T> {
        add_internal(&*this.inner);
        InternalRef {
            inner: Arc::clone(&this.inner),
        }
    }

    /// Create a weak reference to the same object
    pub fn downgrade(this: &Self) -> WeakRef<T> {
        WeakRef {
            inner: Arc::downgrade(&this.inner),
        }
    }

    /// Whether both handles point at the same object
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Current total count
    pub fn total_count(this: &Self) -> u64 {
        total_count(&*this.inner)
    }

    /// Current external count, for objects that track one
    pub fn external_count(this: &Self) -> Option<u64> {
        match this.inner.counts() {
            Counts::Single(_) => None,
            Counts::WithExternal(counts) => Some(counts.external()),
        }
    }
}

impl<T: RefCounted> Clone for Ref<T> {
    fn clone(&self) -> Self {
        add_external(&*self.inner);
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: RefCounted> Drop for Ref<T> {
    fn drop(&mut self) {
        if release_external(&*self.inner) {
            self.inner.on_last_ref_released();
        }
    }
}

impl<T: RefCounted> Deref for Ref<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: RefCounted + fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

// ============================================================================
// InternalRef<T> - engine-held owner
// ============================================================================

/// Engine-held owning handle
///
/// Keeps the object alive without counting as an API-visible owner.
pub struct InternalRef<T: RefCounted> {
    inner: Arc<T>,
}

impl<T: RefCounted> InternalRef<T> {
    /// Hand the object back to the API as a new external owner
    ///
    /// Fails once the last external owner has gone: an object whose
    /// `will_drop_last_external_ref` has run is never revived.
    pub fn try_to_external(this: &Self) -> Option<Ref<T>> {
        if try_add_external(&*this.inner) {
            Some(Ref {
                inner: Arc::clone(&this.inner),
            })
        } else {
            None
        }
    }

    /// Create a weak reference to the same object
    pub fn downgrade(this: &Self) -> WeakRef<T> {
        WeakRef {
            inner: Arc::downgrade(&this.inner),
        }
    }

    /// Whether both handles point at the same object
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Current total count
    pub fn total_count(this: &Self) -> u64 {
        total_count(&*this.inner)
    }
}

impl<T: RefCounted> Clone for InternalRef<T> {
    fn clone(&self) -> Self {
        add_internal(&*self.inner);
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: RefCounted> Drop for InternalRef<T> {
    fn drop(&mut self) {
        if release_internal(&*self.inner) {
            self.inner.on_last_ref_released();
        }
    }
}

impl<T: RefCounted> Deref for InternalRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: RefCounted + fmt::Debug> fmt::Debug for InternalRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

// ============================================================================
// WeakRef<T> - non-owning
// ============================================================================

/// Non-owning handle
pub struct WeakRef<T: RefCounted> {
    inner: Weak<T>,
}

impl<T: RefCounted> WeakRef<T> {
    /// A weak reference that never upgrades
    pub fn new() -> Self {
        Self { inner: Weak::new() }
    }

    /// Take an internal reference if the object is still alive
    ///
    /// Fails once the total count has reached zero, even if the memory has
    /// not been reclaimed yet.
    pub fn upgrade(&self) -> Option<InternalRef<T>> {
        let inner = self.inner.upgrade()?;
        if try_add_internal(&*inner) {
            Some(InternalRef { inner })
        } else {
            None
        }
    }
}

impl<T: RefCounted> Clone for WeakRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: RefCounted> Default for WeakRef<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RefCounted> fmt::Debug for WeakRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(WeakRef)")
    }
}

fn total_count<T: RefCounted>(object: &T) -> u64 {
    match object.counts() {
        Counts::Single(count) => count.count(),
        Counts::WithExternal(counts) => counts.total(),
    }
}
