//! RefCounted trait for objects owned through `Ref`/`InternalRef`
//!
//! Implementors embed either a `RefCount` or an `ExternalRefCount` and expose
//! it through `counts()`. The two hooks are where an object settles its state
//! when it loses its last API-visible owner and when it dies.
//!
//! # Example
//!
//! ```rust
//! use refcount::{Counts, RefCount, RefCounted};
//!
//! struct Sampler {
//!     refs: RefCount,
//! }
//!
//! impl RefCounted for Sampler {
//!     fn counts(&self) -> Counts<'_> {
//!         Counts::Single(&self.refs)
//!     }
//! }
//! ```

use crate::count::{ExternalRefCount, RefCount};

/// Borrowed view of an object's counters
#[derive(Debug, Clone, Copy)]
pub enum Counts<'a> {
    /// Total count only
    Single(&'a RefCount),
    /// Total count plus external owners
    WithExternal(&'a ExternalRefCount),
}

/// Objects whose lifetime is managed by explicit reference counts
///
/// Objects must be:
/// - Send + Sync: handles cross threads freely
/// - 'static: handles are stored inside long-lived events
pub trait RefCounted: Send + Sync + 'static {
    /// The object's counters
    fn counts(&self) -> Counts<'_>;

    /// Called synchronously inside the release that drops the last external
    /// reference, before the total count is decremented
    ///
    /// The object may still be alive afterwards through internal references.
    /// Only called for objects exposing `Counts::WithExternal`.
    fn will_drop_last_external_ref(&self) {}

    /// Called exactly once, when the total count reaches zero
    fn on_last_ref_released(&self) {}
}

pub(crate) fn add_external<T: RefCounted + ?Sized>(object: &T) {
    match object.counts() {
        Counts::Single(count) => count.add_ref(),
        Counts::WithExternal(counts) => counts.add_ref(),
    }
}

pub(crate) fn try_add_external<T: RefCounted + ?Sized>(object: &T) -> bool {
    match object.counts() {
        Counts::Single(count) => count.try_add_ref(),
        Counts::WithExternal(counts) => counts.try_add_ref(),
    }
}

pub(crate) fn release_external<T: RefCounted + ?Sized>(object: &T) -> bool {
    match object.counts() {
        Counts::Single(count) => count.release(),
        Counts::WithExternal(counts) => counts.release(|| object.will_drop_last_external_ref()),
    }
}

pub(crate) fn add_internal<T: RefCounted + ?Sized>(object: &T) {
    match object.counts() {
        Counts::Single(count) => count.add_ref(),
        Counts::WithExternal(counts) => counts.add_internal_ref(),
    }
}

pub(crate) fn try_add_internal<T: RefCounted + ?Sized>(object: &T) -> bool {
    match object.counts() {
        Counts::Single(count) => count.try_add_ref(),
        Counts::WithExternal(counts) => counts.try_add_internal_ref(),
    }
}

pub(crate) fn release_internal<T: RefCounted + ?Sized>(object: &T) -> bool {
    match object.counts() {
        Counts::Single(count) => count.release(),
        Counts::WithExternal(counts) => counts.release_internal(),
    }
}
