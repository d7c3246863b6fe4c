//! Atomic reference counters
//!
//! This module provides the two counter primitives used by every handle object:
//! - `RefCount`: a single total-lifetime counter
//! - `ExternalRefCount`: a total counter plus a counter of API-visible owners
//!
//! Neither type destroys anything itself. Releasing returns `true` when the
//! caller must now run its teardown, so bookkeeping such as notifying a host
//! runs exactly once and is ordered after every other release.

use std::sync::atomic::{fence, AtomicU64, Ordering};

// ============================================================================
// RefCount - single-tier counter
// ============================================================================

/// Atomic total-lifetime reference count
///
/// Starts at 1: the creator owns the first reference.
#[derive(Debug)]
pub struct RefCount {
    count: AtomicU64,
}

impl RefCount {
    /// Create a counter holding the creator's reference
    pub fn new() -> Self {
        Self::with_count(1)
    }

    /// Create a counter with an explicit initial value
    pub fn with_count(count: u64) -> Self {
        Self {
            count: AtomicU64::new(count),
        }
    }

    /// Add a reference
    ///
    /// Relaxed is enough: a new reference can only be made from an existing
    /// one, so there is nothing to synchronize with.
    pub fn add_ref(&self) {
        let previous = self.count.fetch_add(1, Ordering::Relaxed);
        debug_assert!(previous > 0, "add_ref on a dead object");
    }

    /// Add a reference only if the object is still alive
    ///
    /// Returns `false` once the count has reached zero. Used to upgrade weak
    /// references.
    pub fn try_add_ref(&self) -> bool {
        let mut current = self.count.load(Ordering::Relaxed);
        loop {
            if current == 0 {
                return false;
            }
            match self.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Drop a reference, returning whether the caller must now destroy the object
    ///
    /// The decrement uses release ordering so every prior write through this
    /// reference happens-before the teardown. The thread that observes zero
    /// issues an acquire fence before returning `true`.
    pub fn release(&self) -> bool {
        let previous = self.count.fetch_sub(1, Ordering::Release);
        debug_assert!(previous > 0, "release on a dead object");

        if previous == 1 {
            fence(Ordering::Acquire);
            true
        } else {
            false
        }
    }

    /// Current count (racy, for diagnostics and tests)
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// ExternalRefCount - total counter plus API-visible owners
// ============================================================================

/// Reference count with a separate tally of external (API-visible) owners
///
/// `add_ref`/`release` track an external owner and therefore touch both
/// counters. `add_internal_ref`/`release_internal` track engine-held references
/// and touch only the total counter.
///
/// # Example
///
/// ```rust
/// use refcount::ExternalRefCount;
///
/// let counts = ExternalRefCount::new();
/// counts.add_internal_ref();
///
/// let mut hook_ran = false;
/// // Last external owner goes away: the hook runs, but the object lives on.
/// assert!(!counts.release(|| hook_ran = true));
/// assert!(hook_ran);
///
/// // Last internal reference: destroy now.
/// assert!(counts.release_internal());
/// ```
#[derive(Debug)]
pub struct ExternalRefCount {
    total: RefCount,
    external: RefCount,
}

impl ExternalRefCount {
    /// Create counters holding the creator's (external) reference
    pub fn new() -> Self {
        Self {
            total: RefCount::new(),
            external: RefCount::new(),
        }
    }

    /// Add an external reference (bumps both counters)
    pub fn add_ref(&self) {
        self.external.add_ref();
        self.total.add_ref();
    }

    /// Add an external reference only while another external owner exists
    ///
    /// Returns `false` once the external count has reached zero, including
    /// from inside `will_drop_last_external_ref`.
    pub fn try_add_ref(&self) -> bool {
        if !self.external.try_add_ref() {
            return false;
        }
        self.total.add_ref();
        true
    }

    /// Drop an external reference
    ///
    /// When the external counter reaches zero, `will_drop_last_external_ref`
    /// runs before the total counter is decremented, while the object may
    /// still be referenced internally.
    pub fn release(&self, will_drop_last_external_ref: impl FnOnce()) -> bool {
        if self.external.release() {
            will_drop_last_external_ref();
        }
        self.total.release()
    }

    /// Add an internal reference (total counter only)
    pub fn add_internal_ref(&self) {
        self.total.add_ref();
    }

    /// Add an internal reference if the object is still alive
    pub fn try_add_internal_ref(&self) -> bool {
        self.total.try_add_ref()
    }

    /// Drop an internal reference
    pub fn release_internal(&self) -> bool {
        self.total.release()
    }

    /// Current total count
    pub fn total(&self) -> u64 {
        self.total.count()
    }

    /// Current external count
    pub fn external(&self) -> u64 {
        self.external.count()
    }
}

impl Default for ExternalRefCount {
    fn default() -> Self {
        Self::new()
    }
}
