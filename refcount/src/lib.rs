//! Two-tier reference counting
//!
//! Explicit reference counts for objects shared between an API surface and
//! an engine that completes work on their behalf.
//!
//! # Features
//!
//! - **Total count**: the object's raw lifetime; reaching zero runs
//!   `RefCounted::on_last_ref_released` exactly once
//! - **External count**: optional tally of API-visible owners; reaching zero
//!   runs `RefCounted::will_drop_last_external_ref` while internal references
//!   may still keep the object alive
//! - **Typed handles**: `Ref<T>` (external owner), `InternalRef<T>` (engine
//!   owner), `WeakRef<T>` (non-owning)
//!
//! # Quick Start
//!
//! ```rust
//! use refcount::{Counts, ExternalRefCount, Ref, RefCounted};
//!
//! struct Buffer {
//!     refs: ExternalRefCount,
//! }
//!
//! impl RefCounted for Buffer {
//!     fn counts(&self) -> Counts<'_> {
//!         Counts::WithExternal(&self.refs)
//!     }
//!
//!     fn will_drop_last_external_ref(&self) {
//!         // Abort outstanding work while internal owners may still exist.
//!     }
//! }
//!
//! let buffer = Ref::new(Buffer { refs: ExternalRefCount::new() });
//! let held_by_engine = Ref::to_internal(&buffer);
//!
//! drop(buffer); // hook runs here
//! drop(held_by_engine); // object dies here
//! ```
//!
//! # Architecture
//!
//! ```text
//! Ref<T> ──────┐
//!              ├── Arc<T> (memory)
//! InternalRef<T>┘     │
//!                     └── T::counts()
//!                           ├── Single(&RefCount)
//!                           └── WithExternal(&ExternalRefCount)
//!                                  ├── total
//!                                  └── external
//! ```

// Modules
pub mod count;
pub mod handle;
pub mod traits;

// Re-exports - Public API
pub use count::{ExternalRefCount, RefCount};
pub use handle::{InternalRef, Ref, WeakRef};
pub use traits::{Counts, RefCounted};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::count::{ExternalRefCount, RefCount};
    pub use crate::handle::{InternalRef, Ref, WeakRef};
    pub use crate::traits::{Counts, RefCounted};
}
