//! # GPU Bridge Event Manager
//!
//! Thread-safe tracking of asynchronous operations ("futures") and dispatch
//! of their completions under three callback modes.
//!
//! ## Overview
//!
//! Every asynchronous request issued through the bridge gets a `FutureId` and
//! one tracked event. The host reports results later, from any thread; the
//! manager stores them and decides when the user callback runs:
//!
//! - **AllowSpontaneous**: immediately, on the reporting thread
//! - **AllowProcessEvents**: on the next `process_events` for the owning instance
//! - **WaitAnyOnly**: only when a `wait_any` observes the future
//!
//! When an instance goes away every future it still owns is completed with
//! `EventCompletionType::Shutdown`, so each callback fires exactly once.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gpu_event_manager::prelude::*;
//!
//! let manager = Arc::new(EventManager::new());
//! let instance = InstanceId::next();
//! manager.register_instance(instance)?;
//!
//! let future_id = manager.track_event(my_event);
//!
//! // Host side, any thread
//! manager.set_future_ready::<MyEvent>(future_id, result);
//!
//! // User side
//! let mut infos = [FutureWaitInfo::new(future_id.into())];
//! let suspender = manager.suspender();
//! manager.wait_any(instance, &mut infos, WAIT_FOREVER_NANOS, Some(suspender.as_ref()));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! track_event ──► ┌──────────────────────────────┐
//!                 │ Mutex<State>                 │
//! set_future_ready│   events:    future → entry  │──► complete() outside lock
//!            ──►  │   instances: instance → {ids}│
//!                 └──────────────┬───────────────┘
//!                                │ Condvar (settled)
//!                                ▼
//!                       CondvarSuspender (timed wait_any)
//! ```

pub mod error;
pub mod event;
pub mod ids;
pub mod manager;
pub mod wait;

// Re-export main types for convenience
pub use error::{EventManagerError, Result};
pub use event::{EventKind, ReadyEvent, TrackedEvent};
pub use ids::{CallbackMode, EventCompletionType, Future, FutureId, InstanceId};
pub use manager::EventManager;
pub use wait::{FutureWaitInfo, Suspender, WaitStatus, WAIT_FOREVER_NANOS};

/// Prelude module for convenient imports
///
/// ```rust
/// use gpu_event_manager::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CallbackMode, EventCompletionType, EventKind, EventManager, EventManagerError, Future,
        FutureId, FutureWaitInfo, InstanceId, ReadyEvent, Result, Suspender, TrackedEvent,
        WaitStatus, WAIT_FOREVER_NANOS,
    };
}
