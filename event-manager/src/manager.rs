//! Thread-safe future registry
//!
//! Maps future ids to their tracked events and instances to the futures they
//! own. One mutex guards both tables. User callbacks never run while it is
//! held: every path collects the events it is about to complete, drops the
//! lock, then completes them, so a callback may freely issue new requests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace, warn};

use crate::error::{EventManagerError, Result};
use crate::event::{EventKind, ReadyEvent, TrackedEvent};
use crate::ids::{CallbackMode, EventCompletionType, FutureId, InstanceId};
use crate::wait::{timeout_from_nanos, FutureWaitInfo, Suspender, WaitStatus};

/// A tracked event plus the attributes the manager dispatches on
struct EventEntry {
    kind: EventKind,
    instance_id: InstanceId,
    mode: CallbackMode,
    ready: bool,
    event: Box<dyn TrackedEvent>,
}

impl EventEntry {
    fn complete(self, future_id: FutureId, completion: EventCompletionType) {
        debug!(
            future_id = %future_id,
            kind = %self.kind,
            completion = ?completion,
            "Completing event"
        );
        self.event.complete(future_id, completion);
    }
}

#[derive(Default)]
struct State {
    /// Pending and ready events, ordered by issuance
    events: BTreeMap<FutureId, EventEntry>,

    /// Futures owned by each registered instance
    instances: HashMap<InstanceId, BTreeSet<FutureId>>,
}

impl State {
    /// Remove an event from the table and from its instance's membership set
    fn take(&mut self, future_id: FutureId) -> Option<EventEntry> {
        let entry = self.events.remove(&future_id)?;
        if let Some(members) = self.instances.get_mut(&entry.instance_id) {
            members.remove(&future_id);
        }
        Some(entry)
    }

    /// Whether a future is ready or no longer tracked
    fn is_settled(&self, future_id: FutureId) -> bool {
        self.events.get(&future_id).map_or(true, |entry| entry.ready)
    }
}

/// Process-wide registry of in-flight futures
///
/// # Example
///
/// ```rust,ignore
/// let manager = Arc::new(EventManager::new());
/// let instance = InstanceId::next();
/// manager.register_instance(instance)?;
///
/// let future_id = manager.track_event(WorkDoneEvent::new(instance, mode, callback));
/// // ... later, on any thread:
/// manager.set_future_ready::<WorkDoneEvent>(future_id, QueueWorkDoneStatus::Success);
///
/// // Resolve queued non-spontaneous events
/// manager.process_events(instance);
///
/// // Force-complete whatever is left with Shutdown
/// manager.unregister_instance(instance);
/// ```
pub struct EventManager {
    state: Mutex<State>,

    /// Signalled whenever a future becomes ready or leaves the table
    settled: Condvar,
}

impl EventManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            settled: Condvar::new(),
        }
    }

    /// Start tracking futures for an instance
    pub fn register_instance(&self, instance_id: InstanceId) -> Result<()> {
        if instance_id.is_null() {
            return Err(EventManagerError::NullInstance);
        }

        let mut state = self.state.lock();
        if state.instances.contains_key(&instance_id) {
            return Err(EventManagerError::InstanceAlreadyRegistered(instance_id));
        }
        state.instances.insert(instance_id, BTreeSet::new());

        debug!(instance_id = %instance_id, "Registered instance");
        Ok(())
    }

    /// Stop tracking an instance, completing its pending futures with `Shutdown`
    ///
    /// Futures are completed in ascending id order before this returns. Returns
    /// the number of futures completed. Unregistering an unknown instance is a
    /// no-op.
    pub fn unregister_instance(&self, instance_id: InstanceId) -> usize {
        let pending: Vec<(FutureId, EventEntry)> = {
            let mut state = self.state.lock();
            let Some(members) = state.instances.remove(&instance_id) else {
                trace!(instance_id = %instance_id, "Unregister of unknown instance ignored");
                return 0;
            };
            members
                .into_iter()
                .filter_map(|future_id| {
                    state
                        .events
                        .remove(&future_id)
                        .map(|entry| (future_id, entry))
                })
                .collect()
        };
        self.settled.notify_all();

        let count = pending.len();
        debug!(
            instance_id = %instance_id,
            pending = count,
            "Unregistered instance, shutting down pending futures"
        );

        for (future_id, entry) in pending {
            entry.complete(future_id, EventCompletionType::Shutdown);
        }
        count
    }

    /// Whether an instance is currently registered
    pub fn is_registered(&self, instance_id: InstanceId) -> bool {
        self.state.lock().instances.contains_key(&instance_id)
    }

    /// Track a new event and return its future id
    ///
    /// If the owning instance is no longer registered the event is completed
    /// with `Shutdown` right away; the returned id is still valid (and
    /// already resolved). Events owned by the null instance are tracked
    /// without instance membership.
    pub fn track_event<E: TrackedEvent>(&self, event: E) -> FutureId {
        self.track_boxed(Box::new(event))
    }

    /// Track an already boxed event
    pub fn track_boxed(&self, event: Box<dyn TrackedEvent>) -> FutureId {
        let future_id = FutureId::next();
        let entry = EventEntry {
            kind: event.kind(),
            instance_id: event.instance_id(),
            mode: event.callback_mode(),
            ready: false,
            event,
        };

        let mut state = self.state.lock();
        let tracked = entry.instance_id.is_null()
            || match state.instances.get_mut(&entry.instance_id) {
                Some(members) => members.insert(future_id),
                None => false,
            };
        if !tracked {
            drop(state);
            debug!(
                future_id = %future_id,
                instance_id = %entry.instance_id,
                "Instance already unregistered, completing new event with Shutdown"
            );
            entry.complete(future_id, EventCompletionType::Shutdown);
            return future_id;
        }

        trace!(
            future_id = %future_id,
            kind = %entry.kind,
            mode = %entry.mode,
            "Tracking event"
        );
        state.events.insert(future_id, entry);
        future_id
    }

    /// Deliver a host result to a future
    ///
    /// Runs the event's ready hook under the lock and marks it ready.
    /// Spontaneous events are then removed and completed on this thread after
    /// the lock is released. Returns whether the result was delivered;
    /// unknown or already completed futures are ignored.
    pub fn set_future_ready<E: ReadyEvent>(&self, future_id: FutureId, result: E::Ready) -> bool {
        let spontaneous = {
            let mut state = self.state.lock();
            let Some(entry) = state.events.get_mut(&future_id) else {
                trace!(future_id = %future_id, "Result for unknown or completed future ignored");
                return false;
            };

            if entry.kind != E::KIND {
                let mismatch = EventManagerError::KindMismatch {
                    future_id,
                    expected: E::KIND,
                    actual: entry.kind,
                };
                error!("{}", mismatch);
                debug_assert!(false, "{}", mismatch);
                return false;
            }

            let Some(event) = entry.event.as_any_mut().downcast_mut::<E>() else {
                error!(future_id = %future_id, kind = %E::KIND, "Event type does not match its kind tag");
                debug_assert!(false, "event type does not match its kind tag");
                return false;
            };
            event.ready(result);
            entry.ready = true;

            if entry.mode.is_spontaneous() {
                state.take(future_id)
            } else {
                None
            }
        };
        self.settled.notify_all();

        match spontaneous {
            Some(entry) => entry.complete(future_id, EventCompletionType::Ready),
            None => trace!(future_id = %future_id, "Future ready, queued for dispatch"),
        }
        true
    }

    /// Complete every ready `AllowProcessEvents` future of an instance
    ///
    /// Completions run in ascending future id order. Returns the number of
    /// futures completed.
    pub fn process_events(&self, instance_id: InstanceId) -> usize {
        let ready: Vec<(FutureId, EventEntry)> = {
            let mut state = self.state.lock();
            let State { events, instances } = &mut *state;
            let Some(members) = instances.get_mut(&instance_id) else {
                return 0;
            };

            let ready_ids: Vec<FutureId> = members
                .iter()
                .copied()
                .filter(|future_id| {
                    events.get(future_id).map_or(false, |entry| {
                        entry.ready && entry.mode == CallbackMode::AllowProcessEvents
                    })
                })
                .collect();

            ready_ids
                .into_iter()
                .filter_map(|future_id| {
                    members.remove(&future_id);
                    events.remove(&future_id).map(|entry| (future_id, entry))
                })
                .collect()
        };

        let count = ready.len();
        if count > 0 {
            debug!(instance_id = %instance_id, count, "Processing ready events");
        }
        for (future_id, entry) in ready {
            entry.complete(future_id, EventCompletionType::Ready);
        }
        count
    }

    /// Wait for any of `infos` to complete
    ///
    /// With a zero timeout this polls: every slot whose future is ready or no
    /// longer tracked is marked completed, the ready events are completed in
    /// ascending id order, and the result is `Success` if any slot completed.
    /// Null futures never complete.
    ///
    /// With a positive timeout the poll runs first; if nothing completed the
    /// `suspender` parks the thread until one future settles. A positive
    /// timeout without a suspender is an `Error`. `WAIT_FOREVER_NANOS` waits
    /// without deadline.
    pub fn wait_any(
        &self,
        instance_id: InstanceId,
        infos: &mut [FutureWaitInfo],
        timeout_ns: u64,
        suspender: Option<&dyn Suspender>,
    ) -> WaitStatus {
        if infos.is_empty() {
            return WaitStatus::Success;
        }

        if timeout_ns > 0 && suspender.is_none() {
            warn!(instance_id = %instance_id, "Timed wait requested without a suspender");
            return WaitStatus::Error;
        }

        if self.poll(infos) {
            return WaitStatus::Success;
        }

        let Some(suspender) = suspender else {
            return WaitStatus::TimedOut;
        };

        let futures: Vec<FutureId> = infos
            .iter()
            .map(|info| info.future.id)
            .filter(|id| !id.is_null())
            .collect();
        if futures.is_empty() {
            return WaitStatus::TimedOut;
        }
        trace!(
            instance_id = %instance_id,
            count = futures.len(),
            timeout_ns,
            "Suspending for timed wait"
        );

        let Some(woken) = suspender.wait_any(&futures, timeout_from_nanos(timeout_ns)) else {
            return WaitStatus::TimedOut;
        };

        let entry = {
            let mut state = self.state.lock();
            if !state.is_settled(woken) {
                warn!(future_id = %woken, "Suspender woke on a future that is not ready");
                return WaitStatus::TimedOut;
            }
            state.take(woken)
        };

        for info in infos.iter_mut() {
            if info.future.id == woken {
                info.completed = true;
            }
        }
        if let Some(entry) = entry {
            entry.complete(woken, EventCompletionType::Ready);
        }
        WaitStatus::Success
    }

    /// Zero-timeout pass of `wait_any`
    fn poll(&self, infos: &mut [FutureWaitInfo]) -> bool {
        let ready: BTreeMap<FutureId, EventEntry> = {
            let mut state = self.state.lock();
            let mut ready = BTreeMap::new();
            for info in infos.iter_mut() {
                let future_id = info.future.id;
                if future_id.is_null() {
                    info.completed = false;
                    continue;
                }
                info.completed = match state.events.get(&future_id).map(|entry| entry.ready) {
                    None => true,
                    Some(true) => {
                        if let Some(entry) = state.take(future_id) {
                            ready.insert(future_id, entry);
                        }
                        true
                    }
                    Some(false) => false,
                };
            }
            ready
        };

        for (future_id, entry) in ready {
            entry.complete(future_id, EventCompletionType::Ready);
        }
        infos.iter().any(|info| info.completed)
    }

    /// A suspender that parks on this manager's own wake-up signal
    pub fn suspender(self: &Arc<Self>) -> Arc<dyn Suspender> {
        Arc::new(CondvarSuspender {
            manager: Arc::clone(self),
        })
    }

    /// Number of tracked (not yet completed) futures
    pub fn pending_count(&self) -> usize {
        self.state.lock().events.len()
    }

    /// Number of tracked futures owned by an instance
    pub fn instance_pending_count(&self, instance_id: InstanceId) -> usize {
        self.state
            .lock()
            .instances
            .get(&instance_id)
            .map_or(0, |members| members.len())
    }

    /// Whether a future is ready (`None` if it is not tracked)
    pub fn is_ready(&self, future_id: FutureId) -> Option<bool> {
        self.state
            .lock()
            .events
            .get(&future_id)
            .map(|entry| entry.ready)
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventManager {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.events.is_empty() {
            warn!(
                pending = state.events.len(),
                "EventManager dropped with pending futures"
            );
        }
    }
}

/// `Suspender` backed by the manager's condition variable
struct CondvarSuspender {
    manager: Arc<EventManager>,
}

impl Suspender for CondvarSuspender {
    fn wait_any(&self, futures: &[FutureId], timeout: Option<Duration>) -> Option<FutureId> {
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let mut state = self.manager.state.lock();
        loop {
            if let Some(settled) = futures.iter().copied().find(|id| state.is_settled(*id)) {
                return Some(settled);
            }

            match deadline {
                Some(deadline) => {
                    if self
                        .manager
                        .settled
                        .wait_until(&mut state, deadline)
                        .timed_out()
                    {
                        return futures.iter().copied().find(|id| state.is_settled(*id));
                    }
                }
                None => self.manager.settled.wait(&mut state),
            }
        }
    }
}
