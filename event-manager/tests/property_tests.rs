//! Property-based tests for future tracking and dispatch
//!
//! Each property drives the manager with a generated sequence of events and
//! checks the dispatch guarantees against a recording event type.

use std::any::Any;
use std::sync::{Arc, Mutex};

use gpu_event_manager::prelude::*;
use proptest::prelude::*;
use rstest::rstest;

// ============================================================================
// Test Helpers
// ============================================================================

type Completions = Arc<Mutex<Vec<(FutureId, EventCompletionType)>>>;

/// Event that records its completion and nothing else
struct Recorder {
    instance_id: InstanceId,
    mode: CallbackMode,
    completions: Completions,
}

impl TrackedEvent for Recorder {
    fn kind(&self) -> EventKind {
        EventKind::WorkDone
    }

    fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    fn callback_mode(&self) -> CallbackMode {
        self.mode
    }

    fn complete(self: Box<Self>, future_id: FutureId, completion: EventCompletionType) {
        self.completions.lock().unwrap().push((future_id, completion));
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ReadyEvent for Recorder {
    const KIND: EventKind = EventKind::WorkDone;
    type Ready = ();

    fn ready(&mut self, _: ()) {}
}

fn mode_strategy() -> impl Strategy<Value = CallbackMode> {
    prop_oneof![
        Just(CallbackMode::WaitAnyOnly),
        Just(CallbackMode::AllowProcessEvents),
        Just(CallbackMode::AllowSpontaneous),
    ]
}

/// A generated event: its mode and whether the host reports it ready
fn events_strategy() -> impl Strategy<Value = Vec<(CallbackMode, bool)>> {
    prop::collection::vec((mode_strategy(), any::<bool>()), 0..24)
}

fn track_all(
    manager: &EventManager,
    instance: InstanceId,
    events: &[(CallbackMode, bool)],
    completions: &Completions,
) -> Vec<FutureId> {
    events
        .iter()
        .map(|(mode, _)| {
            manager.track_event(Recorder {
                instance_id: instance,
                mode: *mode,
                completions: Arc::clone(completions),
            })
        })
        .collect()
}

fn count(completions: &Completions, future_id: FutureId) -> usize {
    completions
        .lock()
        .unwrap()
        .iter()
        .filter(|(id, _)| *id == future_id)
        .count()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Future ids issued in sequence are strictly increasing and never null.
    #[test]
    fn prop_future_ids_strictly_increase(n in 1usize..64) {
        let ids: Vec<FutureId> = (0..n).map(|_| FutureId::next()).collect();
        prop_assert!(ids.iter().all(|id| !id.is_null()));
        prop_assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    /// `process_events` completes exactly the ready AllowProcessEvents
    /// futures, in ascending id order, and leaves everything else tracked.
    #[test]
    fn prop_process_events_completes_only_ready(events in events_strategy()) {
        let manager = EventManager::new();
        let instance = InstanceId::next();
        manager.register_instance(instance).unwrap();
        let completions: Completions = Arc::new(Mutex::new(Vec::new()));

        let ids = track_all(&manager, instance, &events, &completions);
        for (id, (_, ready)) in ids.iter().zip(&events) {
            if *ready {
                manager.set_future_ready::<Recorder>(*id, ());
            }
        }
        let spontaneous_done = completions.lock().unwrap().len();

        let expected: Vec<FutureId> = ids
            .iter()
            .zip(&events)
            .filter(|(_, (mode, ready))| *ready && *mode == CallbackMode::AllowProcessEvents)
            .map(|(id, _)| *id)
            .collect();

        prop_assert_eq!(manager.process_events(instance), expected.len());

        let processed: Vec<FutureId> = completions.lock().unwrap()[spontaneous_done..]
            .iter()
            .map(|(id, _)| *id)
            .collect();
        prop_assert_eq!(processed, expected);

        // A second pass finds nothing new
        prop_assert_eq!(manager.process_events(instance), 0);
    }

    /// Every tracked future completes exactly once, whatever mix of host
    /// results, processing and shutdown it goes through.
    #[test]
    fn prop_every_future_completes_exactly_once(
        events in events_strategy(),
        process_first in any::<bool>(),
    ) {
        let manager = EventManager::new();
        let instance = InstanceId::next();
        manager.register_instance(instance).unwrap();
        let completions: Completions = Arc::new(Mutex::new(Vec::new()));

        let ids = track_all(&manager, instance, &events, &completions);
        for (id, (_, ready)) in ids.iter().zip(&events) {
            if *ready {
                manager.set_future_ready::<Recorder>(*id, ());
            }
        }
        if process_first {
            manager.process_events(instance);
        }
        manager.unregister_instance(instance);
        manager.unregister_instance(instance);

        for id in &ids {
            prop_assert_eq!(count(&completions, *id), 1);
        }
        prop_assert_eq!(manager.pending_count(), 0);
    }

    /// Shutdown completes leftover futures in ascending id order.
    #[test]
    fn prop_shutdown_order_ascending(events in events_strategy()) {
        let manager = EventManager::new();
        let instance = InstanceId::next();
        manager.register_instance(instance).unwrap();
        let completions: Completions = Arc::new(Mutex::new(Vec::new()));

        track_all(&manager, instance, &events, &completions);
        manager.unregister_instance(instance);

        let shutdown: Vec<FutureId> = completions
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, completion)| *completion == EventCompletionType::Shutdown)
            .map(|(id, _)| *id)
            .collect();
        prop_assert_eq!(shutdown.len(), events.len());
        prop_assert!(shutdown.windows(2).all(|pair| pair[0] < pair[1]));
    }

    /// A zero-timeout wait reports exactly the ready or untracked slots.
    #[test]
    fn prop_poll_reports_ready_slots(events in events_strategy()) {
        let manager = EventManager::new();
        let instance = InstanceId::next();
        manager.register_instance(instance).unwrap();
        let completions: Completions = Arc::new(Mutex::new(Vec::new()));

        let ids = track_all(&manager, instance, &events, &completions);
        for (id, (_, ready)) in ids.iter().zip(&events) {
            if *ready {
                manager.set_future_ready::<Recorder>(*id, ());
            }
        }

        let mut infos: Vec<FutureWaitInfo> =
            ids.iter().map(|id| FutureWaitInfo::new((*id).into())).collect();
        let status = manager.wait_any(instance, &mut infos, 0, None);

        let any_ready = events.iter().any(|(_, ready)| *ready);
        let expected_status = if events.is_empty() || any_ready {
            WaitStatus::Success
        } else {
            WaitStatus::TimedOut
        };
        prop_assert_eq!(status, expected_status);

        for (info, (_, ready)) in infos.iter().zip(&events) {
            prop_assert_eq!(info.completed, *ready);
        }
    }
}

// ============================================================================
// Callback mode parsing
// ============================================================================

#[rstest]
#[case(1, CallbackMode::WaitAnyOnly)]
#[case(2, CallbackMode::AllowProcessEvents)]
#[case(3, CallbackMode::AllowSpontaneous)]
fn test_callback_mode_from_raw(#[case] raw: u32, #[case] expected: CallbackMode) {
    assert_eq!(CallbackMode::try_from(raw), Ok(expected));
    assert_eq!(expected.as_raw(), raw);
}

#[rstest]
#[case(0)]
#[case(4)]
#[case(u32::MAX)]
fn test_callback_mode_rejects_unknown(#[case] raw: u32) {
    assert_eq!(
        CallbackMode::try_from(raw),
        Err(EventManagerError::InvalidCallbackMode(raw))
    );
}

#[rstest]
#[case(CallbackMode::WaitAnyOnly, 0)]
#[case(CallbackMode::AllowProcessEvents, 1)]
#[case(CallbackMode::AllowSpontaneous, 0)]
fn test_process_events_by_mode(#[case] mode: CallbackMode, #[case] expected: usize) {
    let manager = EventManager::new();
    let instance = InstanceId::next();
    manager.register_instance(instance).unwrap();
    let completions: Completions = Arc::new(Mutex::new(Vec::new()));

    let id = manager.track_event(Recorder {
        instance_id: instance,
        mode,
        completions: Arc::clone(&completions),
    });
    manager.set_future_ready::<Recorder>(id, ());

    assert_eq!(manager.process_events(instance), expected);
    assert_eq!(manager.is_ready(id).is_none(), mode != CallbackMode::WaitAnyOnly);
}
