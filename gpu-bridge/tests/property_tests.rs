//! Property-based tests for future resolution through the object API
//!
//! Generated operation sequences drive real handles against the recording
//! host; each property checks a resolution guarantee once the sequence and
//! the instance teardown have run.

mod common;

use std::sync::{Arc, Mutex};

use common::FakeBridge;
use gpu_bridge::{
    BufferMapState, CallbackInfo, Future, HostCompletions, MapAsyncStatus, MapMode,
    QueueWorkDoneStatus,
};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum MapOp {
    Map,
    Unmap,
    Destroy,
    /// Host answers the most recent request
    Answer(bool),
}

fn map_op_strategy() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        4 => Just(MapOp::Map),
        2 => Just(MapOp::Unmap),
        1 => Just(MapOp::Destroy),
        3 => any::<bool>().prop_map(MapOp::Answer),
    ]
}

type Resolutions = Arc<Mutex<Vec<(usize, MapAsyncStatus)>>>;

// ============================================================================
// Property: every map request resolves exactly once
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Whatever the interleaving of map, unmap, destroy and host answers,
    /// each issued map future resolves exactly once by the time the
    /// instance is gone.
    #[test]
    fn prop_map_requests_resolve_exactly_once(ops in prop::collection::vec(map_op_strategy(), 1..32)) {
        let bridge = FakeBridge::new();
        let instance = common::instance(&bridge);
        let completions = HostCompletions::for_instance(&instance);
        let adapter = common::adapter(&instance);
        let device = common::device(&instance, &adapter);
        let buffer = common::map_read_buffer(&device, 64);

        let resolutions: Resolutions = Arc::new(Mutex::new(Vec::new()));
        let mut issued: Vec<Future> = Vec::new();

        for op in ops {
            match op {
                MapOp::Map => {
                    let index = issued.len();
                    let was_unmapped =
                        buffer.map_state() == BufferMapState::Unmapped && !buffer.is_destroyed();
                    let sink = Arc::clone(&resolutions);
                    let future = buffer.map_async(
                        MapMode::READ,
                        0,
                        64,
                        CallbackInfo::spontaneous(move |status: MapAsyncStatus, _: String| {
                            sink.lock().unwrap().push((index, status));
                        }),
                    );
                    issued.push(future);

                    if was_unmapped {
                        prop_assert_eq!(buffer.map_state(), BufferMapState::Pending);
                    } else {
                        // Rejected requests resolve inline
                        let resolved = resolutions.lock().unwrap();
                        prop_assert!(resolved.contains(&(index, MapAsyncStatus::Error)));
                    }
                }
                MapOp::Unmap => {
                    buffer.unmap();
                    prop_assert_eq!(buffer.map_state(), BufferMapState::Unmapped);
                }
                MapOp::Destroy => {
                    buffer.destroy();
                    prop_assert!(buffer.is_destroyed());
                }
                MapOp::Answer(success) => {
                    if let Some(future) = issued.last() {
                        let status = if success { MapAsyncStatus::Success } else { MapAsyncStatus::Error };
                        completions.map_async_completed(future.id.as_u64(), status, None);
                    }
                }
            }

            let pending = buffer.map_state() == BufferMapState::Pending;
            let outstanding = issued.len() - resolutions.lock().unwrap().len();
            prop_assert_eq!(pending, outstanding == 1);
            prop_assert!(outstanding <= 1);
        }

        drop(instance);

        let resolved = resolutions.lock().unwrap();
        prop_assert_eq!(resolved.len(), issued.len());
        let mut indices: Vec<usize> = resolved.iter().map(|(index, _)| *index).collect();
        indices.sort_unstable();
        prop_assert_eq!(indices, (0..issued.len()).collect::<Vec<_>>());
    }
}

// ============================================================================
// Property: process_events runs exactly the reported futures
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// `process_events` runs the reported work-done callbacks in issue
    /// order; the instance drop cancels the rest.
    #[test]
    fn prop_process_events_then_shutdown(reported in prop::collection::vec(any::<bool>(), 0..16)) {
        let bridge = FakeBridge::new();
        let instance = common::instance(&bridge);
        let completions = HostCompletions::for_instance(&instance);
        let adapter = common::adapter(&instance);
        let queue = common::device(&instance, &adapter).queue();

        let log = Arc::new(Mutex::new(Vec::new()));
        let futures: Vec<Future> = (0..reported.len())
            .map(|index| {
                let sink = Arc::clone(&log);
                queue.on_submitted_work_done(CallbackInfo::process_events(
                    move |status: QueueWorkDoneStatus, _: String| {
                        sink.lock().unwrap().push((index, status));
                    },
                ))
            })
            .collect();

        // Report in reverse to show ordering follows issue order
        for (future, _) in futures.iter().zip(&reported).rev().filter(|(_, report)| **report) {
            completions.work_done_completed(future.id.as_u64(), QueueWorkDoneStatus::Success, None);
        }

        let expected_ready: Vec<(usize, QueueWorkDoneStatus)> = reported
            .iter()
            .enumerate()
            .filter(|(_, report)| **report)
            .map(|(index, _)| (index, QueueWorkDoneStatus::Success))
            .collect();
        prop_assert_eq!(instance.process_events(), expected_ready.len());
        prop_assert_eq!(&*log.lock().unwrap(), &expected_ready);

        drop(instance);

        let log = log.lock().unwrap();
        prop_assert_eq!(log.len(), reported.len());
        for (index, status) in log.iter().skip(expected_ready.len()) {
            prop_assert!(!reported[*index]);
            prop_assert_eq!(*status, QueueWorkDoneStatus::CallbackCancelled);
        }
    }
}
