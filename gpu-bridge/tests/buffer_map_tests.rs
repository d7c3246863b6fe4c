//! Buffer map state machine scenarios

mod common;

use std::sync::{Arc, Mutex};

use common::{Call, FakeBridge};
use gpu_bridge::{
    BridgeError, Buffer, BufferDescriptor, BufferMapState, BufferUsage, CallbackInfo, Device,
    HostCompletions, Instance, MapAsyncStatus, MapMode, Ref,
};
use rstest::rstest;

type MapLog = Arc<Mutex<Vec<(&'static str, MapAsyncStatus, String)>>>;

struct Fixture {
    bridge: Arc<FakeBridge>,
    completions: HostCompletions,
    buffer: Ref<Buffer>,
    device: Ref<Device>,
    instance: Ref<Instance>,
}

fn fixture(usage: BufferUsage, size: u64) -> Fixture {
    let bridge = FakeBridge::new();
    let instance = common::instance(&bridge);
    let completions = HostCompletions::for_instance(&instance);
    let adapter = common::adapter(&instance);
    let device = common::device(&instance, &adapter);
    let buffer = device
        .create_buffer(&BufferDescriptor {
            label: Some("staging".to_string()),
            size,
            usage,
            mapped_at_creation: false,
        })
        .unwrap();

    Fixture {
        bridge,
        completions,
        buffer,
        device,
        instance,
    }
}

fn recorder(
    log: &MapLog,
    name: &'static str,
) -> impl FnOnce(MapAsyncStatus, String) + Send + 'static {
    let sink = Arc::clone(log);
    move |status: MapAsyncStatus, message: String| {
        sink.lock().unwrap().push((name, status, message));
    }
}

fn new_log() -> MapLog {
    Arc::new(Mutex::new(Vec::new()))
}

// ============================================================================
// Pending requests
// ============================================================================

#[test]
fn test_map_while_pending_is_rejected() {
    let fx = fixture(BufferUsage::MAP_READ, 64);
    let log = new_log();

    let first = fx
        .buffer
        .map_async(MapMode::READ, 0, 64, CallbackInfo::spontaneous(recorder(&log, "first")));
    assert_eq!(fx.buffer.map_state(), BufferMapState::Pending);

    let second = fx
        .buffer
        .map_async(MapMode::READ, 0, 64, CallbackInfo::spontaneous(recorder(&log, "second")));
    assert!(!second.is_null());
    assert_eq!(
        *log.lock().unwrap(),
        vec![(
            "second",
            MapAsyncStatus::Error,
            "Buffer already has an outstanding map pending.".to_string()
        )]
    );
    assert_eq!(fx.buffer.map_state(), BufferMapState::Pending);
    assert_eq!(fx.bridge.count(|call| matches!(call, Call::BufferMapAsync { .. })), 1);

    assert!(fx
        .completions
        .map_async_completed(first.id.as_u64(), MapAsyncStatus::Success, None));
    assert_eq!(fx.buffer.map_state(), BufferMapState::Mapped);
    assert_eq!(log.lock().unwrap()[1], ("first", MapAsyncStatus::Success, String::new()));
}

#[test]
fn test_map_while_mapped_is_rejected() {
    let fx = fixture(BufferUsage::MAP_WRITE, 16);
    let log = new_log();

    let first = fx
        .buffer
        .map_async(MapMode::WRITE, 0, 16, CallbackInfo::spontaneous(recorder(&log, "first")));
    fx.completions
        .map_async_completed(first.id.as_u64(), MapAsyncStatus::Success, None);

    fx.buffer
        .map_async(MapMode::WRITE, 0, 16, CallbackInfo::spontaneous(recorder(&log, "again")));

    assert_eq!(
        log.lock().unwrap()[1],
        ("again", MapAsyncStatus::Error, "Buffer is already mapped.".to_string())
    );
    assert_eq!(fx.buffer.map_state(), BufferMapState::Mapped);
}

#[test]
fn test_failed_map_returns_to_unmapped() {
    let fx = fixture(BufferUsage::MAP_READ, 16);
    let log = new_log();

    let future = fx
        .buffer
        .map_async(MapMode::READ, 0, 16, CallbackInfo::spontaneous(recorder(&log, "map")));
    fx.completions.map_async_completed(
        future.id.as_u64(),
        MapAsyncStatus::Error,
        Some("out of memory"),
    );

    assert_eq!(fx.buffer.map_state(), BufferMapState::Unmapped);
    assert_eq!(
        *log.lock().unwrap(),
        vec![("map", MapAsyncStatus::Error, "out of memory".to_string())]
    );
}

// ============================================================================
// Aborts
// ============================================================================

#[test]
fn test_unmap_aborts_pending_map() {
    let fx = fixture(BufferUsage::MAP_READ, 16);
    let log = new_log();

    let future = fx
        .buffer
        .map_async(MapMode::READ, 0, 16, CallbackInfo::spontaneous(recorder(&log, "map")));
    fx.buffer.unmap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![(
            "map",
            MapAsyncStatus::Aborted,
            "Buffer was unmapped before mapping was resolved.".to_string()
        )]
    );
    assert_eq!(fx.buffer.map_state(), BufferMapState::Unmapped);
    assert!(fx.bridge.calls().contains(&Call::BufferUnmap(fx.buffer.id())));

    // The late host answer finds nothing to resolve
    assert!(!fx
        .completions
        .map_async_completed(future.id.as_u64(), MapAsyncStatus::Success, None));
    assert_eq!(log.lock().unwrap().len(), 1);
    assert_eq!(fx.buffer.map_state(), BufferMapState::Unmapped);
}

#[test]
fn test_abort_outranks_late_success() {
    let fx = fixture(BufferUsage::MAP_READ, 16);
    let log = new_log();

    let future = fx
        .buffer
        .map_async(MapMode::READ, 0, 16, CallbackInfo::process_events(recorder(&log, "map")));
    fx.buffer.unmap();
    assert!(fx
        .completions
        .map_async_completed(future.id.as_u64(), MapAsyncStatus::Success, None));

    assert_eq!(fx.instance.process_events(), 1);
    assert_eq!(log.lock().unwrap()[0].1, MapAsyncStatus::Aborted);
    assert_eq!(fx.buffer.map_state(), BufferMapState::Unmapped);
}

#[test]
fn test_destroy_aborts_pending_map_once() {
    let fx = fixture(BufferUsage::MAP_READ, 16);
    let log = new_log();

    fx.buffer
        .map_async(MapMode::READ, 0, 16, CallbackInfo::spontaneous(recorder(&log, "map")));
    fx.buffer.destroy();
    fx.buffer.destroy();

    assert_eq!(
        *log.lock().unwrap(),
        vec![(
            "map",
            MapAsyncStatus::Aborted,
            "Buffer was destroyed before mapping was resolved.".to_string()
        )]
    );
    assert!(fx.buffer.is_destroyed());
    assert_eq!(fx.bridge.count(|call| matches!(call, Call::BufferDestroy(_))), 1);

    fx.buffer
        .map_async(MapMode::READ, 0, 16, CallbackInfo::spontaneous(recorder(&log, "late")));
    assert_eq!(log.lock().unwrap()[1].1, MapAsyncStatus::Error);
}

#[test]
fn test_dropping_buffer_aborts_pending_map() {
    let fx = fixture(BufferUsage::MAP_READ, 16);
    let log = new_log();
    let buffer_id = fx.buffer.id();

    fx.buffer
        .map_async(MapMode::READ, 0, 16, CallbackInfo::spontaneous(recorder(&log, "map")));
    let Fixture { bridge, buffer, .. } = fx;
    drop(buffer);

    assert_eq!(log.lock().unwrap()[0].1, MapAsyncStatus::Aborted);
    assert!(bridge.calls().contains(&Call::BufferDestroy(buffer_id)));
    assert!(bridge.calls().contains(&Call::Release(buffer_id)));
}

#[test]
fn test_instance_drop_cancels_pending_map() {
    let fx = fixture(BufferUsage::MAP_READ, 16);
    let log = new_log();

    fx.buffer
        .map_async(MapMode::READ, 0, 16, CallbackInfo::wait_any_only(recorder(&log, "map")));
    let Fixture { buffer, instance, .. } = fx;
    drop(instance);

    assert_eq!(log.lock().unwrap()[0].1, MapAsyncStatus::CallbackCancelled);
    assert_eq!(buffer.map_state(), BufferMapState::Unmapped);
}

// ============================================================================
// Request validation
// ============================================================================

#[rstest]
#[case::wrong_usage(MapMode::WRITE, 0, 8)]
#[case::empty_mode(MapMode::empty(), 0, 8)]
#[case::both_modes(MapMode::READ | MapMode::WRITE, 0, 8)]
#[case::unaligned_offset(MapMode::READ, 4, 8)]
#[case::unaligned_size(MapMode::READ, 0, 6)]
#[case::past_end(MapMode::READ, 32, 40)]
#[case::overflow(MapMode::READ, u64::MAX - 7, 16)]
fn test_invalid_map_request(#[case] mode: MapMode, #[case] offset: u64, #[case] size: u64) {
    let fx = fixture(BufferUsage::MAP_READ, 64);
    let log = new_log();

    let future = fx
        .buffer
        .map_async(mode, offset, size, CallbackInfo::spontaneous(recorder(&log, "map")));

    assert!(!future.is_null());
    assert_eq!(log.lock().unwrap()[0].1, MapAsyncStatus::Error);
    assert_eq!(fx.buffer.map_state(), BufferMapState::Unmapped);
    assert_eq!(fx.bridge.count(|call| matches!(call, Call::BufferMapAsync { .. })), 0);
}

#[test]
fn test_buffer_creation_validation() {
    let fx = fixture(BufferUsage::MAP_READ, 16);
    let device = &fx.device;

    let both = device.create_buffer(&BufferDescriptor {
        label: None,
        size: 16,
        usage: BufferUsage::MAP_READ | BufferUsage::MAP_WRITE,
        mapped_at_creation: false,
    });
    assert!(matches!(both, Err(BridgeError::Validation(_))));

    let unaligned = device.create_buffer(&BufferDescriptor {
        label: None,
        size: 6,
        usage: BufferUsage::COPY_SRC,
        mapped_at_creation: true,
    });
    assert!(matches!(unaligned, Err(BridgeError::Validation(_))));
}

// ============================================================================
// Mapped ranges
// ============================================================================

#[test]
fn test_write_at_creation_then_read_back() {
    let fx = fixture(BufferUsage::MAP_READ, 16);
    let buffer = fx
        .device
        .create_buffer(&BufferDescriptor {
            label: None,
            size: 16,
            usage: BufferUsage::MAP_READ | BufferUsage::COPY_DST,
            mapped_at_creation: true,
        })
        .unwrap();
    assert_eq!(buffer.map_state(), BufferMapState::Mapped);

    buffer.write_mapped_range(8, &[1, 2, 3, 4]).unwrap();
    assert!(matches!(
        buffer.read_mapped_range(0, &mut [0; 4]),
        Err(BridgeError::Validation(_))
    ));
    buffer.unmap();

    let log = new_log();
    let future = buffer.map_async(
        MapMode::READ,
        8,
        8,
        CallbackInfo::spontaneous(recorder(&log, "map")),
    );
    fx.completions
        .map_async_completed(future.id.as_u64(), MapAsyncStatus::Success, None);

    let mut bytes = [0u8; 4];
    buffer.read_mapped_range(8, &mut bytes).unwrap();
    assert_eq!(bytes, [1, 2, 3, 4]);

    // Outside the mapped window
    assert!(buffer.read_mapped_range(0, &mut bytes).is_err());
    assert!(buffer.write_mapped_range(8, &bytes).is_err());
}

#[test]
fn test_mapped_range_requires_mapping() {
    let fx = fixture(BufferUsage::MAP_WRITE, 16);
    assert!(matches!(
        fx.buffer.write_mapped_range(0, &[0; 4]),
        Err(BridgeError::Validation(_))
    ));
}
