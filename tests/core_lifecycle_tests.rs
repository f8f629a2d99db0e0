//! Tests for the shared worker-core lifecycle, status surface and factory

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use seurat::{
    clear_ring_name, ring_name, spawn_core, BitDepth, CoreConfig, CoreFactory, FrameBuilderCore,
    FrameGeometry, FrameHandle, FrameWrapperCore, RingRegistry, SplitCounterDecoder,
    SuperFrameDecoder, SuperFramePool, SuperFramePoolConfig, SuperFrameView, StatusReport,
    WorkCoreRefs, WorkerCore,
};

fn geometry() -> FrameGeometry {
    FrameGeometry {
        x_resolution: 4,
        y_resolution: 4,
        bit_depth: BitDepth::Depth16,
        subframe_count: 2,
        superframe_header_size: 32,
        subframe_header_size: 8,
    }
}

struct Fixture {
    decoder: Arc<SplitCounterDecoder>,
    rings: Arc<RingRegistry>,
    pool: Arc<SuperFramePool>,
}

fn fixture() -> Fixture {
    let geometry = geometry();
    Fixture {
        decoder: Arc::new(SplitCounterDecoder::new(geometry.clone()).unwrap()),
        rings: Arc::new(RingRegistry::new()),
        pool: Arc::new(
            SuperFramePool::new(
                SuperFramePoolConfig::new("lifecycle_test")
                    .with_buffer_size(geometry.total_buffer_size())
                    .with_num_buffers(8),
            )
            .unwrap(),
        ),
    }
}

fn refs(fixture: &Fixture, config: CoreConfig) -> WorkCoreRefs {
    WorkCoreRefs {
        decoder: fixture.decoder.clone(),
        rings: fixture.rings.clone(),
        pool: fixture.pool.clone(),
        frame_callback: Arc::new(|_: FrameHandle| {}),
        core_config: config,
        core_set: 0,
    }
}

fn builder_config() -> CoreConfig {
    CoreConfig::new("frame_builder", "packet_rx")
}

fn create_required_rings(fixture: &Fixture) {
    fixture
        .rings
        .create_or_lookup(&ring_name("packet_rx", 0, 0), fixture.pool.num_buffers())
        .unwrap();
    fixture
        .rings
        .create_or_lookup(&clear_ring_name(0), fixture.pool.num_buffers())
        .unwrap();
}

fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn test_stop_before_run_is_a_no_op() {
    let fixture = fixture();
    create_required_rings(&fixture);
    let core = FrameBuilderCore::new(0, refs(&fixture, builder_config())).unwrap();

    core.stop();
    core.stop();
    assert!(!core.is_running());
}

#[test]
fn test_connect_fails_without_upstream_ring() {
    let fixture = fixture();
    // Only the clear ring exists; the upstream ring is missing
    fixture
        .rings
        .create_or_lookup(&clear_ring_name(0), fixture.pool.num_buffers())
        .unwrap();
    let core = FrameBuilderCore::new(0, refs(&fixture, builder_config())).unwrap();

    assert!(core.connect().is_err());
    // A failed connect leaves the core non-runnable: run refuses and the
    // core never reports having started
    assert!(core.run(0).is_err());
    assert!(!core.is_running());
    assert_eq!(core.telemetry().frames_processed, 0);
}

#[test]
fn test_connect_fails_without_clear_ring() {
    let fixture = fixture();
    fixture
        .rings
        .create_or_lookup(&ring_name("packet_rx", 0, 0), fixture.pool.num_buffers())
        .unwrap();
    let core = FrameBuilderCore::new(0, refs(&fixture, builder_config())).unwrap();

    assert!(core.connect().is_err());
    assert!(core.run(0).is_err());
    assert!(!core.is_running());
}

#[test]
fn test_wrapper_connect_requires_both_rings() {
    let fixture = fixture();
    let config = CoreConfig::new("frame_wrapper", "frame_builder");
    let core = FrameWrapperCore::new(0, refs(&fixture, config.clone())).unwrap();
    assert!(core.connect().is_err());

    fixture
        .rings
        .create_or_lookup(&ring_name("frame_builder", 0, 0), fixture.pool.num_buffers())
        .unwrap();
    assert!(core.connect().is_err());

    fixture
        .rings
        .create_or_lookup(&clear_ring_name(0), fixture.pool.num_buffers())
        .unwrap();
    assert!(core.connect().is_ok());
}

#[test]
fn test_run_stop_round_trip() {
    let fixture = fixture();
    create_required_rings(&fixture);
    let core: Arc<dyn WorkerCore> =
        Arc::new(FrameBuilderCore::new(0, refs(&fixture, builder_config())).unwrap());
    core.connect().unwrap();

    let handle = spawn_core(core.clone(), 0).unwrap();
    assert!(wait_until(Duration::from_secs(5), || core.is_running()));

    // Idle polling accumulates while no buffers arrive
    assert!(wait_until(Duration::from_secs(5), || core
        .telemetry()
        .idle_loops
        > 0));

    handle.stop();
    assert!(wait_until(Duration::from_secs(5), || !core.is_running()));
}

#[test]
fn test_throughput_published_after_window_closes() {
    let fixture = fixture();
    create_required_rings(&fixture);
    let core: Arc<dyn WorkerCore> =
        Arc::new(FrameBuilderCore::new(0, refs(&fixture, builder_config())).unwrap());
    core.connect().unwrap();

    let upstream = fixture.rings.lookup(&ring_name("packet_rx", 0, 0)).unwrap();
    let handle = spawn_core(core.clone(), 0).unwrap();

    // Feed 5 super-frames inside one telemetry window
    for index in 0..5u64 {
        let slot = fixture.pool.slot(index as usize).unwrap();
        let mut view =
            unsafe { SuperFrameView::from_slot(slot, fixture.pool.buffer_size()) };
        fixture.decoder.set_sequence_number(&mut view, index).unwrap();
        upstream.try_enqueue(slot).unwrap();
    }

    assert!(wait_until(Duration::from_secs(5), || core
        .telemetry()
        .frames_processed
        == 5));
    // The per-second rate appears once the cycle-clock window closes
    assert!(wait_until(Duration::from_secs(3), || core
        .telemetry()
        .frames_per_second
        == 5));

    handle.join().unwrap();
}

#[test]
fn test_status_report_paths() {
    let fixture = fixture();
    create_required_rings(&fixture);
    let core = FrameBuilderCore::new(0, refs(&fixture, builder_config())).unwrap();
    core.connect().unwrap();

    let mut report = StatusReport::new();
    core.status(&mut report, "/fp");

    let base = "/fp/FrameBuilderCore_0/";
    assert!(report.get_param(&format!("{}frames_processed", base)).is_some());
    assert!(report.get_param(&format!("{}idle_loops", base)).is_some());
    assert!(report
        .get_param(&format!("{}timing/mean_frame_us", base))
        .is_some());

    // Ring occupancy and capacity for the connected upstream ring
    let upstream_name = ring_name("packet_rx", 0, 0);
    assert!(report
        .get_param(&format!("{}upstream_rings/{}_count", base, upstream_name))
        .is_some());
    assert!(report
        .get_param(&format!("{}upstream_rings/{}_size", base, upstream_name))
        .is_some());

    // Downstream ring created at construction
    let downstream_name = ring_name("frame_builder", 0, 0);
    assert!(report
        .get_param(&format!(
            "{}downstream_rings/{}_count",
            base, downstream_name
        ))
        .is_some());
}

#[test]
fn test_configure_is_informational_only() {
    let fixture = fixture();
    create_required_rings(&fixture);
    let core = FrameBuilderCore::new(0, refs(&fixture, builder_config())).unwrap();

    // Acknowledged and logged, no observable behavior change
    core.configure(&builder_config().with_num_downstream_cores(7));
    assert!(!core.is_running());
}

#[test]
fn test_factory_builds_registered_kinds() {
    let fixture = fixture();
    create_required_rings(&fixture);
    let factory = CoreFactory::with_default_kinds();

    assert_eq!(
        factory.kinds(),
        vec!["FrameBuilderCore", "FrameWrapperCore"]
    );

    let builder = factory
        .build("FrameBuilderCore", 0, refs(&fixture, builder_config()))
        .unwrap();
    assert_eq!(builder.role(), "FrameBuilderCore");
    assert_eq!(builder.index(), 0);

    let wrapper = factory
        .build(
            "FrameWrapperCore",
            1,
            refs(&fixture, CoreConfig::new("frame_wrapper", "frame_builder")),
        )
        .unwrap();
    assert_eq!(wrapper.role(), "FrameWrapperCore");
    assert_eq!(wrapper.index(), 1);

    assert!(factory
        .build("UnknownCore", 0, refs(&fixture, builder_config()))
        .is_err());
}
