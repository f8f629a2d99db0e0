//! End-to-end readout pipeline demo
//!
//! Wires a synthetic packet feeder, one frame builder core and one frame
//! wrapper core together through named rings, runs the pipeline for a couple
//! of seconds and prints the status report.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use seurat::{
    clear_ring_name, ring_name, spawn_core, BitDepth, CoreConfig, CoreFactory, FrameGeometry,
    FrameHandle, RingRegistry, SplitCounterDecoder, StatusReport, SuperFrameDecoder,
    SuperFramePool, SuperFramePoolConfig, SuperFrameView, WorkCoreRefs,
};

fn main() -> seurat::Result<()> {
    env_logger::init();

    let geometry = FrameGeometry {
        x_resolution: 16,
        y_resolution: 16,
        bit_depth: BitDepth::Depth16,
        subframe_count: 8,
        superframe_header_size: 64,
        subframe_header_size: 16,
    };
    let decoder = Arc::new(SplitCounterDecoder::new(geometry.clone())?);

    let pool = Arc::new(SuperFramePool::new(
        SuperFramePoolConfig::new("demo_pool")
            .with_buffer_size(geometry.total_buffer_size())
            .with_num_buffers(64),
    )?);

    // Shared channel namespace for this execution-core-set
    let rings = Arc::new(RingRegistry::new());
    let packet_ring = rings.create_or_lookup(&ring_name("packet_rx", 0, 0), pool.num_buffers())?;
    let clear_ring = rings.create_or_lookup(&clear_ring_name(0), pool.num_buffers())?;

    // All slots start out available to the synthetic packet layer
    pool.seed_ring(&clear_ring)?;

    // Downstream chain: count frames and release the views immediately
    let frames_seen = Arc::new(AtomicU64::new(0));
    let callback_counter = frames_seen.clone();
    let refs = |config: CoreConfig| WorkCoreRefs {
        decoder: decoder.clone(),
        rings: rings.clone(),
        pool: pool.clone(),
        frame_callback: {
            let counter = callback_counter.clone();
            Arc::new(move |frame: FrameHandle| {
                counter.fetch_add(1, Ordering::Relaxed);
                drop(frame);
            })
        },
        core_config: config,
        core_set: 0,
    };

    let factory = CoreFactory::with_default_kinds();
    let builder = factory.build(
        "FrameBuilderCore",
        0,
        refs(CoreConfig::new("frame_builder", "packet_rx")),
    )?;
    let wrapper = factory.build(
        "FrameWrapperCore",
        0,
        refs(CoreConfig::new("frame_wrapper", "frame_builder")),
    )?;

    builder.connect()?;
    wrapper.connect()?;

    let builder_handle = spawn_core(builder.clone(), 1)?;
    let wrapper_handle = spawn_core(wrapper.clone(), 2)?;

    // Synthetic packet layer: recycle slots from the clear ring, stamp a
    // sequence number and a ramp pattern, hand them to the builder
    let feeder = {
        let decoder = decoder.clone();
        let pool = pool.clone();
        let packet_ring = packet_ring.clone();
        let clear_ring = clear_ring.clone();
        let geometry = geometry.clone();
        thread::spawn(move || {
            let mut sequence: u64 = 0;
            while sequence < 10_000 {
                let Some(slot) = clear_ring.try_dequeue() else {
                    thread::yield_now();
                    continue;
                };

                let mut view = unsafe { SuperFrameView::from_slot(slot, pool.buffer_size()) };
                decoder.set_sequence_number(&mut view, sequence).unwrap();
                let pixels = geometry.pixels_per_subframe() * geometry.subframe_count;
                let raw = view
                    .pixels_u16_mut(geometry.raw_data_offset(), pixels)
                    .unwrap();
                for (index, sample) in raw.iter_mut().enumerate() {
                    *sample = (sequence as u16).wrapping_add(index as u16);
                }

                packet_ring.try_enqueue(slot).unwrap();
                sequence += 1;
            }
        })
    };

    feeder.join().expect("feeder thread panicked");
    thread::sleep(Duration::from_secs(2));

    let mut report = StatusReport::new();
    builder.status(&mut report, "/pipeline");
    wrapper.status(&mut report, "/pipeline");
    println!(
        "{}",
        serde_json::to_string_pretty(&report.to_json()).unwrap()
    );
    println!("frames dispatched to the chain: {}", frames_seen.load(Ordering::Relaxed));

    builder_handle.join()?;
    wrapper_handle.join()?;
    Ok(())
}
