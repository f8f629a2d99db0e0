//! Frame wrapper core: zero-copy frame view construction and dispatch

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use log::{debug, error, info};

use crate::{
    buffers::SuperFramePool,
    error::{Result, SeuratError},
    frames::{Compression, FrameCallback, FrameMetadata, SharedBufferFrame},
    rings::{clear_ring_name, ring_name, RingChannel, RingRegistry},
    superframe::{SuperFrameDecoder, SuperFrameView},
};

use super::{
    config::CoreConfig,
    status::StatusReport,
    telemetry::{CoreTelemetry, CycleClock, TelemetrySnapshot, TelemetryWindow},
    WorkCoreRefs, WorkerCore,
};

/// Ring handles resolved at connect time
#[derive(Clone)]
struct WrapperRings {
    upstream: Arc<RingChannel>,
    clear: Arc<RingChannel>,
}

/// Worker core converting processed super-frame buffers into
/// downstream-consumable frame views.
///
/// Each dequeued buffer yields two zero-copy views over the same slot: a
/// "raw" view that does not own buffer release, dispatched first, and a
/// "built" view that carries the clear-buffers ring and returns the slot for
/// reuse once the downstream chain drops it. Exactly one of the two views
/// owns release; duplicating ownership would double-release the slot and
/// corrupt the pool.
pub struct FrameWrapperCore {
    proc_idx: usize,
    core_set: u32,
    config: CoreConfig,
    decoder: Arc<dyn SuperFrameDecoder>,
    rings: Arc<RingRegistry>,
    pool: Arc<SuperFramePool>,
    frame_callback: FrameCallback,
    connections: Mutex<Option<WrapperRings>>,
    telemetry: CoreTelemetry,
    run_flag: AtomicBool,
    lcore_id: AtomicUsize,
}

impl FrameWrapperCore {
    /// Kind identifier used for factory registration and status paths
    pub const KIND: &'static str = "FrameWrapperCore";

    /// Create a wrapper core
    pub fn new(proc_idx: usize, refs: WorkCoreRefs) -> Result<Self> {
        let WorkCoreRefs {
            decoder,
            rings,
            pool,
            frame_callback,
            core_config: config,
            core_set,
        } = refs;

        config.validate()?;
        let geometry = decoder.geometry();
        geometry.validate()?;

        if pool.buffer_size() < geometry.total_buffer_size() {
            return Err(SeuratError::insufficient_space(
                geometry.total_buffer_size(),
                pool.buffer_size(),
            ));
        }

        info!(
            "{} {} created with config: core_name: {} | num_cores: {} | connect: {} | \
             upstream_core: {} | num_downstream_cores: {}",
            Self::KIND,
            proc_idx,
            config.core_name,
            config.num_cores,
            config.connect,
            config.upstream_core,
            config.num_downstream_cores
        );

        Ok(Self {
            proc_idx,
            core_set,
            config,
            decoder,
            rings,
            pool,
            frame_callback,
            connections: Mutex::new(None),
            telemetry: CoreTelemetry::default(),
            run_flag: AtomicBool::new(false),
            lcore_id: AtomicUsize::new(0),
        })
    }

    fn poll_loop(&self, rings: &WrapperRings) -> Result<()> {
        let geometry = self.decoder.geometry().clone();
        let buffer_size = self.pool.buffer_size();
        let raw_offset = self.decoder.raw_data_offset();
        let built_offset = self.decoder.built_data_offset();
        let dimensions = geometry.dimensions();
        let image_size = geometry.raw_data_size();

        let clock = CycleClock::calibrate();
        let mut window = TelemetryWindow::new(&clock, CycleClock::cycles());

        while self.run_flag.load(Ordering::Acquire) {
            let now = CycleClock::cycles();
            window.maybe_publish(now, &self.telemetry);

            let slot = match rings.upstream.try_dequeue() {
                Some(slot) => slot,
                None => {
                    self.telemetry.record_idle();
                    continue;
                }
            };

            let start_cycles = CycleClock::cycles();

            // Safety: the ring hand-off granted exclusive ownership of the
            // slot, and construction verified it holds a full super-frame
            let mut view = unsafe { SuperFrameView::from_slot(slot, buffer_size) };
            let sequence = self.decoder.sequence_number(&view)?;
            self.telemetry.last_sequence.store(sequence, Ordering::Relaxed);

            // Record the expected uncompressed size; a downstream consumer
            // comparing the stored size against this value can infer whether
            // the payload was compressed in between
            self.decoder.set_image_size(&mut view, image_size as u64)?;
            let stored_size = self.decoder.image_size(&view)?;
            drop(view);

            let raw_meta = FrameMetadata::new("raw", sequence)
                .with_dimensions(dimensions)
                .with_bit_depth(geometry.bit_depth)
                .with_compression(Compression::Uncompressed)
                .with_image_size(image_size)
                .with_subframe_count(geometry.subframe_count);

            // Safety: slot stays mapped for the pool's lifetime; the raw view
            // is the non-owning alias, only the built view gets the clear ring
            let raw_frame = unsafe {
                SharedBufferFrame::from_slot(raw_meta, slot, buffer_size, raw_offset, None)
            }?;
            (self.frame_callback)(Arc::new(raw_frame));

            let built_meta = FrameMetadata::new("built", sequence)
                .with_dimensions(dimensions)
                .with_bit_depth(geometry.bit_depth)
                .with_compression(Compression::Uncompressed)
                .with_image_size(image_size)
                .with_subframe_count(geometry.subframe_count);

            // Safety: as above; this view owns release of the slot
            let built_frame = unsafe {
                SharedBufferFrame::from_slot(
                    built_meta,
                    slot,
                    buffer_size,
                    built_offset,
                    Some(Arc::clone(&rings.clear)),
                )
            }?;
            (self.frame_callback)(Arc::new(built_frame));

            debug!(
                "Wrapped frame: dataset: {} | frame_number: {} | image_size: {} | compressed: {}",
                self.config.core_name,
                sequence,
                stored_size,
                stored_size != image_size as u64
            );

            let spent = CycleClock::cycles().wrapping_sub(start_cycles);
            window.record_frame(spent);
            self.telemetry.frames_processed.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }
}

impl WorkerCore for FrameWrapperCore {
    fn role(&self) -> &'static str {
        Self::KIND
    }

    fn index(&self) -> usize {
        self.proc_idx
    }

    fn connect(&self) -> Result<()> {
        let upstream_name = ring_name(&self.config.upstream_core, self.core_set, self.proc_idx);
        let upstream = match self.rings.require(&upstream_name) {
            Ok(ring) => ring,
            Err(e) => {
                error!(
                    "{} : {} failed to connect to upstream ring {}",
                    self.config.core_name, self.proc_idx, upstream_name
                );
                return Err(e);
            }
        };

        let clear_name = clear_ring_name(self.core_set);
        let clear = match self.rings.require(&clear_name) {
            Ok(ring) => ring,
            Err(e) => {
                error!(
                    "{} : {} failed to connect to clear-buffers ring {}",
                    self.config.core_name, self.proc_idx, clear_name
                );
                return Err(e);
            }
        };

        *self.connections.lock().unwrap() = Some(WrapperRings { upstream, clear });
        info!(
            "{} : {} connected to upstream resources successfully",
            self.config.core_name, self.proc_idx
        );
        Ok(())
    }

    fn run(&self, lcore_id: usize) -> Result<()> {
        let rings = self
            .connections
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SeuratError::not_connected(format!("{}_{}", Self::KIND, self.proc_idx)))?;

        self.lcore_id.store(lcore_id, Ordering::Relaxed);
        self.run_flag.store(true, Ordering::Release);
        info!("Core {} starting up", lcore_id);

        let result = self.poll_loop(&rings);
        self.run_flag.store(false, Ordering::Release);
        info!("Core {} completed", lcore_id);
        result
    }

    fn stop(&self) {
        if self.run_flag.swap(false, Ordering::AcqRel) {
            info!("Core {} stopping", self.lcore_id.load(Ordering::Relaxed));
        } else {
            debug!(
                "Core {} already stopped",
                self.lcore_id.load(Ordering::Relaxed)
            );
        }
    }

    fn is_running(&self) -> bool {
        self.run_flag.load(Ordering::Acquire)
    }

    fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    fn status(&self, report: &mut StatusReport, path: &str) {
        debug!("Status requested for {}_{}", Self::KIND, self.proc_idx);

        let status_path = format!("{}/{}_{}/", path, Self::KIND, self.proc_idx);
        let timing_path = format!("{}timing/", status_path);
        let upstream_path = format!("{}upstream_rings/", status_path);

        let snapshot = self.telemetry.snapshot();
        report.set_param(format!("{}frames_wrapped", status_path), snapshot.frames_processed);
        report.set_param(
            format!("{}frames_wrapped_per_second", status_path),
            snapshot.frames_per_second,
        );
        report.set_param(format!("{}idle_loops", status_path), snapshot.idle_loops);
        report.set_param(format!("{}core_usage", status_path), snapshot.core_utilization);
        report.set_param(format!("{}last_sequence", status_path), snapshot.last_sequence);

        report.set_param(format!("{}mean_frame_us", timing_path), snapshot.mean_frame_us);
        report.set_param(format!("{}max_frame_us", timing_path), snapshot.max_frame_us);

        if let Some(rings) = self.connections.lock().unwrap().as_ref() {
            report.set_param(
                format!("{}{}_count", upstream_path, rings.upstream.name()),
                rings.upstream.count() as u64,
            );
            report.set_param(
                format!("{}{}_size", upstream_path, rings.upstream.name()),
                rings.upstream.capacity() as u64,
            );
        }
    }

    fn configure(&self, _update: &CoreConfig) {
        info!(
            "{} : {} got update config",
            self.config.core_name, self.proc_idx
        );
    }
}

impl Drop for FrameWrapperCore {
    fn drop(&mut self) {
        debug!("{} {} destructor", Self::KIND, self.proc_idx);
        self.stop();
    }
}
