//! Frame builder core: split coarse/fine pixel reconstruction

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use log::{debug, error, info};

use crate::{
    buffers::SuperFramePool,
    error::{Result, SeuratError},
    rings::{clear_ring_name, ring_name, RingChannel, RingRegistry},
    superframe::{SuperFrameDecoder, SuperFrameView},
};

use super::{
    config::CoreConfig,
    status::StatusReport,
    telemetry::{CoreTelemetry, CycleClock, TelemetrySnapshot, TelemetryWindow},
    WorkCoreRefs, WorkerCore,
};

/// Bits of the slow coarse counter in a raw 16-bit sample
pub const COARSE_MASK: u16 = 0x00FF;
/// Carry flag of the coarse counter
pub const OVERFLOW_MASK: u16 = 0x0100;
/// Bits of the fast fine counter
pub const FINE_MASK: u16 = 0xFE00;

/// Reconstruct the built pixel region of one super-frame.
///
/// The ASIC reports the coarse and overflow channels one sampling period
/// behind the fine channel, so each built sample combines the coarse and
/// overflow bits of the *previous* sub-frame's raw sample with the fine bits
/// of the current one. Sub-frame 0 draws its previous sample from `carry`,
/// the last raw sub-frame of the previously processed super-frame (zeroed
/// before the first one). On return `carry` holds this super-frame's last
/// raw sub-frame.
///
/// `raw` and `built` hold `carry.len()` pixels per sub-frame; their lengths
/// must be equal and a whole multiple of `carry.len()`.
pub fn reconstruct_superframe(raw: &[u16], built: &mut [u16], carry: &mut [u16]) {
    let pixels_per_subframe = carry.len();
    debug_assert_eq!(raw.len(), built.len());
    debug_assert_eq!(raw.len() % pixels_per_subframe, 0);

    let subframe_count = raw.len() / pixels_per_subframe;
    for subframe in 0..subframe_count {
        let base = subframe * pixels_per_subframe;
        for pixel in 0..pixels_per_subframe {
            let previous = if subframe == 0 {
                carry[pixel]
            } else {
                raw[base - pixels_per_subframe + pixel]
            };
            built[base + pixel] =
                (previous & (COARSE_MASK | OVERFLOW_MASK)) | (raw[base + pixel] & FINE_MASK);
        }
    }

    carry.copy_from_slice(&raw[raw.len() - pixels_per_subframe..]);
}

/// Worker core reconstructing full-precision pixel data from the detector's
/// split coarse/fine sampling scheme.
///
/// Pulls raw super-frame buffers from its upstream ring, rebuilds the built
/// region in place, and routes each buffer to the downstream ring selected by
/// `sequence % num_downstream_cores`, so a given sequence range always
/// reaches the same downstream instance.
pub struct FrameBuilderCore {
    proc_idx: usize,
    core_set: u32,
    config: CoreConfig,
    decoder: Arc<dyn SuperFrameDecoder>,
    rings: Arc<RingRegistry>,
    pool: Arc<SuperFramePool>,
    downstream_rings: Vec<Arc<RingChannel>>,
    upstream_ring: Mutex<Option<Arc<RingChannel>>>,
    telemetry: CoreTelemetry,
    run_flag: AtomicBool,
    lcore_id: AtomicUsize,
}

impl FrameBuilderCore {
    /// Kind identifier used for factory registration and status paths
    pub const KIND: &'static str = "FrameBuilderCore";

    /// Create a builder core and its downstream rings.
    ///
    /// Downstream ring creation failure is fatal here: continuing with a
    /// shorter ring list would desynchronize sequence-modulo routing.
    pub fn new(proc_idx: usize, refs: WorkCoreRefs) -> Result<Self> {
        let WorkCoreRefs {
            decoder,
            rings,
            pool,
            core_config: config,
            core_set,
            ..
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

        if config.num_downstream_cores == 0 {
            return Err(SeuratError::configuration(format!(
                "{} {} has no downstream cores to route to",
                config.core_name, proc_idx
            )));
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

        // Downstream rings may already exist if another instance created
        // them first; creation is idempotent by name
        let mut downstream_rings = Vec::with_capacity(config.num_downstream_cores);
        for ring_idx in 0..config.num_downstream_cores {
            let name = ring_name(&config.core_name, core_set, ring_idx);
            let ring = rings.create_or_lookup(&name, pool.num_buffers())?;
            downstream_rings.push(ring);
        }

        Ok(Self {
            proc_idx,
            core_set,
            config,
            decoder,
            rings,
            pool,
            downstream_rings,
            upstream_ring: Mutex::new(None),
            telemetry: CoreTelemetry::default(),
            run_flag: AtomicBool::new(false),
            lcore_id: AtomicUsize::new(0),
        })
    }

    fn log_decoder_info(&self) {
        let geometry = self.decoder.geometry();
        info!("Decoder static information:");
        info!("x_resolution: {}", geometry.x_resolution);
        info!("y_resolution: {}", geometry.y_resolution);
        info!("bit_depth: {:?}", geometry.bit_depth);
        info!("subframe_count: {}", geometry.subframe_count);
        info!("superframe_header_size: {}", geometry.superframe_header_size);
        info!("subframe_header_size: {}", geometry.subframe_header_size);
        info!("raw_data_size: {}", geometry.raw_data_size());
        info!("total_buffer_size: {}", geometry.total_buffer_size());
    }

    fn poll_loop(&self, upstream: &RingChannel) -> Result<()> {
        let geometry = self.decoder.geometry().clone();
        let buffer_size = self.pool.buffer_size();
        let raw_offset = self.decoder.raw_data_offset();
        let built_offset = self.decoder.built_data_offset();
        let pixels_per_superframe = geometry.pixels_per_subframe() * geometry.subframe_count;
        let downstream_count = self.downstream_rings.len() as u64;

        // Carry-over of the previous super-frame's last raw sub-frame,
        // sized from the decoder geometry and zeroed before the first buffer
        let mut carry = vec![0u16; geometry.pixels_per_subframe()];
        let mut prev_sequence: Option<u64> = None;

        let clock = CycleClock::calibrate();
        let mut window = TelemetryWindow::new(&clock, CycleClock::cycles());

        while self.run_flag.load(Ordering::Acquire) {
            let now = CycleClock::cycles();
            window.maybe_publish(now, &self.telemetry);

            let slot = match upstream.try_dequeue() {
                Some(slot) => slot,
                None => {
                    // Normal back-pressure, not an error
                    self.telemetry.record_idle();
                    continue;
                }
            };

            let start_cycles = CycleClock::cycles();

            // Safety: the ring hand-off granted exclusive ownership of the
            // slot, and construction verified it holds a full super-frame
            let mut view = unsafe { SuperFrameView::from_slot(slot, buffer_size) };
            let sequence = self.decoder.sequence_number(&view)?;

            // Ordering is observed, not enforced; the first buffer only
            // establishes the baseline
            match prev_sequence {
                Some(prev) if prev.wrapping_add(1) == sequence => {
                    self.telemetry.in_order_frames.fetch_add(1, Ordering::Relaxed);
                }
                Some(_) => {
                    self.telemetry
                        .out_of_order_frames
                        .fetch_add(1, Ordering::Relaxed);
                }
                None => {}
            }
            prev_sequence = Some(sequence);
            self.telemetry.last_sequence.store(sequence, Ordering::Relaxed);

            {
                let (raw, built) = view.pixel_regions_mut(
                    raw_offset,
                    pixels_per_superframe,
                    built_offset,
                    pixels_per_superframe,
                )?;
                reconstruct_superframe(raw, built, &mut carry);
            }

            let destination = (sequence % downstream_count) as usize;
            if let Err(e) = self.downstream_rings[destination].try_enqueue(slot) {
                // Rings are sized to the pool, so a full downstream ring
                // means a topology bug upstream of us
                error!(
                    "{} {} failed to enqueue sequence {} downstream: {}",
                    Self::KIND,
                    self.proc_idx,
                    sequence,
                    e
                );
            }

            let spent = CycleClock::cycles().wrapping_sub(start_cycles);
            window.record_frame(spent);
            self.telemetry.frames_processed.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }
}

impl WorkerCore for FrameBuilderCore {
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

        // The clear-buffers ring must exist before any buffer can complete a
        // round trip; its absence is a topology misconfiguration
        let clear_name = clear_ring_name(self.core_set);
        if let Err(e) = self.rings.require(&clear_name) {
            error!(
                "{} : {} failed to connect to clear-buffers ring {}",
                self.config.core_name, self.proc_idx, clear_name
            );
            return Err(e);
        }

        *self.upstream_ring.lock().unwrap() = Some(upstream);
        info!(
            "{} : {} connected to upstream resources successfully",
            self.config.core_name, self.proc_idx
        );
        Ok(())
    }

    fn run(&self, lcore_id: usize) -> Result<()> {
        let upstream = self
            .upstream_ring
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SeuratError::not_connected(format!("{}_{}", Self::KIND, self.proc_idx)))?;

        self.lcore_id.store(lcore_id, Ordering::Relaxed);
        self.run_flag.store(true, Ordering::Release);
        info!("Core {} starting up", lcore_id);
        self.log_decoder_info();

        let result = self.poll_loop(&upstream);
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
        let downstream_path = format!("{}downstream_rings/", status_path);

        let snapshot = self.telemetry.snapshot();
        report.set_param(format!("{}frames_processed", status_path), snapshot.frames_processed);
        report.set_param(
            format!("{}frames_processed_per_second", status_path),
            snapshot.frames_per_second,
        );
        report.set_param(format!("{}idle_loops", status_path), snapshot.idle_loops);
        report.set_param(format!("{}core_usage", status_path), snapshot.core_utilization);
        report.set_param(format!("{}last_sequence", status_path), snapshot.last_sequence);
        report.set_param(format!("{}in_order_frames", status_path), snapshot.in_order_frames);
        report.set_param(
            format!("{}out_of_order_frames", status_path),
            snapshot.out_of_order_frames,
        );

        report.set_param(format!("{}mean_frame_us", timing_path), snapshot.mean_frame_us);
        report.set_param(format!("{}max_frame_us", timing_path), snapshot.max_frame_us);

        if let Some(upstream) = self.upstream_ring.lock().unwrap().as_ref() {
            report.set_param(
                format!("{}{}_count", upstream_path, upstream.name()),
                upstream.count() as u64,
            );
            report.set_param(
                format!("{}{}_size", upstream_path, upstream.name()),
                upstream.capacity() as u64,
            );
        }

        for ring in &self.downstream_rings {
            report.set_param(
                format!("{}{}_count", downstream_path, ring.name()),
                ring.count() as u64,
            );
            report.set_param(
                format!("{}{}_size", downstream_path, ring.name()),
                ring.capacity() as u64,
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

impl Drop for FrameBuilderCore {
    fn drop(&mut self) {
        debug!("{} {} destructor", Self::KIND, self.proc_idx);
        self.stop();
    }
}
