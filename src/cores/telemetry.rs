//! Windowed, cycle-counter-based core telemetry
//!
//! Each polling core reads a monotonic cycle counter once per iteration and
//! converts accumulated cycles into per-second statistics only when a window
//! of one cycle-clock-second closes, amortizing the arithmetic to once per
//! second instead of once per frame. Published counters are plain atomic
//! words read by the control plane; torn reads across fields are accepted.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Monotonic cycle counter with a calibrated cycles-per-second rate.
///
/// On x86_64 this reads the TSC directly; elsewhere it falls back to a
/// nanosecond clock with a fixed 1 GHz rate.
#[derive(Debug, Clone, Copy)]
pub struct CycleClock {
    cycles_per_sec: u64,
}

impl CycleClock {
    /// Calibrate the cycle rate against the wall clock.
    ///
    /// Blocks for a few milliseconds; call once at core start, never in the
    /// polling loop.
    pub fn calibrate() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            let wall_start = std::time::Instant::now();
            let cycle_start = Self::cycles();
            std::thread::sleep(std::time::Duration::from_millis(10));
            let cycle_end = Self::cycles();
            let elapsed_nanos = wall_start.elapsed().as_nanos().max(1);

            let cycles_per_sec =
                ((cycle_end.wrapping_sub(cycle_start)) as u128 * 1_000_000_000 / elapsed_nanos)
                    as u64;
            Self {
                cycles_per_sec: cycles_per_sec.max(1),
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            Self {
                cycles_per_sec: 1_000_000_000,
            }
        }
    }

    /// Create a clock with a known rate, for driving windows synthetically
    pub fn with_frequency(cycles_per_sec: u64) -> Self {
        Self {
            cycles_per_sec: cycles_per_sec.max(1),
        }
    }

    /// Read the current cycle count
    #[inline]
    pub fn cycles() -> u64 {
        #[cfg(target_arch = "x86_64")]
        unsafe {
            core::arch::x86_64::_rdtsc()
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            use std::sync::OnceLock;
            use std::time::Instant;
            static START: OnceLock<Instant> = OnceLock::new();
            START.get_or_init(Instant::now).elapsed().as_nanos() as u64
        }
    }

    /// Calibrated cycles per second
    pub fn cycles_per_second(&self) -> u64 {
        self.cycles_per_sec
    }
}

/// Published per-core telemetry counters.
///
/// Mutated only by the owning core's polling loop; read concurrently by
/// status queries.
#[derive(Debug, Default)]
pub struct CoreTelemetry {
    /// Total frames processed since start
    pub frames_processed: AtomicU64,
    /// Frames processed in the last closed window
    pub frames_per_second: AtomicU64,
    /// Idle poll iterations in the current window
    pub idle_loops: AtomicU64,
    /// Mean microseconds per frame in the last closed window
    pub mean_frame_us: AtomicU64,
    /// Maximum microseconds on one frame in the last closed window
    pub max_frame_us: AtomicU64,
    /// Core utilization on a 0-255 scale in the last closed window
    pub core_utilization: AtomicU64,
    /// Sequence number of the last dequeued super-frame
    pub last_sequence: AtomicU64,
    /// Frames whose sequence followed the previous one exactly
    pub in_order_frames: AtomicU64,
    /// Frames whose sequence did not follow the previous one
    pub out_of_order_frames: AtomicU64,
}

impl CoreTelemetry {
    /// Count one idle poll iteration
    #[inline]
    pub fn record_idle(&self) {
        self.idle_loops.fetch_add(1, Ordering::Relaxed);
    }

    /// Read a consistent-enough snapshot of all counters
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_per_second: self.frames_per_second.load(Ordering::Relaxed),
            idle_loops: self.idle_loops.load(Ordering::Relaxed),
            mean_frame_us: self.mean_frame_us.load(Ordering::Relaxed),
            max_frame_us: self.max_frame_us.load(Ordering::Relaxed),
            core_utilization: self.core_utilization.load(Ordering::Relaxed),
            last_sequence: self.last_sequence.load(Ordering::Relaxed),
            in_order_frames: self.in_order_frames.load(Ordering::Relaxed),
            out_of_order_frames: self.out_of_order_frames.load(Ordering::Relaxed),
        }
    }
}

/// Plain-value copy of the published telemetry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub frames_processed: u64,
    pub frames_per_second: u64,
    pub idle_loops: u64,
    pub mean_frame_us: u64,
    pub max_frame_us: u64,
    pub core_utilization: u64,
    pub last_sequence: u64,
    pub in_order_frames: u64,
    pub out_of_order_frames: u64,
}

/// Per-window accumulators for one polling loop.
///
/// Lives on the core's stack; only the derived statistics published at
/// window close touch the shared counters.
#[derive(Debug)]
pub struct TelemetryWindow {
    cycles_per_sec: u64,
    window_start: u64,
    frames: u64,
    total_frame_cycles: u64,
    max_frame_cycles: u64,
    cycles_working: u64,
}

impl TelemetryWindow {
    /// Open the first window at cycle `now`
    pub fn new(clock: &CycleClock, now: u64) -> Self {
        Self {
            cycles_per_sec: clock.cycles_per_second(),
            window_start: now,
            frames: 0,
            total_frame_cycles: 0,
            max_frame_cycles: 0,
            cycles_working: 0,
        }
    }

    /// Account one processed frame that took `spent_cycles`
    #[inline]
    pub fn record_frame(&mut self, spent_cycles: u64) {
        self.frames += 1;
        self.total_frame_cycles += spent_cycles;
        self.cycles_working += spent_cycles;
        if spent_cycles > self.max_frame_cycles {
            self.max_frame_cycles = spent_cycles;
        }
    }

    /// Publish derived statistics and reset accumulators if one
    /// cycle-clock-second has elapsed since the window opened.
    ///
    /// Returns true when the window closed.
    pub fn maybe_publish(&mut self, now: u64, telemetry: &CoreTelemetry) -> bool {
        if now.wrapping_sub(self.window_start) < self.cycles_per_sec {
            return false;
        }

        let cps = self.cycles_per_sec;
        telemetry
            .frames_per_second
            .store(self.frames, Ordering::Relaxed);

        let mean_us = if self.frames > 0 {
            self.total_frame_cycles * 1_000_000 / (self.frames * cps)
        } else {
            0
        };
        telemetry.mean_frame_us.store(mean_us, Ordering::Relaxed);
        telemetry
            .max_frame_us
            .store(self.max_frame_cycles * 1_000_000 / cps, Ordering::Relaxed);
        telemetry
            .core_utilization
            .store((self.cycles_working * 255 / cps).min(255), Ordering::Relaxed);
        telemetry.idle_loops.store(0, Ordering::Relaxed);

        self.frames = 0;
        self.total_frame_cycles = 0;
        self.max_frame_cycles = 0;
        self.cycles_working = 0;
        self.window_start = now;
        true
    }
}
