//! # Seurat - Detector Readout Data-Path Core
//!
//! Seurat is the data-path core of a detector readout pipeline: a set of
//! cooperating worker cores that take raw, packetized detector super-frames
//! from a userspace packet layer, reconstruct corrected per-pixel image data
//! from an interleaved coarse/fine encoding, and hand the result to a
//! downstream image-processing chain as zero-copy frame objects.
//!
//! ## Features
//!
//! - **Lock-free ring hand-off**: named MPMC ring channels move buffer-slot
//!   pointers between pinned, run-to-completion polling cores
//! - **Shared super-frame pool**: fixed-size slots mapped once (optionally
//!   huge-page backed and mlocked), recycled forever through rings
//! - **Split coarse/fine reconstruction**: the frame builder rebuilds
//!   full-precision pixels whose coarse/overflow channels lag the fine
//!   channel by one sampling period
//! - **Zero-copy frame wrapping**: raw and built datasets exposed over the
//!   same buffer with exactly-once release back to the clear-buffers ring
//! - **Windowed telemetry**: cycle-counter statistics recomputed once per
//!   second, readable concurrently from a control-plane thread
//!
//! ## Architecture
//!
//! ```text
//!  upstream      ┌────────────────┐  rings   ┌────────────────┐
//!  packet   ───▶ │ FrameBuilder   │ ───────▶ │ FrameWrapper   │ ──▶ callback
//!  layer         │ core(s)        │  seq%D   │ core(s)        │     (chain)
//!                └────────────────┘          └───────┬────────┘
//!                        ▲                           │ built view drop
//!                        │        clear-buffers ring │
//!                        └───────────────◀───────────┘
//! ```
//!
//! Builder and wrapper cores are symmetric in structure: same lifecycle
//! (created → connected → running → stopped), same ring-connection protocol,
//! different per-iteration algorithm.

// Core modules
pub mod buffers;
pub mod cores;
pub mod error;
pub mod frames;
pub mod rings;
pub mod superframe;

// Main API re-exports
pub use buffers::{SuperFramePool, SuperFramePoolConfig};
pub use cores::{
    pin_current_thread, spawn_core, CoreConfig, CoreFactory, CoreHandle, CoreTelemetry,
    CycleClock, FrameBuilderCore, FrameWrapperCore, StatusReport, TelemetrySnapshot,
    TelemetryWindow, WorkCoreRefs, WorkerCore,
};
pub use error::{Result, SeuratError};
pub use frames::{Compression, FrameCallback, FrameHandle, FrameMetadata, SharedBufferFrame};
pub use rings::{clear_ring_name, ring_name, RingChannel, RingRegistry, SlotPtr};
pub use superframe::{
    BitDepth, FrameGeometry, SplitCounterDecoder, SuperFrameDecoder, SuperFrameView,
};
