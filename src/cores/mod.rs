//! Worker cores: pinned, run-to-completion polling loops connected by ring
//! channels.
//!
//! Every core follows the same lifecycle: `Created` (constructor resolves
//! configuration and creates/looks up its downstream rings) → `Connected`
//! (`connect()` resolves required upstream/auxiliary rings, failing fatally
//! if one is missing) → `Running` (`run(lcore)` polls until the run-flag
//! clears) → `Stopped`. Re-running a stopped core is not supported; construct
//! a new one.

pub mod builder;
pub mod config;
pub mod factory;
pub mod status;
pub mod telemetry;
pub mod wrapper;

use std::{
    sync::Arc,
    thread::JoinHandle,
};

use log::{debug, info, warn};

use crate::{
    buffers::SuperFramePool,
    error::{Result, SeuratError},
    frames::FrameCallback,
    rings::RingRegistry,
    superframe::SuperFrameDecoder,
};

pub use builder::FrameBuilderCore;
pub use config::CoreConfig;
pub use factory::{CoreConstructor, CoreFactory};
pub use status::StatusReport;
pub use telemetry::{CoreTelemetry, CycleClock, TelemetrySnapshot, TelemetryWindow};
pub use wrapper::FrameWrapperCore;

/// Shared references every worker core is constructed from
#[derive(Clone)]
pub struct WorkCoreRefs {
    /// Protocol decoder for super-frame geometry and navigation
    pub decoder: Arc<dyn SuperFrameDecoder>,
    /// Ring registry shared by all cores of one execution-core-set
    pub rings: Arc<RingRegistry>,
    /// Super-frame buffer pool
    pub pool: Arc<SuperFramePool>,
    /// Downstream dispatch callback
    pub frame_callback: FrameCallback,
    /// Resolved configuration for the constructed core
    pub core_config: CoreConfig,
    /// Execution-core-set identifier scoping ring names
    pub core_set: u32,
}

impl std::fmt::Debug for WorkCoreRefs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkCoreRefs")
            .field("core_config", &self.core_config)
            .field("core_set", &self.core_set)
            .finish()
    }
}

/// Common contract of all worker cores.
///
/// `run` is the polling loop itself and is expected to execute on a dedicated
/// thread (see [`spawn_core`]); `stop`, `status` and `configure` are safe to
/// call concurrently from a control-plane thread.
pub trait WorkerCore: Send + Sync {
    /// Role name of this core kind
    fn role(&self) -> &'static str;

    /// Process index of this instance within its role
    fn index(&self) -> usize;

    /// Resolve required upstream/auxiliary ring handles.
    ///
    /// Fails with `RingNotFound` if a required channel does not exist, in
    /// which case the core must not be run.
    fn connect(&self) -> Result<()>;

    /// Execute the polling loop on the calling thread until stopped.
    ///
    /// `lcore_id` identifies the hardware core this loop was pinned to, for
    /// diagnostics. Fails without starting if the core is not connected.
    fn run(&self, lcore_id: usize) -> Result<()>;

    /// Request the polling loop to exit at the top of its next iteration
    fn stop(&self);

    /// Whether the polling loop is currently running
    fn is_running(&self) -> bool;

    /// Read the published telemetry counters
    fn telemetry(&self) -> TelemetrySnapshot;

    /// Append this core's status under `<path>/<Role>_<index>/...`
    fn status(&self, report: &mut StatusReport, path: &str);

    /// Acknowledge a configuration update.
    ///
    /// Currently informational only; the resolved configuration of a running
    /// core does not change.
    fn configure(&self, update: &CoreConfig);
}

/// Pin the calling thread to one hardware core.
#[cfg(target_os = "linux")]
pub fn pin_current_thread(core_id: usize) -> Result<()> {
    unsafe {
        let mut cpu_set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut cpu_set);
        libc::CPU_SET(core_id, &mut cpu_set);

        if libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &cpu_set) != 0 {
            return Err(SeuratError::from_io(
                std::io::Error::last_os_error(),
                "sched_setaffinity failed",
            ));
        }
    }
    Ok(())
}

/// Pin the calling thread to one hardware core (no-op off Linux).
#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(_core_id: usize) -> Result<()> {
    Ok(())
}

/// Handle to a worker core running on its own pinned thread
pub struct CoreHandle {
    core: Arc<dyn WorkerCore>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl CoreHandle {
    /// Shared reference to the core, for status queries and stop requests
    pub fn core(&self) -> &Arc<dyn WorkerCore> {
        &self.core
    }

    /// Request the core to stop without waiting for the loop to exit
    pub fn stop(&self) {
        self.core.stop();
    }

    /// Stop the core and wait for its thread to exit
    pub fn join(mut self) -> Result<()> {
        self.core.stop();
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| SeuratError::configuration("Worker core thread panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for CoreHandle {
    fn drop(&mut self) {
        self.core.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl std::fmt::Debug for CoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreHandle")
            .field("role", &self.core.role())
            .field("index", &self.core.index())
            .field("running", &self.core.is_running())
            .finish()
    }
}

/// Spawn a connected worker core onto a dedicated thread pinned to
/// `lcore_id`.
///
/// A pinning failure is downgraded to a warning; the loop still runs, just
/// unpinned.
pub fn spawn_core(core: Arc<dyn WorkerCore>, lcore_id: usize) -> Result<CoreHandle> {
    let worker = Arc::clone(&core);
    let thread_name = format!("{}_{}", core.role(), core.index());

    let thread = std::thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            if let Err(e) = pin_current_thread(lcore_id) {
                warn!("Failed to pin {} to core {}: {}", thread_name, lcore_id, e);
            } else {
                debug!("Pinned {} to core {}", thread_name, lcore_id);
            }
            worker.run(lcore_id)
        })
        .map_err(|e| SeuratError::from_io(e, "Failed to spawn worker core thread"))?;

    info!(
        "Launched {}_{} on core {}",
        core.role(),
        core.index(),
        lcore_id
    );

    Ok(CoreHandle {
        core,
        thread: Some(thread),
    })
}
