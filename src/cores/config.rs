//! Resolved per-core configuration record

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeuratError};

/// Resolved configuration for one worker core.
///
/// Immutable for the lifetime of a running core; `configure()` on a core is
/// an informational acknowledgment, not a live topology change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Role name of this core, also the role component of its downstream
    /// ring names
    pub core_name: String,
    /// Role name of the upstream core this core dequeues from
    pub upstream_core: String,
    /// Number of instances of this core
    pub num_cores: usize,
    /// Number of downstream instances buffers are distributed over
    pub num_downstream_cores: usize,
    /// Whether this core participates in ring connection
    pub connect: bool,
}

impl CoreConfig {
    /// Create a configuration for a core role with its upstream role
    pub fn new(core_name: impl Into<String>, upstream_core: impl Into<String>) -> Self {
        Self {
            core_name: core_name.into(),
            upstream_core: upstream_core.into(),
            num_cores: 1,
            num_downstream_cores: 1,
            connect: true,
        }
    }

    /// Set the instance count for this role
    pub fn with_num_cores(mut self, num_cores: usize) -> Self {
        self.num_cores = num_cores;
        self
    }

    /// Set the downstream instance count
    pub fn with_num_downstream_cores(mut self, num_downstream_cores: usize) -> Self {
        self.num_downstream_cores = num_downstream_cores;
        self
    }

    /// Set the connect flag
    pub fn with_connect(mut self, connect: bool) -> Self {
        self.connect = connect;
        self
    }

    /// Validate the record
    pub fn validate(&self) -> Result<()> {
        if self.core_name.is_empty() {
            return Err(SeuratError::invalid_parameter(
                "core_name",
                "Core name cannot be empty",
            ));
        }

        if self.upstream_core.is_empty() {
            return Err(SeuratError::invalid_parameter(
                "upstream_core",
                "Upstream core name cannot be empty",
            ));
        }

        if self.num_cores == 0 {
            return Err(SeuratError::invalid_parameter(
                "num_cores",
                "Core role needs at least one instance",
            ));
        }

        Ok(())
    }
}
