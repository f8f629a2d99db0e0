//! Explicit factory for worker core kinds
//!
//! Core kinds are registered by an explicit call list at startup instead of
//! a hidden global registry, so construction order is deterministic and
//! testable.

use std::{collections::HashMap, sync::Arc};

use crate::error::{Result, SeuratError};

use super::{FrameBuilderCore, FrameWrapperCore, WorkCoreRefs, WorkerCore};

/// Constructor signature for one core kind
pub type CoreConstructor = fn(usize, WorkCoreRefs) -> Result<Arc<dyn WorkerCore>>;

/// Map from kind identifier to core constructor
#[derive(Debug, Default)]
pub struct CoreFactory {
    kinds: HashMap<String, CoreConstructor>,
}

fn build_frame_builder(proc_idx: usize, refs: WorkCoreRefs) -> Result<Arc<dyn WorkerCore>> {
    Ok(Arc::new(FrameBuilderCore::new(proc_idx, refs)?))
}

fn build_frame_wrapper(proc_idx: usize, refs: WorkCoreRefs) -> Result<Arc<dyn WorkerCore>> {
    Ok(Arc::new(FrameWrapperCore::new(proc_idx, refs)?))
}

impl CoreFactory {
    /// Create an empty factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory with the built-in core kinds registered
    pub fn with_default_kinds() -> Self {
        let mut factory = Self::new();
        factory.register(FrameBuilderCore::KIND, build_frame_builder);
        factory.register(FrameWrapperCore::KIND, build_frame_wrapper);
        factory
    }

    /// Register a core kind
    pub fn register(&mut self, kind: impl Into<String>, constructor: CoreConstructor) {
        self.kinds.insert(kind.into(), constructor);
    }

    /// Construct a core of the given kind
    pub fn build(
        &self,
        kind: &str,
        proc_idx: usize,
        refs: WorkCoreRefs,
    ) -> Result<Arc<dyn WorkerCore>> {
        let constructor = self.kinds.get(kind).ok_or_else(|| {
            SeuratError::invalid_parameter("kind", format!("Unknown core kind {}", kind))
        })?;
        constructor(proc_idx, refs)
    }

    /// Registered kind identifiers, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.kinds.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

