//! Named ring channel registry
//!
//! Cores needing the same channel agree on a single shared instance purely by
//! name; creation is idempotent so construction order does not matter. The
//! registry is injected into every core rather than living in process-global
//! state.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use log::{debug, info};

use crate::error::{Result, SeuratError};

use super::channel::RingChannel;

/// Registry mapping channel names to shared ring instances
#[derive(Debug, Default)]
pub struct RingRegistry {
    /// Map of name to channel
    rings: RwLock<HashMap<String, Arc<RingChannel>>>,
}

impl RingRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self {
            rings: RwLock::new(HashMap::new()),
        }
    }

    /// Get the ring with the given name, creating it if absent.
    ///
    /// Idempotent by name: if the ring already exists the existing handle is
    /// returned and the requested capacity is ignored.
    pub fn create_or_lookup(&self, name: &str, capacity: usize) -> Result<Arc<RingChannel>> {
        {
            let rings = self.rings.read().unwrap();
            if let Some(ring) = rings.get(name) {
                debug!("Ring {} already created, reusing existing handle", name);
                return Ok(Arc::clone(ring));
            }
        }

        let mut rings = self.rings.write().unwrap();
        // Double-check under the write lock, another thread may have won
        if let Some(ring) = rings.get(name) {
            debug!("Ring {} already created, reusing existing handle", name);
            return Ok(Arc::clone(ring));
        }

        let ring = Arc::new(RingChannel::new(name, capacity)?);
        info!(
            "Created ring {} with capacity {}",
            name,
            ring.capacity()
        );
        rings.insert(name.to_string(), Arc::clone(&ring));
        Ok(ring)
    }

    /// Look up an existing ring by name
    pub fn lookup(&self, name: &str) -> Option<Arc<RingChannel>> {
        let rings = self.rings.read().unwrap();
        rings.get(name).cloned()
    }

    /// Look up a ring that must exist, failing with `RingNotFound` otherwise.
    ///
    /// Used at connect time for required upstream/auxiliary channels.
    pub fn require(&self, name: &str) -> Result<Arc<RingChannel>> {
        self.lookup(name)
            .ok_or_else(|| SeuratError::ring_not_found(name))
    }

    /// Number of registered rings
    pub fn len(&self) -> usize {
        self.rings.read().unwrap().len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of all registered rings, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rings.read().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_or_lookup_idempotent() {
        let registry = RingRegistry::new();
        let first = registry.create_or_lookup("shared", 16).unwrap();
        let second = registry.create_or_lookup("shared", 4096).unwrap();

        // Same instance, second capacity request ignored
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.capacity(), 16);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_missing() {
        let registry = RingRegistry::new();
        assert!(registry.lookup("absent").is_none());
        assert!(matches!(
            registry.require("absent"),
            Err(SeuratError::RingNotFound { .. })
        ));
    }

    #[test]
    fn test_names_sorted() {
        let registry = RingRegistry::new();
        registry.create_or_lookup("b_ring", 4).unwrap();
        registry.create_or_lookup("a_ring", 4).unwrap();
        assert_eq!(registry.names(), vec!["a_ring", "b_ring"]);
    }
}
