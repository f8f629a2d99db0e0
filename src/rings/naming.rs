//! Deterministic ring channel naming
//!
//! Independently-constructed cores agree on shared channels purely through
//! these derivations; there is no central coordinator handing out names.

/// Derive the name of an inter-core ring from role, execution-core-set and
/// instance index.
///
/// A producer creates `ring_name(own_role, set, i)` for each downstream
/// instance `i`; the consumer with process index `i` connects to
/// `ring_name(upstream_role, set, i)`.
pub fn ring_name(role: &str, core_set: u32, index: usize) -> String {
    format!("{}_cs{}_r{}", role, core_set, index)
}

/// Derive the name of the clear-buffers return channel for one
/// execution-core-set.
///
/// Fully consumed super-frame buffers are enqueued here for reuse by the
/// upstream packet layer.
pub fn clear_ring_name(core_set: u32) -> String {
    format!("clear_frames_cs{}", core_set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_name_deterministic() {
        assert_eq!(ring_name("frame_builder", 0, 2), "frame_builder_cs0_r2");
        assert_eq!(ring_name("frame_builder", 0, 2), ring_name("frame_builder", 0, 2));
    }

    #[test]
    fn test_ring_name_distinct_per_component() {
        let base = ring_name("fb", 1, 1);
        assert_ne!(base, ring_name("fw", 1, 1));
        assert_ne!(base, ring_name("fb", 2, 1));
        assert_ne!(base, ring_name("fb", 1, 2));
    }

    #[test]
    fn test_clear_ring_name_scoped_per_core_set() {
        assert_eq!(clear_ring_name(0), "clear_frames_cs0");
        assert_ne!(clear_ring_name(0), clear_ring_name(1));
    }
}
