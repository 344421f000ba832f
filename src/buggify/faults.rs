//! Fault Catalog for Deterministic Simulation Testing
//!
//! Injectable store faults. Each fault has a unique identifier for tracking and
//! configuration through [`FaultConfig`](super::FaultConfig).

/// Store faults - persistence chaos seen by the rollup engine
pub mod store {
    /// Put fails before anything is written (also models a crash between scan and put)
    pub const PUT_FAIL: &str = "store.put_fail";
    /// Scan fails before yielding any entry
    pub const SCAN_FAIL: &str = "store.scan_fail";
    /// Scan yields a few entries, then fails
    pub const SCAN_INTERRUPT: &str = "store.scan_interrupt";
}

/// All fault identifiers for iteration
pub const ALL_FAULTS: &[&str] = &[store::PUT_FAIL, store::SCAN_FAIL, store::SCAN_INTERRUPT];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_faults_unique() {
        let mut seen = std::collections::HashSet::new();
        for fault in ALL_FAULTS {
            assert!(seen.insert(*fault), "Duplicate fault: {}", fault);
        }
    }

    #[test]
    fn test_fault_ids_are_namespaced() {
        assert!(ALL_FAULTS.iter().all(|f| f.starts_with("store.")));
    }
}
