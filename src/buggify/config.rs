//! BUGGIFY Configuration
//!
//! Defines fault probabilities and provides preset configurations for different
//! testing scenarios (calm, moderate, chaos).

use super::faults;
use std::collections::HashMap;

/// Configuration for fault injection probabilities
#[derive(Debug, Clone)]
pub struct FaultConfig {
    /// Whether BUGGIFY is enabled at all
    pub enabled: bool,
    /// Per-fault probabilities (0.0 to 1.0)
    pub probabilities: HashMap<&'static str, f64>,
    /// Global probability multiplier
    pub global_multiplier: f64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self::moderate()
    }
}

impl FaultConfig {
    /// Create a new empty config (all faults disabled)
    pub fn new() -> Self {
        FaultConfig {
            enabled: true,
            probabilities: HashMap::new(),
            global_multiplier: 1.0,
        }
    }

    /// Disabled - no fault injection
    pub fn disabled() -> Self {
        FaultConfig {
            enabled: false,
            probabilities: HashMap::new(),
            global_multiplier: 0.0,
        }
    }

    /// Calm - very low fault rates for basic testing
    pub fn calm() -> Self {
        let mut config = Self::new();
        config.global_multiplier = 0.1;

        config.set(faults::store::PUT_FAIL, 0.01);
        config.set(faults::store::SCAN_FAIL, 0.01);

        config
    }

    /// Moderate - balanced fault injection for regular testing
    pub fn moderate() -> Self {
        let mut config = Self::new();
        config.global_multiplier = 1.0;

        config.set(faults::store::PUT_FAIL, 0.05); // 5%
        config.set(faults::store::SCAN_FAIL, 0.05); // 5%
        config.set(faults::store::SCAN_INTERRUPT, 0.02); // 2%

        config
    }

    /// Chaos - aggressive fault injection for stress testing
    pub fn chaos() -> Self {
        let mut config = Self::new();
        config.global_multiplier = 3.0;

        config.set(faults::store::PUT_FAIL, 0.10); // 10% (x3)
        config.set(faults::store::SCAN_FAIL, 0.08); // 8% (x3)
        config.set(faults::store::SCAN_INTERRUPT, 0.05); // 5% (x3)

        config
    }

    /// Set probability for a specific fault
    pub fn set(&mut self, fault_id: &'static str, probability: f64) -> &mut Self {
        self.probabilities
            .insert(fault_id, probability.clamp(0.0, 1.0));
        self
    }

    /// Get probability for a fault (returns 0.0 if not set)
    pub fn get(&self, fault_id: &str) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        let base = self.probabilities.get(fault_id).copied().unwrap_or(0.0);
        (base * self.global_multiplier).clamp(0.0, 1.0)
    }

    /// Check if a fault should trigger given its probability
    pub fn should_trigger(&self, fault_id: &str, random_value: f64) -> bool {
        random_value < self.get(fault_id)
    }

    /// Builder pattern - make one fault fire on every roll
    pub fn always(mut self, fault_id: &'static str) -> Self {
        self.set(fault_id, 1.0);
        self.global_multiplier = self.global_multiplier.max(1.0);
        self
    }

    /// Builder pattern - enable all store faults at moderate rates
    pub fn with_store_faults(mut self) -> Self {
        self.set(faults::store::PUT_FAIL, 0.05);
        self.set(faults::store::SCAN_FAIL, 0.05);
        self.set(faults::store::SCAN_INTERRUPT, 0.02);
        self
    }

    /// Builder pattern - set global multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.global_multiplier = multiplier.max(0.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_config() {
        let config = FaultConfig::disabled();
        assert_eq!(config.get(faults::store::PUT_FAIL), 0.0);
        assert!(!config.should_trigger(faults::store::PUT_FAIL, 0.0));
    }

    #[test]
    fn test_moderate_config() {
        let config = FaultConfig::moderate();
        assert!(config.get(faults::store::PUT_FAIL) > 0.0);
        assert!(config.get(faults::store::PUT_FAIL) <= 1.0);
    }

    #[test]
    fn test_chaos_higher_than_moderate() {
        let moderate = FaultConfig::moderate();
        let chaos = FaultConfig::chaos();

        for fault in faults::ALL_FAULTS {
            assert!(chaos.get(fault) > moderate.get(fault), "{fault}");
        }
    }

    #[test]
    fn test_should_trigger() {
        let config = FaultConfig::moderate();
        let prob = config.get(faults::store::SCAN_FAIL);

        // Value below probability should trigger
        assert!(config.should_trigger(faults::store::SCAN_FAIL, prob - 0.001));
        // Value above probability should not trigger
        assert!(!config.should_trigger(faults::store::SCAN_FAIL, prob + 0.001));
    }

    #[test]
    fn test_always_fires() {
        let config = FaultConfig::new().always(faults::store::PUT_FAIL);
        assert!(config.should_trigger(faults::store::PUT_FAIL, 0.999));
        assert!(!config.should_trigger(faults::store::SCAN_FAIL, 0.0));
    }

    #[test]
    fn test_builder_pattern() {
        let config = FaultConfig::new()
            .with_store_faults()
            .with_multiplier(2.0);

        assert!(config.get(faults::store::SCAN_INTERRUPT) > 0.0);
        assert_eq!(config.global_multiplier, 2.0);
    }
}
