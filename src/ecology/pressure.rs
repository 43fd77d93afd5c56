//! Density-based population regulation.
//!
//! There is no hard cap on either population. A single pressure scalar in
//! `[0, 1]`, derived from live counts, raises running costs and lowers the
//! reproduction chance as populations overshoot their targets.

use crate::config::RegulationConfig;
use serde::{Deserialize, Serialize};

/// Live population counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Census {
    pub grazers: usize,
    pub hunters: usize,
}

impl Census {
    pub fn new(grazers: usize, hunters: usize) -> Self {
        Self { grazers, hunters }
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.grazers + self.hunters
    }

    /// Current pressure for these counts
    #[inline]
    pub fn pressure(&self, config: &RegulationConfig) -> f32 {
        population_pressure(*self, config)
    }
}

/// Logistic function
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Blend of the two population sigmoids, clamped to `[0, 1]`
pub fn population_pressure(census: Census, config: &RegulationConfig) -> f32 {
    let g = sigmoid((census.grazers as f32 - config.target_grazers) / config.grazer_softness.max(f32::EPSILON));
    let h = sigmoid((census.hunters as f32 - config.target_hunters) / config.hunter_softness.max(f32::EPSILON));
    (0.55 * g + 0.45 * h).clamp(0.0, 1.0)
}

/// Multiplier applied to movement and metabolic cost
#[inline]
pub fn crowd_cost_factor(pressure: f32, config: &RegulationConfig) -> f32 {
    1.0 + config.crowd_cost_gain * pressure
}

/// Reproduction chance before the size adjustment
#[inline]
pub fn reproduction_chance(base: f32, pressure: f32, config: &RegulationConfig) -> f32 {
    (base * (1.0 - config.reproduction_drop * pressure)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_midpoint() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    #[test]
    fn test_pressure_at_targets_is_half() {
        let config = RegulationConfig::default();
        let census = Census::new(config.target_grazers as usize, config.target_hunters as usize);
        assert!((census.pressure(&config) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_pressure_monotonic_and_bounded() {
        let config = RegulationConfig::default();
        let mut last = -1.0;
        for n in (0..2000).step_by(50) {
            let p = Census::new(n, n / 3).pressure(&config);
            assert!((0.0..=1.0).contains(&p));
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn test_pressure_weights() {
        let config = RegulationConfig::default();
        // Grazers saturated, hunters absent
        let p = Census::new(100_000, 0).pressure(&config);
        let h = sigmoid(-config.target_hunters / config.hunter_softness);
        assert!((p - (0.55 + 0.45 * h)).abs() < 1e-5);
    }

    #[test]
    fn test_costs_rise_and_fertility_falls_with_pressure() {
        let config = RegulationConfig::default();
        assert!(crowd_cost_factor(1.0, &config) > crowd_cost_factor(0.0, &config));
        assert!(reproduction_chance(0.2, 1.0, &config) < reproduction_chance(0.2, 0.0, &config));
        assert!(reproduction_chance(0.2, 1.0, &config) >= 0.0);
    }
}
