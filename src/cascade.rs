// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Grid Resilience Simulation Suite - Cascade Coupling
//
// Extra negative pressure on the cluster once inverters start tripping. Two
// models are supported and selected through the parameter set; a study must
// use the same model for its mitigated and unmitigated runs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CascadeModel {
    /// Each active inverter sees `-gain × (1 - active_fraction)` in its
    /// derivative every step.
    Continuous { gain: f64 },
    /// After a step's updates, every inverter voltage drops by `penalty` when
    /// the active fraction is below `active_fraction_below`.
    DiscretePenalty { penalty: f64, active_fraction_below: f64 },
}

impl Default for CascadeModel {
    fn default() -> Self {
        CascadeModel::Continuous { gain: 0.03 }
    }
}

impl CascadeModel {
    pub fn discrete(penalty: f64) -> Self {
        CascadeModel::DiscretePenalty { penalty, active_fraction_below: 0.5 }
    }

    /// Derivative contribution for one active inverter (always ≤ 0).
    pub fn pressure(&self, active_fraction: f64) -> f64 {
        match *self {
            CascadeModel::Continuous { gain } => -gain * (1.0 - active_fraction),
            CascadeModel::DiscretePenalty { .. } => 0.0,
        }
    }

    /// Voltage drop applied to the whole cluster after a step's updates.
    pub fn step_penalty(&self, active_count: usize, inverter_count: usize) -> Option<f64> {
        match *self {
            CascadeModel::Continuous { .. } => None,
            CascadeModel::DiscretePenalty { penalty, active_fraction_below } => {
                ((active_count as f64) < inverter_count as f64 * active_fraction_below)
                    .then_some(penalty)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_pressure_grows_with_tripped_fraction() {
        let model = CascadeModel::Continuous { gain: 0.03 };
        assert_eq!(model.pressure(1.0), 0.0);
        assert!((model.pressure(0.5) + 0.015).abs() < 1e-12);
        assert!(model.pressure(0.0) < model.pressure(0.5));
        assert_eq!(model.step_penalty(0, 20), None);
    }

    #[test]
    fn discrete_penalty_fires_only_below_half() {
        let model = CascadeModel::discrete(0.02);
        assert_eq!(model.pressure(0.1), 0.0);
        assert_eq!(model.step_penalty(10, 20), None);
        assert_eq!(model.step_penalty(9, 20), Some(0.02));
    }
}
