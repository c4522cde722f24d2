// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Grid Resilience Simulation Suite - Cluster State
//
// Mutable per-run state of the inverter cluster. Created at run start, mutated
// once per step by the simulator, dropped once the run result is extracted.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::params::{ParameterSet, TripThresholds};

/// Voltages, active flags and trip thresholds for one run.
#[derive(Debug, Clone)]
pub struct ClusterState {
    pub(crate) voltages: Vec<f64>,
    pub(crate) active: Vec<bool>,
    pub(crate) trip_thresholds: Vec<f64>,
    pub(crate) detected: bool,
}

impl ClusterState {
    /// Fresh cluster at nominal voltage with every inverter active.
    ///
    /// Randomized trip thresholds are drawn here, before any step noise, so a
    /// seed fixes them for the whole run.
    pub fn new<R: Rng + ?Sized>(params: &ParameterSet, rng: &mut R) -> Self {
        let n = params.inverter_count;
        let trip_thresholds = match params.trip {
            TripThresholds::Fixed { threshold } => vec![threshold; n],
            TripThresholds::Randomized { mean, std } => (0..n)
                .map(|_| {
                    let z: f64 = rng.sample(StandardNormal);
                    mean + std * z
                })
                .collect(),
        };

        Self {
            voltages: vec![1.0; n],
            active: vec![true; n],
            trip_thresholds,
            detected: false,
        }
    }

    pub fn inverter_count(&self) -> usize {
        self.voltages.len()
    }

    pub fn voltages(&self) -> &[f64] {
        &self.voltages
    }

    pub fn active(&self) -> &[bool] {
        &self.active
    }

    pub fn trip_thresholds(&self) -> &[f64] {
        &self.trip_thresholds
    }

    pub fn is_detected(&self) -> bool {
        self.detected
    }

    /// Mean over all inverters, tripped ones included at their pinned voltage.
    pub fn average_voltage(&self) -> f64 {
        self.voltages.iter().sum::<f64>() / self.voltages.len() as f64
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|&&a| a).count()
    }

    pub fn active_fraction(&self) -> f64 {
        self.active_count() as f64 / self.active.len() as f64
    }

    /// Largest |V - 1| across the cluster right now.
    pub fn max_deviation(&self) -> f64 {
        self.voltages
            .iter()
            .map(|v| (v - 1.0).abs())
            .fold(0.0_f64, f64::max)
    }

    /// One-way detection latch. Returns `true` only on the step it fires.
    pub(crate) fn latch_detection(&mut self, time: f64, detection_time: f64) -> bool {
        if !self.detected && time >= detection_time {
            self.detected = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn starts_nominal_and_active() {
        let params = ParameterSet::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let state = ClusterState::new(&params, &mut rng);

        assert_eq!(state.inverter_count(), 20);
        assert_eq!(state.average_voltage(), 1.0);
        assert_eq!(state.active_fraction(), 1.0);
        assert_eq!(state.max_deviation(), 0.0);
        assert!(!state.is_detected());
    }

    #[test]
    fn randomized_thresholds_depend_only_on_seed() {
        let params = ParameterSet::default();
        let a = ClusterState::new(&params, &mut ChaCha8Rng::seed_from_u64(11));
        let b = ClusterState::new(&params, &mut ChaCha8Rng::seed_from_u64(11));
        let c = ClusterState::new(&params, &mut ChaCha8Rng::seed_from_u64(12));

        assert_eq!(a.trip_thresholds(), b.trip_thresholds());
        assert_ne!(a.trip_thresholds(), c.trip_thresholds());
        for &t in a.trip_thresholds() {
            assert!((t - 0.85).abs() < 0.06, "threshold {} far from mean", t);
        }
    }

    #[test]
    fn fixed_thresholds_are_uniform() {
        let params = ParameterSet::differentiation();
        let state = ClusterState::new(&params, &mut ChaCha8Rng::seed_from_u64(0));
        assert!(state.trip_thresholds().iter().all(|&t| t == 0.80));
    }

    #[test]
    fn detection_latch_never_resets() {
        let params = ParameterSet::default();
        let mut state = ClusterState::new(&params, &mut ChaCha8Rng::seed_from_u64(0));

        assert!(!state.latch_detection(2.5, 3.0));
        assert!(state.latch_detection(3.0, 3.0));
        assert!(!state.latch_detection(3.5, 3.0), "latch fires only once");
        assert!(state.is_detected());
    }

    #[test]
    fn tripped_units_pull_the_average_down() {
        let params = ParameterSet { inverter_count: 4, ..ParameterSet::default() };
        let mut state = ClusterState::new(&params, &mut ChaCha8Rng::seed_from_u64(0));
        state.voltages[0] = 0.0;
        state.active[0] = false;

        assert_eq!(state.active_count(), 3);
        assert_eq!(state.active_fraction(), 0.75);
        assert_eq!(state.average_voltage(), 0.75);
        assert_eq!(state.max_deviation(), 1.0);
    }
}
