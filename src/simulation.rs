// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Grid Resilience Simulation Suite - Single-Run Simulator

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::attack::AttackSignal;
use crate::error::ResilienceError;
use crate::params::{ConfigurationError, ParameterSet};
use crate::state::ClusterState;

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("non-finite voltage {value} on inverter {inverter} at step {step} (seed {seed:?})")]
    NumericalDegeneracy {
        step: usize,
        inverter: usize,
        value: f64,
        seed: Option<u64>,
    },
}

// ─── Run Result ─────────────────────────────────────────────────────────────

/// Outcome of one run. `severity` is the peak |V - 1| over the whole trace
/// plus the tripped fraction; `resilience = 1 / (1 + severity)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub collapse: bool,
    pub severity: f64,
    pub resilience: f64,
    pub final_active_fraction: f64,
    pub final_mean_voltage: f64,
    pub max_deviation: f64,
    pub tripped_fraction: f64,
    pub detection_time: Option<f64>,
    pub seed: Option<u64>,
}

// ─── ClusterSimulation ──────────────────────────────────────────────────────

/// One instance of the inverter-cluster state machine.
///
/// Owns its state, attack signal and RNG; nothing is shared across runs.
pub struct ClusterSimulation<'a> {
    params: &'a ParameterSet,
    mitigate: bool,
    seed: Option<u64>,
    rng: ChaCha8Rng,
    state: ClusterState,
    attack: AttackSignal,
    next: Vec<f64>,
    step: usize,
    steps: usize,
    max_deviation: f64,
    detection_time: Option<f64>,
}

impl<'a> ClusterSimulation<'a> {
    /// Build a run. `params` must already be validated.
    pub fn new(params: &'a ParameterSet, attack_scale: f64, mitigate: bool, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        let state = ClusterState::new(params, &mut rng);
        let attack = AttackSignal::new(
            params.attack_input,
            params.attack_magnitude(attack_scale),
            params.attack_start,
        );

        Self {
            params,
            mitigate,
            seed,
            rng,
            next: vec![0.0; params.inverter_count],
            state,
            attack,
            step: 0,
            steps: params.steps(),
            max_deviation: 0.0,
            detection_time: None,
        }
    }

    pub fn state(&self) -> &ClusterState {
        &self.state
    }

    pub fn current_step(&self) -> usize {
        self.step
    }

    pub fn is_finished(&self) -> bool {
        self.step + 1 >= self.steps
    }

    pub fn attack_filtered_state(&self) -> f64 {
        self.attack.filtered_state()
    }

    /// Advance one discrete step. Returns `Ok(false)` once the horizon is reached.
    pub fn step_core(&mut self) -> Result<bool, SimulationError> {
        if self.is_finished() {
            return Ok(false);
        }
        self.step += 1;
        let p = self.params;
        let t = self.step;
        let time = t as f64 * p.dt;

        let attack = self.attack.advance(time, p.dt);
        if self.state.latch_detection(time, p.detection_time()) {
            self.detection_time = Some(time);
        }

        // Feedback terms read the previous step's state.
        let avg_voltage = self.state.average_voltage();
        let active_fraction = self.state.active_fraction();

        let mitigating = self.mitigate && self.state.detected;
        let (effective_attack, damping) = if mitigating {
            (
                attack * p.mitigation.attack_factor,
                p.damping_gain * p.mitigation.damping_factor,
            )
        } else {
            (attack, p.damping_gain)
        };
        let cascade = p.cascade.pressure(active_fraction);
        let may_reconnect = mitigating
            && p.mitigation.reconnect
            && avg_voltage > p.reconnect_threshold;

        for i in 0..self.state.voltages.len() {
            // Drawn for every inverter so paired runs stay on the same stream.
            let z: f64 = self.rng.sample(StandardNormal);
            let noise = p.noise_std * z;

            if !self.state.active[i] {
                if may_reconnect {
                    self.state.active[i] = true;
                } else {
                    self.next[i] = 0.0;
                    continue;
                }
            }

            let v = self.state.voltages[i];
            let droop = p.droop_gain * (1.0 - v);
            let coupling = p.coupling_strength * (avg_voltage - v);
            let recovery = if mitigating { p.recovery_gain * (1.0 - v) } else { 0.0 };

            let dv = -damping * (v - 1.0) - effective_attack
                + droop
                + coupling
                + recovery
                + cascade
                + noise;
            let mut updated = v + p.dt * dv;

            if !updated.is_finite() {
                return Err(SimulationError::NumericalDegeneracy {
                    step: t,
                    inverter: i,
                    value: updated,
                    seed: self.seed,
                });
            }

            if updated < self.state.trip_thresholds[i] {
                self.state.active[i] = false;
                updated = 0.0;
            }
            self.next[i] = updated;
        }

        if let Some(penalty) = p
            .cascade
            .step_penalty(self.state.active_count(), self.state.inverter_count())
        {
            for v in self.next.iter_mut() {
                *v -= penalty;
            }
        }

        std::mem::swap(&mut self.state.voltages, &mut self.next);
        self.max_deviation = self.max_deviation.max(self.state.max_deviation());
        Ok(true)
    }

    /// Run to the horizon and score the trace.
    pub fn run(mut self) -> Result<RunResult, SimulationError> {
        while self.step_core()? {}
        Ok(self.finish())
    }

    fn finish(&self) -> RunResult {
        let final_active_fraction = self.state.active_fraction();
        let final_mean_voltage = self.state.average_voltage();
        let tripped_fraction = 1.0 - final_active_fraction;
        let severity = self.max_deviation + tripped_fraction;

        RunResult {
            collapse: self
                .params
                .collapse
                .is_collapse(final_active_fraction, final_mean_voltage),
            severity,
            resilience: 1.0 / (1.0 + severity),
            final_active_fraction,
            final_mean_voltage,
            max_deviation: self.max_deviation,
            tripped_fraction,
            detection_time: self.detection_time,
            seed: self.seed,
        }
    }
}

// ─── Entry Points ───────────────────────────────────────────────────────────

/// Simulate one (attack scale, mitigation, seed) triple.
///
/// With `Some(seed)` every random draw of the run (trip thresholds and step
/// noise) is fixed by the seed, so a mitigated and an unmitigated call with
/// the same seed see the same disturbances.
pub fn simulate(
    params: &ParameterSet,
    attack_scale: f64,
    mitigate: bool,
    seed: Option<u64>,
) -> Result<RunResult, ResilienceError> {
    params.validate()?;
    check_attack_scale(attack_scale)?;
    Ok(run_validated(params, attack_scale, mitigate, seed)?)
}

pub(crate) fn run_validated(
    params: &ParameterSet,
    attack_scale: f64,
    mitigate: bool,
    seed: Option<u64>,
) -> Result<RunResult, SimulationError> {
    ClusterSimulation::new(params, attack_scale, mitigate, seed).run()
}

pub(crate) fn check_attack_scale(attack_scale: f64) -> Result<(), ConfigurationError> {
    if !attack_scale.is_finite() {
        return Err(ConfigurationError::NotFinite { field: "attack_scale", value: attack_scale });
    }
    if attack_scale < 0.0 {
        return Err(ConfigurationError::Negative { field: "attack_scale", value: attack_scale });
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────
