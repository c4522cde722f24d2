// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Grid Resilience Simulation Suite - Attack Signal
//
// Voltage-disturbance input applied to every active inverter. The attack is a
// step that switches on at `attack_start`; it is either applied raw or passed
// through a first-order low-pass filter before reaching the inverters.

use serde::{Deserialize, Serialize};

/// Default low-pass time constant in seconds.
pub const DEFAULT_FILTER_TIME_CONSTANT: f64 = 0.2;

// ─── Input Shaping ──────────────────────────────────────────────────────────

/// How the raw attack step is shaped before it reaches the inverters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttackInput {
    /// Raw step: full magnitude from the first step at or after `attack_start`.
    Step,
    /// First-order low-pass: `state += (input - state) * dt / time_constant`.
    Filtered { time_constant: f64 },
}

impl Default for AttackInput {
    fn default() -> Self {
        AttackInput::Step
    }
}

impl AttackInput {
    pub fn filtered() -> Self {
        AttackInput::Filtered { time_constant: DEFAULT_FILTER_TIME_CONSTANT }
    }

    pub fn is_filtered(&self) -> bool {
        matches!(self, AttackInput::Filtered { .. })
    }
}

// ─── Magnitude Scaling ──────────────────────────────────────────────────────

/// How the per-call `attack_scale` maps to an attack magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackScaling {
    /// magnitude = attack_base_magnitude × attack_scale
    Multiplier,
    /// magnitude = attack_scale
    Direct,
}

impl Default for AttackScaling {
    fn default() -> Self {
        AttackScaling::Multiplier
    }
}

impl AttackScaling {
    pub fn magnitude(&self, base: f64, scale: f64) -> f64 {
        match self {
            AttackScaling::Multiplier => base * scale,
            AttackScaling::Direct => scale,
        }
    }
}

// ─── Per-Run Signal State ───────────────────────────────────────────────────

/// Attack signal for one run. Holds the filter state when filtering is active.
#[derive(Debug, Clone)]
pub struct AttackSignal {
    input: AttackInput,
    magnitude: f64,
    start: f64,
    filtered_state: f64,
}

impl AttackSignal {
    pub fn new(input: AttackInput, magnitude: f64, start: f64) -> Self {
        Self { input, magnitude, start, filtered_state: 0.0 }
    }

    /// Advance one step and return the attack value seen by the inverters.
    pub fn advance(&mut self, time: f64, dt: f64) -> f64 {
        let raw = if time >= self.start { self.magnitude } else { 0.0 };
        match self.input {
            AttackInput::Step => raw,
            AttackInput::Filtered { time_constant } => {
                self.filtered_state += (raw - self.filtered_state) * dt / time_constant;
                self.filtered_state
            }
        }
    }

    /// Current low-pass state; stays 0 for the step input.
    pub fn filtered_state(&self) -> f64 {
        self.filtered_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_is_zero_before_start_and_full_after() {
        let mut signal = AttackSignal::new(AttackInput::Step, 0.8, 2.0);
        assert_eq!(signal.advance(1.99, 0.01), 0.0);
        assert_eq!(signal.advance(2.0, 0.01), 0.8);
        assert_eq!(signal.advance(5.0, 0.01), 0.8);
        assert_eq!(signal.filtered_state(), 0.0);
    }

    #[test]
    fn filtered_input_rises_towards_magnitude() {
        let mut signal = AttackSignal::new(AttackInput::filtered(), 1.0, 0.0);
        let first = signal.advance(0.0, 0.01);
        assert!((first - 0.05).abs() < 1e-12, "first filtered value {}", first);

        let mut last = first;
        for step in 1..300 {
            let value = signal.advance(step as f64 * 0.01, 0.01);
            assert!(value >= last, "filter output must not decrease under a constant step");
            last = value;
        }
        assert!((last - 1.0).abs() < 1e-3, "filter should settle near 1.0, got {}", last);
    }

    #[test]
    fn scaling_modes() {
        assert_eq!(AttackScaling::Multiplier.magnitude(0.8, 0.5), 0.4);
        assert_eq!(AttackScaling::Direct.magnitude(0.8, 0.5), 0.5);
    }
}
