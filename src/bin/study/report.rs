// Study Report Types
// Structured JSON output for independent analysis and plotting

use inverter_resilience::{
    BoundaryEstimate, ParameterSet, ResilienceMetric, ResilienceStudy, SweepConfig, SweepPoint,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct StudyReport {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub preset: String,
    pub parameters: ParameterSet,
    pub sweep: SweepConfig,
    pub boundary: Option<BoundaryEstimate>,
    pub points: Vec<SweepPoint>,
    pub metric: ResilienceMetric,
}

impl StudyReport {
    pub fn new(
        timestamp: String,
        preset: String,
        parameters: ParameterSet,
        sweep: SweepConfig,
        study: ResilienceStudy,
    ) -> Self {
        Self {
            timestamp,
            version: env!("CARGO_PKG_VERSION"),
            prng: "ChaCha8Rng",
            preset,
            parameters,
            sweep,
            boundary: study.boundary,
            points: study.points,
            metric: study.metric,
        }
    }
}

// ─── Console Table ──────────────────────────────────────────────────────────

pub fn print_header() {
    println!("  {:>10} {:>14} {:>14} {:>9} {:>9}",
        "Attack", "NoMit", "Mit", "Rescued", "Worsened");
    println!("  {}", "-".repeat(60));
}

pub fn print_point(p: &SweepPoint) {
    println!("  {:>10.3} {:>7.3}±{:<6.3} {:>7.3}±{:<6.3} {:>9} {:>9}",
        p.attack_magnitude,
        p.collapse_probability_no_mitigation, p.std_error_no_mitigation,
        p.collapse_probability_mitigated, p.std_error_mitigated,
        p.rescued, p.worsened,
    );
}

pub fn print_metric(m: &ResilienceMetric) {
    println!("\n  =================================");
    println!("  RESILIENCE METRIC");
    println!("  AUC No Mitigation : {:.4}", m.area_no_mitigation);
    println!("  AUC Mitigation    : {:.4}", m.area_mitigated);
    println!("  Improvement       : {:.2}%", m.improvement_percent);
    println!("  =================================\n");
}
