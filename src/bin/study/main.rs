// Resilience Study Runner: collapse-probability curves with and without mitigation
// Paired Monte Carlo (same seeds both ways), ChaCha8 PRNG, JSON report
//
// Usage:
//   cargo run --release --bin resilience-study                          # Stable model, 300 runs/point
//   cargo run --release --bin resilience-study -- --runs 50             # Quick mode
//   cargo run --release --bin resilience-study -- --preset differentiation
//   cargo run --release --bin resilience-study -- --config params.json --output study.json
//   RUST_LOG=debug cargo run --release --bin resilience-study           # Per-estimate logging

mod report;

use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::de::DeserializeOwned;
use tracing::info;
use tracing_subscriber::EnvFilter;

use inverter_resilience::{run_study, Execution, ParameterSet, SweepConfig};
use report::*;

// ─── CLI ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    Stable,
    Differentiation,
}

#[derive(Debug, Parser)]
#[command(name = "resilience-study", version, about = "Inverter cluster collapse resilience study")]
struct Cli {
    /// Built-in parameter family
    #[arg(long, value_enum, default_value_t = Preset::Stable)]
    preset: Preset,

    /// JSON parameter set; missing fields take the stable defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON sweep configuration (grid, boundary search, execution)
    #[arg(long)]
    sweep: Option<PathBuf>,

    /// Monte Carlo runs per estimate
    #[arg(long)]
    runs: Option<usize>,

    /// Base seed; run i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Run Monte Carlo repetitions on one thread
    #[arg(long)]
    sequential: bool,

    /// Write the JSON report here
    #[arg(long)]
    output: Option<PathBuf>,
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut params = match &cli.config {
        Some(path) => load_json::<ParameterSet>(path)?,
        None => match cli.preset {
            Preset::Stable => ParameterSet::stable(),
            Preset::Differentiation => ParameterSet::differentiation(),
        },
    };
    if let Some(runs) = cli.runs {
        params.monte_carlo_runs = runs;
    }
    if let Some(seed) = cli.seed {
        params.base_seed = seed;
    }
    params.validate().context("invalid parameter set")?;

    let mut sweep = match &cli.sweep {
        Some(path) => load_json::<SweepConfig>(path)?,
        None => match cli.preset {
            Preset::Stable => SweepConfig::default(),
            Preset::Differentiation => SweepConfig::differentiation(),
        },
    };
    if cli.sequential {
        sweep.execution = Execution::Sequential;
    }

    let preset = format!("{:?}", cli.preset).to_lowercase();
    info!(
        preset = %preset,
        runs = params.monte_carlo_runs,
        base_seed = params.base_seed,
        inverters = params.inverter_count,
        "running resilience study"
    );

    let start = Instant::now();
    let study = run_study(&params, &sweep)?;
    let elapsed = start.elapsed();

    println!("\n  Resilience Study v{}", env!("CARGO_PKG_VERSION"));
    println!("  PRNG: ChaCha8Rng | Runs/point: {} | Base seed: {}",
        params.monte_carlo_runs, params.base_seed);
    if let Some(b) = &study.boundary {
        let note = if b.fell_back { " (fallback)" } else { "" };
        println!("  Estimated boundary ≈ {:.3}{}\n", b.attack_scale, note);
    }
    print_header();
    for point in &study.points {
        print_point(point);
    }
    print_metric(&study.metric);
    println!("  Study time: {:.1}s", elapsed.as_secs_f64());

    if let Some(path) = &cli.output {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let report = StudyReport::new(ts.to_string(), preset, params, sweep, study);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("  Results saved to: {}\n", path.display());
    }

    Ok(())
}
