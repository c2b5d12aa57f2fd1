//! Microgrid twin entry point: train an agent, then compare it with the baseline.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use microgrid_twin::agent::PpoAgent;
use microgrid_twin::config::ScenarioConfig;
use microgrid_twin::io::export::{export_csv, export_summary_csv};
use microgrid_twin::logging::{LogFormat, LogLevel, init_logging};
use microgrid_twin::runner::{Comparison, compare, train_agent};
use microgrid_twin::twin::types::ACTION_DIM;
use microgrid_twin::{Error, Result};

/// Seed offset for agent weights, so they do not share the twin's stream.
const AGENT_SEED_OFFSET: u64 = 1_000;

#[derive(Debug, Parser)]
#[command(
    name = "microgrid-twin",
    about = "Train a dispatch agent on a microgrid digital twin and compare it with the rule-based baseline"
)]
struct Cli {
    /// Load scenario from a TOML file.
    #[arg(long, conflicts_with = "preset")]
    scenario: Option<PathBuf>,

    /// Built-in preset (baseline, stress, predictive, quick).
    #[arg(long)]
    preset: Option<String>,

    /// Override the random seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of training episodes.
    #[arg(long)]
    episodes: Option<usize>,

    /// Fold forecasts into the observations.
    #[arg(long)]
    forecast: bool,

    /// Write step telemetry of both evaluation runs to CSV.
    #[arg(long)]
    telemetry_out: Option<PathBuf>,

    /// Write one KPI row per evaluation run to CSV.
    #[arg(long)]
    summary_out: Option<PathBuf>,

    /// Log level when RUST_LOG is unset.
    #[arg(long, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log output format (compact, pretty, json).
    #[arg(long, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

/// Resolves the scenario: `--scenario`, then `--preset`, then baseline.
fn load_scenario(cli: &Cli) -> Result<ScenarioConfig> {
    let mut scenario = match (&cli.scenario, &cli.preset) {
        (Some(path), _) => ScenarioConfig::from_toml_file(path)?,
        (None, Some(name)) => ScenarioConfig::from_preset(name)?,
        (None, None) => ScenarioConfig::baseline(),
    };
    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(episodes) = cli.episodes {
        scenario.training.episodes = episodes;
    }
    if cli.forecast {
        scenario.forecast.enabled = true;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        return Err(Error::invalid(&errors));
    }
    Ok(scenario)
}

fn run(cli: &Cli) -> Result<()> {
    let scenario = load_scenario(cli)?;
    init_logging(cli.log_level, cli.log_format)?;

    let obs_dim = scenario.twin_config().observation.dim();
    let mut agent = PpoAgent::new(
        obs_dim,
        ACTION_DIM,
        &scenario.agent,
        scenario.simulation.seed.wrapping_add(AGENT_SEED_OFFSET),
    );

    let training = train_agent(&scenario, &mut agent);
    for ep in &training {
        println!(
            "Episode {:>3}: reward {:>10.2}, stability {:.3}, updates {}",
            ep.episode, ep.kpis.total_reward, ep.kpis.mean_stability, ep.updates
        );
    }

    let comparison = compare(&scenario, &mut agent);
    println!("\n== {} ==\n{}", comparison.baseline.controller, comparison.baseline.kpis);
    println!("\n== {} ==\n{}", comparison.agent.controller, comparison.agent.kpis);
    print_deltas(&comparison);

    if let Some(path) = &cli.telemetry_out {
        export_csv(&[&comparison.baseline, &comparison.agent], path)?;
        eprintln!("Telemetry written to {}", path.display());
    }
    if let Some(path) = &cli.summary_out {
        export_summary_csv(&[&comparison.baseline, &comparison.agent], path)?;
        eprintln!("Summary written to {}", path.display());
    }
    Ok(())
}

/// Agent minus baseline for the headline indicators.
fn print_deltas(comparison: &Comparison) {
    let (b, a) = (&comparison.baseline.kpis, &comparison.agent.kpis);
    println!("\n== {} vs {} ==", comparison.agent.controller, comparison.baseline.controller);
    println!("Reward:                {:+.2}", a.total_reward - b.total_reward);
    println!("Mean stability:        {:+.3}", a.mean_stability - b.mean_stability);
    println!("Uptime:                {:+.1} pts", a.uptime_pct - b.uptime_pct);
    println!("CO2 saved:             {:+.3} t", a.co2_saved_t - b.co2_saved_t);
    println!("Cost savings:          {:+.2}", a.cost_savings - b.cost_savings);
    println!(
        "Safety violations:     {:+}",
        a.safety_violations as i64 - b.safety_violations as i64
    );
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
