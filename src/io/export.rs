//! CSV export of episode step records and per-episode KPI summaries.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::Result;
use crate::runner::EpisodeResult;

/// Column header, one row per step per episode.
const HEADER: &str = "controller,step,day_of_year,time_of_day,\
                      charge,discharge,load_shift,import_allow,curtailment,\
                      reward,done,solar_kw,wind_kw,load_kw,\
                      battery_soc,battery_kw,battery_health,grid_import_kw,\
                      frequency_hz,voltage_pu,cloud_cover,wind_speed,temperature_c,\
                      stability,energy_cost,safety_violations";

/// Column header of the summary, one row per episode.
const SUMMARY_HEADER: &str = "controller,steps,total_reward,mean_reward,\
                              mean_stability,min_stability,outages,uptime_pct,\
                              renewable_fraction,renewable_kwh,co2_saved_t,\
                              grid_import_kwh,grid_export_kwh,total_cost,\
                              cost_savings,cost_savings_pct,battery_throughput_kwh,\
                              safety_violations,terminated_early";

/// Exports the step records of `episodes` to a CSV file at `path`.
///
/// Rows keep episode order, then step order. Identical inputs produce
/// identical bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_csv(episodes: &[&EpisodeResult], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_csv(episodes, io::BufWriter::new(file))
}

/// Writes the step records of `episodes` as CSV to any writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_csv(episodes: &[&EpisodeResult], writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for episode in episodes {
        for r in &episode.records {
            let s = &r.state;
            let mut row = vec![
                episode.controller.clone(),
                r.step.to_string(),
                s.day_of_year.to_string(),
                format!("{:.2}", s.time_of_day),
            ];
            row.extend(r.action.as_slice().iter().map(|a| format!("{a:.4}")));
            row.extend([
                format!("{:.4}", r.reward),
                r.done.to_string(),
                format!("{:.4}", s.solar_generation),
                format!("{:.4}", s.wind_generation),
                format!("{:.4}", s.load_demand),
                format!("{:.4}", s.battery_soc),
                format!("{:.4}", s.battery_charge_rate),
                format!("{:.6}", s.battery_health),
                format!("{:.4}", s.grid_import),
                format!("{:.4}", s.grid_frequency),
                format!("{:.4}", s.grid_voltage),
                format!("{:.4}", s.cloud_cover),
                format!("{:.4}", s.wind_speed),
                format!("{:.4}", s.temperature),
                format!("{:.4}", s.stability_score),
                format!("{:.4}", s.energy_cost),
                r.safety_violations.to_string(),
            ]);
            wtr.write_record(&row)?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Exports one KPI row per episode to a CSV file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_summary_csv(episodes: &[&EpisodeResult], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_summary_csv(episodes, io::BufWriter::new(file))
}

/// Writes one KPI row per episode as CSV to any writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_summary_csv(episodes: &[&EpisodeResult], writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(SUMMARY_HEADER.split(',').map(str::trim))?;

    for episode in episodes {
        let k = &episode.kpis;
        wtr.write_record([
            episode.controller.clone(),
            k.steps.to_string(),
            format!("{:.4}", k.total_reward),
            format!("{:.4}", k.mean_reward),
            format!("{:.4}", k.mean_stability),
            format!("{:.4}", k.min_stability),
            k.outages.to_string(),
            format!("{:.2}", k.uptime_pct),
            format!("{:.4}", k.renewable_fraction),
            format!("{:.4}", k.renewable_kwh),
            format!("{:.6}", k.co2_saved_t),
            format!("{:.4}", k.grid_import_kwh),
            format!("{:.4}", k.grid_export_kwh),
            format!("{:.4}", k.total_cost),
            format!("{:.4}", k.cost_savings),
            format!("{:.2}", k.cost_savings_pct),
            format!("{:.4}", k.battery_throughput_kwh),
            k.safety_violations.to_string(),
            k.terminated_early.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
