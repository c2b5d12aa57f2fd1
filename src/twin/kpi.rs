//! Post-hoc KPI computation from episode step records.

use std::fmt;

use serde::Serialize;

use super::types::StepRecord;

/// Stability below this counts the step as an outage.
pub const OUTAGE_STABILITY: f32 = 0.7;

/// Grid emission factor displaced by renewable energy (kg CO₂ per kWh).
pub const GRID_EMISSION_KG_PER_KWH: f32 = 0.82;

/// Reference energy cost per step that savings are measured against.
pub const REFERENCE_COST_PER_STEP: f32 = 150.0;

/// Aggregate indicators of one episode.
///
/// Computed post-hoc from the `StepRecord`s so that reported metrics always
/// agree with the recorded trajectory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EpisodeKpis {
    /// Steps taken.
    pub steps: usize,
    /// Sum of rewards.
    pub total_reward: f32,
    /// Mean reward per step.
    pub mean_reward: f32,
    /// Mean stability score.
    pub mean_stability: f32,
    /// Lowest stability score seen.
    pub min_stability: f32,
    /// Steps with stability below [`OUTAGE_STABILITY`].
    pub outages: usize,
    /// Share of steps without an outage (percent).
    pub uptime_pct: f32,
    /// Share of demand energy covered by renewables (0.0–1.0).
    pub renewable_fraction: f32,
    /// Solar plus wind energy generated (kWh).
    pub renewable_kwh: f32,
    /// Grid emissions displaced by `renewable_kwh` (tonnes CO₂).
    pub co2_saved_t: f32,
    /// Energy imported from the grid (kWh).
    pub grid_import_kwh: f32,
    /// Energy exported to the grid (kWh).
    pub grid_export_kwh: f32,
    /// Sum of per-step energy costs (currency).
    pub total_cost: f32,
    /// `REFERENCE_COST_PER_STEP * steps - total_cost`.
    pub cost_savings: f32,
    /// `cost_savings` relative to the reference cost (percent).
    pub cost_savings_pct: f32,
    /// Energy moved through the battery (kWh, sum of |power| * dt).
    pub battery_throughput_kwh: f32,
    /// Safety violations raised during the episode.
    pub safety_violations: u64,
    /// Whether the episode ended before its horizon.
    pub terminated_early: bool,
}

impl EpisodeKpis {
    /// Computes all KPIs from an episode's step records.
    ///
    /// # Arguments
    ///
    /// * `records` - Step records in order
    /// * `dt_hours` - Timestep duration in hours
    /// * `violations_before` - Twin's cumulative safety violations at episode start
    /// * `horizon_steps` - Step count at which the episode would end normally
    pub fn from_records(
        records: &[StepRecord],
        dt_hours: f32,
        violations_before: u64,
        horizon_steps: usize,
    ) -> Self {
        let Some(last) = records.last() else {
            return Self::default();
        };

        let n = records.len() as f32;
        let mut total_reward = 0.0_f32;
        let mut stability_sum = 0.0_f32;
        let mut min_stability = f32::INFINITY;
        let mut outages = 0;
        let mut generated = 0.0_f32;
        let mut renewable_used = 0.0_f32;
        let mut demand = 0.0_f32;
        let mut import = 0.0_f32;
        let mut export = 0.0_f32;
        let mut cost = 0.0_f32;
        let mut throughput = 0.0_f32;

        for r in records {
            let s = &r.state;
            total_reward += r.reward;
            stability_sum += s.stability_score;
            min_stability = min_stability.min(s.stability_score);
            if s.stability_score < OUTAGE_STABILITY {
                outages += 1;
            }
            generated += s.renewable_generation() * dt_hours;
            renewable_used += s.renewable_generation().min(s.load_demand) * dt_hours;
            demand += s.load_demand * dt_hours;
            import += s.grid_import.max(0.0) * dt_hours;
            export += (-s.grid_import).max(0.0) * dt_hours;
            cost += s.energy_cost;
            throughput += s.battery_charge_rate.abs() * dt_hours;
        }

        let reference_cost = REFERENCE_COST_PER_STEP * n;
        Self {
            steps: records.len(),
            total_reward,
            mean_reward: total_reward / n,
            mean_stability: stability_sum / n,
            min_stability,
            outages,
            uptime_pct: 100.0 * (1.0 - outages as f32 / n),
            renewable_fraction: if demand > 0.0 {
                renewable_used / demand
            } else {
                0.0
            },
            renewable_kwh: generated,
            co2_saved_t: generated * GRID_EMISSION_KG_PER_KWH / 1000.0,
            grid_import_kwh: import,
            grid_export_kwh: export,
            total_cost: cost,
            cost_savings: reference_cost - cost,
            cost_savings_pct: 100.0 * (reference_cost - cost) / reference_cost,
            battery_throughput_kwh: throughput,
            safety_violations: last.safety_violations.saturating_sub(violations_before),
            terminated_early: last.done && records.len() < horizon_steps,
        }
    }
}

impl fmt::Display for EpisodeKpis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Steps:                 {}", self.steps)?;
        writeln!(
            f,
            "Reward:                {:.2} total, {:.3} mean",
            self.total_reward, self.mean_reward
        )?;
        writeln!(
            f,
            "Stability:             {:.3} mean, {:.3} min",
            self.mean_stability, self.min_stability
        )?;
        writeln!(
            f,
            "Uptime:                {:.1}% ({} outage steps)",
            self.uptime_pct, self.outages
        )?;
        writeln!(
            f,
            "Renewable fraction:    {:.1}%",
            100.0 * self.renewable_fraction
        )?;
        writeln!(
            f,
            "Renewable energy:      {:.2} kWh, {:.3} t CO2 saved",
            self.renewable_kwh, self.co2_saved_t
        )?;
        writeln!(f, "Grid import:           {:.2} kWh", self.grid_import_kwh)?;
        writeln!(f, "Grid export:           {:.2} kWh", self.grid_export_kwh)?;
        writeln!(f, "Energy cost:           {:.2}", self.total_cost)?;
        writeln!(
            f,
            "Cost savings:          {:.2} ({:.1}% of reference)",
            self.cost_savings, self.cost_savings_pct
        )?;
        writeln!(
            f,
            "Battery throughput:    {:.2} kWh",
            self.battery_throughput_kwh
        )?;
        writeln!(f, "Safety violations:     {}", self.safety_violations)?;
        write!(f, "Terminated early:      {}", self.terminated_early)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twin::state::GridState;
    use crate::twin::types::Action;

    fn record(step: usize, stability: f32, import: f32, done: bool, violations: u64) -> StepRecord {
        StepRecord {
            step,
            action: Action::default(),
            reward: 10.0,
            done,
            state: GridState {
                solar_generation: 200.0,
                wind_generation: 100.0,
                load_demand: 400.0,
                grid_import: import,
                battery_charge_rate: -50.0,
                stability_score: stability,
                energy_cost: 1.5,
                ..GridState::default()
            },
            safety_violations: violations,
        }
    }

    #[test]
    fn empty_records_yield_zeroed_report() {
        let k = EpisodeKpis::from_records(&[], 0.1, 0, 1000);
        assert_eq!(k, EpisodeKpis::default());
    }

    #[test]
    fn aggregates_over_records() {
        let records = vec![
            record(0, 0.9, 100.0, false, 3),
            record(1, 0.7, -50.0, false, 4),
            record(2, 0.8, 0.0, true, 6),
        ];
        let k = EpisodeKpis::from_records(&records, 0.1, 2, 1000);
        assert_eq!(k.steps, 3);
        assert!((k.total_reward - 30.0).abs() < 1e-4);
        assert!((k.mean_reward - 10.0).abs() < 1e-4);
        assert!((k.mean_stability - 0.8).abs() < 1e-5);
        assert!((k.min_stability - 0.7).abs() < 1e-6);
        assert!((k.renewable_fraction - 0.75).abs() < 1e-5);
        assert!((k.grid_import_kwh - 10.0).abs() < 1e-4);
        assert!((k.grid_export_kwh - 5.0).abs() < 1e-4);
        assert!((k.total_cost - 4.5).abs() < 1e-4);
        assert!((k.battery_throughput_kwh - 15.0).abs() < 1e-4);
        assert_eq!(k.safety_violations, 4);
        assert!(k.terminated_early);
    }

    #[test]
    fn reliability_sustainability_and_savings() {
        let records: Vec<StepRecord> = [0.9, 0.65, 0.5, 0.8]
            .iter()
            .enumerate()
            .map(|(i, &stability)| record(i, stability, 0.0, false, 0))
            .collect();
        let k = EpisodeKpis::from_records(&records, 0.1, 0, 1000);
        assert_eq!(k.outages, 2);
        assert!((k.uptime_pct - 50.0).abs() < 1e-4);
        // 300 kW of solar and wind for 4 steps of 0.1 h.
        assert!((k.renewable_kwh - 120.0).abs() < 1e-3);
        assert!((k.co2_saved_t - 0.0984).abs() < 1e-6);
        // Reference 4 * 150 against 4 * 1.5 spent.
        assert!((k.cost_savings - 594.0).abs() < 1e-3);
        assert!((k.cost_savings_pct - 99.0).abs() < 1e-3);
    }

    #[test]
    fn stability_at_threshold_is_not_an_outage() {
        let records = vec![record(0, OUTAGE_STABILITY, 0.0, false, 0)];
        let k = EpisodeKpis::from_records(&records, 0.1, 0, 1000);
        assert_eq!(k.outages, 0);
        assert_eq!(k.uptime_pct, 100.0);
    }

    #[test]
    fn reaching_horizon_is_not_early() {
        let records = vec![record(0, 0.9, 0.0, false, 0), record(1, 0.9, 0.0, true, 0)];
        let k = EpisodeKpis::from_records(&records, 0.1, 0, 2);
        assert!(!k.terminated_early);
    }

    #[test]
    fn display_lists_every_metric() {
        let k = EpisodeKpis::from_records(&[record(0, 0.9, 0.0, false, 0)], 0.1, 0, 10);
        let text = k.to_string();
        for label in [
            "Steps",
            "Reward",
            "Stability",
            "Uptime",
            "Renewable",
            "CO2 saved",
            "Cost savings",
            "Safety violations",
        ] {
            assert!(text.contains(label), "missing {label}");
        }
    }
}
