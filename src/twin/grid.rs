//! Grid exchange, frequency/voltage response, stability, and energy cost.

use crate::config::{GridConfig, TariffConfig};
use crate::twin::types::Action;

/// Electrical condition of the point of common coupling after a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridResponse {
    /// Net imbalance seen by the grid: load - renewable - battery (kW).
    pub balance_kw: f32,
    /// Signed exchange; positive = import, negative = export (kW).
    pub import_kw: f32,
    /// Frequency (Hz).
    pub frequency_hz: f32,
    /// Voltage (pu).
    pub voltage_pu: f32,
}

/// Settles the site balance against the grid.
///
/// When the import switch is on (> 0.5) the full balance is exchanged,
/// including export of any surplus; otherwise only deficits are imported.
/// Frequency and voltage follow the raw balance through linear droops and
/// are clipped to their safe bands.
pub fn settle(
    load_kw: f32,
    renewable_kw: f32,
    battery_kw: f32,
    action: &Action,
    cfg: &GridConfig,
) -> GridResponse {
    let balance_kw = load_kw - renewable_kw - battery_kw;
    let import_kw = if action.import_allow() > 0.5 {
        balance_kw
    } else {
        balance_kw.max(0.0)
    };
    let frequency_hz = (cfg.nominal_frequency_hz - balance_kw / cfg.frequency_droop_kw)
        .clamp(cfg.min_frequency_hz, cfg.max_frequency_hz);
    let voltage_pu = (cfg.nominal_voltage_pu - balance_kw.abs() / cfg.voltage_droop_kw)
        .clamp(cfg.min_voltage_pu, cfg.max_voltage_pu);
    GridResponse {
        balance_kw,
        import_kw,
        frequency_hz,
        voltage_pu,
    }
}

/// Inputs to the stability score.
#[derive(Debug, Clone, Copy)]
pub struct StabilityInputs {
    pub frequency_hz: f32,
    pub voltage_pu: f32,
    pub battery_health: f32,
    pub solar_kw: f32,
    pub wind_kw: f32,
    pub battery_kw: f32,
    pub import_kw: f32,
    pub load_kw: f32,
}

/// Composite stability score in [0, 1].
///
/// Weighted sum: frequency closeness 0.3, voltage closeness 0.3, battery
/// health 0.2, and supply adequacy 0.2 (solar + wind + |battery| + positive
/// import over demand, capped at 1).
pub fn stability_score(i: &StabilityInputs, cfg: &GridConfig) -> f32 {
    let freq = (1.0 - (i.frequency_hz - cfg.nominal_frequency_hz).abs() / cfg.frequency_tolerance_hz)
        .max(0.0);
    let volt =
        (1.0 - (i.voltage_pu - cfg.nominal_voltage_pu).abs() / cfg.voltage_tolerance_pu).max(0.0);
    let supply = i.solar_kw + i.wind_kw + i.battery_kw.abs() + i.import_kw.max(0.0);
    let adequacy = (supply / i.load_kw.max(1.0)).min(1.0);
    0.3 * freq + 0.3 * volt + 0.2 * i.battery_health + 0.2 * adequacy
}

/// Energy cost of one step: import cost minus export revenue plus battery wear.
pub fn energy_cost(import_kw: f32, battery_kw: f32, dt_hours: f32, cfg: &TariffConfig) -> f32 {
    let import = import_kw.max(0.0) * cfg.import_price * dt_hours;
    let export = (-import_kw).max(0.0) * cfg.export_price * dt_hours;
    let wear = battery_kw.abs() * cfg.degradation_cost * dt_hours;
    import - export + wear
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow() -> Action {
        Action::new(0.0, 0.0, 0.0, 1.0, 0.0)
    }

    #[test]
    fn balanced_site_is_nominal() {
        let g = settle(400.0, 300.0, 100.0, &allow(), &GridConfig::default());
        assert_eq!(g.balance_kw, 0.0);
        assert_eq!(g.import_kw, 0.0);
        assert_eq!(g.frequency_hz, 50.0);
        assert_eq!(g.voltage_pu, 1.0);
    }

    #[test]
    fn deficit_lowers_frequency_and_voltage() {
        let g = settle(700.0, 200.0, 0.0, &allow(), &GridConfig::default());
        assert_eq!(g.import_kw, 500.0);
        assert!((g.frequency_hz - 49.5).abs() < 1e-5);
        assert!((g.voltage_pu - 0.9).abs() < 1e-5);
    }

    #[test]
    fn surplus_exported_only_when_allowed() {
        let cfg = GridConfig::default();
        let allowed = settle(100.0, 300.0, 0.0, &allow(), &cfg);
        assert_eq!(allowed.import_kw, -200.0);
        let blocked = settle(100.0, 300.0, 0.0, &Action::default(), &cfg);
        assert_eq!(blocked.import_kw, 0.0);
        // Frequency follows the raw balance either way.
        assert_eq!(allowed.frequency_hz, blocked.frequency_hz);
        assert!((blocked.frequency_hz - 50.2).abs() < 1e-4);
    }

    #[test]
    fn frequency_clipped_to_band() {
        let g = settle(5000.0, 0.0, 0.0, &allow(), &GridConfig::default());
        assert_eq!(g.frequency_hz, 49.0);
        assert_eq!(g.voltage_pu, 0.9);
    }

    #[test]
    fn perfect_conditions_score_one() {
        let i = StabilityInputs {
            frequency_hz: 50.0,
            voltage_pu: 1.0,
            battery_health: 1.0,
            solar_kw: 300.0,
            wind_kw: 100.0,
            battery_kw: 0.0,
            import_kw: 0.0,
            load_kw: 400.0,
        };
        assert!((stability_score(&i, &GridConfig::default()) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn score_degrades_with_deviation() {
        let i = StabilityInputs {
            frequency_hz: 49.5,
            voltage_pu: 0.95,
            battery_health: 0.5,
            solar_kw: 100.0,
            wind_kw: 0.0,
            battery_kw: 0.0,
            import_kw: 100.0,
            load_kw: 400.0,
        };
        // 0.3*0.5 + 0.3*0.5 + 0.2*0.5 + 0.2*0.5
        assert!((stability_score(&i, &GridConfig::default()) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn cost_terms() {
        let t = TariffConfig::default();
        assert!((energy_cost(100.0, 0.0, 0.1, &t) - 70.0).abs() < 1e-4);
        assert!((energy_cost(-100.0, 0.0, 0.1, &t) + 40.0).abs() < 1e-4);
        assert!((energy_cost(0.0, -50.0, 0.1, &t) - 2.5).abs() < 1e-4);
    }
}
