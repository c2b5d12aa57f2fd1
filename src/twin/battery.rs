//! Battery dispatch and state-of-charge bookkeeping.

use crate::config::BatteryConfig;
use crate::twin::types::Action;

/// Battery condition carried between steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryState {
    /// State of charge (0.0–1.0).
    pub soc: f32,
    /// Health factor (1.0 = new).
    pub health: f32,
}

/// Result of one battery dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryDispatch {
    /// Battery power; positive = discharge to the site, negative = charge (kW).
    pub power_kw: f32,
    /// SOC after the step.
    pub soc: f32,
    /// Health after the step.
    pub health: f32,
}

/// Dispatches the battery for one step.
///
/// Charging runs when the charge command exceeds 0.5 and SOC is below
/// `soc_max`; it absorbs only the renewable surplus over the shifted load,
/// bounded by the commanded rate and the headroom to `soc_max`. Discharging
/// runs (only if not charging) when the discharge command exceeds 0.5 and
/// SOC is above `soc_min`; it covers only the deficit, bounded likewise.
/// Stored energy is reduced by the efficiency on charge and drawn at a
/// premium of `1/efficiency` on discharge. Health decays every step.
///
/// # Arguments
///
/// * `battery` - Condition before the step
/// * `action` - Clipped control action
/// * `renewable_kw` - Renewable output after curtailment
/// * `load_kw` - Demand after load shifting
/// * `dt_hours` - Step duration
/// * `cfg` - Battery parameters
pub fn dispatch(
    battery: BatteryState,
    action: &Action,
    renewable_kw: f32,
    load_kw: f32,
    dt_hours: f32,
    cfg: &BatteryConfig,
) -> BatteryDispatch {
    let cap = cfg.capacity_kwh;
    let soc = battery.soc;

    let power_kw = if action.charge() > 0.5 && soc < cfg.soc_max {
        let surplus = (renewable_kw - load_kw).max(0.0);
        let headroom = (cfg.soc_max - soc) * cap / dt_hours;
        -surplus.min(action.charge() * cfg.max_rate_kw).min(headroom)
    } else if action.discharge() > 0.5 && soc > cfg.soc_min {
        let deficit = (load_kw - renewable_kw).max(0.0);
        let available = (soc - cfg.soc_min) * cap / dt_hours;
        deficit.min(action.discharge() * cfg.max_rate_kw).min(available)
    } else {
        0.0
    };

    let mut energy_kwh = power_kw * dt_hours;
    if power_kw < 0.0 {
        energy_kwh *= cfg.efficiency;
    } else if power_kw > 0.0 {
        energy_kwh /= cfg.efficiency;
    }

    BatteryDispatch {
        power_kw,
        soc: (soc - energy_kwh / cap).clamp(0.0, 1.0),
        health: battery.health * cfg.health_decay,
    }
}
