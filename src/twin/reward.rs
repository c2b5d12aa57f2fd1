//! Reward shaping and episode termination.

use crate::config::{RewardConfig, TerminationConfig};
use crate::twin::state::GridState;

/// Scalar reward for a post-step state.
///
/// `stability·w_s - energy_cost + w_r·min(renewable/max(load,1), 1) +
/// w_h·health`, plus the SOC penalty outside `[soc_low, soc_high]` and the
/// instability penalty below `instability_threshold`.
pub fn reward(state: &GridState, cfg: &RewardConfig) -> f32 {
    let renewable_ratio = (state.renewable_generation() / state.load_demand.max(1.0)).min(1.0);
    let mut r = cfg.stability * state.stability_score - state.energy_cost
        + cfg.renewable * renewable_ratio
        + cfg.battery_health * state.battery_health;
    if state.battery_soc < cfg.soc_low || state.battery_soc > cfg.soc_high {
        r += cfg.soc_penalty;
    }
    if state.stability_score < cfg.instability_threshold {
        r += cfg.instability_penalty;
    }
    r
}

/// Whether the episode ends after this state.
///
/// Ends on low stability, worn battery, a frequency excursion beyond the
/// limit, or once `step_count` reaches `horizon_steps`.
pub fn is_terminal(
    state: &GridState,
    step_count: usize,
    horizon_steps: usize,
    nominal_frequency_hz: f32,
    cfg: &TerminationConfig,
) -> bool {
    state.stability_score < cfg.min_stability
        || state.battery_health < cfg.min_battery_health
        || (state.grid_frequency - nominal_frequency_hz).abs() > cfg.max_frequency_deviation_hz
        || step_count >= horizon_steps
}
