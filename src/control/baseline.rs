//! Rule-based baseline controller.

use crate::twin::{Action, GridState};

use super::{ControlInput, Controller};

/// Nominal battery power used to scale charge/discharge commands (kW).
const RATE_SCALE_KW: f32 = 200.0;

/// Stateless heuristic dispatcher.
///
/// With `surplus = renewable - load`:
/// - charge proportionally to surplus while SOC < 0.8
/// - discharge proportionally to deficit while SOC > 0.2
/// - shift load when stability drops below 0.85
/// - allow import strongly for deficits over 100 kW, mildly for smaller ones
/// - curtail when the battery is full and surplus exceeds 200 kW
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedController;

impl RuleBasedController {
    /// Computes the action for `state`. Pure: equal states yield equal actions.
    pub fn action(&self, state: &GridState) -> Action {
        let surplus = state.renewable_generation() - state.load_demand;
        let soc = state.battery_soc;

        let charge = if surplus > 0.0 && soc < 0.8 {
            (surplus / RATE_SCALE_KW).min(1.0)
        } else {
            0.0
        };
        let discharge = if surplus < 0.0 && soc > 0.2 {
            (surplus.abs() / RATE_SCALE_KW).min(1.0)
        } else {
            0.0
        };
        let load_shift = if state.stability_score < 0.85 { 0.5 } else { 0.0 };
        let import_allow = if surplus < -100.0 {
            0.8
        } else if surplus < 0.0 {
            0.3
        } else {
            0.0
        };
        let curtailment = if soc > 0.95 && surplus > 200.0 {
            0.3
        } else {
            0.0
        };

        Action::new(charge, discharge, load_shift, import_allow, curtailment)
    }
}

impl Controller for RuleBasedController {
    fn name(&self) -> &str {
        "baseline"
    }

    fn act(&mut self, input: &ControlInput<'_>) -> Action {
        self.action(input.state)
    }
}
