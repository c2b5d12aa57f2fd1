//! Controller capability shared by the baseline and the learning agent.

pub mod baseline;

pub use baseline::RuleBasedController;

use crate::twin::{Action, GridState};

/// Everything a controller may look at before choosing an action.
#[derive(Debug, Clone, Copy)]
pub struct ControlInput<'a> {
    /// Current twin state.
    pub state: &'a GridState,
    /// Normalized observation of `state`.
    pub observation: &'a [f32],
}

/// Maps the current grid condition to a control action.
///
/// Comparison and training code is written against this trait only, so a
/// rule-based controller and a learned policy are interchangeable.
pub trait Controller {
    /// Short name used in reports and telemetry.
    fn name(&self) -> &str;

    /// Chooses the action for this step.
    fn act(&mut self, input: &ControlInput<'_>) -> Action;
}
