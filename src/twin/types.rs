//! Core twin types: actions, step outcomes, and configuration.

use std::fmt;
use std::str::FromStr;

use crate::config::{
    BatteryConfig, GridConfig, LoadConfig, RewardConfig, SolarConfig, TariffConfig,
    TerminationConfig, WeatherConfig, WindConfig,
};
use crate::twin::state::GridState;

/// Number of components in a control action.
pub const ACTION_DIM: usize = 5;

/// Five-component control command, each component in [0, 1].
///
/// Components in order: battery charge, battery discharge, load shifting,
/// grid import allowance, renewable curtailment. Values above 0.5 act as
/// "on" for the charge, discharge and import switches.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Action([f32; ACTION_DIM]);

impl Action {
    /// Builds an action from its components, clipping each to [0, 1].
    pub fn new(
        charge: f32,
        discharge: f32,
        load_shift: f32,
        import_allow: f32,
        curtailment: f32,
    ) -> Self {
        Self([charge, discharge, load_shift, import_allow, curtailment]).clipped()
    }

    /// Builds an action from a slice. Missing components are zero, extra ones ignored.
    pub fn from_slice(values: &[f32]) -> Self {
        let mut a = [0.0; ACTION_DIM];
        for (dst, src) in a.iter_mut().zip(values) {
            *dst = *src;
        }
        Self(a).clipped()
    }

    /// Returns a copy with every component clamped to [0, 1]. NaN becomes 0.
    pub fn clipped(self) -> Self {
        Self(self.0.map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn charge(&self) -> f32 {
        self.0[0]
    }

    pub fn discharge(&self) -> f32 {
        self.0[1]
    }

    pub fn load_shift(&self) -> f32 {
        self.0[2]
    }

    pub fn import_allow(&self) -> f32 {
        self.0[3]
    }

    pub fn curtailment(&self) -> f32 {
        self.0[4]
    }
}

/// Result of a single twin step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Normalized observation after the step.
    pub observation: Vec<f32>,
    /// Scalar reward earned by the step.
    pub reward: f32,
    /// Whether the episode has ended.
    pub done: bool,
}

/// One step of an episode as recorded by the runner.
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Step index within the episode.
    pub step: usize,
    /// Action applied (after clipping).
    pub action: Action,
    /// Reward earned.
    pub reward: f32,
    /// Whether this step ended the episode.
    pub done: bool,
    /// State after the step.
    pub state: GridState,
    /// Cumulative safety violations of the twin after the step.
    pub safety_violations: u64,
}

/// Observation vector layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObservationLayout {
    /// Ten state features.
    Reactive,
    /// Ten state features followed by three forecast features.
    #[default]
    Predictive,
}

impl ObservationLayout {
    /// Observation length for this layout.
    pub fn dim(self) -> usize {
        match self {
            Self::Reactive => 10,
            Self::Predictive => 13,
        }
    }
}

impl FromStr for ObservationLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reactive" => Ok(Self::Reactive),
            "predictive" => Ok(Self::Predictive),
            other => Err(format!("unknown observation layout \"{other}\"")),
        }
    }
}

impl fmt::Display for ObservationLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reactive => write!(f, "reactive"),
            Self::Predictive => write!(f, "predictive"),
        }
    }
}

/// Physics and episode parameters of a [`DigitalTwin`](crate::twin::engine::DigitalTwin).
///
/// Usually built from a scenario with
/// [`ScenarioConfig::twin_config`](crate::config::ScenarioConfig::twin_config).
#[derive(Debug, Clone)]
pub struct TwinConfig {
    /// Seed of the twin's random stream.
    pub seed: u64,
    /// Duration of one timestep in hours.
    pub dt_hours: f32,
    /// Step count at which an episode ends.
    pub horizon_steps: usize,
    /// Observation layout.
    pub observation: ObservationLayout,
    /// Fixed day of year; random per reset when `None`.
    pub day_of_year: Option<u16>,
    pub weather: WeatherConfig,
    pub solar: SolarConfig,
    pub wind: WindConfig,
    pub load: LoadConfig,
    pub battery: BatteryConfig,
    pub grid: GridConfig,
    pub tariff: TariffConfig,
    pub reward: RewardConfig,
    pub termination: TerminationConfig,
}

impl Default for TwinConfig {
    fn default() -> Self {
        crate::config::ScenarioConfig::baseline().twin_config()
    }
}
