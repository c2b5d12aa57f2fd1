//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::twin::event::StressEvent;
use crate::twin::types::{ObservationLayout, TwinConfig};

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Simulation timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Weather process parameters.
    #[serde(default)]
    pub weather: WeatherConfig,
    /// Solar PV plant parameters.
    #[serde(default)]
    pub solar: SolarConfig,
    /// Wind turbine parameters.
    #[serde(default)]
    pub wind: WindConfig,
    /// Demand profile parameters.
    #[serde(default)]
    pub load: LoadConfig,
    /// Battery storage parameters.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Grid frequency/voltage model and safety thresholds.
    #[serde(default)]
    pub grid: GridConfig,
    /// Energy prices.
    #[serde(default)]
    pub tariff: TariffConfig,
    /// Reward shaping weights.
    #[serde(default)]
    pub reward: RewardConfig,
    /// Episode termination thresholds.
    #[serde(default)]
    pub termination: TerminationConfig,
    /// Forecaster selection.
    #[serde(default)]
    pub forecast: ForecastConfig,
    /// Policy-optimization agent hyperparameters.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Training loop parameters.
    #[serde(default)]
    pub training: TrainingConfig,
    /// Stress events injected by the runner.
    #[serde(default)]
    pub events: Vec<ScheduledEventConfig>,
}

/// Simulation timing and global parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Master random seed.
    pub seed: u64,
    /// Duration of one timestep in hours.
    pub dt_hours: f32,
    /// Step count at which an episode ends.
    pub horizon_steps: usize,
    /// Observation layout: `"predictive"` (13 dims) or `"reactive"` (10 dims).
    pub observation: String,
    /// Fixed day of year; drawn uniformly from 1..=365 on every reset when absent.
    pub day_of_year: Option<u16>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            dt_hours: 0.1,
            horizon_steps: 1000,
            observation: "predictive".to_string(),
            day_of_year: None,
        }
    }
}

/// Weather process parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherConfig {
    /// Cloud-cover innovation standard deviation per step.
    pub cloud_noise_std: f32,
    /// Per-step drift of cloud cover towards clear sky.
    pub cloud_drift: f32,
    /// Wind-speed innovation standard deviation per step (m/s).
    pub wind_noise_std: f32,
    /// Upper clip for wind speed (m/s).
    pub max_wind_speed: f32,
    /// Daily mean temperature (°C).
    pub temp_mean_c: f32,
    /// Diurnal temperature amplitude (°C).
    pub temp_amplitude_c: f32,
    /// Hour of the daily temperature maximum.
    pub temp_peak_hour: f32,
    /// Temperature noise standard deviation (°C).
    pub temp_noise_std: f32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            cloud_noise_std: 0.05,
            cloud_drift: 0.01,
            wind_noise_std: 1.0,
            max_wind_speed: 25.0,
            temp_mean_c: 27.0,
            temp_amplitude_c: 8.0,
            temp_peak_hour: 14.0,
            temp_noise_std: 1.0,
        }
    }
}

/// Solar PV plant parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolarConfig {
    /// Rated output (kW).
    pub capacity_kw: f32,
    /// First generating hour (inclusive).
    pub sunrise_hour: f32,
    /// Last generating hour (inclusive).
    pub sunset_hour: f32,
    /// Fraction of output lost under full cloud cover.
    pub cloud_attenuation: f32,
    /// Amplitude of the yearly seasonal factor.
    pub seasonal_amplitude: f32,
    /// Relative output loss per °C above the reference temperature.
    pub temp_coefficient: f32,
    /// Cell temperature above which derating applies (°C).
    pub reference_temp_c: f32,
}

impl Default for SolarConfig {
    fn default() -> Self {
        Self {
            capacity_kw: 500.0,
            sunrise_hour: 6.0,
            sunset_hour: 18.0,
            cloud_attenuation: 0.8,
            seasonal_amplitude: 0.2,
            temp_coefficient: 0.004,
            reference_temp_c: 25.0,
        }
    }
}

/// Wind turbine parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindConfig {
    /// Rated output (kW).
    pub capacity_kw: f32,
    /// Cut-in speed (m/s).
    pub cut_in_speed: f32,
    /// Rated speed (m/s).
    pub rated_speed: f32,
    /// Cut-out speed (m/s).
    pub cut_out_speed: f32,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            capacity_kw: 300.0,
            cut_in_speed: 3.0,
            rated_speed: 12.0,
            cut_out_speed: 25.0,
        }
    }
}

/// Demand profile parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadConfig {
    /// Peak demand the profile factor is scaled by (kW).
    pub peak_kw: f32,
    /// Base demand factor.
    pub base_factor: f32,
    /// Hour of the morning peak.
    pub morning_peak_hour: f32,
    /// Morning peak amplitude (factor).
    pub morning_amplitude: f32,
    /// Morning peak width (`exp(-(h - peak)^2 / width)`).
    pub morning_width: f32,
    /// Hour of the evening peak.
    pub evening_peak_hour: f32,
    /// Evening peak amplitude (factor).
    pub evening_amplitude: f32,
    /// Evening peak width.
    pub evening_width: f32,
    /// Weekend demand derating.
    pub weekend_factor: f32,
    /// Multiplicative noise standard deviation.
    pub noise_std: f32,
    /// Lower clamp of the demand factor.
    pub min_factor: f32,
    /// Upper clamp of the demand factor.
    pub max_factor: f32,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            peak_kw: 800.0,
            base_factor: 0.4,
            morning_peak_hour: 8.0,
            morning_amplitude: 0.3,
            morning_width: 2.0,
            evening_peak_hour: 20.0,
            evening_amplitude: 0.5,
            evening_width: 4.0,
            weekend_factor: 0.9,
            noise_std: 0.1,
            min_factor: 0.3,
            max_factor: 1.0,
        }
    }
}

/// Battery storage parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Total energy capacity (kWh).
    pub capacity_kwh: f32,
    /// Maximum charge/discharge power (kW).
    pub max_rate_kw: f32,
    /// One-way conversion efficiency (0.0–1.0).
    pub efficiency: f32,
    /// Lowest SOC the dispatcher discharges to.
    pub soc_min: f32,
    /// Highest SOC the dispatcher charges to.
    pub soc_max: f32,
    /// Multiplicative health factor applied every step.
    pub health_decay: f32,
    /// Lower bound of the SOC drawn on reset.
    pub initial_soc_min: f32,
    /// Upper bound of the SOC drawn on reset.
    pub initial_soc_max: f32,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 1000.0,
            max_rate_kw: 200.0,
            efficiency: 0.95,
            soc_min: 0.10,
            soc_max: 0.95,
            health_decay: 0.9999,
            initial_soc_min: 0.4,
            initial_soc_max: 0.6,
        }
    }
}

/// Grid frequency/voltage model and safety thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Nominal frequency (Hz).
    pub nominal_frequency_hz: f32,
    /// Nominal voltage (pu).
    pub nominal_voltage_pu: f32,
    /// Imbalance producing a 1 Hz deviation (kW).
    pub frequency_droop_kw: f32,
    /// Imbalance producing a 1 pu deviation (kW).
    pub voltage_droop_kw: f32,
    /// Lower frequency clip (Hz).
    pub min_frequency_hz: f32,
    /// Upper frequency clip (Hz).
    pub max_frequency_hz: f32,
    /// Lower voltage clip (pu).
    pub min_voltage_pu: f32,
    /// Upper voltage clip (pu).
    pub max_voltage_pu: f32,
    /// Frequency deviation at which the frequency score reaches zero (Hz).
    pub frequency_tolerance_hz: f32,
    /// Voltage deviation at which the voltage score reaches zero (pu).
    pub voltage_tolerance_pu: f32,
    /// Frequency deviation counted as a safety violation (Hz).
    pub frequency_violation_hz: f32,
    /// Voltage deviation counted as a safety violation (pu).
    pub voltage_violation_pu: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            nominal_frequency_hz: 50.0,
            nominal_voltage_pu: 1.0,
            frequency_droop_kw: 1000.0,
            voltage_droop_kw: 2000.0,
            min_frequency_hz: 49.0,
            max_frequency_hz: 51.0,
            min_voltage_pu: 0.9,
            max_voltage_pu: 1.1,
            frequency_tolerance_hz: 1.0,
            voltage_tolerance_pu: 0.1,
            frequency_violation_hz: 0.5,
            voltage_violation_pu: 0.05,
        }
    }
}

/// Energy prices (currency per kWh).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TariffConfig {
    /// Price paid per imported kWh.
    pub import_price: f32,
    /// Revenue per exported kWh.
    pub export_price: f32,
    /// Wear cost per kWh moved through the battery.
    pub degradation_cost: f32,
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            import_price: 7.0,
            export_price: 4.0,
            degradation_cost: 0.5,
        }
    }
}

/// Reward shaping weights.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewardConfig {
    /// Weight on the stability score.
    pub stability: f32,
    /// Weight on the renewable coverage ratio.
    pub renewable: f32,
    /// Weight on battery health.
    pub battery_health: f32,
    /// Flat term added when SOC leaves the comfort band (negative).
    pub soc_penalty: f32,
    /// Flat term added when stability drops below the threshold (negative).
    pub instability_penalty: f32,
    /// SOC below which the SOC penalty applies.
    pub soc_low: f32,
    /// SOC above which the SOC penalty applies.
    pub soc_high: f32,
    /// Stability score below which the instability penalty applies.
    pub instability_threshold: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            stability: 100.0,
            renewable: 20.0,
            battery_health: 10.0,
            soc_penalty: -50.0,
            instability_penalty: -100.0,
            soc_low: 0.15,
            soc_high: 0.95,
            instability_threshold: 0.7,
        }
    }
}

/// Episode termination thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TerminationConfig {
    /// Stability score below which the episode ends.
    pub min_stability: f32,
    /// Battery health below which the episode ends.
    pub min_battery_health: f32,
    /// Frequency deviation above which the episode ends (Hz).
    pub max_frequency_deviation_hz: f32,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            min_stability: 0.5,
            min_battery_health: 0.5,
            max_frequency_deviation_hz: 2.0,
        }
    }
}

/// Forecaster selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// Whether the runner feeds forecasts into observations.
    pub enabled: bool,
    /// Forecaster model: `"blended"` or `"persistence"`.
    pub model: String,
    /// Bounded history length (samples).
    pub history_len: usize,
    /// Samples required before the blended model leaves persistence mode.
    pub warmup: usize,
    /// Moving-average window (samples).
    pub window: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "blended".to_string(),
            history_len: 100,
            warmup: 10,
            window: 5,
        }
    }
}

/// Policy-optimization agent hyperparameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Width of both hidden layers in actor and critic.
    pub hidden_dim: usize,
    /// Adam learning rate for actor and critic.
    pub learning_rate: f32,
    /// Discount factor.
    pub gamma: f32,
    /// Ratio clip range of the surrogate objective.
    pub clip_epsilon: f32,
    /// Entropy bonus coefficient.
    pub entropy_coef: f32,
    /// Global gradient-norm ceiling.
    pub max_grad_norm: f32,
    /// Actor update epochs per train step.
    pub policy_epochs: usize,
    /// Critic update epochs per train step.
    pub value_epochs: usize,
    /// Experience buffer capacity (transitions).
    pub buffer_capacity: usize,
    /// Stabilizer added to the advantage standard deviation.
    pub advantage_epsilon: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 128,
            learning_rate: 3e-4,
            gamma: 0.99,
            clip_epsilon: 0.2,
            entropy_coef: 0.01,
            max_grad_norm: 0.5,
            policy_epochs: 10,
            value_epochs: 10,
            buffer_capacity: 10_000,
            advantage_epsilon: 1e-8,
        }
    }
}

/// Training loop parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    /// Number of training episodes.
    pub episodes: usize,
    /// Transitions sampled per train step.
    pub batch_size: usize,
    /// Environment steps between train steps.
    pub train_interval: usize,
    /// Supervisor bound on steps per episode.
    pub max_steps_per_episode: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 5,
            batch_size: 64,
            train_interval: 10,
            max_steps_per_episode: 1000,
        }
    }
}

/// A stress event injected before the given step of every runner episode.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduledEventConfig {
    /// Step index (0-based) before which the event is injected.
    pub step: usize,
    /// Event kind (`cloud_cover`, `wind_drop`, `peak_demand`, `battery_degradation`).
    pub kind: String,
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.capacity_kwh"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the stress preset: one of each event kind during the first day.
    pub fn stress() -> Self {
        let event = |step: usize, kind: &str| ScheduledEventConfig {
            step,
            kind: kind.to_string(),
        };
        Self {
            events: vec![
                event(20, "cloud_cover"),
                event(60, "wind_drop"),
                event(100, "peak_demand"),
                event(150, "battery_degradation"),
            ],
            ..Self::default()
        }
    }

    /// Returns the predictive preset: forecasts folded into observations.
    pub fn predictive() -> Self {
        Self {
            forecast: ForecastConfig {
                enabled: true,
                ..ForecastConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns a small, fast preset for smoke runs.
    pub fn quick() -> Self {
        Self {
            simulation: SimulationConfig {
                horizon_steps: 200,
                ..SimulationConfig::default()
            },
            agent: AgentConfig {
                hidden_dim: 32,
                policy_epochs: 4,
                value_epochs: 4,
                buffer_capacity: 2_000,
                ..AgentConfig::default()
            },
            training: TrainingConfig {
                episodes: 1,
                batch_size: 32,
                train_interval: 50,
                max_steps_per_episode: 200,
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "stress", "predictive", "quick"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "stress" => Ok(Self::stress()),
            "predictive" => Ok(Self::predictive()),
            "quick" => Ok(Self::quick()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Bundles the physics sections into the twin's configuration.
    ///
    /// Call [`validate`](Self::validate) first; an unknown observation name
    /// falls back to the predictive layout.
    pub fn twin_config(&self) -> TwinConfig {
        let observation = self
            .simulation
            .observation
            .parse()
            .unwrap_or(ObservationLayout::Predictive);
        TwinConfig {
            seed: self.simulation.seed,
            dt_hours: self.simulation.dt_hours,
            horizon_steps: self.simulation.horizon_steps,
            observation,
            day_of_year: self.simulation.day_of_year,
            weather: self.weather.clone(),
            solar: self.solar.clone(),
            wind: self.wind.clone(),
            load: self.load.clone(),
            battery: self.battery.clone(),
            grid: self.grid.clone(),
            tariff: self.tariff.clone(),
            reward: self.reward.clone(),
            termination: self.termination.clone(),
        }
    }

    /// Scheduled stress events as `(step, kind)`, sorted by step.
    ///
    /// Entries with unknown kinds are skipped; [`validate`](Self::validate)
    /// reports them.
    pub fn event_schedule(&self) -> Vec<(usize, StressEvent)> {
        let mut schedule: Vec<(usize, StressEvent)> = self
            .events
            .iter()
            .filter_map(|e| e.kind.parse().ok().map(|kind| (e.step, kind)))
            .collect();
        schedule.sort_by_key(|(step, _)| *step);
        schedule
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut positive = |field: &str, value: f32| {
            if value.is_nan() || value <= 0.0 {
                errors.push(ConfigError::new(field, "must be > 0"));
            }
        };

        let s = &self.simulation;
        positive("simulation.dt_hours", s.dt_hours);
        positive("solar.capacity_kw", self.solar.capacity_kw);
        positive("wind.capacity_kw", self.wind.capacity_kw);
        positive("load.peak_kw", self.load.peak_kw);
        positive("load.morning_width", self.load.morning_width);
        positive("load.evening_width", self.load.evening_width);
        positive("battery.capacity_kwh", self.battery.capacity_kwh);
        positive("battery.max_rate_kw", self.battery.max_rate_kw);
        positive("grid.frequency_droop_kw", self.grid.frequency_droop_kw);
        positive("grid.voltage_droop_kw", self.grid.voltage_droop_kw);
        positive("grid.frequency_tolerance_hz", self.grid.frequency_tolerance_hz);
        positive("grid.voltage_tolerance_pu", self.grid.voltage_tolerance_pu);
        positive("agent.learning_rate", self.agent.learning_rate);
        positive("agent.max_grad_norm", self.agent.max_grad_norm);

        if s.horizon_steps == 0 {
            errors.push(ConfigError::new("simulation.horizon_steps", "must be > 0"));
        }
        if s.observation.parse::<ObservationLayout>().is_err() {
            errors.push(ConfigError::new(
                "simulation.observation",
                format!(
                    "must be \"predictive\" or \"reactive\", got \"{}\"",
                    s.observation
                ),
            ));
        }
        if s.day_of_year.is_some_and(|day| !(1..=365).contains(&day)) {
            errors.push(ConfigError::new(
                "simulation.day_of_year",
                "must be in [1, 365]",
            ));
        }

        let sol = &self.solar;
        if sol.sunrise_hour >= sol.sunset_hour {
            errors.push(ConfigError::new(
                "solar.sunrise_hour",
                "must be < solar.sunset_hour",
            ));
        }
        if !(0.0..=1.0).contains(&sol.cloud_attenuation) {
            errors.push(ConfigError::new(
                "solar.cloud_attenuation",
                "must be in [0.0, 1.0]",
            ));
        }

        let w = &self.wind;
        if !(w.cut_in_speed < w.rated_speed && w.rated_speed <= w.cut_out_speed) {
            errors.push(ConfigError::new(
                "wind.rated_speed",
                "must satisfy cut_in_speed < rated_speed <= cut_out_speed",
            ));
        }

        let l = &self.load;
        if !(0.0 < l.min_factor && l.min_factor <= l.max_factor) {
            errors.push(ConfigError::new(
                "load.min_factor",
                "must satisfy 0 < min_factor <= max_factor",
            ));
        }

        let bat = &self.battery;
        if !(bat.efficiency > 0.0 && bat.efficiency <= 1.0) {
            errors.push(ConfigError::new("battery.efficiency", "must be in (0.0, 1.0]"));
        }
        if !(0.0 <= bat.soc_min && bat.soc_min < bat.soc_max && bat.soc_max <= 1.0) {
            errors.push(ConfigError::new(
                "battery.soc_min",
                "must satisfy 0 <= soc_min < soc_max <= 1",
            ));
        }
        if !(bat.health_decay > 0.0 && bat.health_decay <= 1.0) {
            errors.push(ConfigError::new(
                "battery.health_decay",
                "must be in (0.0, 1.0]",
            ));
        }
        if !(0.0 <= bat.initial_soc_min
            && bat.initial_soc_min < bat.initial_soc_max
            && bat.initial_soc_max <= 1.0)
        {
            errors.push(ConfigError::new(
                "battery.initial_soc_min",
                "must satisfy 0 <= initial_soc_min < initial_soc_max <= 1",
            ));
        }

        let g = &self.grid;
        if g.min_frequency_hz >= g.max_frequency_hz {
            errors.push(ConfigError::new(
                "grid.min_frequency_hz",
                "must be < grid.max_frequency_hz",
            ));
        }
        if g.min_voltage_pu >= g.max_voltage_pu {
            errors.push(ConfigError::new(
                "grid.min_voltage_pu",
                "must be < grid.max_voltage_pu",
            ));
        }

        let f = &self.forecast;
        if f.model != "blended" && f.model != "persistence" {
            errors.push(ConfigError::new(
                "forecast.model",
                format!("must be \"blended\" or \"persistence\", got \"{}\"", f.model),
            ));
        }
        if f.history_len == 0 {
            errors.push(ConfigError::new("forecast.history_len", "must be > 0"));
        }
        if f.window == 0 {
            errors.push(ConfigError::new("forecast.window", "must be > 0"));
        }

        let a = &self.agent;
        if a.hidden_dim == 0 {
            errors.push(ConfigError::new("agent.hidden_dim", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&a.gamma) {
            errors.push(ConfigError::new("agent.gamma", "must be in [0.0, 1.0]"));
        }
        if !(a.clip_epsilon > 0.0 && a.clip_epsilon < 1.0) {
            errors.push(ConfigError::new("agent.clip_epsilon", "must be in (0.0, 1.0)"));
        }
        if a.buffer_capacity == 0 {
            errors.push(ConfigError::new("agent.buffer_capacity", "must be > 0"));
        }

        let t = &self.training;
        if t.batch_size == 0 {
            errors.push(ConfigError::new("training.batch_size", "must be > 0"));
        }
        if t.batch_size > a.buffer_capacity {
            errors.push(ConfigError::new(
                "training.batch_size",
                "must be <= agent.buffer_capacity",
            ));
        }
        if t.train_interval == 0 {
            errors.push(ConfigError::new("training.train_interval", "must be > 0"));
        }
        if t.max_steps_per_episode == 0 {
            errors.push(ConfigError::new(
                "training.max_steps_per_episode",
                "must be > 0",
            ));
        }

        for (i, event) in self.events.iter().enumerate() {
            if event.kind.parse::<StressEvent>().is_err() {
                errors.push(ConfigError::new(
                    format!("events[{i}].kind"),
                    format!("unknown event kind \"{}\"", event.kind),
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
seed = 7
horizon_steps = 500
observation = "reactive"
day_of_year = 180

[battery]
capacity_kwh = 500.0
max_rate_kw = 100.0

[agent]
hidden_dim = 64

[[events]]
step = 10
kind = "wind_drop"
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.ok();
        assert_eq!(cfg.as_ref().map(|c| c.simulation.seed), Some(7));
        assert_eq!(cfg.as_ref().map(|c| c.simulation.day_of_year), Some(Some(180)));
        assert_eq!(cfg.as_ref().map(|c| c.agent.hidden_dim), Some(64));
        assert_eq!(cfg.as_ref().map(|c| c.events.len()), Some(1));
        assert!(cfg.map(|c| c.validate().is_empty()).unwrap_or(false));
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[battery]
capacity_kwh = 100.0
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[simulation]
seed = 99
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).ok();
        assert_eq!(cfg.as_ref().map(|c| c.simulation.seed), Some(99));
        assert_eq!(cfg.as_ref().map(|c| c.simulation.horizon_steps), Some(1000));
        assert_eq!(cfg.as_ref().map(|c| c.solar.capacity_kw), Some(500.0));
        assert_eq!(cfg.as_ref().map(|c| c.agent.buffer_capacity), Some(10_000));
    }

    #[test]
    fn validation_catches_bad_observation_layout() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.observation = "psychic".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.observation"));
    }

    #[test]
    fn validation_catches_unknown_event_kind() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.events.push(ScheduledEventConfig {
            step: 3,
            kind: "earthquake".to_string(),
        });
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "events[0].kind"));
    }

    #[test]
    fn event_schedule_is_sorted_and_typed() {
        let mut cfg = ScenarioConfig::stress();
        cfg.events.reverse();
        let schedule = cfg.event_schedule();
        assert_eq!(schedule.len(), 4);
        assert_eq!(schedule[0], (20, StressEvent::CloudCover));
        assert_eq!(schedule[3], (150, StressEvent::BatteryDegradation));
    }

    #[test]
    fn validation_catches_batch_larger_than_buffer() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.agent.buffer_capacity = 16;
        cfg.training.batch_size = 64;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "training.batch_size"));
    }

    #[test]
    fn validation_rejects_nan_and_non_positive_values() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.dt_hours = f32::NAN;
        cfg.agent.learning_rate = 0.0;
        cfg.battery.max_rate_kw = -1.0;
        let errors = cfg.validate();
        for field in ["simulation.dt_hours", "agent.learning_rate", "battery.max_rate_kw"] {
            assert!(errors.iter().any(|e| e.field == field), "missing {field}");
        }
    }

    #[test]
    fn validation_checks_fixed_day_of_year() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.day_of_year = Some(0);
        assert!(cfg.validate().iter().any(|e| e.field == "simulation.day_of_year"));
        cfg.simulation.day_of_year = Some(366);
        assert!(cfg.validate().iter().any(|e| e.field == "simulation.day_of_year"));
        cfg.simulation.day_of_year = Some(365);
        assert!(cfg.validate().is_empty());
        cfg.simulation.day_of_year = None;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validation_catches_inverted_wind_curve() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.wind.rated_speed = 2.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "wind.rated_speed"));
    }

    #[test]
    fn twin_config_carries_sections() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.observation = "reactive".to_string();
        cfg.battery.capacity_kwh = 250.0;
        let twin = cfg.twin_config();
        assert_eq!(twin.observation, ObservationLayout::Reactive);
        assert_eq!(twin.battery.capacity_kwh, 250.0);
        assert_eq!(twin.horizon_steps, 1000);
    }

    #[test]
    fn config_error_display_names_field() {
        let e = ConfigError::new("battery.efficiency", "must be in (0.0, 1.0]");
        assert_eq!(
            e.to_string(),
            "config error: battery.efficiency: must be in (0.0, 1.0]"
        );
    }
}
