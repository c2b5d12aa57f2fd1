//! The digital twin: owns the grid state and advances its physics.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::forecast::Forecast;

use super::battery::{self, BatteryState};
use super::event::{ActiveEvent, EventSet, Revert, StressEvent};
use super::generation::{solar_output, wind_output};
use super::grid::{self, StabilityInputs};
use super::load::sample_demand;
use super::observation::{self, Normalization};
use super::reward::{is_terminal, reward};
use super::safety::SafetyCounters;
use super::state::GridState;
use super::types::{Action, ObservationLayout, StepOutcome, TwinConfig};
use super::weather::{next_cloud_cover, next_wind_speed, temperature_at};

/// Simulated microgrid with solar, wind, battery storage and a grid tie.
///
/// The twin exclusively owns its [`GridState`], its random stream and its
/// event records. Callers receive copies of the state; the only way to
/// perturb it from outside is [`inject_event`](Self::inject_event).
///
/// Two twins built from the same [`TwinConfig`] and driven by the same
/// action sequence produce identical trajectories.
#[derive(Debug, Clone)]
pub struct DigitalTwin {
    config: TwinConfig,
    state: GridState,
    rng: StdRng,
    events: EventSet,
    safety: SafetyCounters,
    step_count: usize,
    done: bool,
}

impl DigitalTwin {
    /// Creates a twin seeded from `config.seed` and resets it.
    pub fn new(config: TwinConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        let mut twin = Self {
            state: GridState {
                battery_capacity: config.battery.capacity_kwh,
                ..GridState::default()
            },
            config,
            rng,
            events: EventSet::default(),
            safety: SafetyCounters::default(),
            step_count: 0,
            done: false,
        };
        twin.reset();
        twin
    }

    /// Creates a twin that starts from a caller-provided condition.
    ///
    /// Weather, time, SOC and health are taken from `initial`; generation,
    /// demand, stability and cost are recomputed from them. Grid exchange
    /// and battery power start at zero.
    ///
    /// # Panics
    ///
    /// Panics if `initial` holds out-of-range SOC, health, cloud cover or time.
    pub fn from_state(config: TwinConfig, initial: GridState) -> Self {
        assert!((0.0..=1.0).contains(&initial.battery_soc), "battery_soc must be in [0, 1]");
        assert!((0.0..=1.0).contains(&initial.battery_health), "battery_health must be in [0, 1]");
        assert!((0.0..=1.0).contains(&initial.cloud_cover), "cloud_cover must be in [0, 1]");
        assert!((0.0..24.0).contains(&initial.time_of_day), "time_of_day must be in [0, 24)");
        assert!((1..=365).contains(&initial.day_of_year), "day_of_year must be in [1, 365]");

        let rng = StdRng::seed_from_u64(config.seed);
        let mut twin = Self {
            state: GridState {
                battery_capacity: config.battery.capacity_kwh,
                battery_charge_rate: 0.0,
                grid_import: 0.0,
                grid_frequency: config.grid.nominal_frequency_hz,
                grid_voltage: config.grid.nominal_voltage_pu,
                wind_speed: initial.wind_speed.clamp(0.0, config.weather.max_wind_speed),
                ..initial
            },
            config,
            rng,
            events: EventSet::default(),
            safety: SafetyCounters::default(),
            step_count: 0,
            done: false,
        };
        twin.refresh_supply_and_demand();
        twin.refresh_metrics();
        twin
    }

    /// Starts a new episode and returns its first observation.
    ///
    /// Draws fresh weather, day of year (unless fixed) and SOC, restores
    /// battery health and nominal grid conditions, and clears events and the
    /// step counter. Safety counters keep accumulating across episodes.
    pub fn reset(&mut self) -> Vec<f32> {
        let bat = &self.config.battery;
        let day_of_year = match self.config.day_of_year {
            Some(day) => day,
            None => self.rng.random_range(1..=365),
        };
        let cloud_cover = self.rng.random_range(0.0..0.3);
        let wind_speed = self.rng.random_range(5.0..15.0);
        let temperature = self.rng.random_range(20.0..35.0);
        let battery_soc = self
            .rng
            .random_range(bat.initial_soc_min..bat.initial_soc_max);

        self.state = GridState {
            battery_soc,
            battery_capacity: bat.capacity_kwh,
            battery_charge_rate: 0.0,
            battery_health: 1.0,
            grid_import: 0.0,
            grid_frequency: self.config.grid.nominal_frequency_hz,
            grid_voltage: self.config.grid.nominal_voltage_pu,
            cloud_cover,
            wind_speed,
            temperature,
            time_of_day: 12.0,
            day_of_year,
            ..GridState::default()
        };
        self.refresh_supply_and_demand();
        self.refresh_metrics();
        self.events.clear();
        self.step_count = 0;
        self.done = false;
        self.observation(None)
    }

    /// Advances the twin by one timestep.
    ///
    /// Action components are clipped to [0, 1]. Once an episode has ended
    /// the twin is absorbing: further steps leave the state untouched and
    /// return zero reward with `done` set.
    pub fn step(&mut self, action: &Action) -> StepOutcome {
        if self.done {
            warn!(step = self.step_count, "step called on a terminated twin");
            return StepOutcome {
                observation: self.observation(None),
                reward: 0.0,
                done: true,
            };
        }
        let action = action.clipped();
        let dt = self.config.dt_hours;

        self.step_count += 1;
        self.state.time_of_day = (self.state.time_of_day + dt) % 24.0;

        let weather = &self.config.weather;
        self.state.cloud_cover = next_cloud_cover(&mut self.rng, self.state.cloud_cover, weather);
        self.state.wind_speed = next_wind_speed(&mut self.rng, self.state.wind_speed, weather);
        self.state.temperature = temperature_at(&mut self.rng, self.state.time_of_day, weather);
        self.refresh_supply_and_demand();

        for revert in self.events.tick() {
            match revert {
                Revert::CloudCover(v) => self.state.cloud_cover = v,
                Revert::WindSpeed(v) => self.state.wind_speed = v,
            }
        }

        let renewable = self.state.renewable_generation() * (1.0 - 0.5 * action.curtailment());
        let load = self.state.load_demand * (1.0 - 0.2 * action.load_shift());

        let dispatch = battery::dispatch(
            BatteryState {
                soc: self.state.battery_soc,
                health: self.state.battery_health,
            },
            &action,
            renewable,
            load,
            dt,
            &self.config.battery,
        );
        self.state.battery_soc = dispatch.soc;
        self.state.battery_charge_rate = dispatch.power_kw;
        self.state.battery_health = dispatch.health;

        let response = grid::settle(load, renewable, dispatch.power_kw, &action, &self.config.grid);
        self.state.grid_import = response.import_kw;
        self.state.grid_frequency = response.frequency_hz;
        self.state.grid_voltage = response.voltage_pu;

        self.refresh_metrics();
        self.safety
            .record(&self.state, &self.config.grid, &self.config.battery);

        let reward = reward(&self.state, &self.config.reward);
        self.done = is_terminal(
            &self.state,
            self.step_count,
            self.config.horizon_steps,
            self.config.grid.nominal_frequency_hz,
            &self.config.termination,
        );

        StepOutcome {
            observation: self.observation(None),
            reward,
            done: self.done,
        }
    }

    /// Applies a stress event to the current state and arms its record.
    pub fn inject_event(&mut self, kind: StressEvent) {
        match kind {
            StressEvent::CloudCover => self.state.cloud_cover = 0.9,
            StressEvent::WindDrop => self.state.wind_speed = 1.0,
            StressEvent::PeakDemand => self.state.load_demand *= 1.5,
            StressEvent::BatteryDegradation => self.state.battery_health *= 0.8,
        }
        self.events.arm(kind);
    }

    /// Normalized observation of the current state.
    ///
    /// The length is set by the configured [`ObservationLayout`] alone:
    /// 13 for predictive and 10 for reactive, whether or not a forecast is
    /// passed. With the predictive layout, `forecast` fills the last three
    /// components; without one they repeat the current solar, wind and load.
    /// The reactive layout ignores any forecast.
    pub fn observation(&self, forecast: Option<&Forecast>) -> Vec<f32> {
        if forecast.is_some() && self.config.observation == ObservationLayout::Reactive {
            warn!("forecast supplied to a reactive observation layout; ignoring it");
        }
        observation::build(
            &self.state,
            forecast,
            self.config.observation,
            &self.normalization(),
        )
    }

    /// Copy of the current state.
    pub fn state(&self) -> GridState {
        self.state
    }

    /// Length of the observations this twin produces.
    pub fn observation_dim(&self) -> usize {
        self.config.observation.dim()
    }

    /// Cumulative safety counters over the twin's lifetime.
    pub fn safety(&self) -> SafetyCounters {
        self.safety
    }

    /// Event records still within their active window.
    pub fn active_events(&self) -> &[ActiveEvent] {
        self.events.active()
    }

    /// Steps taken in the current episode.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Whether the current episode has ended.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn config(&self) -> &TwinConfig {
        &self.config
    }

    fn normalization(&self) -> Normalization {
        Normalization {
            solar_capacity_kw: self.config.solar.capacity_kw,
            wind_capacity_kw: self.config.wind.capacity_kw,
            nominal_frequency_hz: self.config.grid.nominal_frequency_hz,
            nominal_voltage_pu: self.config.grid.nominal_voltage_pu,
        }
    }

    /// Recomputes solar, wind and demand from the current weather and time.
    fn refresh_supply_and_demand(&mut self) {
        let s = &mut self.state;
        s.solar_generation = solar_output(
            s.time_of_day,
            s.cloud_cover,
            s.day_of_year,
            s.temperature,
            &self.config.solar,
        );
        s.wind_generation = wind_output(s.wind_speed, &self.config.wind);
        s.load_demand = sample_demand(&mut self.rng, s.time_of_day, s.day_of_year, &self.config.load);
    }

    /// Recomputes the stability score and energy cost.
    fn refresh_metrics(&mut self) {
        let s = &mut self.state;
        s.stability_score = grid::stability_score(
            &StabilityInputs {
                frequency_hz: s.grid_frequency,
                voltage_pu: s.grid_voltage,
                battery_health: s.battery_health,
                solar_kw: s.solar_generation,
                wind_kw: s.wind_generation,
                battery_kw: s.battery_charge_rate,
                import_kw: s.grid_import,
                load_kw: s.load_demand,
            },
            &self.config.grid,
        );
        s.energy_cost = grid::energy_cost(
            s.grid_import,
            s.battery_charge_rate,
            self.config.dt_hours,
            &self.config.tariff,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> TwinConfig {
        TwinConfig {
            seed,
            ..TwinConfig::default()
        }
    }

    fn idle() -> Action {
        Action::new(0.0, 0.0, 0.0, 1.0, 0.0)
    }

    #[test]
    fn reset_draws_documented_ranges() {
        let twin = DigitalTwin::new(config(1));
        let s = twin.state();
        assert_eq!(s.time_of_day, 12.0);
        assert!((1..=365).contains(&s.day_of_year));
        assert!((0.0..0.3).contains(&s.cloud_cover));
        assert!((5.0..15.0).contains(&s.wind_speed));
        assert!((20.0..35.0).contains(&s.temperature));
        assert!((0.4..0.6).contains(&s.battery_soc));
        assert_eq!(s.battery_health, 1.0);
        assert_eq!(s.grid_frequency, 50.0);
        assert_eq!(twin.step_count(), 0);
    }

    #[test]
    fn time_advances_and_wraps() {
        let mut cfg = config(2);
        cfg.termination.min_stability = 0.0;
        let mut twin = DigitalTwin::new(cfg);
        for _ in 0..120 {
            twin.step(&idle());
        }
        let t = twin.state().time_of_day;
        assert!((t - 0.0).abs() < 1e-3 || (t - 24.0).abs() < 1e-3, "time {t}");
        assert_eq!(twin.step_count(), 120);
    }

    #[test]
    fn fixed_day_of_year_is_respected() {
        let cfg = TwinConfig {
            day_of_year: Some(172),
            ..config(3)
        };
        let mut twin = DigitalTwin::new(cfg);
        assert_eq!(twin.state().day_of_year, 172);
        twin.reset();
        assert_eq!(twin.state().day_of_year, 172);
    }

    #[test]
    fn terminated_twin_is_absorbing() {
        let mut cfg = TwinConfig {
            horizon_steps: 3,
            ..config(4)
        };
        cfg.termination.min_stability = 0.0;
        let mut twin = DigitalTwin::new(cfg);
        let mut last = None;
        for _ in 0..3 {
            last = Some(twin.step(&idle()));
        }
        assert_eq!(last.map(|o| o.done), Some(true));
        let frozen = twin.state();
        let again = twin.step(&idle());
        assert!(again.done);
        assert_eq!(again.reward, 0.0);
        assert_eq!(twin.state(), frozen);
        assert_eq!(twin.step_count(), 3);
    }

    #[test]
    fn reset_clears_done_and_events_but_keeps_safety() {
        let cfg = TwinConfig {
            horizon_steps: 2,
            ..config(5)
        };
        let mut twin = DigitalTwin::new(cfg);
        twin.inject_event(StressEvent::WindDrop);
        twin.step(&idle());
        twin.step(&idle());
        assert!(twin.is_done());
        let before = twin.safety();
        twin.reset();
        assert!(!twin.is_done());
        assert!(twin.active_events().is_empty());
        assert_eq!(twin.safety(), before);
    }

    #[test]
    fn inject_cloud_cover_is_immediate() {
        let mut twin = DigitalTwin::new(config(6));
        twin.inject_event(StressEvent::CloudCover);
        assert_eq!(twin.state().cloud_cover, 0.9);
        assert_eq!(twin.active_events().len(), 1);
    }

    #[test]
    fn inject_battery_degradation_scales_health() {
        let mut twin = DigitalTwin::new(config(7));
        twin.inject_event(StressEvent::BatteryDegradation);
        assert!((twin.state().battery_health - 0.8).abs() < 1e-6);
    }

    #[test]
    fn observation_dim_follows_layout() {
        let reactive = TwinConfig {
            observation: ObservationLayout::Reactive,
            ..config(8)
        };
        let mut twin = DigitalTwin::new(reactive);
        assert_eq!(twin.observation_dim(), 10);
        assert_eq!(twin.step(&idle()).observation.len(), 10);

        let mut twin = DigitalTwin::new(config(8));
        assert_eq!(twin.observation_dim(), 13);
        assert_eq!(twin.step(&idle()).observation.len(), 13);
    }

    #[test]
    fn observation_length_does_not_depend_on_forecast() {
        let forecast = Forecast {
            solar_kw: 100.0,
            wind_kw: 50.0,
            load_kw: 300.0,
        };
        let twin = DigitalTwin::new(config(8));
        let without = twin.observation(None);
        let with = twin.observation(Some(&forecast));
        assert_eq!(without.len(), 13);
        assert_eq!(with.len(), 13);
        assert_eq!(without[..10], with[..10]);

        let reactive = TwinConfig {
            observation: ObservationLayout::Reactive,
            ..config(8)
        };
        let twin = DigitalTwin::new(reactive);
        assert_eq!(twin.observation(None).len(), 10);
        assert_eq!(twin.observation(Some(&forecast)), twin.observation(None));
    }

    #[test]
    fn from_state_recomputes_generation() {
        let initial = GridState {
            time_of_day: 12.0,
            day_of_year: 365,
            cloud_cover: 0.0,
            wind_speed: 15.0,
            temperature: 20.0,
            battery_soc: 0.5,
            ..GridState::default()
        };
        let twin = DigitalTwin::from_state(config(9), initial);
        let s = twin.state();
        assert_eq!(s.wind_generation, 300.0);
        assert!((s.solar_generation - 500.0).abs() < 1.0);
        assert!(s.load_demand > 0.0);
    }
}
