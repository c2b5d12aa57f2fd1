//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use microgrid_twin::config::{ScenarioConfig, TerminationConfig, WeatherConfig};
use microgrid_twin::twin::{Action, DigitalTwin, GridState, TwinConfig};

/// Baseline twin configuration with a fixed seed.
pub fn twin_config(seed: u64) -> TwinConfig {
    TwinConfig {
        seed,
        ..TwinConfig::default()
    }
}

/// Termination that only fires at the horizon.
pub fn horizon_only() -> TerminationConfig {
    TerminationConfig {
        min_stability: 0.0,
        min_battery_health: 0.0,
        max_frequency_deviation_hz: f32::INFINITY,
    }
}

/// Weather without random noise, so event timing is observable exactly.
pub fn calm_weather() -> WeatherConfig {
    WeatherConfig {
        cloud_noise_std: 0.0,
        wind_noise_std: 0.0,
        temp_noise_std: 0.0,
        ..WeatherConfig::default()
    }
}

/// Noon on a fixed day with clear sky and strong wind.
pub fn sunny_windy_noon() -> GridState {
    GridState {
        time_of_day: 12.0,
        day_of_year: 80,
        cloud_cover: 0.0,
        wind_speed: 15.0,
        temperature: 22.0,
        battery_soc: 0.5,
        ..GridState::default()
    }
}

/// Deterministic pseudo-random action sequence covering the whole action box.
pub fn action_sequence(len: usize) -> Vec<Action> {
    (0..len)
        .map(|i| {
            let f = |k: usize| (((i * 7 + k * 13) % 11) as f32) / 10.0;
            Action::new(f(0), f(1), f(2), f(3), f(4))
        })
        .collect()
}

/// Twin built from the quick preset with the given horizon.
pub fn quick_scenario(horizon: usize) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::quick();
    cfg.simulation.horizon_steps = horizon;
    cfg.training.max_steps_per_episode = horizon;
    cfg
}

/// Steps `twin` with `actions` until done, returning the visited states.
pub fn rollout(twin: &mut DigitalTwin, actions: &[Action]) -> Vec<GridState> {
    let mut states = Vec::with_capacity(actions.len());
    for a in actions {
        let outcome = twin.step(a);
        states.push(twin.state());
        if outcome.done {
            break;
        }
    }
    states
}
