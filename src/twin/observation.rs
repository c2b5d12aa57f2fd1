//! Normalized observation vectors for controllers.

use crate::forecast::Forecast;
use crate::twin::state::GridState;
use crate::twin::types::ObservationLayout;

/// Scale applied to load and grid exchange (kW).
const POWER_SCALE_KW: f32 = 1000.0;
/// Frequency deviation scale (Hz).
const FREQUENCY_SCALE_HZ: f32 = 2.0;
/// Wind speed scale (m/s).
const WIND_SPEED_SCALE: f32 = 25.0;

/// Rated capacities used to normalize generation.
#[derive(Debug, Clone, Copy)]
pub struct Normalization {
    pub solar_capacity_kw: f32,
    pub wind_capacity_kw: f32,
    pub nominal_frequency_hz: f32,
    pub nominal_voltage_pu: f32,
}

/// Builds the observation for `state`.
///
/// The first ten components are: solar/capacity, wind/capacity, load/1000,
/// SOC, health, import/1000, frequency deviation/2, voltage deviation,
/// cloud cover, wind speed/25. The predictive layout appends solar, wind and
/// load of `forecast` normalized the same way, or of the current state when
/// no forecast is given.
pub fn build(
    state: &GridState,
    forecast: Option<&Forecast>,
    layout: ObservationLayout,
    norm: &Normalization,
) -> Vec<f32> {
    let mut obs = Vec::with_capacity(layout.dim());
    obs.extend_from_slice(&[
        state.solar_generation / norm.solar_capacity_kw,
        state.wind_generation / norm.wind_capacity_kw,
        state.load_demand / POWER_SCALE_KW,
        state.battery_soc,
        state.battery_health,
        state.grid_import / POWER_SCALE_KW,
        (state.grid_frequency - norm.nominal_frequency_hz) / FREQUENCY_SCALE_HZ,
        state.grid_voltage - norm.nominal_voltage_pu,
        state.cloud_cover,
        state.wind_speed / WIND_SPEED_SCALE,
    ]);
    if layout == ObservationLayout::Predictive {
        let (solar, wind, load) = match forecast {
            Some(f) => (f.solar_kw, f.wind_kw, f.load_kw),
            None => (
                state.solar_generation,
                state.wind_generation,
                state.load_demand,
            ),
        };
        obs.extend_from_slice(&[
            solar / norm.solar_capacity_kw,
            wind / norm.wind_capacity_kw,
            load / POWER_SCALE_KW,
        ]);
    }
    obs
}
