use serde::Serialize;

/// Snapshot of the microgrid at the end of a timestep.
///
/// Power values are in kW, energy in kWh, frequency in Hz and voltage in
/// per-unit. `grid_import` is signed: positive means import, negative export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridState {
    /// Solar PV output (kW).
    pub solar_generation: f32,
    /// Wind turbine output (kW).
    pub wind_generation: f32,
    /// Site demand after events, before load shifting (kW).
    pub load_demand: f32,
    /// Battery state of charge (0.0–1.0).
    pub battery_soc: f32,
    /// Battery energy capacity (kWh).
    pub battery_capacity: f32,
    /// Battery power of the last step; positive = discharge, negative = charge (kW).
    pub battery_charge_rate: f32,
    /// Battery health factor (1.0 = new).
    pub battery_health: f32,
    /// Grid exchange; positive = import, negative = export (kW).
    pub grid_import: f32,
    /// Grid frequency (Hz).
    pub grid_frequency: f32,
    /// Grid voltage (pu).
    pub grid_voltage: f32,
    /// Composite stability score (0.0–1.0).
    pub stability_score: f32,
    /// Energy cost of the last step (currency).
    pub energy_cost: f32,
    /// Cloud cover fraction (0.0–1.0).
    pub cloud_cover: f32,
    /// Hub-height wind speed (m/s).
    pub wind_speed: f32,
    /// Ambient temperature (°C).
    pub temperature: f32,
    /// Hour of day in [0, 24).
    pub time_of_day: f32,
    /// Day of year (1–365).
    pub day_of_year: u16,
}

impl Default for GridState {
    fn default() -> Self {
        Self {
            solar_generation: 0.0,
            wind_generation: 0.0,
            load_demand: 0.0,
            battery_soc: 0.5,
            battery_capacity: 1000.0,
            battery_charge_rate: 0.0,
            battery_health: 1.0,
            grid_import: 0.0,
            grid_frequency: 50.0,
            grid_voltage: 1.0,
            stability_score: 1.0,
            energy_cost: 0.0,
            cloud_cover: 0.0,
            wind_speed: 0.0,
            temperature: 25.0,
            time_of_day: 12.0,
            day_of_year: 1,
        }
    }
}

impl GridState {
    /// Total renewable output (kW).
    pub fn renewable_generation(&self) -> f32 {
        self.solar_generation + self.wind_generation
    }
}
