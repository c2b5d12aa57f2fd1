//! Renewable generation models.

use std::f32::consts::PI;

use crate::config::{SolarConfig, WindConfig};

/// Solar PV output (kW) for the given hour, cloud cover, day, and temperature.
///
/// Zero outside the `[sunrise_hour, sunset_hour]` window. Inside it the
/// clear-sky shape `max(0, cos((h - 12)π/12))` is scaled by the plant
/// capacity, then attenuated by cloud cover, a yearly seasonal factor and a
/// linear derating above the reference temperature.
pub fn solar_output(
    hour: f32,
    cloud_cover: f32,
    day_of_year: u16,
    temperature_c: f32,
    cfg: &SolarConfig,
) -> f32 {
    if hour < cfg.sunrise_hour || hour > cfg.sunset_hour {
        return 0.0;
    }
    let irradiance = ((hour - 12.0) * PI / 12.0).cos().max(0.0);
    let cloud = 1.0 - cfg.cloud_attenuation * cloud_cover;
    let seasonal = 1.0 + cfg.seasonal_amplitude * (2.0 * PI * f32::from(day_of_year) / 365.0).sin();
    let derate = 1.0 - cfg.temp_coefficient * (temperature_c - cfg.reference_temp_c).max(0.0);
    (cfg.capacity_kw * irradiance * cloud * seasonal * derate).max(0.0)
}

/// Fraction of rated wind output for the given speed.
///
/// Piecewise curve: zero below cut-in, linear ramp up to rated speed, flat
/// until cut-out, zero at and above cut-out.
pub fn wind_power_fraction(speed: f32, cfg: &WindConfig) -> f32 {
    if speed < cfg.cut_in_speed {
        0.0
    } else if speed < cfg.rated_speed {
        (speed - cfg.cut_in_speed) / (cfg.rated_speed - cfg.cut_in_speed)
    } else if speed < cfg.cut_out_speed {
        1.0
    } else {
        0.0
    }
}

/// Wind turbine output (kW) for the given speed.
pub fn wind_output(speed: f32, cfg: &WindConfig) -> f32 {
    cfg.capacity_kw * wind_power_fraction(speed, cfg)
}
