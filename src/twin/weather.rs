//! Stochastic weather processes: cloud cover, wind speed, and temperature.

use std::f32::consts::PI;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::WeatherConfig;

/// Draws zero-mean Gaussian noise with the given standard deviation.
///
/// Returns 0.0 when `std_dev` is not strictly positive.
pub fn gaussian_noise<R: Rng + ?Sized>(rng: &mut R, std_dev: f32) -> f32 {
    match Normal::new(0.0, std_dev) {
        Ok(dist) if std_dev > 0.0 => dist.sample(rng),
        _ => 0.0,
    }
}

/// Advances cloud cover by one step: random walk with a drift towards clear sky.
pub fn next_cloud_cover<R: Rng + ?Sized>(rng: &mut R, current: f32, cfg: &WeatherConfig) -> f32 {
    (current + gaussian_noise(rng, cfg.cloud_noise_std) - cfg.cloud_drift).clamp(0.0, 1.0)
}

/// Advances wind speed by one step: random walk clipped to `[0, max_wind_speed]`.
pub fn next_wind_speed<R: Rng + ?Sized>(rng: &mut R, current: f32, cfg: &WeatherConfig) -> f32 {
    (current + gaussian_noise(rng, cfg.wind_noise_std)).clamp(0.0, cfg.max_wind_speed)
}

/// Samples temperature for the given hour from the diurnal cycle plus noise.
pub fn temperature_at<R: Rng + ?Sized>(rng: &mut R, hour: f32, cfg: &WeatherConfig) -> f32 {
    let diurnal = (((hour - cfg.temp_peak_hour) * PI) / 12.0).cos();
    cfg.temp_mean_c + cfg.temp_amplitude_c * diurnal + gaussian_noise(rng, cfg.temp_noise_std)
}
