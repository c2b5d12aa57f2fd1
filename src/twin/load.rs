//! Site demand model with morning and evening peaks.

use rand::Rng;

use crate::config::LoadConfig;
use crate::twin::weather::gaussian_noise;

/// Deterministic demand factor for the given hour and day, before noise.
pub fn demand_factor(hour: f32, day_of_year: u16, cfg: &LoadConfig) -> f32 {
    let morning = cfg.morning_amplitude
        * (-(hour - cfg.morning_peak_hour).powi(2) / cfg.morning_width).exp();
    let evening = cfg.evening_amplitude
        * (-(hour - cfg.evening_peak_hour).powi(2) / cfg.evening_width).exp();
    let weekend = if is_weekend(day_of_year) {
        cfg.weekend_factor
    } else {
        1.0
    };
    (cfg.base_factor + morning + evening) * weekend
}

/// Weekend days are those with `day_of_year % 7` equal to 0 or 6.
pub fn is_weekend(day_of_year: u16) -> bool {
    matches!(day_of_year % 7, 0 | 6)
}

/// Samples site demand (kW) for the given hour and day.
///
/// The demand factor is perturbed by multiplicative Gaussian noise, clamped
/// to `[min_factor, max_factor]`, and scaled by `peak_kw`.
pub fn sample_demand<R: Rng + ?Sized>(
    rng: &mut R,
    hour: f32,
    day_of_year: u16,
    cfg: &LoadConfig,
) -> f32 {
    let noisy = demand_factor(hour, day_of_year, cfg) * (1.0 + gaussian_noise(rng, cfg.noise_std));
    cfg.peak_kw * noisy.clamp(cfg.min_factor, cfg.max_factor)
}
