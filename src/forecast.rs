//! Short-term forecasting of solar, wind, and load from recent history.

use std::collections::VecDeque;

use crate::config::ForecastConfig;
use crate::twin::GridState;

/// Near-term forecast of the three supply/demand quantities (kW).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecast {
    pub solar_kw: f32,
    pub wind_kw: f32,
    pub load_kw: f32,
}

/// One observation fed to a forecaster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastSample {
    /// Hour of day in [0, 24).
    pub time_of_day: f32,
    pub solar_kw: f32,
    pub wind_kw: f32,
    pub load_kw: f32,
    pub cloud_cover: f32,
    pub wind_speed: f32,
    pub temperature: f32,
}

impl ForecastSample {
    /// Extracts the forecaster inputs from a twin state.
    pub fn from_state(state: &GridState) -> Self {
        Self {
            time_of_day: state.time_of_day,
            solar_kw: state.solar_generation,
            wind_kw: state.wind_generation,
            load_kw: state.load_demand,
            cloud_cover: state.cloud_cover,
            wind_speed: state.wind_speed,
            temperature: state.temperature,
        }
    }

    fn as_forecast(&self) -> Forecast {
        Forecast {
            solar_kw: self.solar_kw,
            wind_kw: self.wind_kw,
            load_kw: self.load_kw,
        }
    }
}

/// Forecast returned before any history exists.
pub const EMPTY_HISTORY_FORECAST: Forecast = Forecast {
    solar_kw: 0.0,
    wind_kw: 0.0,
    load_kw: 400.0,
};

/// Best-effort near-term predictor of solar, wind, and load.
///
/// Implementations never fail: with too little history they fall back to
/// the most recent raw sample.
pub trait Forecaster {
    /// Appends one observation to the bounded history.
    fn update_history(&mut self, sample: ForecastSample);

    /// Predicts the next step's solar, wind, and load.
    fn predict(&self) -> Forecast;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Bounded FIFO of samples shared by the forecasters.
#[derive(Debug, Clone)]
struct History {
    samples: VecDeque<ForecastSample>,
    capacity: usize,
}

impl History {
    fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "forecast history capacity must be > 0");
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, sample: ForecastSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    fn last(&self) -> Forecast {
        self.samples
            .back()
            .map_or(EMPTY_HISTORY_FORECAST, ForecastSample::as_forecast)
    }
}

/// Mean of `samples`, or `None` when empty.
fn mean<'a>(samples: impl Iterator<Item = &'a ForecastSample>) -> Option<Forecast> {
    let (mut n, mut solar, mut wind, mut load) = (0usize, 0.0_f32, 0.0_f32, 0.0_f32);
    for s in samples {
        n += 1;
        solar += s.solar_kw;
        wind += s.wind_kw;
        load += s.load_kw;
    }
    (n > 0).then(|| {
        let n = n as f32;
        Forecast {
            solar_kw: solar / n,
            wind_kw: wind / n,
            load_kw: load / n,
        }
    })
}

/// Circular distance between two hours of day.
fn hour_distance(a: f32, b: f32) -> f32 {
    let d = (a - b).abs() % 24.0;
    d.min(24.0 - d)
}

/// "Next step equals last step" forecaster.
#[derive(Debug, Clone)]
pub struct PersistenceForecaster {
    history: History,
}

impl PersistenceForecaster {
    /// # Panics
    ///
    /// Panics if `history_len` is zero.
    pub fn new(history_len: usize) -> Self {
        Self {
            history: History::new(history_len),
        }
    }
}

impl Forecaster for PersistenceForecaster {
    fn update_history(&mut self, sample: ForecastSample) {
        self.history.push(sample);
    }

    fn predict(&self) -> Forecast {
        self.history.last()
    }

    fn name(&self) -> &str {
        "persistence"
    }
}

/// Weighted blend of persistence, a moving average, and a same-hour average.
///
/// Below the warm-up count it returns the last raw sample. The seasonal
/// term averages every retained sample within one hour (circularly) of the
/// latest sample's time of day.
#[derive(Debug, Clone)]
pub struct BlendedForecaster {
    history: History,
    warmup: usize,
    window: usize,
}

/// Blend weights: persistence, moving average, seasonal.
const BLEND_WEIGHTS: [f32; 3] = [0.4, 0.3, 0.3];
/// Half-width of the same-hour window (hours).
const SEASONAL_WINDOW_HOURS: f32 = 1.0;

impl BlendedForecaster {
    /// # Panics
    ///
    /// Panics if `history_len` or `window` is zero.
    pub fn new(history_len: usize, warmup: usize, window: usize) -> Self {
        assert!(window > 0, "moving-average window must be > 0");
        Self {
            history: History::new(history_len),
            warmup,
            window,
        }
    }

    fn moving_average(&self) -> Option<Forecast> {
        let samples = &self.history.samples;
        if samples.len() < self.window {
            return None;
        }
        mean(samples.iter().skip(samples.len() - self.window))
    }

    fn seasonal(&self, hour: f32) -> Option<Forecast> {
        mean(
            self.history
                .samples
                .iter()
                .filter(|s| hour_distance(s.time_of_day, hour) < SEASONAL_WINDOW_HOURS),
        )
    }
}

impl Forecaster for BlendedForecaster {
    fn update_history(&mut self, sample: ForecastSample) {
        self.history.push(sample);
    }

    fn predict(&self) -> Forecast {
        let last = self.history.last();
        let Some(latest) = self.history.samples.back() else {
            return last;
        };
        if self.history.samples.len() < self.warmup {
            return last;
        }
        let avg = self.moving_average().unwrap_or(last);
        let seasonal = self.seasonal(latest.time_of_day).unwrap_or(last);
        let [wp, wa, ws] = BLEND_WEIGHTS;
        let blend = |p: f32, a: f32, s: f32| wp * p + wa * a + ws * s;
        Forecast {
            solar_kw: blend(last.solar_kw, avg.solar_kw, seasonal.solar_kw),
            wind_kw: blend(last.wind_kw, avg.wind_kw, seasonal.wind_kw),
            load_kw: blend(last.load_kw, avg.load_kw, seasonal.load_kw),
        }
    }

    fn name(&self) -> &str {
        "blended"
    }
}

/// Builds the forecaster selected by `cfg`.
///
/// Unknown model names fall back to the blended forecaster; validate the
/// configuration first to reject them.
pub fn build(cfg: &ForecastConfig) -> Box<dyn Forecaster> {
    match cfg.model.as_str() {
        "persistence" => Box::new(PersistenceForecaster::new(cfg.history_len)),
        _ => Box::new(BlendedForecaster::new(
            cfg.history_len,
            cfg.warmup,
            cfg.window,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(time: f32, solar: f32, wind: f32, load: f32) -> ForecastSample {
        ForecastSample {
            time_of_day: time,
            solar_kw: solar,
            wind_kw: wind,
            load_kw: load,
            cloud_cover: 0.1,
            wind_speed: 8.0,
            temperature: 25.0,
        }
    }

    #[test]
    fn persistence_empty_history_defaults() {
        let f = PersistenceForecaster::new(10);
        assert_eq!(f.predict(), EMPTY_HISTORY_FORECAST);
    }

    #[test]
    fn persistence_returns_last_sample() {
        let mut f = PersistenceForecaster::new(10);
        f.update_history(sample(12.0, 100.0, 50.0, 300.0));
        f.update_history(sample(12.1, 110.0, 40.0, 320.0));
        assert_eq!(
            f.predict(),
            Forecast {
                solar_kw: 110.0,
                wind_kw: 40.0,
                load_kw: 320.0
            }
        );
    }

    #[test]
    fn history_is_bounded() {
        let mut h = History::new(3);
        for i in 0..10 {
            h.push(sample(i as f32, i as f32, 0.0, 0.0));
        }
        assert_eq!(h.samples.len(), 3);
        assert_eq!(h.samples.front().map(|s| s.solar_kw), Some(7.0));
    }

    #[test]
    fn blended_below_warmup_is_persistence() {
        let mut f = BlendedForecaster::new(100, 10, 5);
        for i in 0..9 {
            f.update_history(sample(12.0 + i as f32 * 0.1, i as f32, 0.0, 400.0));
        }
        assert_eq!(f.predict().solar_kw, 8.0);
    }

    #[test]
    fn blended_constant_history_is_constant() {
        let mut f = BlendedForecaster::new(100, 10, 5);
        for i in 0..20 {
            f.update_history(sample(12.0 + i as f32 * 0.1, 200.0, 60.0, 450.0));
        }
        let p = f.predict();
        assert!((p.solar_kw - 200.0).abs() < 1e-3);
        assert!((p.wind_kw - 60.0).abs() < 1e-3);
        assert!((p.load_kw - 450.0).abs() < 1e-3);
    }

    #[test]
    fn blended_mixes_components() {
        let mut f = BlendedForecaster::new(100, 10, 5);
        // Ten samples far from the last hour, then the latest at 18:00.
        for i in 0..10 {
            f.update_history(sample(6.0 + i as f32 * 0.1, 0.0, 0.0, 0.0));
        }
        f.update_history(sample(18.0, 100.0, 0.0, 0.0));
        let p = f.predict();
        // persistence 100, moving average 20, seasonal 100
        let expected = 0.4 * 100.0 + 0.3 * 20.0 + 0.3 * 100.0;
        assert!((p.solar_kw - expected).abs() < 1e-3, "got {}", p.solar_kw);
    }

    #[test]
    fn hour_distance_wraps_midnight() {
        assert!((hour_distance(23.6, 0.2) - 0.6).abs() < 1e-5);
        assert!((hour_distance(3.0, 5.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn build_selects_model() {
        let mut cfg = ForecastConfig::default();
        assert_eq!(build(&cfg).name(), "blended");
        cfg.model = "persistence".to_string();
        assert_eq!(build(&cfg).name(), "persistence");
    }
}
