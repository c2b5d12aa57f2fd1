//! Episode loops: evaluation runs, agent training, and controller comparison.
//!
//! Every loop follows the same control cycle: capture the observation,
//! let the controller act, step the twin, then observe again. Transitions
//! handed to the agent always pair the pre-step observation with the
//! post-step reward and observation.

use tracing::{info, warn};

use crate::agent::{PpoAgent, TrainMetrics, Transition};
use crate::config::ScenarioConfig;
use crate::control::{ControlInput, Controller, RuleBasedController};
use crate::forecast::{self, Forecast, ForecastSample, Forecaster};
use crate::twin::{Action, DigitalTwin, EpisodeKpis, ObservationLayout, StepRecord, StressEvent};

/// Outcome of one episode driven by a single controller.
#[derive(Debug, Clone)]
pub struct EpisodeResult {
    /// Name of the controller that produced the episode.
    pub controller: String,
    /// One record per step taken.
    pub records: Vec<StepRecord>,
    /// Aggregates over `records`.
    pub kpis: EpisodeKpis,
}

/// Summary of one training episode.
#[derive(Debug, Clone)]
pub struct TrainingEpisode {
    /// Episode index, starting at 0.
    pub episode: usize,
    pub kpis: EpisodeKpis,
    /// Train steps that actually updated the networks.
    pub updates: usize,
    /// Metrics of the last update, zero if none ran.
    pub last_metrics: TrainMetrics,
}

/// Baseline and agent evaluated on identical, independent twins.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub baseline: EpisodeResult,
    pub agent: EpisodeResult,
}

/// Produces observations, folding forecasts in when a forecaster is present.
struct Observer<'a> {
    forecaster: Option<&'a mut dyn Forecaster>,
    forecast: Option<Forecast>,
}

impl<'a> Observer<'a> {
    fn new(forecaster: Option<&'a mut dyn Forecaster>, layout: ObservationLayout) -> Self {
        let forecaster = match (forecaster, layout) {
            (Some(f), ObservationLayout::Reactive) => {
                warn!(forecaster = f.name(), "reactive observation layout; forecaster unused");
                None
            }
            (f, _) => f,
        };
        Self {
            forecaster,
            forecast: None,
        }
    }

    /// Feeds the current state to the forecaster and builds the observation.
    fn record(&mut self, twin: &DigitalTwin) -> Vec<f32> {
        if let Some(f) = self.forecaster.as_deref_mut() {
            f.update_history(ForecastSample::from_state(&twin.state()));
            self.forecast = Some(f.predict());
        }
        twin.observation(self.forecast.as_ref())
    }

    /// Rebuilds the observation without touching the forecaster history.
    fn refresh(&self, twin: &DigitalTwin) -> Vec<f32> {
        twin.observation(self.forecast.as_ref())
    }
}

fn borrow_forecaster(slot: &mut Option<Box<dyn Forecaster>>) -> Option<&mut dyn Forecaster> {
    match slot {
        Some(f) => Some(&mut **f),
        None => None,
    }
}

/// Injects the events scheduled for `step`. Returns whether any fired.
fn inject_scheduled(twin: &mut DigitalTwin, events: &[(usize, StressEvent)], step: usize) -> bool {
    let mut fired = false;
    for &(_, kind) in events.iter().filter(|(at, _)| *at == step) {
        twin.inject_event(kind);
        fired = true;
    }
    fired
}

/// Resets `twin` and drives it with `controller` for up to `max_steps`.
///
/// `on_transition` sees every transition together with the controller and
/// the step index, after the twin has stepped.
fn drive<C, F>(
    twin: &mut DigitalTwin,
    controller: &mut C,
    forecaster: Option<&mut dyn Forecaster>,
    events: &[(usize, StressEvent)],
    max_steps: usize,
    mut on_transition: F,
) -> EpisodeResult
where
    C: Controller + ?Sized,
    F: FnMut(&mut C, Transition, usize),
{
    twin.reset();
    let violations_before = twin.safety().total;
    let mut observer = Observer::new(forecaster, twin.config().observation);
    let mut observation = observer.record(twin);
    let mut records = Vec::with_capacity(max_steps.min(twin.config().horizon_steps));

    for step in 0..max_steps {
        if inject_scheduled(twin, events, step) {
            observation = observer.refresh(twin);
        }
        let state = twin.state();
        let action: Action = controller
            .act(&ControlInput {
                state: &state,
                observation: &observation,
            })
            .clipped();
        let outcome = twin.step(&action);
        let next_observation = observer.record(twin);

        records.push(StepRecord {
            step,
            action,
            reward: outcome.reward,
            done: outcome.done,
            state: twin.state(),
            safety_violations: twin.safety().total,
        });
        on_transition(
            controller,
            Transition {
                observation: std::mem::take(&mut observation),
                action: action.as_slice().to_vec(),
                reward: outcome.reward,
                next_observation: next_observation.clone(),
                done: outcome.done,
            },
            step,
        );
        observation = next_observation;
        if outcome.done {
            break;
        }
    }

    let config = twin.config();
    let kpis = EpisodeKpis::from_records(
        &records,
        config.dt_hours,
        violations_before,
        config.horizon_steps,
    );
    EpisodeResult {
        controller: controller.name().to_string(),
        records,
        kpis,
    }
}

/// Runs one episode without learning.
///
/// The twin is reset first. Scheduled events are injected before the step
/// whose index they name. The episode stops at termination or after
/// `max_steps`, whichever comes first.
///
/// # Arguments
///
/// * `twin` - Twin to drive; exclusively borrowed for the episode
/// * `controller` - Chooses every action
/// * `forecaster` - Optional forecaster for predictive observations
/// * `events` - `(step, kind)` stress events
/// * `max_steps` - Step cap for the episode
pub fn run_episode(
    twin: &mut DigitalTwin,
    controller: &mut dyn Controller,
    forecaster: Option<&mut dyn Forecaster>,
    events: &[(usize, StressEvent)],
    max_steps: usize,
) -> EpisodeResult {
    drive(twin, controller, forecaster, events, max_steps, |_, _, _| {})
}

/// Trains `agent` on a twin built from `config` for `training.episodes` episodes.
///
/// Every transition is stored; every `training.train_interval` steps one
/// train step runs on a batch of `training.batch_size`.
pub fn train_agent(config: &ScenarioConfig, agent: &mut PpoAgent) -> Vec<TrainingEpisode> {
    let mut twin = DigitalTwin::new(config.twin_config());
    let mut forecaster = config
        .forecast
        .enabled
        .then(|| forecast::build(&config.forecast));
    let events = config.event_schedule();
    let training = &config.training;
    let interval = training.train_interval.max(1);

    agent.set_training_mode(true);
    let mut summaries = Vec::with_capacity(training.episodes);
    for episode in 0..training.episodes {
        let mut updates = 0;
        let mut last_metrics = TrainMetrics::default();
        let result = drive(
            &mut twin,
            agent,
            borrow_forecaster(&mut forecaster),
            &events,
            training.max_steps_per_episode,
            |agent, transition, step| {
                agent.store_transition(transition);
                if (step + 1) % interval == 0 && agent.buffer_len() >= training.batch_size {
                    last_metrics = agent.train_step(training.batch_size);
                    updates += 1;
                }
            },
        );
        info!(
            episode,
            steps = result.kpis.steps,
            total_reward = result.kpis.total_reward,
            mean_stability = result.kpis.mean_stability,
            updates,
            value_loss = last_metrics.value_loss,
            "training episode finished"
        );
        summaries.push(TrainingEpisode {
            episode,
            kpis: result.kpis,
            updates,
            last_metrics,
        });
    }
    summaries
}

/// Evaluates the baseline controller and the agent on two independent twins
/// built from the same configuration and seed.
///
/// The agent acts deterministically; its training mode is restored afterwards.
pub fn compare(config: &ScenarioConfig, agent: &mut PpoAgent) -> Comparison {
    let events = config.event_schedule();
    let max_steps = config.training.max_steps_per_episode;
    let new_forecaster = || {
        config
            .forecast
            .enabled
            .then(|| forecast::build(&config.forecast))
    };

    let mut baseline_twin = DigitalTwin::new(config.twin_config());
    let mut baseline_forecaster = new_forecaster();
    let baseline = run_episode(
        &mut baseline_twin,
        &mut RuleBasedController,
        borrow_forecaster(&mut baseline_forecaster),
        &events,
        max_steps,
    );

    let was_training = agent.is_training();
    agent.set_training_mode(false);
    let mut agent_twin = DigitalTwin::new(config.twin_config());
    let mut agent_forecaster = new_forecaster();
    let evaluated = run_episode(
        &mut agent_twin,
        agent,
        borrow_forecaster(&mut agent_forecaster),
        &events,
        max_steps,
    );
    agent.set_training_mode(was_training);

    for result in [&baseline, &evaluated] {
        info!(
            controller = %result.controller,
            steps = result.kpis.steps,
            total_reward = result.kpis.total_reward,
            mean_stability = result.kpis.mean_stability,
            safety_violations = result.kpis.safety_violations,
            "evaluation finished"
        );
    }
    Comparison {
        baseline,
        agent: evaluated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerminationConfig;
    use crate::twin::TwinConfig;

    fn short_twin() -> DigitalTwin {
        DigitalTwin::new(TwinConfig {
            horizon_steps: 50,
            day_of_year: Some(172),
            termination: TerminationConfig {
                min_stability: 0.0,
                min_battery_health: 0.0,
                max_frequency_deviation_hz: 10.0,
            },
            ..TwinConfig::default()
        })
    }

    /// Records what it was shown and always idles.
    struct Recorder {
        seen: Vec<(f32, usize)>,
    }

    impl Controller for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn act(&mut self, input: &ControlInput<'_>) -> Action {
            self.seen
                .push((input.state.cloud_cover, input.observation.len()));
            Action::default()
        }
    }

    #[test]
    fn episode_stops_at_horizon() {
        let mut twin = short_twin();
        let mut c = RuleBasedController;
        let result = run_episode(&mut twin, &mut c, None, &[], 500);
        assert_eq!(result.records.len(), 50);
        assert!(!result.kpis.terminated_early);
        assert_eq!(result.kpis.steps, result.records.len());
        assert_eq!(result.controller, "baseline");
        assert!(result.records.last().is_some_and(|r| r.done));
    }

    #[test]
    fn episode_respects_step_cap() {
        let mut twin = short_twin();
        let mut c = Recorder { seen: Vec::new() };
        let result = run_episode(&mut twin, &mut c, None, &[], 5);
        assert!(result.records.len() <= 5);
        assert_eq!(c.seen.len(), result.records.len());
        for (i, r) in result.records.iter().enumerate() {
            assert_eq!(r.step, i);
        }
    }

    #[test]
    fn scheduled_event_is_visible_to_controller() {
        let mut twin = short_twin();
        let mut c = Recorder { seen: Vec::new() };
        run_episode(&mut twin, &mut c, None, &[(2, StressEvent::CloudCover)], 3);
        assert_eq!(c.seen.get(2).map(|s| s.0), Some(0.9));
    }

    #[test]
    fn forecaster_feeds_predictive_observations() {
        let mut twin = short_twin();
        let mut c = Recorder { seen: Vec::new() };
        let mut f = forecast::PersistenceForecaster::new(10);
        run_episode(&mut twin, &mut c, Some(&mut f), &[], 3);
        assert!(c.seen.iter().all(|s| s.1 == 13));
    }

    #[test]
    fn reactive_layout_yields_short_observations() {
        let mut twin = DigitalTwin::new(TwinConfig {
            observation: ObservationLayout::Reactive,
            horizon_steps: 10,
            ..TwinConfig::default()
        });
        let mut c = Recorder { seen: Vec::new() };
        let mut f = forecast::PersistenceForecaster::new(10);
        run_episode(&mut twin, &mut c, Some(&mut f), &[], 3);
        assert!(c.seen.iter().all(|s| s.1 == 10));
    }

    #[test]
    fn training_collects_transitions_and_updates() {
        let mut cfg = ScenarioConfig::quick();
        cfg.simulation.horizon_steps = 60;
        cfg.training.max_steps_per_episode = 60;
        cfg.training.episodes = 2;
        cfg.training.batch_size = 16;
        cfg.training.train_interval = 10;
        cfg.termination.min_stability = 0.0;
        cfg.termination.min_battery_health = 0.0;
        cfg.termination.max_frequency_deviation_hz = 10.0;
        let twin_dim = cfg.twin_config().observation.dim();
        let mut agent = PpoAgent::new(twin_dim, 5, &cfg.agent, 1);

        let episodes = train_agent(&cfg, &mut agent);
        assert_eq!(episodes.len(), 2);
        assert_eq!(agent.buffer_len(), 120);
        assert!(episodes.iter().all(|e| e.kpis.steps == 60));
        assert!(episodes[1].updates > 0);
        assert!(agent.is_training());
    }

    #[test]
    fn comparison_uses_identical_twins() {
        let mut cfg = ScenarioConfig::quick();
        cfg.simulation.horizon_steps = 30;
        cfg.training.max_steps_per_episode = 30;
        let dim = cfg.twin_config().observation.dim();
        let mut agent = PpoAgent::new(dim, 5, &cfg.agent, 2);
        let cmp = compare(&cfg, &mut agent);
        assert_eq!(cmp.baseline.controller, "baseline");
        assert_eq!(cmp.agent.controller, "ppo");
        let first = |r: &EpisodeResult| r.records.first().map(|s| s.state.day_of_year);
        assert_eq!(first(&cmp.baseline), first(&cmp.agent));
        assert!(agent.is_training());
    }
}
