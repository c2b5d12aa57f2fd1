//! Integration tests for the policy-optimization agent driving a twin.

mod common;

use microgrid_twin::agent::{PpoAgent, TrainMetrics, Transition};
use microgrid_twin::config::AgentConfig;
use microgrid_twin::control::{ControlInput, Controller};
use microgrid_twin::twin::types::ACTION_DIM;
use microgrid_twin::twin::{Action, DigitalTwin};

fn small_agent(obs_dim: usize, seed: u64) -> PpoAgent {
    let cfg = AgentConfig {
        hidden_dim: 32,
        policy_epochs: 4,
        value_epochs: 4,
        buffer_capacity: 500,
        ..AgentConfig::default()
    };
    PpoAgent::new(obs_dim, ACTION_DIM, &cfg, seed)
}

/// Collects `steps` transitions from a fresh twin with the agent sampling.
fn collect(agent: &mut PpoAgent, twin: &mut DigitalTwin, steps: usize) {
    let mut obs = twin.reset();
    for _ in 0..steps {
        let action = agent.select_action(&obs, false);
        let outcome = twin.step(&Action::from_slice(&action));
        agent.store_transition(Transition {
            observation: obs,
            action,
            reward: outcome.reward,
            next_observation: outcome.observation.clone(),
            done: outcome.done,
        });
        obs = if outcome.done {
            twin.reset()
        } else {
            outcome.observation
        };
    }
}

#[test]
fn agent_actions_are_valid_twin_actions() {
    let mut twin = DigitalTwin::new(common::twin_config(1));
    let mut agent = small_agent(twin.observation_dim(), 1);
    let obs = twin.reset();
    for deterministic in [true, false] {
        let a = agent.select_action(&obs, deterministic);
        assert_eq!(a.len(), ACTION_DIM);
        assert!(a.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}

#[test]
fn deterministic_selection_is_stable_until_training() {
    let mut twin = DigitalTwin::new(common::twin_config(2));
    let mut agent = small_agent(twin.observation_dim(), 2);
    let obs = twin.reset();
    let first = agent.select_action(&obs, true);
    for _ in 0..5 {
        assert_eq!(agent.select_action(&obs, true), first);
    }

    collect(&mut agent, &mut twin, 100);
    assert_eq!(agent.select_action(&obs, true), first, "collection alone must not move weights");
    let metrics = agent.train_step(64);
    assert_ne!(metrics, TrainMetrics::default());
    assert_ne!(agent.select_action(&obs, true), first);
}

#[test]
fn train_step_is_a_noop_until_buffer_fills() {
    let mut twin = DigitalTwin::new(common::twin_config(3));
    let mut agent = small_agent(twin.observation_dim(), 3);
    collect(&mut agent, &mut twin, 10);
    assert_eq!(agent.buffer_len(), 10);
    assert_eq!(agent.train_step(64), TrainMetrics::default());
}

#[test]
fn buffer_evicts_beyond_capacity() {
    let mut twin = DigitalTwin::new(common::twin_config(4));
    let mut agent = small_agent(twin.observation_dim(), 4);
    collect(&mut agent, &mut twin, 700);
    assert_eq!(agent.buffer_len(), 500);
}

#[test]
fn repeated_training_reduces_value_loss() {
    let mut twin = DigitalTwin::new(common::twin_config(5));
    let cfg = AgentConfig {
        hidden_dim: 32,
        learning_rate: 1e-2,
        policy_epochs: 1,
        value_epochs: 4,
        buffer_capacity: 400,
        ..AgentConfig::default()
    };
    let mut agent = PpoAgent::new(twin.observation_dim(), ACTION_DIM, &cfg, 5);
    collect(&mut agent, &mut twin, 400);

    // A batch of the whole buffer keeps the regression set fixed between calls.
    let first = agent.train_step(400);
    let mut last = first;
    for _ in 0..40 {
        last = agent.train_step(400);
    }
    assert!(first.value_loss.is_finite() && last.value_loss.is_finite());
    assert!(
        last.value_loss < first.value_loss,
        "value loss went from {} to {}",
        first.value_loss,
        last.value_loss
    );
}

#[test]
fn agent_as_controller_honours_mode() {
    let twin = DigitalTwin::new(common::twin_config(6));
    let mut agent = small_agent(twin.observation_dim(), 6);
    let state = twin.state();
    let obs = twin.observation(None);
    let input = ControlInput {
        state: &state,
        observation: &obs,
    };

    agent.set_training_mode(false);
    let mean = agent.act(&input);
    assert_eq!(agent.act(&input), mean);
    assert_eq!(agent.name(), "ppo");
}

#[test]
#[should_panic(expected = "observation has")]
fn mismatched_observation_fails_fast() {
    let mut agent = small_agent(13, 7);
    agent.select_action(&[0.0; 10], true);
}
