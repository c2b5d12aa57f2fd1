//! Fixed-capacity FIFO experience buffer.

use std::collections::VecDeque;

use ndarray::{Array1, Array2};
use rand::Rng;
use rand::seq::index;

/// One environment interaction.
///
/// `observation` must be captured before the step that produced `reward`
/// and `next_observation`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: Vec<f32>,
    pub action: Vec<f32>,
    pub reward: f32,
    pub next_observation: Vec<f32>,
    pub done: bool,
}

/// A sampled batch laid out as arrays, one row per transition.
#[derive(Debug, Clone)]
pub struct Batch {
    pub observations: Array2<f32>,
    pub actions: Array2<f32>,
    pub rewards: Array1<f32>,
    pub next_observations: Array2<f32>,
    /// 1.0 where the transition ended an episode, else 0.0.
    pub dones: Array1<f32>,
}

/// Ring buffer that evicts its oldest transition once full.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    entries: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be > 0");
        Self {
            entries: VecDeque::with_capacity(capacity.min(1 << 16)),
            capacity,
        }
    }

    pub fn push(&mut self, transition: Transition) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(transition);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest retained transition.
    pub fn oldest(&self) -> Option<&Transition> {
        self.entries.front()
    }

    /// Samples `size` distinct transitions uniformly and copies them into arrays.
    ///
    /// # Panics
    ///
    /// Panics if `size` exceeds the number of stored transitions, or if the
    /// stored transitions disagree on observation or action length.
    pub fn sample<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Batch {
        let picked: Vec<&Transition> = index::sample(rng, self.entries.len(), size)
            .into_iter()
            .map(|i| &self.entries[i])
            .collect();
        let obs_dim = picked.first().map_or(0, |t| t.observation.len());
        let action_dim = picked.first().map_or(0, |t| t.action.len());

        Batch {
            observations: stack(&picked, obs_dim, |t| t.observation.as_slice()),
            actions: stack(&picked, action_dim, |t| t.action.as_slice()),
            rewards: picked.iter().map(|t| t.reward).collect(),
            next_observations: stack(&picked, obs_dim, |t| t.next_observation.as_slice()),
            dones: picked
                .iter()
                .map(|t| if t.done { 1.0 } else { 0.0 })
                .collect(),
        }
    }
}

fn stack(
    picked: &[&Transition],
    width: usize,
    field: impl Fn(&Transition) -> &[f32],
) -> Array2<f32> {
    Array2::from_shape_fn((picked.len(), width), |(i, j)| field(picked[i])[j])
}
