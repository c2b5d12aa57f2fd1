//! Policy-optimization agent: burn networks, experience buffer, and the
//! clipped-surrogate training loop.

pub mod buffer;
pub mod nn;
pub mod policy;
pub mod ppo;
pub mod value;

pub use buffer::{ReplayBuffer, Transition};
pub use ppo::{PpoAgent, TrainMetrics};
