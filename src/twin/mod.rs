//! Microgrid digital twin: physics, events, observations, and KPIs.

pub mod battery;
pub mod engine;
pub mod event;
pub mod generation;
pub mod grid;
pub mod kpi;
pub mod load;
pub mod observation;
pub mod reward;
pub mod safety;
pub mod state;
pub mod types;
pub mod weather;

pub use engine::DigitalTwin;
pub use event::StressEvent;
pub use kpi::EpisodeKpis;
pub use state::GridState;
pub use types::{Action, ObservationLayout, StepOutcome, StepRecord, TwinConfig};
