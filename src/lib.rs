//! Renewable microgrid digital twin with a policy-optimization dispatch agent.

pub mod agent;
pub mod config;
/// Controller capability and the rule-based baseline.
pub mod control;
pub mod error;
pub mod forecast;
pub mod io;
pub mod logging;
pub mod runner;
/// Microgrid physics, events, observations and KPIs.
pub mod twin;

pub use error::{Error, Result};
