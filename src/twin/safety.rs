//! Safety-violation accounting.

use serde::Serialize;

use crate::config::{BatteryConfig, GridConfig};
use crate::twin::state::GridState;

/// Cumulative safety-violation counters.
///
/// A single step may raise several counters; `total` counts each violated
/// condition separately, so it always equals the sum of the specific ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SafetyCounters {
    pub total: u64,
    pub frequency: u64,
    pub voltage: u64,
    pub soc: u64,
}

impl SafetyCounters {
    /// Checks `state` against the safety thresholds and bumps the counters.
    ///
    /// Returns the number of violations found in this state.
    pub fn record(&mut self, state: &GridState, grid: &GridConfig, battery: &BatteryConfig) -> u64 {
        let mut found = 0;
        if (state.grid_frequency - grid.nominal_frequency_hz).abs() > grid.frequency_violation_hz {
            self.frequency += 1;
            found += 1;
        }
        if (state.grid_voltage - grid.nominal_voltage_pu).abs() > grid.voltage_violation_pu {
            self.voltage += 1;
            found += 1;
        }
        if state.battery_soc < battery.soc_min || state.battery_soc > battery.soc_max {
            self.soc += 1;
            found += 1;
        }
        self.total += found;
        found
    }
}
