//! Stress events and the set of active event records.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Kind of stress event that can be injected into the twin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StressEvent {
    /// Heavy cloud cover: cloud set to 0.9 for 10 steps, then back to 0.2.
    CloudCover,
    /// Wind lull: wind speed set to 1 m/s for 15 steps, then back to 10 m/s.
    WindDrop,
    /// Demand spike: current load multiplied by 1.5; tracked for 20 steps.
    PeakDemand,
    /// Battery damage: health multiplied by 0.8; tracked for 5 steps.
    BatteryDegradation,
}

/// Error returned when an event name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event kind \"{0}\"")]
pub struct UnknownEventKind(pub String);

impl StressEvent {
    /// All event kinds.
    pub const ALL: [StressEvent; 4] = [
        StressEvent::CloudCover,
        StressEvent::WindDrop,
        StressEvent::PeakDemand,
        StressEvent::BatteryDegradation,
    ];

    /// Number of steps the event stays active.
    pub fn duration(self) -> u32 {
        match self {
            Self::CloudCover => 10,
            Self::WindDrop => 15,
            Self::PeakDemand => 20,
            Self::BatteryDegradation => 5,
        }
    }

    /// Snake-case name used in configuration files and CSV output.
    pub fn name(self) -> &'static str {
        match self {
            Self::CloudCover => "cloud_cover",
            Self::WindDrop => "wind_drop",
            Self::PeakDemand => "peak_demand",
            Self::BatteryDegradation => "battery_degradation",
        }
    }
}

impl FromStr for StressEvent {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

impl fmt::Display for StressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Weather field restored when an event expires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Revert {
    CloudCover(f32),
    WindSpeed(f32),
}

/// An active event with its remaining lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveEvent {
    pub kind: StressEvent,
    /// Steps left before the record expires.
    pub remaining: u32,
    /// Restoration applied on expiry, if any.
    pub revert: Option<Revert>,
}

impl ActiveEvent {
    /// Creates a fresh record for `kind`.
    pub fn new(kind: StressEvent) -> Self {
        let revert = match kind {
            StressEvent::CloudCover => Some(Revert::CloudCover(0.2)),
            StressEvent::WindDrop => Some(Revert::WindSpeed(10.0)),
            StressEvent::PeakDemand | StressEvent::BatteryDegradation => None,
        };
        Self {
            kind,
            remaining: kind.duration(),
            revert,
        }
    }
}

/// Active event records, at most one per kind.
#[derive(Debug, Clone, Default)]
pub struct EventSet {
    active: Vec<ActiveEvent>,
}

impl EventSet {
    /// Registers `kind`, or re-arms its timer if it is already active.
    pub fn arm(&mut self, kind: StressEvent) {
        match self.active.iter_mut().find(|e| e.kind == kind) {
            Some(existing) => existing.remaining = kind.duration(),
            None => self.active.push(ActiveEvent::new(kind)),
        }
    }

    /// Advances every record by one step and returns the reverts of the ones that expired.
    pub fn tick(&mut self) -> Vec<Revert> {
        let mut reverts = Vec::new();
        self.active.retain_mut(|e| {
            e.remaining = e.remaining.saturating_sub(1);
            if e.remaining == 0 {
                reverts.extend(e.revert);
                false
            } else {
                true
            }
        });
        reverts
    }

    pub fn is_active(&self, kind: StressEvent) -> bool {
        self.active.iter().any(|e| e.kind == kind)
    }

    pub fn active(&self) -> &[ActiveEvent] {
        &self.active
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}
