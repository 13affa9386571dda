//! Shared data model for the rover workspace.
//!
//! Everything that crosses a crate boundary lives here: sensor snapshots,
//! scan samples, steering decisions, motion commands, the navigation state
//! enum, the process-wide [`RobotConfig`] and the [`RoverError`] taxonomy.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;

pub use config::RobotConfig;

/// One on-demand snapshot of every scalar sensor on the robot.
///
/// Never cached: each value reflects sensor state at the moment of the read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardwareReading {
    /// Range to the nearest obstacle in front of the sensor head, in cm.
    pub distance_cm: f64,
    /// Normalised ambient light, `0.0` (dark) to `1.0` (bright).
    pub light: f64,
    /// Normalised sound level, `0.0` (silent) to `1.0` (loud).
    pub sound: f64,
    /// Remaining battery charge, `0.0` to `100.0`.
    pub battery_pct: f64,
}

/// A single angle-tagged sample captured during a servo sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanSample {
    pub angle_deg: i32,
    pub distance_cm: f64,
    pub light: f64,
}

impl ScanSample {
    pub fn new(angle_deg: i32, distance_cm: f64, light: f64) -> Self {
        Self {
            angle_deg,
            distance_cm,
            light,
        }
    }
}

/// Angle-ascending sequence of [`ScanSample`]s produced by one scan cycle.
///
/// The order is meaningful: the scorer replays samples in this order and
/// breaks ties in favour of the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    samples: Vec<ScanSample>,
}

impl ScanResult {
    /// Build a result from `samples`, stably sorting them by angle so the
    /// ascending-order invariant holds regardless of capture order.
    pub fn new(mut samples: Vec<ScanSample>) -> Self {
        samples.sort_by_key(|s| s.angle_deg);
        Self { samples }
    }

    pub fn samples(&self) -> &[ScanSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScanSample> {
        self.samples.iter()
    }
}

impl<'a> IntoIterator for &'a ScanResult {
    type Item = &'a ScanSample;
    type IntoIter = std::slice::Iter<'a, ScanSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// The heading chosen for the current cycle and its combined score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionDecision {
    pub angle_deg: i32,
    pub score: f64,
}

/// A single bounded actuation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload")]
pub enum MotionCommand {
    /// Drive straight ahead at cruise speed for `duration`.
    Forward { duration: Duration },
    /// Rotate in place; positive angles turn clockwise (right).
    Turn { angle_deg: i32, duration: Duration },
    /// Zero both wheels immediately.
    Stop,
}

/// States of the navigation supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavigationState {
    Scanning,
    EmergencyStopped,
    Moving,
    Turning,
    BatteryCritical,
    ShuttingDown,
}

impl NavigationState {
    /// `true` for the state after which no further cycle may run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NavigationState::ShuttingDown)
    }
}

impl fmt::Display for NavigationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NavigationState::Scanning => "scanning",
            NavigationState::EmergencyStopped => "emergency_stopped",
            NavigationState::Moving => "moving",
            NavigationState::Turning => "turning",
            NavigationState::BatteryCritical => "battery_critical",
            NavigationState::ShuttingDown => "shutting_down",
        };
        f.write_str(name)
    }
}

/// What a single supervisor cycle ended up doing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    Moved(DirectionDecision),
    Turned(DirectionDecision),
    EmergencyStopped,
    /// A non-fatal port error was contained; motors were force-stopped.
    Faulted(FaultKind),
}

/// Copyable summary of a contained, non-fatal fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Sensor,
    Actuator,
    Hardware,
}

impl From<&RoverError> for FaultKind {
    fn from(err: &RoverError) -> Self {
        match err {
            RoverError::SensorReadFault { .. } => FaultKind::Sensor,
            RoverError::ActuatorFault { .. } => FaultKind::Actuator,
            _ => FaultKind::Hardware,
        }
    }
}

/// Error taxonomy shared by the HAL, the runtime and the CLI.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoverError {
    #[error("Hardware Unavailable: {details}")]
    HardwareUnavailable { details: String },

    #[error("Sensor Read Fault on {sensor}: {details}")]
    SensorReadFault { sensor: String, details: String },

    #[error("Actuator Fault on {actuator}: {details}")]
    ActuatorFault { actuator: String, details: String },

    #[error("Battery Critical: {battery_pct:.1}% remaining")]
    BatteryCritical { battery_pct: f64 },

    #[error("Operator Interrupt")]
    OperatorInterrupt,

    #[error("Invalid Configuration: {0}")]
    InvalidConfig(String),
}

impl RoverError {
    pub fn sensor(sensor: impl Into<String>, details: impl Into<String>) -> Self {
        RoverError::SensorReadFault {
            sensor: sensor.into(),
            details: details.into(),
        }
    }

    pub fn actuator(actuator: impl Into<String>, details: impl Into<String>) -> Self {
        RoverError::ActuatorFault {
            actuator: actuator.into(),
            details: details.into(),
        }
    }

    pub fn unavailable(details: impl Into<String>) -> Self {
        RoverError::HardwareUnavailable {
            details: details.into(),
        }
    }

    /// Whether this error ends the process when it reaches the top level
    /// (startup, diagnostics, or the end of a navigation run).
    ///
    /// Sensor and actuator faults never do. Inside a navigation cycle the
    /// supervisor contains every port error, `HardwareUnavailable` included;
    /// only `BatteryCritical` and `OperatorInterrupt` end the loop.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RoverError::SensorReadFault { .. } | RoverError::ActuatorFault { .. }
        )
    }
}
