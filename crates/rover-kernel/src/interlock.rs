//! Safety interlocks – conditions that override normal motion decisions.
//!
//! The supervisor consults these at the top of every cycle, before any scan
//! or motion command:
//!
//! - [`BatteryInterlock`] classifies the charge level; `Critical` is fatal.
//! - [`SoundInterlock`] trips the emergency stop on loud noise and fixes how
//!   long the robot holds still afterwards.

use std::time::Duration;

use rover_types::{RobotConfig, RoverError};

/// Classification of one battery reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryStatus {
    Nominal,
    /// At or below the warning level: keep going, but say so.
    Low,
    /// At or below the critical level: stop for good.
    Critical,
}

/// Battery health thresholds (inclusive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryInterlock {
    pub warning_pct: f64,
    pub critical_pct: f64,
}

impl BatteryInterlock {
    pub fn from_config(cfg: &RobotConfig) -> Self {
        Self {
            warning_pct: cfg.battery_warning_pct,
            critical_pct: cfg.battery_critical_pct,
        }
    }

    /// Classify `battery_pct`.
    ///
    /// # Errors
    ///
    /// A non-finite reading is a [`RoverError::SensorReadFault`] on the
    /// battery gauge, not a status.
    pub fn assess(&self, battery_pct: f64) -> Result<BatteryStatus, RoverError> {
        if !battery_pct.is_finite() {
            return Err(RoverError::sensor(
                "battery",
                format!("non-finite reading {battery_pct}"),
            ));
        }
        Ok(if battery_pct <= self.critical_pct {
            BatteryStatus::Critical
        } else if battery_pct <= self.warning_pct {
            BatteryStatus::Low
        } else {
            BatteryStatus::Nominal
        })
    }
}

/// Loud-noise emergency stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundInterlock {
    /// Levels strictly above this trip the interlock.
    pub threshold: f64,
    /// How long to hold still once tripped.
    pub hold: Duration,
}

impl SoundInterlock {
    pub fn from_config(cfg: &RobotConfig) -> Self {
        Self {
            threshold: cfg.sound_threshold,
            hold: cfg.emergency_stop_duration(),
        }
    }

    /// `true` when the robot must stop. An unreadable (non-finite) level
    /// trips as well.
    pub fn tripped(&self, sound: f64) -> bool {
        !sound.is_finite() || sound > self.threshold
    }
}
