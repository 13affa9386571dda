//! [`RobotConfig`] – immutable, process-wide tuning parameters.
//!
//! Loaded once at startup (see the `rover-cli` config layer) and read-only
//! afterwards. Every field has a serde default so partial TOML tables are
//! accepted.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::RoverError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Cruise drive output while moving forward, `(0, 1]`.
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Per-wheel drive output while rotating in place, `(0, 1]`.
    #[serde(default = "default_turn_speed")]
    pub turn_speed: f64,

    /// Range at or beyond which a heading is considered fully clear.
    #[serde(default = "default_safe_distance_cm")]
    pub safe_distance_cm: f64,

    /// Total sweep of the sensor head, centred on straight ahead.
    #[serde(default = "default_scan_range_deg")]
    pub scan_range_deg: i32,

    #[serde(default = "default_scan_step_deg")]
    pub scan_step_deg: i32,

    /// Preferred illumination, `0.0` to `1.0`.
    #[serde(default = "default_target_light_level")]
    pub target_light_level: f64,

    /// Sound level above which the emergency stop trips.
    #[serde(default = "default_sound_threshold")]
    pub sound_threshold: f64,

    #[serde(default = "default_battery_warning_pct")]
    pub battery_warning_pct: f64,

    #[serde(default = "default_battery_critical_pct")]
    pub battery_critical_pct: f64,

    /// Servo settle delay per scan position; also the inter-cycle pause.
    #[serde(default = "default_scan_interval_s")]
    pub scan_interval_s: f64,

    #[serde(default = "default_move_duration_s")]
    pub move_duration_s: f64,

    /// Time needed to rotate 90° at `turn_speed`.
    #[serde(default = "default_turn_duration_s")]
    pub turn_duration_s: f64,

    #[serde(default = "default_emergency_stop_duration_s")]
    pub emergency_stop_duration_s: f64,

    /// Number of intermediate output levels on each side of a ramp.
    #[serde(default = "default_ramp_steps")]
    pub ramp_steps: u32,

    #[serde(default = "default_ramp_step_s")]
    pub ramp_step_s: f64,
}

fn default_speed() -> f64 {
    0.4
}
fn default_turn_speed() -> f64 {
    0.25
}
fn default_safe_distance_cm() -> f64 {
    25.0
}
fn default_scan_range_deg() -> i32 {
    90
}
fn default_scan_step_deg() -> i32 {
    15
}
fn default_target_light_level() -> f64 {
    0.5
}
fn default_sound_threshold() -> f64 {
    0.8
}
fn default_battery_warning_pct() -> f64 {
    20.0
}
fn default_battery_critical_pct() -> f64 {
    10.0
}
fn default_scan_interval_s() -> f64 {
    0.1
}
fn default_move_duration_s() -> f64 {
    0.5
}
fn default_turn_duration_s() -> f64 {
    1.0
}
fn default_emergency_stop_duration_s() -> f64 {
    2.0
}
fn default_ramp_steps() -> u32 {
    3
}
fn default_ramp_step_s() -> f64 {
    0.1
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            turn_speed: default_turn_speed(),
            safe_distance_cm: default_safe_distance_cm(),
            scan_range_deg: default_scan_range_deg(),
            scan_step_deg: default_scan_step_deg(),
            target_light_level: default_target_light_level(),
            sound_threshold: default_sound_threshold(),
            battery_warning_pct: default_battery_warning_pct(),
            battery_critical_pct: default_battery_critical_pct(),
            scan_interval_s: default_scan_interval_s(),
            move_duration_s: default_move_duration_s(),
            turn_duration_s: default_turn_duration_s(),
            emergency_stop_duration_s: default_emergency_stop_duration_s(),
            ramp_steps: default_ramp_steps(),
            ramp_step_s: default_ramp_step_s(),
        }
    }
}

impl RobotConfig {
    /// Reject values that would make the navigation loop unsafe or
    /// meaningless.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<(), RoverError> {
        check_unit_open("speed", self.speed)?;
        check_unit_open("turn_speed", self.turn_speed)?;
        check_unit_closed("target_light_level", self.target_light_level)?;
        check_unit_closed("sound_threshold", self.sound_threshold)?;

        if !(self.safe_distance_cm.is_finite() && self.safe_distance_cm > 0.0) {
            return Err(invalid("safe_distance_cm", self.safe_distance_cm, "must be > 0"));
        }
        if self.scan_step_deg <= 0 {
            return Err(RoverError::InvalidConfig(format!(
                "scan_step_deg {} must be > 0",
                self.scan_step_deg
            )));
        }
        if !(0..=180).contains(&self.scan_range_deg) {
            return Err(RoverError::InvalidConfig(format!(
                "scan_range_deg {} out of [0, 180]",
                self.scan_range_deg
            )));
        }
        let span = 2 * (self.scan_range_deg / 2);
        if span % self.scan_step_deg != 0 {
            return Err(RoverError::InvalidConfig(format!(
                "scan_step_deg {} does not divide the {}° sweep; the last angle would be skipped",
                self.scan_step_deg, span
            )));
        }

        for (name, pct) in [
            ("battery_warning_pct", self.battery_warning_pct),
            ("battery_critical_pct", self.battery_critical_pct),
        ] {
            if !(pct.is_finite() && (0.0..=100.0).contains(&pct)) {
                return Err(invalid(name, pct, "out of [0, 100]"));
            }
        }
        if self.battery_critical_pct > self.battery_warning_pct {
            return Err(RoverError::InvalidConfig(format!(
                "battery_critical_pct {} exceeds battery_warning_pct {}",
                self.battery_critical_pct, self.battery_warning_pct
            )));
        }

        for (name, secs) in [
            ("scan_interval_s", self.scan_interval_s),
            ("move_duration_s", self.move_duration_s),
            ("turn_duration_s", self.turn_duration_s),
            ("emergency_stop_duration_s", self.emergency_stop_duration_s),
            ("ramp_step_s", self.ramp_step_s),
        ] {
            if !(secs.is_finite() && secs >= 0.0) {
                return Err(invalid(name, secs, "must be a non-negative duration"));
            }
        }
        Ok(())
    }

    /// Servo angles visited by one sweep, ascending. Both ends are included
    /// for any config that passes [`RobotConfig::validate`].
    pub fn scan_angles(&self) -> Vec<i32> {
        let half = self.scan_range_deg / 2;
        let step = self.scan_step_deg.max(1) as usize;
        (-half..=half).step_by(step).collect()
    }

    pub fn scan_interval(&self) -> Duration {
        secs(self.scan_interval_s)
    }

    pub fn move_duration(&self) -> Duration {
        secs(self.move_duration_s)
    }

    pub fn emergency_stop_duration(&self) -> Duration {
        secs(self.emergency_stop_duration_s)
    }

    pub fn ramp_step(&self) -> Duration {
        secs(self.ramp_step_s)
    }

    /// Rotation time for `angle_deg`, proportional to its magnitude.
    pub fn turn_duration_for(&self, angle_deg: i32) -> Duration {
        secs(f64::from(angle_deg.unsigned_abs()) / 90.0 * self.turn_duration_s)
    }
}

/// Seconds to [`Duration`], mapping negative or non-finite input to zero.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn invalid(name: &str, value: f64, why: &str) -> RoverError {
    RoverError::InvalidConfig(format!("{name} {value} {why}"))
}

fn check_unit_open(name: &str, value: f64) -> Result<(), RoverError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(invalid(name, value, "out of (0, 1]"))
    }
}

fn check_unit_closed(name: &str, value: f64) -> Result<(), RoverError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(name, value, "out of [0, 1]"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = RobotConfig::default();
        cfg.validate().expect("defaults must validate");
        assert_eq!(cfg.speed, 0.4);
        assert_eq!(cfg.safe_distance_cm, 25.0);
        assert_eq!(cfg.emergency_stop_duration(), Duration::from_secs(2));
    }

    #[test]
    fn default_sweep_has_seven_positions() {
        let cfg = RobotConfig::default();
        assert_eq!(cfg.scan_angles(), vec![-45, -30, -15, 0, 15, 30, 45]);
    }

    #[test]
    fn zero_range_scans_straight_ahead_only() {
        let cfg = RobotConfig {
            scan_range_deg: 0,
            ..RobotConfig::default()
        };
        assert_eq!(cfg.scan_angles(), vec![0]);
    }

    #[test]
    fn turn_duration_scales_with_magnitude() {
        let cfg = RobotConfig::default();
        assert_eq!(cfg.turn_duration_for(90), Duration::from_secs(1));
        assert_eq!(cfg.turn_duration_for(-45), Duration::from_millis(500));
        assert_eq!(cfg.turn_duration_for(0), Duration::ZERO);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: RobotConfig = toml::from_str("speed = 0.6\nscan_step_deg = 30\n").unwrap();
        assert_eq!(cfg.speed, 0.6);
        assert_eq!(cfg.scan_step_deg, 30);
        assert_eq!(cfg.turn_speed, 0.25);
        assert_eq!(cfg.scan_angles(), vec![-45, -15, 15, 45]);
    }

    #[test]
    fn rejects_speed_above_one() {
        let cfg = RobotConfig {
            speed: 1.5,
            ..RobotConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(RoverError::InvalidConfig(msg)) if msg.contains("speed")));
    }

    #[test]
    fn rejects_step_that_skips_the_sweep_end() {
        let cfg = RobotConfig {
            scan_step_deg: 20,
            ..RobotConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(RoverError::InvalidConfig(msg)) if msg.contains("scan_step_deg")));

        for step in [1, 15, 30, 45, 90] {
            let cfg = RobotConfig {
                scan_step_deg: step,
                ..RobotConfig::default()
            };
            cfg.validate().expect("step divides the sweep");
            assert_eq!(cfg.scan_angles().last(), Some(&45), "step {step}");
        }
    }

    #[test]
    fn rejects_inverted_battery_thresholds() {
        let cfg = RobotConfig {
            battery_warning_pct: 10.0,
            battery_critical_pct: 20.0,
            ..RobotConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_step_and_nan_durations() {
        let cfg = RobotConfig {
            scan_step_deg: 0,
            ..RobotConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = RobotConfig {
            move_duration_s: f64::NAN,
            ..RobotConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn negative_seconds_map_to_zero_duration() {
        let cfg = RobotConfig {
            scan_interval_s: -1.0,
            ..RobotConfig::default()
        };
        assert_eq!(cfg.scan_interval(), Duration::ZERO);
    }
}
