//! [`Scanner`] – one servo sweep of the sensor head.
//!
//! The head is stepped from `-range/2` to `+range/2` in `scan_step_deg`
//! increments. At each stop the scanner waits `scan_interval_s` for the servo
//! to settle, then takes one distance and one light reading. Bad values are
//! passed through untouched; a read that fails outright is recorded as `NaN`
//! and left for the scorer to treat as unsafe. Only a servo failure aborts
//! the sweep.

use std::time::Duration;

use rover_hal::HardwarePort;
use rover_types::{RobotConfig, RoverError, ScanResult, ScanSample};
use tracing::{debug, warn};

use crate::clock::Clock;

#[derive(Debug, Clone)]
pub struct Scanner {
    angles: Vec<i32>,
    settle: Duration,
}

impl Scanner {
    pub fn from_config(cfg: &RobotConfig) -> Self {
        Self {
            angles: cfg.scan_angles(),
            settle: cfg.scan_interval(),
        }
    }

    /// Servo angles visited by [`Scanner::scan`], ascending.
    pub fn angles(&self) -> &[i32] {
        &self.angles
    }

    /// Sweep the sensor head and collect one sample per angle.
    ///
    /// # Errors
    ///
    /// Propagates the first [`RoverError::ActuatorFault`] (or any other
    /// non-sensor error) raised while positioning the servo. Sensor faults
    /// never abort the sweep.
    pub fn scan<P, C>(&self, port: &mut P, clock: &C) -> Result<ScanResult, RoverError>
    where
        P: HardwarePort + ?Sized,
        C: Clock + ?Sized,
    {
        let mut samples = Vec::with_capacity(self.angles.len());
        for &angle in &self.angles {
            port.set_servo_angle(angle)?;
            clock.sleep(self.settle);
            let distance = or_nan(port.read_distance(), angle)?;
            let light = or_nan(port.read_light(), angle)?;
            debug!(angle, distance, light, "scan sample");
            samples.push(ScanSample::new(angle, distance, light));
        }
        Ok(ScanResult::new(samples))
    }
}

/// Degrade a failed sensor read to `NaN`; pass every other error through.
fn or_nan(read: Result<f64, RoverError>, angle: i32) -> Result<f64, RoverError> {
    match read {
        Ok(value) => Ok(value),
        Err(RoverError::SensorReadFault { sensor, details }) => {
            warn!(angle, %sensor, %details, "sensor read failed during scan");
            Ok(f64::NAN)
        }
        Err(other) => Err(other),
    }
}
