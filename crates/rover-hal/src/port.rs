//! The [`HardwarePort`] capability trait.
//!
//! The navigation runtime only ever talks to this trait. Backends (integrated
//! board, discrete GPIO/I2C, simulation) are chosen once at startup and are
//! interchangeable behind it.

use rover_types::{HardwareReading, RoverError};

/// Mechanical limit of the sensor-head servo, either side of centre.
pub const SERVO_LIMIT_DEG: i32 = 90;

/// Uniform capability set over the robot's sensors and actuators.
///
/// Every read reflects current sensor state; nothing is cached. Backends
/// normalise their outputs at this boundary: light and sound are clamped to
/// `[0, 1]`, battery to `[0, 100]`. Non-finite values pass through untouched
/// so that downstream scoring can classify them as faults.
pub trait HardwarePort: Send {
    /// Short backend identifier used in logs, e.g. `"integrated"`.
    fn name(&self) -> &str;

    /// Range to the nearest obstacle in front of the sensor head, in cm.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::SensorReadFault`] when the ranger gives no usable
    /// answer (e.g. no echo within the timeout).
    fn read_distance(&mut self) -> Result<f64, RoverError>;

    /// Ambient light, normalised to `[0, 1]`.
    fn read_light(&mut self) -> Result<f64, RoverError>;

    /// Sound level, normalised to `[0, 1]`.
    fn read_sound(&mut self) -> Result<f64, RoverError>;

    /// Remaining battery charge in percent.
    fn read_battery(&mut self) -> Result<f64, RoverError>;

    /// Point the sensor head at `angle_deg` (0 = straight ahead, positive =
    /// right).
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::ActuatorFault`] if the angle is beyond
    /// [`SERVO_LIMIT_DEG`] or the servo cannot be driven.
    fn set_servo_angle(&mut self, angle_deg: i32) -> Result<(), RoverError>;

    /// Command differential drive outputs, each in `[-1, 1]`.
    fn drive(&mut self, left: f64, right: f64) -> Result<(), RoverError>;

    /// Command zero output on both wheels. Idempotent.
    fn stop(&mut self) -> Result<(), RoverError>;

    /// Stop and release every hardware resource held by the backend.
    ///
    /// Idempotent; safe to call on every exit path.
    fn release(&mut self) -> Result<(), RoverError> {
        self.stop()
    }

    /// Read every scalar sensor once, in the order battery, sound, distance,
    /// light.
    fn read_all(&mut self) -> Result<HardwareReading, RoverError> {
        let battery_pct = self.read_battery()?;
        let sound = self.read_sound()?;
        let distance_cm = self.read_distance()?;
        let light = self.read_light()?;
        Ok(HardwareReading {
            distance_cm,
            light,
            sound,
            battery_pct,
        })
    }
}

impl<P: HardwarePort + ?Sized> HardwarePort for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn read_distance(&mut self) -> Result<f64, RoverError> {
        (**self).read_distance()
    }
    fn read_light(&mut self) -> Result<f64, RoverError> {
        (**self).read_light()
    }
    fn read_sound(&mut self) -> Result<f64, RoverError> {
        (**self).read_sound()
    }
    fn read_battery(&mut self) -> Result<f64, RoverError> {
        (**self).read_battery()
    }
    fn set_servo_angle(&mut self, angle_deg: i32) -> Result<(), RoverError> {
        (**self).set_servo_angle(angle_deg)
    }
    fn drive(&mut self, left: f64, right: f64) -> Result<(), RoverError> {
        (**self).drive(left, right)
    }
    fn stop(&mut self) -> Result<(), RoverError> {
        (**self).stop()
    }
    fn release(&mut self) -> Result<(), RoverError> {
        (**self).release()
    }
    fn read_all(&mut self) -> Result<HardwareReading, RoverError> {
        (**self).read_all()
    }
}

/// Clamp a normalised reading to `[0, 1]`, leaving NaN/inf untouched.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        value
    }
}

/// Clamp a battery reading to `[0, 100]`, leaving NaN/inf untouched.
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        value
    }
}

/// Clamp a drive output to `[-1, 1]`. Non-finite commands become zero.
pub fn clamp_drive(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Reject servo targets beyond the mechanical limit.
pub(crate) fn check_servo_angle(angle_deg: i32) -> Result<(), RoverError> {
    if angle_deg.abs() > SERVO_LIMIT_DEG {
        return Err(RoverError::actuator(
            "servo",
            format!("angle {angle_deg}° beyond ±{SERVO_LIMIT_DEG}°"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_unit_bounds_finite_values() {
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_unit(0.3), 0.3);
        assert!(clamp_unit(f64::NAN).is_nan());
    }

    #[test]
    fn clamp_percent_bounds_finite_values() {
        assert_eq!(clamp_percent(104.0), 100.0);
        assert_eq!(clamp_percent(-3.0), 0.0);
        assert!(clamp_percent(f64::INFINITY).is_infinite());
    }

    #[test]
    fn clamp_drive_zeroes_non_finite() {
        assert_eq!(clamp_drive(2.0), 1.0);
        assert_eq!(clamp_drive(-2.0), -1.0);
        assert_eq!(clamp_drive(f64::NAN), 0.0);
    }

    #[test]
    fn servo_limit_is_inclusive() {
        assert!(check_servo_angle(90).is_ok());
        assert!(check_servo_angle(-90).is_ok());
        assert!(matches!(
            check_servo_angle(91),
            Err(RoverError::ActuatorFault { .. })
        ));
    }
}
