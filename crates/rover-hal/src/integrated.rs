//! Integrated backend – delegates to a composite on-board controller.
//!
//! Robot boards that bundle the ranger, light and sound sensors, the servo
//! header, both motor drivers and a battery gauge expose them through a
//! single vendor API. The board driver implements [`OnboardController`]; the
//! [`IntegratedBackend`] adapts it to [`HardwarePort`] and applies the
//! boundary normalisation.

use rover_types::RoverError;
use tracing::{debug, info};

use crate::port::{HardwarePort, check_servo_angle, clamp_drive, clamp_percent, clamp_unit};

/// One side of the differential drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorSide {
    Left,
    Right,
}

/// Contract for the external on-board controller driver.
pub trait OnboardController: Send {
    fn ultrasonic_distance_cm(&mut self) -> Result<f64, RoverError>;

    /// Raw light reading; the backend clamps it to `[0, 1]`.
    fn light_reading(&mut self) -> Result<f64, RoverError>;

    /// Raw sound reading; the backend clamps it to `[0, 1]`.
    fn sound_reading(&mut self) -> Result<f64, RoverError>;

    fn battery_percentage(&mut self) -> Result<f64, RoverError>;

    fn set_servo_angle(&mut self, angle_deg: i32) -> Result<(), RoverError>;

    /// Run one motor at `output` in `[-1, 1]`; negative runs it backwards.
    fn set_motor(&mut self, side: MotorSide, output: f64) -> Result<(), RoverError>;

    fn stop_motor(&mut self, side: MotorSide) -> Result<(), RoverError>;

    /// Hand the board's resources back. Called once by
    /// [`IntegratedBackend::release`].
    fn close(&mut self) -> Result<(), RoverError> {
        Ok(())
    }
}

/// [`HardwarePort`] over an [`OnboardController`].
pub struct IntegratedBackend<C: OnboardController> {
    controller: C,
    released: bool,
}

impl<C: OnboardController> IntegratedBackend<C> {
    /// Wrap `controller` and centre the sensor head.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::HardwareUnavailable`] if the board does not
    /// accept the initial servo command.
    pub fn new(mut controller: C) -> Result<Self, RoverError> {
        controller
            .set_servo_angle(0)
            .map_err(|e| RoverError::unavailable(format!("integrated board init: {e}")))?;
        info!("integrated backend initialised");
        Ok(Self {
            controller,
            released: false,
        })
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }
}

impl<C: OnboardController> HardwarePort for IntegratedBackend<C> {
    fn name(&self) -> &str {
        "integrated"
    }

    fn read_distance(&mut self) -> Result<f64, RoverError> {
        self.controller.ultrasonic_distance_cm()
    }

    fn read_light(&mut self) -> Result<f64, RoverError> {
        self.controller.light_reading().map(clamp_unit)
    }

    fn read_sound(&mut self) -> Result<f64, RoverError> {
        self.controller.sound_reading().map(clamp_unit)
    }

    fn read_battery(&mut self) -> Result<f64, RoverError> {
        self.controller.battery_percentage().map(clamp_percent)
    }

    fn set_servo_angle(&mut self, angle_deg: i32) -> Result<(), RoverError> {
        check_servo_angle(angle_deg)?;
        self.controller.set_servo_angle(angle_deg)
    }

    fn drive(&mut self, left: f64, right: f64) -> Result<(), RoverError> {
        if self.released {
            return Err(RoverError::actuator("drive_base", "backend already released"));
        }
        self.controller.set_motor(MotorSide::Left, clamp_drive(left))?;
        self.controller.set_motor(MotorSide::Right, clamp_drive(right))
    }

    fn stop(&mut self) -> Result<(), RoverError> {
        // Try both sides even if the first refuses.
        let left = self.controller.stop_motor(MotorSide::Left);
        let right = self.controller.stop_motor(MotorSide::Right);
        left.and(right)
    }

    fn release(&mut self) -> Result<(), RoverError> {
        if self.released {
            return Ok(());
        }
        let stopped = self.stop();
        self.released = true;
        let closed = self.controller.close();
        debug!("integrated backend released");
        stopped.and(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MockBoard {
        light: f64,
        servo: Option<i32>,
        left: f64,
        right: f64,
        fail_left_stop: bool,
        right_stop_calls: u32,
        closed: u32,
    }

    impl OnboardController for MockBoard {
        fn ultrasonic_distance_cm(&mut self) -> Result<f64, RoverError> {
            Ok(42.0)
        }
        fn light_reading(&mut self) -> Result<f64, RoverError> {
            Ok(self.light)
        }
        fn sound_reading(&mut self) -> Result<f64, RoverError> {
            Ok(-0.5)
        }
        fn battery_percentage(&mut self) -> Result<f64, RoverError> {
            Ok(101.0)
        }
        fn set_servo_angle(&mut self, angle_deg: i32) -> Result<(), RoverError> {
            self.servo = Some(angle_deg);
            Ok(())
        }
        fn set_motor(&mut self, side: MotorSide, output: f64) -> Result<(), RoverError> {
            match side {
                MotorSide::Left => self.left = output,
                MotorSide::Right => self.right = output,
            }
            Ok(())
        }
        fn stop_motor(&mut self, side: MotorSide) -> Result<(), RoverError> {
            match side {
                MotorSide::Left if self.fail_left_stop => {
                    Err(RoverError::actuator("left_motor", "driver fault"))
                }
                MotorSide::Left => {
                    self.left = 0.0;
                    Ok(())
                }
                MotorSide::Right => {
                    self.right_stop_calls += 1;
                    self.right = 0.0;
                    Ok(())
                }
            }
        }
        fn close(&mut self) -> Result<(), RoverError> {
            self.closed += 1;
            Ok(())
        }
    }

    #[test]
    fn new_centres_servo() {
        let backend = IntegratedBackend::new(MockBoard::default()).unwrap();
        assert_eq!(backend.controller().servo, Some(0));
    }

    #[test]
    fn readings_are_normalised_at_the_boundary() {
        let mut backend = IntegratedBackend::new(MockBoard {
            light: 1.4,
            ..MockBoard::default()
        })
        .unwrap();
        assert_eq!(backend.read_light().unwrap(), 1.0);
        assert_eq!(backend.read_sound().unwrap(), 0.0);
        assert_eq!(backend.read_battery().unwrap(), 100.0);
        assert_eq!(backend.read_distance().unwrap(), 42.0);
    }

    #[test]
    fn drive_clamps_outputs() {
        let mut backend = IntegratedBackend::new(MockBoard::default()).unwrap();
        backend.drive(1.5, -0.3).unwrap();
        assert_eq!(backend.controller().left, 1.0);
        assert_eq!(backend.controller().right, -0.3);
    }

    #[test]
    fn stop_reaches_both_sides_even_when_one_fails() {
        let mut backend = IntegratedBackend::new(MockBoard {
            fail_left_stop: true,
            ..MockBoard::default()
        })
        .unwrap();
        backend.drive(0.4, 0.4).unwrap();
        assert!(backend.stop().is_err());
        assert_eq!(backend.controller().right_stop_calls, 1);
        assert_eq!(backend.controller().right, 0.0);
    }

    #[test]
    fn release_is_idempotent_and_blocks_further_drive() {
        let mut backend = IntegratedBackend::new(MockBoard::default()).unwrap();
        backend.release().unwrap();
        backend.release().unwrap();
        assert_eq!(backend.controller().closed, 1);
        assert!(matches!(
            backend.drive(0.2, 0.2),
            Err(RoverError::ActuatorFault { .. })
        ));
    }

    #[test]
    fn servo_beyond_limit_is_rejected_before_reaching_board() {
        let mut backend = IntegratedBackend::new(MockBoard::default()).unwrap();
        assert!(backend.set_servo_angle(120).is_err());
        assert_eq!(backend.controller().servo, Some(0));
    }
}
