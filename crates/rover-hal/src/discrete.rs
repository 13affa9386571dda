//! Discrete backend – raw GPIO / I2C wiring.
//!
//! Used when no integrated robot board is present. Sensors and actuators are
//! wired to individual pins and bus channels:
//!
//! | Capability | Wiring |
//! |---|---|
//! | Distance | HC-SR04 style trigger/echo pair; range from echo pulse width |
//! | Light, sound | digital pin (0/1) or normalised ADC channel |
//! | Battery | ADC channel scaled to percent |
//! | Servo | PWM controller channel, linear angle-to-ticks calibration |
//! | Motors | PWM channel plus forward/backward direction pins per side |
//!
//! The pin/bus driver implements [`PinBus`]; [`DiscreteBackend`] turns it
//! into a [`HardwarePort`].

use std::time::Duration;

use rover_types::RoverError;
use tracing::{debug, info};

use crate::port::{HardwarePort, check_servo_angle, clamp_drive, clamp_percent, clamp_unit};

/// Speed of sound in air at ~20 °C, cm/s.
pub const SPEED_OF_SOUND_CM_S: f64 = 34_300.0;

/// Width of the ranger trigger pulse.
pub const TRIGGER_PULSE: Duration = Duration::from_micros(10);

/// Contract for the external GPIO / I2C driver.
pub trait PinBus: Send {
    fn write_pin(&mut self, pin: u8, high: bool) -> Result<(), RoverError>;

    fn read_pin(&mut self, pin: u8) -> Result<bool, RoverError>;

    /// Drive `pin` high for `width`, then low.
    fn pulse(&mut self, pin: u8, width: Duration) -> Result<(), RoverError>;

    /// Wait for `pin` to go high and return how long it stayed high, or
    /// `None` if no pulse arrived within `timeout`.
    fn measure_high(&mut self, pin: u8, timeout: Duration) -> Result<Option<Duration>, RoverError>;

    /// ADC reading normalised to `[0, 1]`.
    fn read_analog(&mut self, channel: u8) -> Result<f64, RoverError>;

    /// Write a raw PWM register value (ticks) to `channel`.
    fn write_pwm(&mut self, channel: u8, value: f64) -> Result<(), RoverError>;

    /// Return every claimed line and close the bus handle.
    fn release(&mut self) -> Result<(), RoverError>;
}

/// Where a scalar sensor is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorInput {
    /// Threshold sensor on a GPIO line: reads as `0.0` or `1.0`.
    Digital(u8),
    /// ADC channel, already normalised by the bus.
    Analog(u8),
}

/// Pins for one motor of the differential drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorPins {
    pub pwm_channel: u8,
    pub forward_pin: u8,
    pub backward_pin: u8,
}

/// Linear angle → PWM ticks mapping, calibrated per servo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServoCalibration {
    pub ticks_per_degree: f64,
    pub center_ticks: f64,
}

impl Default for ServoCalibration {
    fn default() -> Self {
        Self {
            ticks_per_degree: 2.5,
            center_ticks: 150.0,
        }
    }
}

impl ServoCalibration {
    pub fn ticks_for(&self, angle_deg: i32) -> f64 {
        f64::from(angle_deg) * self.ticks_per_degree + self.center_ticks
    }
}

/// Full wiring description for the discrete backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscretePins {
    pub trigger_pin: u8,
    pub echo_pin: u8,
    /// Longest echo to wait for; ~4 m round trip at the default.
    pub echo_timeout: Duration,
    pub light: SensorInput,
    pub sound: SensorInput,
    pub battery_channel: u8,
    pub servo_channel: u8,
    pub servo: ServoCalibration,
    pub left: MotorPins,
    pub right: MotorPins,
    /// PWM register value corresponding to full motor output.
    pub motor_pwm_full_scale: f64,
}

impl Default for DiscretePins {
    fn default() -> Self {
        Self {
            trigger_pin: 23,
            echo_pin: 24,
            echo_timeout: Duration::from_millis(25),
            light: SensorInput::Analog(0),
            sound: SensorInput::Analog(1),
            battery_channel: 2,
            servo_channel: 0,
            servo: ServoCalibration::default(),
            left: MotorPins {
                pwm_channel: 16,
                forward_pin: 18,
                backward_pin: 17,
            },
            right: MotorPins {
                pwm_channel: 21,
                forward_pin: 19,
                backward_pin: 20,
            },
            motor_pwm_full_scale: 4095.0,
        }
    }
}

/// Convert an echo pulse width to a one-way distance.
pub fn echo_to_distance_cm(echo_high: Duration) -> f64 {
    echo_high.as_secs_f64() * SPEED_OF_SOUND_CM_S / 2.0
}

/// [`HardwarePort`] over a [`PinBus`].
pub struct DiscreteBackend<B: PinBus> {
    bus: B,
    pins: DiscretePins,
    released: bool,
}

impl<B: PinBus> DiscreteBackend<B> {
    /// Claim the wiring: trigger low, both motors idle, servo centred.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::HardwareUnavailable`] if any line refuses its
    /// initial state.
    pub fn new(bus: B, pins: DiscretePins) -> Result<Self, RoverError> {
        let mut backend = Self {
            bus,
            pins,
            released: false,
        };
        backend
            .initialise()
            .map_err(|e| RoverError::unavailable(format!("discrete wiring init: {e}")))?;
        info!(
            trigger = backend.pins.trigger_pin,
            echo = backend.pins.echo_pin,
            "discrete backend initialised"
        );
        Ok(backend)
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn pins(&self) -> &DiscretePins {
        &self.pins
    }

    fn initialise(&mut self) -> Result<(), RoverError> {
        self.bus.write_pin(self.pins.trigger_pin, false)?;
        self.stop()?;
        self.set_servo_angle(0)
    }

    fn read_input(&mut self, sensor: &str, input: SensorInput) -> Result<f64, RoverError> {
        let raw = match input {
            SensorInput::Digital(pin) => {
                if self.bus.read_pin(pin)? {
                    1.0
                } else {
                    0.0
                }
            }
            SensorInput::Analog(channel) => self.bus.read_analog(channel)?,
        };
        if raw.is_nan() {
            return Err(RoverError::sensor(sensor, "ADC returned NaN"));
        }
        Ok(clamp_unit(raw))
    }

    fn set_motor(&mut self, motor: MotorPins, output: f64) -> Result<(), RoverError> {
        let output = clamp_drive(output);
        self.bus.write_pin(motor.forward_pin, output > 0.0)?;
        self.bus.write_pin(motor.backward_pin, output < 0.0)?;
        self.bus
            .write_pwm(motor.pwm_channel, output.abs() * self.pins.motor_pwm_full_scale)
    }
}

impl<B: PinBus> HardwarePort for DiscreteBackend<B> {
    fn name(&self) -> &str {
        "discrete"
    }

    fn read_distance(&mut self) -> Result<f64, RoverError> {
        self.bus.pulse(self.pins.trigger_pin, TRIGGER_PULSE)?;
        match self
            .bus
            .measure_high(self.pins.echo_pin, self.pins.echo_timeout)?
        {
            Some(echo) => Ok(echo_to_distance_cm(echo)),
            None => Err(RoverError::sensor(
                "ultrasonic",
                format!("no echo within {:?}", self.pins.echo_timeout),
            )),
        }
    }

    fn read_light(&mut self) -> Result<f64, RoverError> {
        self.read_input("light", self.pins.light)
    }

    fn read_sound(&mut self) -> Result<f64, RoverError> {
        self.read_input("sound", self.pins.sound)
    }

    fn read_battery(&mut self) -> Result<f64, RoverError> {
        let raw = self.bus.read_analog(self.pins.battery_channel)?;
        Ok(clamp_percent(raw * 100.0))
    }

    fn set_servo_angle(&mut self, angle_deg: i32) -> Result<(), RoverError> {
        check_servo_angle(angle_deg)?;
        let ticks = self.pins.servo.ticks_for(angle_deg);
        self.bus
            .write_pwm(self.pins.servo_channel, ticks)
            .map_err(|e| RoverError::actuator("servo", e.to_string()))
    }

    fn drive(&mut self, left: f64, right: f64) -> Result<(), RoverError> {
        if self.released {
            return Err(RoverError::actuator("drive_base", "backend already released"));
        }
        let (l, r) = (self.pins.left, self.pins.right);
        self.set_motor(l, left)
            .and_then(|()| self.set_motor(r, right))
            .map_err(|e| RoverError::actuator("drive_base", e.to_string()))
    }

    fn stop(&mut self) -> Result<(), RoverError> {
        let (l, r) = (self.pins.left, self.pins.right);
        let left = self.set_motor(l, 0.0);
        let right = self.set_motor(r, 0.0);
        left.and(right)
    }

    fn release(&mut self) -> Result<(), RoverError> {
        if self.released {
            return Ok(());
        }
        let stopped = self.stop();
        self.released = true;
        let freed = self.bus.release();
        debug!("discrete backend released");
        stopped.and(freed)
    }
}
