//! In-process simulation port for CI and bench runs without a robot.
//!
//! [`SimPort`] implements [`HardwarePort`] against a scripted world:
//! per-angle distance and light tables keyed by the current servo angle,
//! queued sound and battery readings, optional battery drain, and per-operation
//! fault injection. Every call is recorded as a [`PortCall`] so tests can
//! assert on ordering and on the final drive outputs.
//!
//! # Example
//!
//! ```rust
//! use rover_hal::port::HardwarePort;
//! use rover_hal::sim::{PortCall, SimPort};
//!
//! let mut port = SimPort::new().with_distance(0, 50.0);
//! port.set_servo_angle(0).unwrap();
//! assert_eq!(port.read_distance().unwrap(), 50.0);
//! assert_eq!(port.calls(), &[PortCall::SetServo(0), PortCall::ReadDistance]);
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};

use rover_types::RoverError;

use crate::port::{HardwarePort, check_servo_angle, clamp_drive, clamp_percent, clamp_unit};

/// A recorded port invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PortCall {
    ReadDistance,
    ReadLight,
    ReadSound,
    ReadBattery,
    SetServo(i32),
    Drive(f64, f64),
    Stop,
    Release,
}

impl PortCall {
    /// `true` for calls that command the wheels with a non-zero output.
    pub fn is_motion(&self) -> bool {
        matches!(self, PortCall::Drive(l, r) if *l != 0.0 || *r != 0.0)
    }
}

/// Operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortOp {
    Distance,
    Light,
    Sound,
    Battery,
    Servo,
    Drive,
    Stop,
}

/// Scripted, recording [`HardwarePort`].
pub struct SimPort {
    servo_angle: i32,
    distances: BTreeMap<i32, f64>,
    default_distance: f64,
    lights: BTreeMap<i32, f64>,
    default_light: f64,
    sound: VecDeque<f64>,
    last_sound: f64,
    battery: VecDeque<f64>,
    last_battery: f64,
    battery_drain_per_drive: f64,
    faults: HashMap<PortOp, usize>,
    calls: Vec<PortCall>,
    left: f64,
    right: f64,
    released: bool,
}

impl Default for SimPort {
    fn default() -> Self {
        Self {
            servo_angle: 0,
            distances: BTreeMap::new(),
            default_distance: 100.0,
            lights: BTreeMap::new(),
            default_light: 0.5,
            sound: VecDeque::new(),
            last_sound: 0.0,
            battery: VecDeque::new(),
            last_battery: 100.0,
            battery_drain_per_drive: 0.0,
            faults: HashMap::new(),
            calls: Vec::new(),
            left: 0.0,
            right: 0.0,
            released: false,
        }
    }
}

impl SimPort {
    /// An open world: 100 cm in every direction, light 0.5, silent, full
    /// battery.
    pub fn new() -> Self {
        Self::default()
    }

    /// Range reported while the servo points at `angle_deg`.
    pub fn with_distance(mut self, angle_deg: i32, distance_cm: f64) -> Self {
        self.distances.insert(angle_deg, distance_cm);
        self
    }

    pub fn with_default_distance(mut self, distance_cm: f64) -> Self {
        self.default_distance = distance_cm;
        self
    }

    /// Light level reported while the servo points at `angle_deg`.
    pub fn with_light(mut self, angle_deg: i32, light: f64) -> Self {
        self.lights.insert(angle_deg, light);
        self
    }

    pub fn with_default_light(mut self, light: f64) -> Self {
        self.default_light = light;
        self
    }

    /// Script a whole sweep as `(angle, distance, light)` triples.
    pub fn with_samples(mut self, samples: &[(i32, f64, f64)]) -> Self {
        for &(angle, distance, light) in samples {
            self.distances.insert(angle, distance);
            self.lights.insert(angle, light);
        }
        self
    }

    /// Queue sound readings. Once drained, the last value repeats.
    pub fn with_sound_levels(mut self, levels: impl IntoIterator<Item = f64>) -> Self {
        self.sound.extend(levels);
        self
    }

    /// Queue battery readings. Once drained, the last value repeats (minus
    /// any configured drain).
    pub fn with_battery_levels(mut self, levels: impl IntoIterator<Item = f64>) -> Self {
        self.battery.extend(levels);
        self
    }

    /// Lose `pct` of charge on every non-zero drive command.
    pub fn with_battery_drain(mut self, pct: f64) -> Self {
        self.battery_drain_per_drive = pct;
        self
    }

    /// Make the next `times` invocations of `op` fail.
    pub fn failing(mut self, op: PortOp, times: usize) -> Self {
        self.faults.insert(op, times);
        self
    }

    pub fn calls(&self) -> &[PortCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Current `(left, right)` drive outputs.
    pub fn outputs(&self) -> (f64, f64) {
        (self.left, self.right)
    }

    pub fn servo_angle(&self) -> i32 {
        self.servo_angle
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn inject(&mut self, op: PortOp) -> Result<(), RoverError> {
        match self.faults.get_mut(&op) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                let component = format!("{op:?}").to_lowercase();
                Err(match op {
                    PortOp::Servo | PortOp::Drive | PortOp::Stop => {
                        RoverError::actuator(component, "injected fault")
                    }
                    _ => RoverError::sensor(component, "injected fault"),
                })
            }
            _ => Ok(()),
        }
    }
}

impl HardwarePort for SimPort {
    fn name(&self) -> &str {
        "sim"
    }

    fn read_distance(&mut self) -> Result<f64, RoverError> {
        self.calls.push(PortCall::ReadDistance);
        self.inject(PortOp::Distance)?;
        Ok(self
            .distances
            .get(&self.servo_angle)
            .copied()
            .unwrap_or(self.default_distance))
    }

    fn read_light(&mut self) -> Result<f64, RoverError> {
        self.calls.push(PortCall::ReadLight);
        self.inject(PortOp::Light)?;
        let raw = self
            .lights
            .get(&self.servo_angle)
            .copied()
            .unwrap_or(self.default_light);
        Ok(clamp_unit(raw))
    }

    fn read_sound(&mut self) -> Result<f64, RoverError> {
        self.calls.push(PortCall::ReadSound);
        self.inject(PortOp::Sound)?;
        if let Some(level) = self.sound.pop_front() {
            self.last_sound = level;
        }
        Ok(clamp_unit(self.last_sound))
    }

    fn read_battery(&mut self) -> Result<f64, RoverError> {
        self.calls.push(PortCall::ReadBattery);
        self.inject(PortOp::Battery)?;
        if let Some(level) = self.battery.pop_front() {
            self.last_battery = level;
        }
        Ok(clamp_percent(self.last_battery))
    }

    fn set_servo_angle(&mut self, angle_deg: i32) -> Result<(), RoverError> {
        self.calls.push(PortCall::SetServo(angle_deg));
        self.inject(PortOp::Servo)?;
        check_servo_angle(angle_deg)?;
        self.servo_angle = angle_deg;
        Ok(())
    }

    fn drive(&mut self, left: f64, right: f64) -> Result<(), RoverError> {
        let (left, right) = (clamp_drive(left), clamp_drive(right));
        self.calls.push(PortCall::Drive(left, right));
        self.inject(PortOp::Drive)?;
        if self.released {
            return Err(RoverError::actuator("drive_base", "port already released"));
        }
        self.left = left;
        self.right = right;
        if left != 0.0 || right != 0.0 {
            self.last_battery -= self.battery_drain_per_drive;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RoverError> {
        self.calls.push(PortCall::Stop);
        // Outputs drop to zero even when the stop is scripted to report an
        // error: the sim models a driver that fails after cutting power.
        self.left = 0.0;
        self.right = 0.0;
        self.inject(PortOp::Stop)
    }

    fn release(&mut self) -> Result<(), RoverError> {
        self.calls.push(PortCall::Release);
        self.left = 0.0;
        self.right = 0.0;
        self.released = true;
        Ok(())
    }
}
