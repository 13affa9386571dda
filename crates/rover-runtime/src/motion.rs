//! [`MotionController`] – bounded, ramped wheel commands.
//!
//! Every motion follows the same profile: ramp up through `ramp_steps`
//! increasing magnitudes, hold the target for the command's duration, ramp
//! down through the mirror sequence, then stop. The stop is issued on every
//! exit path, including a `drive` that fails half-way up the ramp.

use std::time::Duration;

use rover_hal::HardwarePort;
use rover_types::{MotionCommand, RobotConfig, RoverError};
use tracing::{debug, error, warn};

use crate::clock::Clock;

/// Intermediate magnitudes on the way to `target`, excluding zero and the
/// target itself: `target * i / (steps + 1)` for `i` in `1..=steps`.
pub fn ramp_levels(target: f64, steps: u32) -> Vec<f64> {
    let n = f64::from(steps) + 1.0;
    (1..=steps).map(|i| target * f64::from(i) / n).collect()
}

#[derive(Debug, Clone)]
pub struct MotionController {
    speed: f64,
    turn_speed: f64,
    ramp_steps: u32,
    ramp_step: Duration,
    /// Rotation time for a quarter turn.
    quarter_turn: Duration,
}

impl MotionController {
    pub fn from_config(cfg: &RobotConfig) -> Self {
        Self {
            speed: cfg.speed,
            turn_speed: cfg.turn_speed,
            ramp_steps: cfg.ramp_steps,
            ramp_step: cfg.ramp_step(),
            quarter_turn: cfg.turn_duration_for(90),
        }
    }

    /// `|angle| / 90` quarter turns.
    pub fn turn_duration(&self, angle_deg: i32) -> Duration {
        self.quarter_turn
            .mul_f64(f64::from(angle_deg.unsigned_abs()) / 90.0)
    }

    pub fn forward_command(&self, duration: Duration) -> MotionCommand {
        MotionCommand::Forward { duration }
    }

    pub fn turn_command(&self, angle_deg: i32) -> MotionCommand {
        MotionCommand::Turn {
            angle_deg,
            duration: self.turn_duration(angle_deg),
        }
    }

    /// Carry out `command`, blocking until the wheels are stopped again.
    ///
    /// # Errors
    ///
    /// Returns the first [`RoverError::ActuatorFault`] raised by the port. The
    /// port has already been told to stop when this returns.
    pub fn execute<P, C>(
        &self,
        port: &mut P,
        clock: &C,
        command: MotionCommand,
    ) -> Result<(), RoverError>
    where
        P: HardwarePort + ?Sized,
        C: Clock + ?Sized,
    {
        debug!(?command, "executing motion command");
        match command {
            MotionCommand::Forward { duration } => {
                self.run_profile(port, clock, (1.0, 1.0), self.speed, duration)
            }
            MotionCommand::Turn { angle_deg: 0, .. } => self.stop(port),
            MotionCommand::Turn {
                angle_deg,
                duration,
            } => {
                // Positive angles rotate clockwise: left wheel forward.
                let sign = f64::from(angle_deg.signum());
                self.run_profile(port, clock, (sign, -sign), self.turn_speed, duration)
            }
            MotionCommand::Stop => self.stop(port),
        }
    }

    pub fn move_forward<P, C>(
        &self,
        port: &mut P,
        clock: &C,
        duration: Duration,
    ) -> Result<(), RoverError>
    where
        P: HardwarePort + ?Sized,
        C: Clock + ?Sized,
    {
        self.execute(port, clock, self.forward_command(duration))
    }

    /// Rotate in place by roughly `angle_deg`. Positive is clockwise.
    pub fn turn<P, C>(&self, port: &mut P, clock: &C, angle_deg: i32) -> Result<(), RoverError>
    where
        P: HardwarePort + ?Sized,
        C: Clock + ?Sized,
    {
        self.execute(port, clock, self.turn_command(angle_deg))
    }

    /// Zero both wheels immediately. Idempotent.
    pub fn stop<P: HardwarePort + ?Sized>(&self, port: &mut P) -> Result<(), RoverError> {
        port.stop()
    }

    fn run_profile<P, C>(
        &self,
        port: &mut P,
        clock: &C,
        direction: (f64, f64),
        magnitude: f64,
        hold: Duration,
    ) -> Result<(), RoverError>
    where
        P: HardwarePort + ?Sized,
        C: Clock + ?Sized,
    {
        let driven = self.drive_profile(port, clock, direction, magnitude, hold);
        let stopped = port.stop();
        match driven {
            Ok(()) => stopped,
            Err(e) => {
                warn!(error = %e, "motion aborted; wheels stopped");
                if let Err(stop_err) = stopped {
                    error!(error = %stop_err, "stop after aborted motion also failed");
                }
                Err(e)
            }
        }
    }

    fn drive_profile<P, C>(
        &self,
        port: &mut P,
        clock: &C,
        (left, right): (f64, f64),
        magnitude: f64,
        hold: Duration,
    ) -> Result<(), RoverError>
    where
        P: HardwarePort + ?Sized,
        C: Clock + ?Sized,
    {
        let ramp = ramp_levels(magnitude, self.ramp_steps);
        for &level in &ramp {
            port.drive(left * level, right * level)?;
            clock.sleep(self.ramp_step);
        }
        port.drive(left * magnitude, right * magnitude)?;
        clock.sleep(hold);
        for &level in ramp.iter().rev() {
            port.drive(left * level, right * level)?;
            clock.sleep(self.ramp_step);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rover_hal::{PortCall, PortOp, SimPort};

    use super::*;
    use crate::clock::ManualClock;

    fn controller() -> MotionController {
        MotionController::from_config(&RobotConfig::default())
    }

    fn drives(port: &SimPort) -> Vec<(f64, f64)> {
        port.calls()
            .iter()
            .filter_map(|c| match c {
                PortCall::Drive(l, r) => Some((*l, *r)),
                _ => None,
            })
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn ramp_levels_are_evenly_spaced() {
        let levels = ramp_levels(0.4, 3);
        assert_eq!(levels.len(), 3);
        for (got, want) in levels.iter().zip([0.1, 0.2, 0.3]) {
            assert!(approx(*got, want), "{got} != {want}");
        }
        assert!(ramp_levels(0.4, 0).is_empty());
    }

    #[test]
    fn forward_ramps_holds_and_stops() {
        let mut port = SimPort::new();
        let clock = ManualClock::new();
        controller()
            .move_forward(&mut port, &clock, Duration::from_millis(500))
            .unwrap();

        let magnitudes: Vec<f64> = drives(&port).iter().map(|(l, _)| *l).collect();
        let want = [0.1, 0.2, 0.3, 0.4, 0.3, 0.2, 0.1];
        assert_eq!(magnitudes.len(), want.len());
        for (got, want) in magnitudes.iter().zip(want) {
            assert!(approx(*got, want));
        }
        assert!(drives(&port).iter().all(|(l, r)| l == r));
        assert_eq!(port.calls().last(), Some(&PortCall::Stop));
        assert_eq!(port.outputs(), (0.0, 0.0));

        let ramp = Duration::from_millis(100);
        assert_eq!(
            clock.sleeps(),
            vec![ramp, ramp, ramp, Duration::from_millis(500), ramp, ramp, ramp]
        );
    }

    #[test]
    fn turns_are_mirrored() {
        let mc = controller();
        let (mut right, mut left) = (SimPort::new(), SimPort::new());
        let (rc, lc) = (ManualClock::new(), ManualClock::new());
        mc.turn(&mut right, &rc, 45).unwrap();
        mc.turn(&mut left, &lc, -45).unwrap();

        let (r, l) = (drives(&right), drives(&left));
        assert_eq!(r.len(), l.len());
        for ((rl, rr), (ll, lr)) in r.iter().zip(&l) {
            assert!(*rl > 0.0 && *rr < 0.0);
            assert_eq!((*rl, *rr), (-*ll, -*lr));
        }
        assert_eq!(rc.sleeps(), lc.sleeps());
        assert_eq!(right.outputs(), (0.0, 0.0));
        assert_eq!(left.outputs(), (0.0, 0.0));
    }

    #[test]
    fn turn_duration_is_proportional() {
        let mc = controller();
        assert_eq!(mc.turn_duration(90), Duration::from_secs(1));
        assert_eq!(mc.turn_duration(-45), Duration::from_millis(500));
        assert_eq!(mc.turn_duration(0), Duration::ZERO);

        let clock = ManualClock::new();
        mc.turn(&mut SimPort::new(), &clock, 90).unwrap();
        assert!(clock.sleeps().contains(&Duration::from_secs(1)));
    }

    #[test]
    fn zero_turn_only_stops() {
        let mut port = SimPort::new();
        let clock = ManualClock::new();
        controller().turn(&mut port, &clock, 0).unwrap();
        assert_eq!(port.calls(), &[PortCall::Stop]);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn failed_drive_still_stops() {
        let mut port = SimPort::new().failing(PortOp::Drive, 1);
        let err = controller()
            .move_forward(&mut port, &ManualClock::new(), Duration::from_millis(500))
            .unwrap_err();
        assert!(matches!(err, RoverError::ActuatorFault { .. }));
        assert_eq!(port.calls().last(), Some(&PortCall::Stop));
        assert_eq!(port.outputs(), (0.0, 0.0));
    }

    #[test]
    fn stop_command_is_idempotent() {
        let mut port = SimPort::new();
        let mc = controller();
        let clock = ManualClock::new();
        mc.execute(&mut port, &clock, MotionCommand::Stop).unwrap();
        mc.execute(&mut port, &clock, MotionCommand::Stop).unwrap();
        assert_eq!(port.calls(), &[PortCall::Stop, PortCall::Stop]);
    }
}
