//! Component self-test behind `rover test`.
//!
//! Each check runs independently and records either the observed value or
//! the error; one failing component never hides the others.

use std::fmt;
use std::time::Duration;

use rover_hal::HardwarePort;
use rover_types::{RobotConfig, RoverError};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::motion::MotionController;

/// How long the servo sweep dwells at each position.
pub const SERVO_DWELL: Duration = Duration::from_secs(1);

/// Forward run used by the motor check.
pub const MOTOR_TEST_DURATION: Duration = Duration::from_secs(1);

const SWEEP: [i32; 3] = [0, 90, 0];

/// Which components `rover test` exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestTarget {
    Sensors,
    Motors,
    #[default]
    All,
}

impl TestTarget {
    fn sensors(self) -> bool {
        matches!(self, TestTarget::Sensors | TestTarget::All)
    }

    fn motors(self) -> bool {
        matches!(self, TestTarget::Motors | TestTarget::All)
    }
}

impl fmt::Display for TestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestTarget::Sensors => write!(f, "sensors"),
            TestTarget::Motors => write!(f, "motors"),
            TestTarget::All => write!(f, "all"),
        }
    }
}

/// Outcome of one named check.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub name: &'static str,
    /// Human-readable observation on success.
    pub outcome: Result<String, RoverError>,
}

impl CheckResult {
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticReport {
    pub checks: Vec<CheckResult>,
}

impl DiagnosticReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(CheckResult::passed)
    }

    pub fn failures(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed()).count()
    }

    fn record(&mut self, name: &'static str, outcome: Result<String, RoverError>) {
        match &outcome {
            Ok(observed) => info!(check = name, %observed, "check passed"),
            Err(e) => warn!(check = name, error = %e, "check failed"),
        }
        self.checks.push(CheckResult { name, outcome });
    }
}

/// Run the checks selected by `target` against `port`.
pub fn run_diagnostics<P, C>(
    port: &mut P,
    clock: &C,
    cfg: &RobotConfig,
    target: TestTarget,
) -> DiagnosticReport
where
    P: HardwarePort + ?Sized,
    C: Clock + ?Sized,
{
    info!(%target, backend = port.name(), "running component test");
    let mut report = DiagnosticReport::default();
    if target.sensors() {
        check_sensors(port, clock, &mut report);
    }
    if target.motors() {
        check_motors(port, clock, &MotionController::from_config(cfg), &mut report);
    }
    report
}

/// One reading from every sensor, then a servo sweep 0° → 90° → 0°.
pub fn check_sensors<P, C>(port: &mut P, clock: &C, report: &mut DiagnosticReport)
where
    P: HardwarePort + ?Sized,
    C: Clock + ?Sized,
{
    report.record(
        "ultrasonic",
        port.read_distance().map(|d| format!("{d:.1} cm")),
    );
    report.record("light", port.read_light().map(|l| format!("{l:.2}")));
    report.record("sound", port.read_sound().map(|s| format!("{s:.2}")));
    report.record("battery", port.read_battery().map(|b| format!("{b:.0}%")));

    let swept = SWEEP.iter().try_for_each(|&angle| {
        port.set_servo_angle(angle)?;
        clock.sleep(SERVO_DWELL);
        Ok::<(), RoverError>(())
    });
    report.record("servo", swept.map(|()| "0° -> 90° -> 0°".to_string()));
}

/// Drive forward briefly, turn a quarter, then stop.
pub fn check_motors<P, C>(
    port: &mut P,
    clock: &C,
    motion: &MotionController,
    report: &mut DiagnosticReport,
) where
    P: HardwarePort + ?Sized,
    C: Clock + ?Sized,
{
    report.record(
        "forward",
        motion
            .move_forward(port, clock, MOTOR_TEST_DURATION)
            .map(|()| format!("{:.1} s", MOTOR_TEST_DURATION.as_secs_f64())),
    );
    report.record(
        "turn",
        motion.turn(port, clock, 90).map(|()| "90°".to_string()),
    );
    report.record("stop", motion.stop(port).map(|()| "stopped".to_string()));
}
