//! [`Supervisor`] – the sense-score-act navigation loop.
//!
//! The supervisor exclusively owns the [`HardwarePort`] and the navigation
//! [`StateMachine`]. Each call to [`Supervisor::step`] runs one cycle:
//!
//! 1. **Operator stop** – if the stop flag is set, return
//!    [`RoverError::OperatorInterrupt`].
//! 2. **Battery** – critical charge stops the wheels and ends navigation;
//!    low charge is only logged.
//! 3. **Sound** – a loud noise stops the wheels and holds still for
//!    `emergency_stop_duration_s`. No motion is commanded that cycle.
//! 4. **Scan and score** the sweep in front of the robot.
//! 5. **Act** – drive forward when the best score is above
//!    [`FORWARD_SCORE_THRESHOLD`], otherwise turn towards the best angle.
//! 6. **Settle** for `scan_interval_s`.
//!
//! Port errors are contained within the cycle: the wheels are stopped, the
//! machine returns to `Scanning`, and the cycle reports
//! [`CycleOutcome::Faulted`]. Only a critical battery or the operator ends
//! navigation.
//!
//! [`Supervisor::run`] loops `step` until the operator stops it or the battery
//! runs out. The port is stopped and released on every exit path, including
//! drop.
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::Ordering;
//!
//! use rover_hal::SimPort;
//! use rover_runtime::clock::ManualClock;
//! use rover_runtime::supervisor::Supervisor;
//! use rover_types::{CycleOutcome, RobotConfig};
//!
//! let mut sup = Supervisor::with_clock(SimPort::new(), ManualClock::new(), RobotConfig::default())
//!     .expect("default config is valid");
//! assert!(matches!(sup.step().unwrap(), CycleOutcome::Moved(_)));
//!
//! sup.stop_handle().store(true, Ordering::SeqCst);
//! sup.run().unwrap();
//! assert!(sup.port().is_released());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rover_hal::HardwarePort;
use rover_kernel::{BatteryInterlock, BatteryStatus, SoundInterlock, StateMachine};
use rover_types::{CycleOutcome, FaultKind, NavigationState, RobotConfig, RoverError};
use tracing::{debug, error, info, info_span, warn};

use crate::clock::{Clock, SystemClock};
use crate::motion::MotionController;
use crate::scanner::Scanner;
use crate::scorer::DirectionScorer;

/// Best scores strictly above this drive forward; anything else turns.
pub const FORWARD_SCORE_THRESHOLD: f64 = 0.5;

pub struct Supervisor<P: HardwarePort, C: Clock = SystemClock> {
    port: P,
    clock: C,
    config: RobotConfig,
    scanner: Scanner,
    scorer: DirectionScorer,
    motion: MotionController,
    battery: BatteryInterlock,
    sound: SoundInterlock,
    machine: StateMachine,
    stop_flag: Arc<AtomicBool>,
    cycles: u64,
    halted: Option<RoverError>,
    released: bool,
}

impl<P: HardwarePort> Supervisor<P, SystemClock> {
    /// Build a supervisor that sleeps on the wall clock.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::InvalidConfig`] if `config` fails validation.
    pub fn new(port: P, config: RobotConfig) -> Result<Self, RoverError> {
        Self::with_clock(port, SystemClock, config)
    }
}

impl<P: HardwarePort, C: Clock> Supervisor<P, C> {
    /// Build a supervisor with an explicit time source.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::InvalidConfig`] if `config` fails validation.
    /// The port is released before returning the error.
    pub fn with_clock(mut port: P, clock: C, config: RobotConfig) -> Result<Self, RoverError> {
        if let Err(e) = config.validate() {
            if let Err(release_err) = port.release() {
                warn!(error = %release_err, "releasing port after invalid config failed");
            }
            return Err(e);
        }
        Ok(Self {
            scanner: Scanner::from_config(&config),
            scorer: DirectionScorer::from_config(&config),
            motion: MotionController::from_config(&config),
            battery: BatteryInterlock::from_config(&config),
            sound: SoundInterlock::from_config(&config),
            machine: StateMachine::new(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            cycles: 0,
            halted: None,
            released: false,
            port,
            clock,
            config,
        })
    }

    /// Share an externally owned operator stop flag (e.g. a Ctrl-C handler's).
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_flag = flag;
        self
    }

    /// Handle that requests a stop at the next cycle boundary when set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    pub fn state(&self) -> NavigationState {
        self.machine.state()
    }

    /// Recent navigation states, oldest first.
    pub fn history(&self) -> impl Iterator<Item = NavigationState> + '_ {
        self.machine.history()
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    /// Cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one sense-score-act cycle.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::OperatorInterrupt`] when the stop flag is set or
    /// [`RoverError::BatteryCritical`] when the battery is exhausted. Once an
    /// error has been returned, every later call returns it again.
    pub fn step(&mut self) -> Result<CycleOutcome, RoverError> {
        if let Some(reason) = &self.halted {
            return Err(reason.clone());
        }
        if self.stop_flag.load(Ordering::SeqCst) {
            self.halted = Some(RoverError::OperatorInterrupt);
            return Err(RoverError::OperatorInterrupt);
        }

        self.cycles += 1;
        let span = info_span!("cycle", n = self.cycles);
        let _enter = span.enter();

        match self.run_cycle() {
            Ok(outcome) => Ok(outcome),
            Err(e @ RoverError::BatteryCritical { .. }) => {
                self.halted = Some(e.clone());
                Err(e)
            }
            Err(e) => Ok(self.contain(&e)),
        }
    }

    /// Loop [`Supervisor::step`] until navigation ends, then shut down.
    ///
    /// # Errors
    ///
    /// An operator interrupt is a clean exit and yields `Ok(())`. A critical
    /// battery is returned as an error after the port has been stopped and
    /// released.
    pub fn run(&mut self) -> Result<(), RoverError> {
        info!(backend = self.port.name(), "starting autonomous navigation");
        loop {
            match self.step() {
                Ok(outcome) => debug!(?outcome, "cycle complete"),
                Err(RoverError::OperatorInterrupt) => {
                    info!("operator interrupt; stopping robot");
                    self.shutdown();
                    return Ok(());
                }
                Err(e) => {
                    error!(error = %e, "navigation halted");
                    self.shutdown();
                    return Err(e);
                }
            }
        }
    }

    /// Enter `ShuttingDown`, stop the wheels and release the hardware.
    /// Only the first call has any effect.
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.enter(NavigationState::ShuttingDown);
        if let Err(e) = self.port.stop() {
            warn!(error = %e, "stop during shutdown failed");
        }
        if let Err(e) = self.port.release() {
            warn!(error = %e, "hardware release failed");
        }
        info!(cycles = self.cycles, "robot stopped; hardware released");
    }

    fn run_cycle(&mut self) -> Result<CycleOutcome, RoverError> {
        let battery_pct = self.port.read_battery()?;
        match self.battery.assess(battery_pct)? {
            BatteryStatus::Critical => {
                self.enter(NavigationState::BatteryCritical);
                error!(battery_pct, "battery critical; halting navigation");
                if let Err(e) = self.port.stop() {
                    error!(error = %e, "stop on critical battery failed");
                }
                return Err(RoverError::BatteryCritical { battery_pct });
            }
            BatteryStatus::Low => warn!(battery_pct, "battery low"),
            BatteryStatus::Nominal => debug!(battery_pct, "battery ok"),
        }

        let sound = self.port.read_sound()?;
        if self.sound.tripped(sound) {
            self.enter(NavigationState::EmergencyStopped);
            warn!(
                sound,
                threshold = self.sound.threshold,
                "loud sound detected; emergency stop"
            );
            // The hold applies even if the stop command reports a failure.
            if let Err(e) = self.motion.stop(&mut self.port) {
                error!(error = %e, "stop during emergency hold failed");
            }
            self.clock.sleep(self.sound.hold);
            self.enter(NavigationState::Scanning);
            return Ok(CycleOutcome::EmergencyStopped);
        }

        let scan = self.scanner.scan(&mut self.port, &self.clock)?;
        let decision = self.scorer.score(&scan);
        info!(
            angle_deg = decision.angle_deg,
            score = decision.score,
            "direction chosen"
        );

        let outcome = if decision.score > FORWARD_SCORE_THRESHOLD {
            self.enter(NavigationState::Moving);
            self.motion
                .move_forward(&mut self.port, &self.clock, self.config.move_duration())?;
            CycleOutcome::Moved(decision)
        } else {
            self.enter(NavigationState::Turning);
            self.motion
                .turn(&mut self.port, &self.clock, decision.angle_deg)?;
            CycleOutcome::Turned(decision)
        };

        self.clock.sleep(self.config.scan_interval());
        self.enter(NavigationState::Scanning);
        Ok(outcome)
    }

    /// Stop the wheels after a non-fatal fault and get ready for the next
    /// cycle.
    fn contain(&mut self, err: &RoverError) -> CycleOutcome {
        error!(error = %err, "cycle fault; stopping motors");
        if let Err(stop_err) = self.port.stop() {
            error!(error = %stop_err, "defensive stop failed");
        }
        if self.machine.state() != NavigationState::Scanning {
            self.enter(NavigationState::Scanning);
        }
        self.clock.sleep(self.config.scan_interval());
        CycleOutcome::Faulted(FaultKind::from(err))
    }

    fn enter(&mut self, to: NavigationState) {
        let moved = self.machine.transition(to);
        debug_assert!(moved.is_ok(), "illegal transition to {to}");
    }
}

impl<P: HardwarePort, C: Clock> Drop for Supervisor<P, C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
