//! [`BackendSelector`] – one-shot capability probing at startup.
//!
//! Register a probe per backend, then call [`BackendSelector::select`]. The
//! integrated board is preferred; the discrete wiring is only probed when the
//! integrated probe fails. The chosen backend is fixed for the process
//! lifetime: there is no fallback once navigation has started.
//!
//! # Example
//!
//! ```rust
//! use rover_hal::selector::BackendSelector;
//!
//! // Nothing registered: selection must fail.
//! let err = BackendSelector::new().select().err().expect("no backends");
//! assert!(err.to_string().contains("Hardware Unavailable"));
//! ```

use std::fmt;

use rover_types::RoverError;
use tracing::{info, warn};

use crate::discrete::{DiscreteBackend, DiscretePins, PinBus};
use crate::integrated::{IntegratedBackend, OnboardController};
use crate::port::HardwarePort;

type Probe = Box<dyn FnOnce() -> Result<Box<dyn HardwarePort>, RoverError>>;

/// Which backend family ended up driving the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Integrated,
    Discrete,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Integrated => write!(f, "integrated"),
            BackendKind::Discrete => write!(f, "discrete"),
        }
    }
}

/// Result of a successful selection.
pub struct SelectedBackend {
    pub kind: BackendKind,
    pub port: Box<dyn HardwarePort>,
}

/// Builder that probes the registered backends in priority order.
#[derive(Default)]
pub struct BackendSelector {
    integrated: Option<Probe>,
    discrete: Option<Probe>,
}

impl BackendSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the integrated-board probe. `open` should fail fast when the
    /// board is absent.
    pub fn with_integrated<C, F>(mut self, open: F) -> Self
    where
        C: OnboardController + 'static,
        F: FnOnce() -> Result<C, RoverError> + 'static,
    {
        self.integrated = Some(Box::new(move || {
            let controller = open()?;
            let backend = IntegratedBackend::new(controller)?;
            Ok(Box::new(backend) as Box<dyn HardwarePort>)
        }));
        self
    }

    /// Register the discrete-wiring probe.
    pub fn with_discrete<B, F>(mut self, pins: DiscretePins, open: F) -> Self
    where
        B: PinBus + 'static,
        F: FnOnce() -> Result<B, RoverError> + 'static,
    {
        self.discrete = Some(Box::new(move || {
            let bus = open()?;
            let backend = DiscreteBackend::new(bus, pins)?;
            Ok(Box::new(backend) as Box<dyn HardwarePort>)
        }));
        self
    }

    /// Probe the integrated backend first, then the discrete one.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::HardwareUnavailable`] listing every probe
    /// failure when neither backend initialises.
    pub fn select(self) -> Result<SelectedBackend, RoverError> {
        let mut failures = Vec::new();

        for (kind, probe) in [
            (BackendKind::Integrated, self.integrated),
            (BackendKind::Discrete, self.discrete),
        ] {
            let Some(probe) = probe else {
                failures.push(format!("{kind}: no probe registered"));
                continue;
            };
            match probe() {
                Ok(port) => {
                    info!(backend = %kind, "hardware backend selected");
                    return Ok(SelectedBackend { kind, port });
                }
                Err(e) => {
                    warn!(backend = %kind, error = %e, "hardware backend probe failed");
                    failures.push(format!("{kind}: {e}"));
                }
            }
        }

        Err(RoverError::unavailable(failures.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::integrated::MotorSide;

    struct StubBoard;

    impl OnboardController for StubBoard {
        fn ultrasonic_distance_cm(&mut self) -> Result<f64, RoverError> {
            Ok(30.0)
        }
        fn light_reading(&mut self) -> Result<f64, RoverError> {
            Ok(0.5)
        }
        fn sound_reading(&mut self) -> Result<f64, RoverError> {
            Ok(0.1)
        }
        fn battery_percentage(&mut self) -> Result<f64, RoverError> {
            Ok(80.0)
        }
        fn set_servo_angle(&mut self, _angle_deg: i32) -> Result<(), RoverError> {
            Ok(())
        }
        fn set_motor(&mut self, _side: MotorSide, _output: f64) -> Result<(), RoverError> {
            Ok(())
        }
        fn stop_motor(&mut self, _side: MotorSide) -> Result<(), RoverError> {
            Ok(())
        }
    }

    struct StubBus;

    impl PinBus for StubBus {
        fn write_pin(&mut self, _pin: u8, _high: bool) -> Result<(), RoverError> {
            Ok(())
        }
        fn read_pin(&mut self, _pin: u8) -> Result<bool, RoverError> {
            Ok(false)
        }
        fn pulse(&mut self, _pin: u8, _width: Duration) -> Result<(), RoverError> {
            Ok(())
        }
        fn measure_high(
            &mut self,
            _pin: u8,
            _timeout: Duration,
        ) -> Result<Option<Duration>, RoverError> {
            Ok(Some(Duration::from_millis(2)))
        }
        fn read_analog(&mut self, _channel: u8) -> Result<f64, RoverError> {
            Ok(0.5)
        }
        fn write_pwm(&mut self, _channel: u8, _value: f64) -> Result<(), RoverError> {
            Ok(())
        }
        fn release(&mut self) -> Result<(), RoverError> {
            Ok(())
        }
    }

    #[test]
    fn integrated_is_preferred_when_available() {
        let selected = BackendSelector::new()
            .with_integrated(|| Ok(StubBoard))
            .with_discrete(DiscretePins::default(), || Ok(StubBus))
            .select()
            .unwrap();
        assert_eq!(selected.kind, BackendKind::Integrated);
        assert_eq!(selected.port.name(), "integrated");
    }

    #[test]
    fn falls_back_to_discrete_at_startup() {
        let mut selected = BackendSelector::new()
            .with_integrated(|| -> Result<StubBoard, RoverError> {
                Err(RoverError::unavailable("board not detected"))
            })
            .with_discrete(DiscretePins::default(), || Ok(StubBus))
            .select()
            .unwrap();
        assert_eq!(selected.kind, BackendKind::Discrete);
        let d = selected.port.read_distance().unwrap();
        assert!((d - 34.3).abs() < 1e-9);
    }

    #[test]
    fn neither_backend_yields_hardware_unavailable() {
        let err = BackendSelector::new()
            .with_integrated(|| -> Result<StubBoard, RoverError> {
                Err(RoverError::unavailable("board not detected"))
            })
            .select()
            .err()
            .expect("selection must fail");
        match err {
            RoverError::HardwareUnavailable { details } => {
                assert!(details.contains("board not detected"));
                assert!(details.contains("discrete: no probe registered"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
