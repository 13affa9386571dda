//! `rover-hal` – Hardware Port abstraction
//!
//! The navigation runtime never touches a driver directly. It holds one
//! [`HardwarePort`] for the whole process lifetime, chosen at startup.
//!
//! # Modules
//!
//! - [`port`] – [`HardwarePort`]: the capability trait (distance, light,
//!   sound, battery, servo, differential drive, stop, release) and the
//!   boundary clamping helpers.
//! - [`integrated`] – [`IntegratedBackend`]: adapter over a composite
//!   on-board controller ([`OnboardController`]).
//! - [`discrete`] – [`DiscreteBackend`]: raw GPIO/I2C wiring ([`PinBus`]),
//!   echo-timing ranging and linear servo calibration.
//! - [`selector`] – [`BackendSelector`]: one-shot capability probing,
//!   integrated first, discrete second.
//! - [`sim`] – [`SimPort`]: scripted, recording port for tests and bench runs.

pub mod discrete;
pub mod integrated;
pub mod port;
pub mod selector;
pub mod sim;

pub use discrete::{DiscreteBackend, DiscretePins, MotorPins, PinBus, SensorInput, ServoCalibration};
pub use integrated::{IntegratedBackend, MotorSide, OnboardController};
pub use port::HardwarePort;
pub use selector::{BackendKind, BackendSelector, SelectedBackend};
pub use sim::{PortCall, PortOp, SimPort};
