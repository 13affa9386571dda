//! `rover-kernel` – Safety & State
//!
//! Enforces the rules the navigation loop may never break. It does not
//! decide where to go; it decides whether the robot may move at all.
//!
//! # Modules
//!
//! - [`interlock`] – [`BatteryInterlock`][interlock::BatteryInterlock] and
//!   [`SoundInterlock`][interlock::SoundInterlock]: the battery and
//!   loud-noise conditions that override every motion decision.
//! - [`transitions`] – [`StateMachine`][transitions::StateMachine]: the
//!   legal [`NavigationState`][rover_types::NavigationState] transition table
//!   with logging and a bounded history.

pub mod interlock;
pub mod transitions;

pub use interlock::{BatteryInterlock, BatteryStatus, SoundInterlock};
pub use transitions::{StateMachine, TransitionRefused};
