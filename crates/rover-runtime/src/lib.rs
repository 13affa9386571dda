//! `rover-runtime` – the navigation brain.
//!
//! Everything between the hardware port and the command line:
//!
//! - [`scanner`] – [`Scanner`]: one servo sweep of distance and light.
//! - [`scorer`] – [`DirectionScorer`]: picks the best heading from a sweep.
//! - [`motion`] – [`MotionController`]: ramped forward runs and in-place
//!   turns that always end stopped.
//! - [`supervisor`] – [`Supervisor`]: the sense-score-act loop with battery
//!   and sound interlocks from `rover-kernel`.
//! - [`diagnostics`] – the component self-test behind `rover test`.
//! - [`clock`] – [`Clock`]: the blocking time source, swappable in tests.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: log
//!   formatting and optional OTLP span export.
//!
//! The runtime is synchronous. Every sensor read and motion command blocks
//! for a bounded time, and the operator stop flag is only sampled between
//! cycles.

pub mod clock;
pub mod diagnostics;
pub mod motion;
pub mod scanner;
pub mod scorer;
pub mod supervisor;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use diagnostics::{CheckResult, DiagnosticReport, TestTarget, run_diagnostics};
pub use motion::{MotionController, ramp_levels};
pub use scanner::Scanner;
pub use scorer::{DirectionScorer, SampleScore, score};
pub use supervisor::{FORWARD_SCORE_THRESHOLD, Supervisor};
