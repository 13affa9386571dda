//! `rover` – command-line entry point for the light-seeking rover.
//!
//! ```text
//! rover navigate [--speed X] [--safe-distance Y]
//! rover test [sensors|motors|all]
//! rover config [--init]
//! ```
//!
//! Global flags: `--config PATH` (otherwise `$ROVER_CONFIG` or
//! `~/.rover/config.toml`) and `--sim` to run against the simulated robot.
//!
//! Exit codes: `0` clean shutdown, `1` hardware or configuration failure at
//! startup, `2` battery-critical or other fatal error while running.

mod config;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rover_hal::{BackendSelector, HardwarePort, SimPort};
use rover_runtime::diagnostics::{DiagnosticReport, TestTarget, run_diagnostics};
use rover_runtime::telemetry::init_tracing;
use rover_runtime::{Supervisor, SystemClock};
use rover_types::RoverError;
use tracing::{info, warn};

use crate::config::{BackendChoice, Config};

#[derive(Parser, Debug)]
#[command(name = "rover", version, about = "Reactive light-seeking rover")]
struct Cli {
    /// Config file (default: $ROVER_CONFIG or ~/.rover/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Drive the simulated robot instead of real hardware
    #[arg(long, global = true)]
    sim: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Navigate autonomously until Ctrl-C or a critical battery
    Navigate {
        /// Cruise speed, (0, 1]
        #[arg(long)]
        speed: Option<f64>,

        /// Distance in cm at which a heading counts as fully safe
        #[arg(long)]
        safe_distance: Option<f64>,
    },
    /// Exercise sensors and/or motors once and report
    Test {
        #[arg(value_enum, default_value_t = Component::All)]
        component: Component,
    },
    /// Print the effective configuration
    Config {
        /// Write the default config file instead
        #[arg(long)]
        init: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Component {
    Sensors,
    Motors,
    All,
}

impl From<Component> for TestTarget {
    fn from(c: Component) -> Self {
        match c {
            Component::Sensors => TestTarget::Sensors,
            Component::Motors => TestTarget::Motors,
            Component::All => TestTarget::All,
        }
    }
}

/// Everything that can end the process with a non-zero status.
#[derive(Debug)]
enum CliError {
    /// Config file I/O or parse failure.
    Config(String),
    Rover(RoverError),
}

impl From<RoverError> for CliError {
    fn from(e: RoverError) -> Self {
        CliError::Rover(e)
    }
}

impl From<String> for CliError {
    fn from(e: String) -> Self {
        CliError::Config(e)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "{e}"),
            CliError::Rover(e) => write!(f, "{e}"),
        }
    }
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) => 1,
            CliError::Rover(RoverError::HardwareUnavailable { .. } | RoverError::InvalidConfig(_)) => 1,
            CliError::Rover(RoverError::OperatorInterrupt) => 0,
            CliError::Rover(_) => 2,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing("rover");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut cfg = config::load(cli.config.as_deref())?;
    if cli.sim {
        cfg.backend = BackendChoice::Sim;
    }

    match cli.command {
        Command::Config { init } => show_or_init_config(&cfg, cli.config, init),
        Command::Navigate {
            speed,
            safe_distance,
        } => {
            if let Some(speed) = speed {
                cfg.robot.speed = speed;
            }
            if let Some(distance) = safe_distance {
                cfg.robot.safe_distance_cm = distance;
            }
            navigate(cfg)
        }
        Command::Test { component } => component_test(cfg, component.into()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn navigate(cfg: Config) -> Result<(), CliError> {
    cfg.robot.validate()?;
    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – stopping after the current cycle …"
                .yellow()
                .bold()
        );
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the robot can only be stopped by a critical battery");
    }

    let port = open_port(cfg.backend)?;
    println!(
        "  Navigating on {} backend at speed {} (Ctrl-C to stop)\n",
        port.name().bold(),
        cfg.robot.speed
    );

    let mut supervisor = Supervisor::new(port, cfg.robot)?.with_stop_flag(shutdown);
    supervisor.run()?;

    println!("{}", "  ✓ Robot stopped; hardware released.".green());
    Ok(())
}

fn component_test(cfg: Config, target: TestTarget) -> Result<(), CliError> {
    cfg.robot.validate()?;
    print_banner();

    let mut port = open_port(cfg.backend)?;
    println!("  Testing {} on {} backend\n", target.to_string().bold(), port.name().bold());

    let report = run_diagnostics(&mut port, &SystemClock, &cfg.robot, target);
    if let Err(e) = port.release() {
        warn!(error = %e, "hardware release after test failed");
    }
    print_report(&report);
    Ok(())
}

fn show_or_init_config(
    cfg: &Config,
    explicit: Option<PathBuf>,
    init: bool,
) -> Result<(), CliError> {
    let path = explicit.unwrap_or_else(config::config_path);
    if !init {
        println!("# effective configuration ({})", path.display());
        print!("{}", config::render(cfg)?);
        return Ok(());
    }
    if path.exists() {
        println!(
            "  Config already exists at {}; leaving it untouched.",
            path.display().to_string().bold()
        );
        return Ok(());
    }
    config::save_to(&Config::default(), &path)?;
    println!(
        "  {} Config saved to {}",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Hardware
// ─────────────────────────────────────────────────────────────────────────────

/// Open the configured backend. Selection happens exactly once.
fn open_port(choice: BackendChoice) -> Result<Box<dyn HardwarePort>, RoverError> {
    match choice {
        BackendChoice::Sim => {
            info!("using simulated robot");
            Ok(Box::new(sim_world()))
        }
        BackendChoice::Auto => {
            // Board drivers are external; until one registers a probe here,
            // selection reports both backends as unavailable.
            let selected = BackendSelector::new().select()?;
            info!(backend = %selected.kind, "hardware backend ready");
            Ok(selected.port)
        }
    }
}

/// A small scripted room: a wall on the left, an open bright corridor ahead,
/// one loud clap early on, and a battery that drains with every move.
fn sim_world() -> SimPort {
    SimPort::new()
        .with_samples(&[
            (-45, 12.0, 0.2),
            (-30, 18.0, 0.3),
            (-15, 40.0, 0.45),
            (0, 80.0, 0.5),
            (15, 60.0, 0.65),
            (30, 22.0, 0.7),
            (45, 15.0, 0.8),
        ])
        .with_sound_levels([0.1, 0.2, 0.95, 0.1])
        .with_battery_levels([100.0])
        .with_battery_drain(0.05)
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_report(report: &DiagnosticReport) {
    for check in &report.checks {
        match &check.outcome {
            Ok(observed) => println!("  {} {:<12} {}", "✓".green().bold(), check.name, observed),
            Err(e) => println!("  {} {:<12} {}", "✗".red().bold(), check.name, e.to_string().red()),
        }
    }
    println!();
    if report.all_passed() {
        println!("  {}", "All checks passed.".green().bold());
    } else {
        println!(
            "  {}",
            format!("{} of {} checks failed.", report.failures(), report.checks.len())
                .yellow()
                .bold()
        );
    }
}

fn print_banner() {
    println!();
    println!("  {} {}", "rover".bold().cyan(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!("  Reactive light-seeking navigation");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_policy() {
        assert_eq!(CliError::Config("bad toml".into()).exit_code(), 1);
        assert_eq!(CliError::from(RoverError::unavailable("no board")).exit_code(), 1);
        assert_eq!(
            CliError::from(RoverError::InvalidConfig("speed".into())).exit_code(),
            1
        );
        assert_eq!(
            CliError::from(RoverError::BatteryCritical { battery_pct: 8.0 }).exit_code(),
            2
        );
        assert_eq!(CliError::from(RoverError::actuator("servo", "stuck")).exit_code(), 2);
    }

    #[test]
    fn cli_parses_navigate_flags() {
        let cli = Cli::parse_from(["rover", "--sim", "navigate", "--speed", "0.6", "--safe-distance", "30"]);
        assert!(cli.sim);
        match cli.command {
            Command::Navigate {
                speed,
                safe_distance,
            } => {
                assert_eq!(speed, Some(0.6));
                assert_eq!(safe_distance, Some(30.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_component_defaults_to_all() {
        let cli = Cli::parse_from(["rover", "test"]);
        match cli.command {
            Command::Test { component } => {
                assert_eq!(TestTarget::from(component), TestTarget::All)
            }
            other => panic!("unexpected command {other:?}"),
        }
        let cli = Cli::parse_from(["rover", "test", "motors", "--config", "/tmp/r.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/r.toml")));
    }

    #[test]
    fn clap_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn auto_backend_without_drivers_is_unavailable() {
        let err = open_port(BackendChoice::Auto).err().expect("no drivers");
        assert!(matches!(err, RoverError::HardwareUnavailable { .. }));
        assert_eq!(CliError::from(err).exit_code(), 1);
    }

    #[test]
    fn sim_world_supports_a_full_run() {
        use rover_runtime::ManualClock;
        use rover_types::RobotConfig;

        let mut sup =
            Supervisor::with_clock(sim_world(), ManualClock::new(), RobotConfig::default()).unwrap();
        let err = sup.run().unwrap_err();
        assert!(matches!(err, RoverError::BatteryCritical { .. }));
        assert!(sup.port().is_released());
    }
}
