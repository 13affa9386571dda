//! Config file layer – reads/writes `~/.rover/config.toml`.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, `ROVER_*`
//! environment variables, command-line flags (applied in `main`).
//!
//! ```toml
//! backend = "auto"   # or "sim"
//!
//! [robot]
//! speed = 0.4
//! safe_distance_cm = 25.0
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rover_types::RobotConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Where the robot's sensors and motors come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Probe the integrated board, then the discrete wiring.
    #[default]
    Auto,
    /// Scripted in-process robot; no hardware needed.
    Sim,
}

impl fmt::Display for BackendChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendChoice::Auto => write!(f, "auto"),
            BackendChoice::Sim => write!(f, "sim"),
        }
    }
}

impl FromStr for BackendChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendChoice::Auto),
            "sim" => Ok(BackendChoice::Sim),
            other => Err(format!("unknown backend '{other}' (expected auto or sim)")),
        }
    }
}

/// Persisted configuration stored in `~/.rover/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendChoice,

    #[serde(default)]
    pub robot: RobotConfig,
}

/// `$ROVER_CONFIG` if set, otherwise `~/.rover/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("ROVER_CONFIG") {
        return PathBuf::from(p);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".rover").join("config.toml")
}

/// Effective configuration: file at `path` (or the default location), then
/// environment overrides. A missing file is not an error.
pub fn load(path: Option<&Path>) -> Result<Config, String> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let mut cfg = load_from(&path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Parse the file at `path`. Returns `None` if it does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config at {}: {}", path.display(), e))?;
    Ok(Some(cfg))
}

/// Apply `ROVER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROVER_SPEED` | `robot.speed` |
/// | `ROVER_SAFE_DISTANCE` | `robot.safe_distance_cm` |
/// | `ROVER_BACKEND` | `backend` |
///
/// Values that do not parse are ignored with a warning.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(speed) = env_parsed::<f64>("ROVER_SPEED") {
        cfg.robot.speed = speed;
    }
    if let Some(distance) = env_parsed::<f64>("ROVER_SAFE_DISTANCE") {
        cfg.robot.safe_distance_cm = distance;
    }
    if let Some(backend) = env_parsed::<BackendChoice>("ROVER_BACKEND") {
        cfg.backend = backend;
    }
}

fn env_parsed<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparsable override");
            None
        }
    }
}

/// Save the config to `path`.
///
/// A missing parent directory is created owner-only; an existing one is left
/// exactly as it is.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                    format!("Failed to set config directory permissions: {}", e)
                })?;
            }
        }
    }
    let raw = render(cfg)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

/// TOML text for `cfg`, as written by [`save_to`].
pub fn render(cfg: &Config) -> Result<String, String> {
    toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600, "config file must have 0o600 permissions");
        let dir_mode = fs::metadata(path.parent().unwrap())
            .expect("dir metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700, "config directory must have 0o700 permissions");
    }

    #[cfg(unix)]
    #[test]
    fn existing_directory_keeps_its_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let shared = dir.path().join("shared");
        fs::create_dir(&shared).expect("mkdir");
        fs::set_permissions(&shared, fs::Permissions::from_mode(0o755)).expect("chmod");

        let path = shared.join("rover.toml");
        save_to(&Config::default(), &path).expect("save");

        let dir_mode = fs::metadata(&shared).expect("dir metadata").permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o755, "an existing directory must not be locked down");
        let file_mode = fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
    }

    #[test]
    fn bare_file_name_saves_into_working_directory() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let previous = std::env::current_dir().expect("cwd");
        std::env::set_current_dir(dir.path()).expect("chdir");

        let saved = save_to(&Config::default(), Path::new("rover.toml"));

        std::env::set_current_dir(previous).expect("restore cwd");
        saved.expect("save");
        assert!(dir.path().join("rover.toml").is_file());
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, Config::default());
        assert_eq!(loaded.robot.scan_step_deg, 15);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "backend = \"sim\"\n\n[robot]\nspeed = 0.6\n").expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.backend, BackendChoice::Sim);
        assert_eq!(loaded.robot.speed, 0.6);
        assert_eq!(loaded.robot.turn_speed, 0.25);
        assert_eq!(loaded.robot.emergency_stop_duration_s, 2.0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "backend = \"bluetooth\"\n").expect("write");
        let err = load_from(&path).unwrap_err();
        assert!(err.contains("Failed to parse config"), "{err}");
    }

    #[test]
    fn config_path_points_to_rover_dir() {
        let p = config_path_for_home("/home/testuser");
        assert_eq!(p, PathBuf::from("/home/testuser/.rover/config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn backend_choice_parses_case_insensitively() {
        assert_eq!("SIM".parse::<BackendChoice>(), Ok(BackendChoice::Sim));
        assert_eq!(" auto ".parse::<BackendChoice>(), Ok(BackendChoice::Auto));
        assert!("gpio".parse::<BackendChoice>().is_err());
    }

    #[test]
    fn apply_env_overrides_changes_speed() {
        // SAFETY: single-threaded test; no other test touches this variable.
        unsafe { std::env::set_var("ROVER_SPEED", "0.7") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.robot.speed, 0.7);
        unsafe { std::env::remove_var("ROVER_SPEED") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_distance() {
        // SAFETY: single-threaded test; no other test touches this variable.
        unsafe { std::env::set_var("ROVER_SAFE_DISTANCE", "far") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.robot.safe_distance_cm, 25.0);
        unsafe { std::env::remove_var("ROVER_SAFE_DISTANCE") };
    }

    #[test]
    fn apply_env_overrides_changes_backend() {
        // SAFETY: single-threaded test; no other test touches this variable.
        unsafe { std::env::set_var("ROVER_BACKEND", "sim") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.backend, BackendChoice::Sim);
        unsafe { std::env::remove_var("ROVER_BACKEND") };
    }
}
