//! Daemon configuration
//!
//! Loaded once at startup from a TOML file and passed by reference to the
//! scan loop and the ledger. Every `[daemon]` key the loop depends on is
//! required; there are no silent defaults for them.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "DEMUXD_CONFIG";

/// Default backing-store filename inside the watched directory
pub const DEFAULT_RECORD_FILE: &str = "scanRecord.txt";

/// Configuration errors, all fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("could not determine the user config directory")]
    NoConfigDir,

    #[error("failed to write config template {}: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Validated configuration
#[derive(Debug, Clone)]
pub struct SystemConfig {
    pub daemon: DaemonConfig,
    pub logging: LoggingConfig,
    pub hooks: Vec<HookConfig>,
}

/// Settings for the scan loop
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Directory polled for new media
    pub watch_dir: PathBuf,

    /// Adapter executable, or `"mock"` for the fixture scanner
    pub scanner: String,

    /// Extra arguments placed before the adapter operation
    pub scanner_args: Vec<String>,

    /// Failed attempts before a unit is abandoned
    pub max_retries: u32,

    /// Requested language codes, in configured order
    pub languages: Vec<String>,

    /// Sleep between passes
    pub sleep_interval: Duration,

    /// Backing-store filename inside `watch_dir`
    pub record_file: String,

    /// Gitignore-style patterns never scanned
    pub ignore: Vec<String>,
}

impl DaemonConfig {
    /// Full path of the ledger backing store
    pub fn ledger_path(&self) -> PathBuf {
        self.watch_dir.join(&self.record_file)
    }
}

/// Optional file logging
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files
    pub directory: Option<PathBuf>,
}

/// A `[[hooks]]` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookConfig {
    pub name: String,
    pub command: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    pub priority: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    daemon: RawDaemon,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    hooks: Vec<HookConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDaemon {
    watch_dir: Option<String>,
    scanner: Option<String>,
    #[serde(default)]
    scanner_args: Vec<String>,
    max_retries: Option<i64>,
    languages: Option<String>,
    sleep_minutes: Option<i64>,
    record_file: Option<String>,
    #[serde(default)]
    ignore: Vec<String>,
}

/// Resolve the config file path: explicit flag, then `DEMUXD_CONFIG`, then
/// `<config dir>/demuxd/config.toml`
pub fn config_file_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|dir| dir.join("demuxd").join("config.toml"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Read and validate a config file
pub fn load(path: &Path) -> Result<SystemConfig, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let raw: RawConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    raw.validate()
}

/// Parse and validate config text
pub fn parse(contents: &str) -> Result<SystemConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: PathBuf::from("<inline>"),
        source,
    })?;
    raw.validate()
}

impl RawConfig {
    fn validate(self) -> Result<SystemConfig, ConfigError> {
        let daemon = self.daemon;

        let watch_dir = required(daemon.watch_dir, "daemon.watch_dir")?;
        let scanner = required(daemon.scanner, "daemon.scanner")?;

        let max_retries = daemon
            .max_retries
            .ok_or(ConfigError::Missing("daemon.max_retries"))?;
        let max_retries = u32::try_from(max_retries)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| ConfigError::Invalid {
                key: "daemon.max_retries",
                reason: format!("expected a positive integer, got {max_retries}"),
            })?;

        let languages = parse_languages(&required(daemon.languages, "daemon.languages")?)?;

        let sleep_minutes = daemon
            .sleep_minutes
            .ok_or(ConfigError::Missing("daemon.sleep_minutes"))?;
        let sleep_minutes = u64::try_from(sleep_minutes)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| ConfigError::Invalid {
                key: "daemon.sleep_minutes",
                reason: format!("expected a positive integer, got {sleep_minutes}"),
            })?;
        let sleep_secs = sleep_minutes
            .checked_mul(60)
            .ok_or_else(|| ConfigError::Invalid {
                key: "daemon.sleep_minutes",
                reason: format!("{sleep_minutes} minutes does not fit in a duration"),
            })?;

        let record_file = match daemon.record_file {
            None => DEFAULT_RECORD_FILE.to_string(),
            Some(name) if is_plain_file_name(&name) => name,
            Some(name) => {
                return Err(ConfigError::Invalid {
                    key: "daemon.record_file",
                    reason: format!("{name:?} must be a bare filename"),
                });
            }
        };

        for hook in &self.hooks {
            if hook.name.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key: "hooks.name",
                    reason: "hook name must not be empty".to_string(),
                });
            }
            if hook.command.as_os_str().is_empty() {
                return Err(ConfigError::Invalid {
                    key: "hooks.command",
                    reason: format!("hook {:?} has an empty command", hook.name),
                });
            }
        }

        Ok(SystemConfig {
            daemon: DaemonConfig {
                watch_dir: PathBuf::from(watch_dir),
                scanner,
                scanner_args: daemon.scanner_args,
                max_retries,
                languages,
                sleep_interval: Duration::from_secs(sleep_secs),
                record_file,
                ignore: daemon.ignore,
            },
            logging: self.logging,
            hooks: self.hooks,
        })
    }
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

/// Split a comma-separated language list, trimming whitespace around each code
pub fn parse_languages(value: &str) -> Result<Vec<String>, ConfigError> {
    let codes: Vec<String> = value.split(',').map(|c| c.trim().to_string()).collect();

    if codes.iter().any(String::is_empty) {
        return Err(ConfigError::Invalid {
            key: "daemon.languages",
            reason: format!("empty language code in {value:?}"),
        });
    }

    Ok(codes)
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

/// Write the template to `path` if nothing exists there yet.
///
/// Returns true if the template was written.
pub fn init_if_missing(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }

    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, example_config())
    };

    write().map_err(|source| ConfigError::Template {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

/// Commented template written for operators on first start
pub fn example_config() -> &'static str {
    r#"# demuxd configuration

[daemon]
# Directory polled for new media (required)
watch_dir = "/srv/media/incoming"

# Demux adapter executable, or "mock" for the built-in fixture scanner (required)
scanner = "/usr/local/bin/demux-adapter"

# Extra arguments passed to the adapter before the operation name
# scanner_args = []

# Failed attempts before a unit is abandoned (required)
max_retries = 3

# Comma-separated language codes to keep (required)
languages = "eng, jpn"

# Minutes to sleep between passes (required)
sleep_minutes = 10

# Ledger filename inside watch_dir
# record_file = "scanRecord.txt"

# Gitignore-style patterns that are never scanned
# ignore = ["*.part", "sample-*"]

[logging]
# Daily rolling log files in addition to stderr
# directory = "/var/log/demuxd"

# Commands run after each successful scan with the scanned path followed by
# every generated path. Lower priority runs first.
# [[hooks]]
# name = "rename"
# command = "/usr/local/bin/rename-tracks"
# args = ["--dry-run"]
# priority = 10
"#
}
