//! Configuration module for SeaSync.
//!
//! Typed configuration structs mapping to the YAML configuration file, with
//! loading, validation, defaults, and a builder for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for SeaSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub sync: SyncConfig,
    pub transfers: TransfersConfig,
    pub conflicts: ConflictsConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Root directory under which per-library folders are materialized.
    pub root: PathBuf,
    /// Seconds between periodic sync cycles.
    pub interval: u64,
    /// Quiet-time window after a watcher event before a cycle starts.
    pub debounce: f64,
}

/// Transfer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransfersConfig {
    /// Reserved: transfers within a cycle are currently serialized.
    pub max_concurrent: u32,
}

/// Conflict resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictsConfig {
    /// Currently only `last_modified_wins` is implemented.
    pub strategy: String,
}

/// State database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Location of the SQLite state database.
    pub path: PathBuf,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/seasync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("seasync")
            .join("config.yaml")
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("Seafile"),
            interval: 300,
            debounce: 2.0,
        }
    }
}

impl Default for TransfersConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

impl Default for ConflictsConfig {
    fn default() -> Self {
        Self {
            strategy: "last_modified_wins".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("seasync")
                .join("sync_state.sqlite"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.interval"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `conflicts.strategy`.
const VALID_CONFLICT_STRATEGIES: &[&str] = &["last_modified_wins"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.sync.interval == 0 {
            errors.push(ValidationError {
                field: "sync.interval".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.debounce <= 0.0 {
            errors.push(ValidationError {
                field: "sync.debounce".into(),
                message: "must be greater than 0".into(),
            });
        }
        if !self.sync.root.is_absolute() && !self.sync.root.to_string_lossy().starts_with('~') {
            errors.push(ValidationError {
                field: "sync.root".into(),
                message: format!("must be absolute: {}", self.sync.root.display()),
            });
        }

        if self.transfers.max_concurrent == 0 {
            errors.push(ValidationError {
                field: "transfers.max_concurrent".into(),
                message: "must be greater than 0".into(),
            });
        }

        if !VALID_CONFLICT_STRATEGIES.contains(&self.conflicts.strategy.as_str()) {
            errors.push(ValidationError {
                field: "conflicts.strategy".into(),
                message: format!(
                    "invalid strategy '{}'; valid options: {}",
                    self.conflicts.strategy,
                    VALID_CONFLICT_STRATEGIES.join(", ")
                ),
            });
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn sync_root(mut self, root: PathBuf) -> Self {
        self.config.sync.root = root;
        self
    }

    pub fn sync_interval(mut self, seconds: u64) -> Self {
        self.config.sync.interval = seconds;
        self
    }

    pub fn sync_debounce(mut self, seconds: f64) -> Self {
        self.config.sync.debounce = seconds;
        self
    }

    pub fn transfers_max_concurrent(mut self, n: u32) -> Self {
        self.config.transfers.max_concurrent = n;
        self
    }

    pub fn conflicts_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.config.conflicts.strategy = strategy.into();
        self
    }

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.database.path = path;
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.sync.interval, 300);
        assert!((cfg.sync.debounce - 2.0).abs() < f64::EPSILON);
        assert!(cfg.sync.root.to_string_lossy().contains("Seafile"));
        assert_eq!(cfg.transfers.max_concurrent, 4);
        assert_eq!(cfg.conflicts.strategy, "last_modified_wins");
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg
            .database
            .path
            .to_string_lossy()
            .ends_with("sync_state.sqlite"));
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
sync:
  root: /srv/seafile
  interval: 60
  debounce: 0.5
transfers:
  max_concurrent: 2
conflicts:
  strategy: last_modified_wins
database:
  path: /tmp/seasync.sqlite
logging:
  level: debug
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.sync.root, PathBuf::from("/srv/seafile"));
        assert_eq!(cfg.sync.interval, 60);
        assert!((cfg.sync.debounce - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.transfers.max_concurrent, 2);
        assert_eq!(cfg.database.path, PathBuf::from("/tmp/seasync.sqlite"));
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.sync.interval, 300);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();
        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn validate_catches_zero_interval() {
        let mut cfg = Config::default();
        cfg.sync.interval = 0;
        assert!(cfg.validate().iter().any(|e| e.field == "sync.interval"));
    }

    #[test]
    fn validate_catches_non_positive_debounce() {
        let mut cfg = Config::default();
        cfg.sync.debounce = 0.0;
        assert!(cfg.validate().iter().any(|e| e.field == "sync.debounce"));
    }

    #[test]
    fn validate_catches_zero_max_concurrent() {
        let mut cfg = Config::default();
        cfg.transfers.max_concurrent = 0;
        assert!(cfg
            .validate()
            .iter()
            .any(|e| e.field == "transfers.max_concurrent"));
    }

    #[test]
    fn validate_catches_unknown_strategy() {
        let mut cfg = Config::default();
        cfg.conflicts.strategy = "newest_wins".to_string();
        assert!(cfg
            .validate()
            .iter()
            .any(|e| e.field == "conflicts.strategy"));
    }

    #[test]
    fn validate_catches_invalid_log_level() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".to_string();
        assert!(cfg.validate().iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn validate_accepts_all_valid_log_levels() {
        for level in VALID_LOG_LEVELS {
            let mut cfg = Config::default();
            cfg.logging.level = level.to_string();
            assert!(
                !cfg.validate().iter().any(|e| e.field == "logging.level"),
                "level '{level}' should be valid"
            );
        }
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .sync_root(PathBuf::from("/custom/root"))
            .sync_interval(120)
            .sync_debounce(5.0)
            .transfers_max_concurrent(8)
            .database_path(PathBuf::from("/tmp/state.sqlite"))
            .logging_level("debug")
            .build();

        assert_eq!(cfg.sync.root, PathBuf::from("/custom/root"));
        assert_eq!(cfg.sync.interval, 120);
        assert!((cfg.sync.debounce - 5.0).abs() < f64::EPSILON);
        assert_eq!(cfg.transfers.max_concurrent, 8);
        assert_eq!(cfg.database.path, PathBuf::from("/tmp/state.sqlite"));
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn builder_build_validated_fails_for_invalid_config() {
        let result = ConfigBuilder::new()
            .sync_interval(0)
            .logging_level("nope")
            .build_validated();
        let errors = result.unwrap_err();
        assert!(errors.len() >= 2);
    }

    #[test]
    fn default_path_ends_with_config_yaml() {
        assert!(Config::default_path().ends_with("seasync/config.yaml"));
    }
}
