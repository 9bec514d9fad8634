//! Layered configuration for the `calcmark` binary
//!
//! `defaults/calcmark.default.toml` is embedded so the documented defaults
//! and the runtime ones cannot drift. On top of it, in order:
//!
//! 1. `<config dir>/calcmark/config.toml` (optional)
//! 2. `./calcmark.toml` (optional)
//! 3. the file given with `--config` (required when given)
//! 4. `CALCMARK__*` environment variables, e.g. `CALCMARK__PROCESS__PRECISION=4`
//! 5. command-line flags

use calcmark_document::ProcessOptions;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_TOML: &str = include_str!("../defaults/calcmark.default.toml");
const ENV_PREFIX: &str = "CALCMARK";
const LOCAL_FILE: &str = "calcmark.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    pub process: ProcessOptions,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter level used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

/// Per-user config file location, when the platform has a config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("calcmark").join("config.toml"))
}

/// Settings given on the command line; `None` leaves the layered value alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub json_logs: bool,
    pub precision: Option<u32>,
    pub timeout_ms: Option<u64>,
}

pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start from the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// The user and working-directory files, both optional.
    pub fn with_standard_files(self) -> Self {
        let loader = match user_config_path() {
            Some(path) => self.with_optional_file(path),
            None => self,
        };
        loader.with_optional_file(LOCAL_FILE)
    }

    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    pub fn with_environment(mut self) -> Self {
        self.builder = self.builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("process.shadowable_units"),
        );
        self
    }

    /// Apply a single key/value override (command-line flags).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn with_overrides(self, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut loader = self;
        if let Some(level) = &overrides.log_level {
            loader = loader.set_override("logging.level", level.as_str())?;
        }
        if overrides.json_logs {
            loader = loader.set_override("logging.json", true)?;
        }
        if let Some(precision) = overrides.precision {
            loader = loader.set_override("process.precision", i64::from(precision))?;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            let timeout_ms = i64::try_from(timeout_ms).unwrap_or(i64::MAX);
            loader = loader.set_override("process.timeout_ms", timeout_ms)?;
        }
        Ok(loader)
    }

    pub fn build(self) -> Result<CliConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads `./.env` into the process environment. A missing file is normal;
/// any other failure is returned so it can be logged once logging is up.
pub fn load_dotenv() -> Option<dotenvy::Error> {
    dotenv_problem(dotenvy::dotenv())
}

fn dotenv_problem(result: Result<PathBuf, dotenvy::Error>) -> Option<dotenvy::Error> {
    match result {
        Ok(_) => None,
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => Some(err),
    }
}

/// Loads every layer. Call [`load_dotenv`] first so `.env` variables take
/// part in the environment layer.
pub fn load(explicit: Option<&Path>, overrides: &Overrides) -> Result<CliConfig, ConfigError> {
    let loader = Loader::new().with_standard_files();
    let loader = match explicit {
        Some(path) => loader.with_file(path),
        None => loader,
    };
    loader.with_environment().with_overrides(overrides)?.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_process_options() {
        let config = Loader::new().build().expect("defaults to deserialize");
        assert_eq!(config.process, ProcessOptions::default());
        assert_eq!(config.logging.level, "warn");
        assert!(!config.logging.json);
    }

    #[test]
    fn overrides_win() {
        let config = Loader::new()
            .set_override("process.precision", 3_i64)
            .expect("override to apply")
            .set_override("logging.json", true)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.process.precision, 3);
        assert_eq!(config.process.timeout_ms, 2000);
        assert!(config.logging.json);
    }

    #[test]
    fn command_line_overrides_apply_last() {
        let overrides = Overrides {
            log_level: Some("debug".into()),
            json_logs: true,
            precision: Some(4),
            timeout_ms: Some(0),
        };
        let config = Loader::new()
            .with_overrides(&overrides)
            .expect("overrides to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.process.precision, 4);
        assert_eq!(config.process.timeout_ms, 0);
        assert_eq!(config.process.max_depth, 200);

        let untouched = Loader::new()
            .with_overrides(&Overrides::default())
            .expect("overrides to apply")
            .build()
            .expect("config to build");
        assert_eq!(untouched.process, ProcessOptions::default());
        assert!(!untouched.logging.json);
    }

    #[test]
    fn only_missing_dotenv_is_silent() {
        let dir = std::env::temp_dir().join(format!("calcmark-dotenv-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");

        let missing = dir.join("absent.env");
        assert!(dotenv_problem(dotenvy::from_path(&missing).map(|()| missing.clone())).is_none());

        let malformed = dir.join("malformed.env");
        std::fs::write(&malformed, "this is not=valid\n").expect("write env file");
        let problem = dotenv_problem(dotenvy::from_path(&malformed).map(|()| malformed.clone()));
        assert!(matches!(problem, Some(dotenvy::Error::LineParse(..))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = Loader::new()
            .with_file("/nonexistent/calcmark-test.toml")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/calcmark-test.toml")
            .build()
            .expect("config to build");
        assert_eq!(config.process.precision, 6);
    }
}
