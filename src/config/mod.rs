//! Configuration management.
//!
//! Configuration is read from a TOML file and then overridden by
//! environment variables.
//!
//! ```toml
//! [engine]
//! url = "https://localhost:9200"
//! username = "admin"
//! password = "admin"
//! timeout_ms = 30000
//! accept_invalid_certs = true
//!
//! [upsert]
//! batch_size = 100
//!
//! [search]
//! default_limit = 10
//!
//! [filter]
//! strict_conjunction = true
//! multi_valued_fields = ["tags"]
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```
//!
//! # Environment Overrides
//!
//! | Variable | Setting |
//! |----------|---------|
//! | `VECTORGATE_URL` | `engine.url` |
//! | `VECTORGATE_USERNAME` | `engine.username` |
//! | `VECTORGATE_PASSWORD` | `engine.password` |
//! | `VECTORGATE_TIMEOUT_MS` | `engine.timeout_ms` |
//! | `VECTORGATE_CONNECT_TIMEOUT_MS` | `engine.connect_timeout_ms` |
//! | `VECTORGATE_BATCH_SIZE` | `upsert.batch_size` |
//! | `VECTORGATE_LOG_LEVEL` | `logging.level` |
//! | `VECTORGATE_LOG_FORMAT` | `logging.format` |

use crate::filter::{ConjunctionPolicy, FilterCompiler};
use crate::observability::LogFormat;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Main configuration for vectorgate.
#[derive(Debug, Clone)]
pub struct VectorGateConfig {
    /// Engine connection settings.
    pub engine: EngineConfig,
    /// Maximum documents per bulk request.
    pub batch_size: usize,
    /// Result limit when none is given.
    pub default_limit: usize,
    /// Filter compiler settings.
    pub filter: FilterConfig,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Engine connection settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the engine.
    pub url: String,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<SecretString>,
    /// Request timeout in milliseconds (0 disables).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 disables).
    pub connect_timeout_ms: u64,
    /// Skip TLS certificate verification (local clusters only).
    pub accept_invalid_certs: bool,
}

impl EngineConfig {
    /// Default engine URL.
    pub const DEFAULT_URL: &'static str = "http://localhost:9200";

    /// Default request timeout.
    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

    /// Default connect timeout.
    pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

    /// Creates settings for the given URL with default timeouts.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets basic auth credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Disables TLS certificate verification.
    #[must_use]
    pub const fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: Self::DEFAULT_URL.to_string(),
            username: None,
            password: None,
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
            connect_timeout_ms: Self::DEFAULT_CONNECT_TIMEOUT_MS,
            accept_invalid_certs: false,
        }
    }
}

/// Filter compiler settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    /// Reject `$and` on fields not listed in `multi_valued_fields`.
    pub strict_conjunction: bool,
    /// Fields holding lists of values (e.g. tags).
    pub multi_valued_fields: BTreeSet<String>,
}

impl FilterConfig {
    /// Returns the conjunction policy these settings describe.
    #[must_use]
    pub fn policy(&self) -> ConjunctionPolicy {
        if self.strict_conjunction {
            ConjunctionPolicy::MultiValuedOnly(self.multi_valued_fields.clone())
        } else {
            ConjunctionPolicy::Permissive
        }
    }

    /// Builds a compiler with these settings.
    #[must_use]
    pub fn compiler(&self) -> FilterCompiler {
        FilterCompiler::new().with_policy(self.policy())
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `info` or `vectorgate=debug`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Optional log file (stderr otherwise).
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Engine section.
    pub engine: Option<ConfigFileEngine>,
    /// Upsert section.
    pub upsert: Option<ConfigFileUpsert>,
    /// Search section.
    pub search: Option<ConfigFileSearch>,
    /// Filter section.
    pub filter: Option<ConfigFileFilter>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Engine section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileEngine {
    /// Base URL.
    pub url: Option<String>,
    /// Username.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
    /// Skip TLS verification.
    pub accept_invalid_certs: Option<bool>,
}

/// Upsert section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileUpsert {
    /// Batch size.
    pub batch_size: Option<usize>,
}

/// Search section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileSearch {
    /// Default limit.
    pub default_limit: Option<usize>,
}

/// Filter section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileFilter {
    /// Strict conjunction.
    pub strict_conjunction: Option<bool>,
    /// Multi-valued fields.
    pub multi_valued_fields: Option<Vec<String>>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Filter directive.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl Default for VectorGateConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            batch_size: 100,
            default_limit: 10,
            filter: FilterConfig::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl VectorGateConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::InvalidInput(format!(
            "cannot read config file {}: {e}",
            path.display()
        )))?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the text is not valid configuration.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| Error::InvalidInput(format!("invalid config file: {e}")))?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/vectorgate/` on macOS)
    /// 2. XDG config dir (`~/.config/vectorgate/`)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs
            .config_dir()
            .join("vectorgate")
            .join("config.toml");
        if platform_config.exists() {
            if let Ok(config) = Self::load_from_file(&platform_config) {
                return config;
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("vectorgate")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Loads from `path` if given, otherwise from the default location, then
    /// applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file cannot be loaded.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Converts a `ConfigFile` to `VectorGateConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(engine) = file.engine {
            if let Some(url) = engine.url {
                config.engine.url = url;
            }
            config.engine.username = engine.username;
            config.engine.password = engine.password.map(SecretString::from);
            if let Some(v) = engine.timeout_ms {
                config.engine.timeout_ms = v;
            }
            if let Some(v) = engine.connect_timeout_ms {
                config.engine.connect_timeout_ms = v;
            }
            if let Some(v) = engine.accept_invalid_certs {
                config.engine.accept_invalid_certs = v;
            }
        }
        if let Some(batch_size) = file.upsert.and_then(|u| u.batch_size) {
            config.batch_size = batch_size;
        }
        if let Some(limit) = file.search.and_then(|s| s.default_limit) {
            config.default_limit = limit;
        }
        if let Some(filter) = file.filter {
            if let Some(v) = filter.strict_conjunction {
                config.filter.strict_conjunction = v;
            }
            if let Some(fields) = filter.multi_valued_fields {
                config.filter.multi_valued_fields = fields.into_iter().collect();
            }
        }
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                config.logging.level = level;
            }
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format);
            }
            config.logging.file = logging.file.map(PathBuf::from);
        }

        config
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("VECTORGATE_URL") {
            self.engine.url = v;
        }
        if let Ok(v) = std::env::var("VECTORGATE_USERNAME") {
            self.engine.username = Some(v);
        }
        if let Ok(v) = std::env::var("VECTORGATE_PASSWORD") {
            self.engine.password = Some(SecretString::from(v));
        }
        if let Some(v) = parse_env("VECTORGATE_TIMEOUT_MS") {
            self.engine.timeout_ms = v;
        }
        if let Some(v) = parse_env("VECTORGATE_CONNECT_TIMEOUT_MS") {
            self.engine.connect_timeout_ms = v;
        }
        if let Some(v) = parse_env("VECTORGATE_BATCH_SIZE") {
            self.batch_size = v;
        }
        if let Ok(v) = std::env::var("VECTORGATE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("VECTORGATE_LOG_FORMAT") {
            self.logging.format = LogFormat::parse(&v);
        }
        self
    }

    /// Sets the engine settings.
    #[must_use]
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Sets the bulk batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = VectorGateConfig::default();
        assert_eq!(config.engine.url, "http://localhost:9200");
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.default_limit, 10);
        assert_eq!(config.filter.policy(), ConjunctionPolicy::Permissive);
    }

    #[test]
    fn test_from_toml() {
        let config = VectorGateConfig::from_toml(
            r#"
            [engine]
            url = "https://search.internal:9200"
            username = "admin"
            password = "hunter2"
            accept_invalid_certs = true

            [upsert]
            batch_size = 50

            [filter]
            strict_conjunction = true
            multi_valued_fields = ["tags"]

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.url, "https://search.internal:9200");
        assert_eq!(config.engine.username.as_deref(), Some("admin"));
        assert_eq!(
            config.engine.password.as_ref().map(ExposeSecret::expose_secret),
            Some("hunter2")
        );
        assert!(config.engine.accept_invalid_certs);
        assert_eq!(config.engine.timeout_ms, EngineConfig::DEFAULT_TIMEOUT_MS);
        assert_eq!(config.batch_size, 50);
        assert_eq!(
            config.filter.policy(),
            ConjunctionPolicy::MultiValuedOnly(BTreeSet::from(["tags".to_string()]))
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_toml() {
        let err = VectorGateConfig::from_toml("[engine\nurl=").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[search]\ndefault_limit = 25").unwrap();
        let config = VectorGateConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.default_limit, 25);
    }

    #[test]
    fn test_missing_file() {
        let result = VectorGateConfig::load_from_file(Path::new("/nonexistent/vectorgate.toml"));
        assert!(result.is_err());
    }
}
