//! Engine configuration and the optional TOML file layer.
//!
//! [`EngineConfig`] is passed explicitly into the client and resolver
//! constructors; nothing in the library reads process-wide settings. The
//! binary layers values as: command-line flag > [`FileConfig`] > default.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::user_agent;

/// Public Wikidata SPARQL endpoint.
pub const DEFAULT_SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";
/// Public Wikidata action API (entity search).
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.wikidata.org/w/api.php";
/// Minimum delay between the start of consecutive lookups.
pub const DEFAULT_MIN_DELAY_MS: u64 = 1000;
/// Timeout for per-request lookups.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
/// Timeout for batched lookups.
pub const DEFAULT_BATCH_QUERY_TIMEOUT_SECS: u64 = 60;
/// Connect timeout for the HTTP client.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Number of search hits verified by the fuzzy fallback.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;
/// Maximum lookup values per batched query.
pub const DEFAULT_BATCH_SIZE: usize = 50;

const MAX_MIN_DELAY_MS: u64 = 60_000;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file '{path}': {source}\n  Suggestion: Check the file permissions")]
    Read {
        /// Path that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown keys.
    #[error("failed to parse config file '{path}': {reason}\n  Suggestion: Remove unknown keys and check value types")]
    Parse {
        /// Path that failed
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// A numeric value is outside its allowed range.
    #[error("invalid config value for `{field}`: {value}. Expected range: {range}")]
    OutOfRange {
        /// Offending key
        field: &'static str,
        /// Value as given
        value: u64,
        /// Allowed range, for display
        range: &'static str,
    },

    /// A string value is unusable.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Offending key
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Settings for the knowledge-base client, dispatcher and resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// SPARQL endpoint URL.
    pub sparql_endpoint: String,
    /// Entity search (action API) endpoint URL.
    pub search_endpoint: String,
    /// Label language tag used for matching and series labels.
    pub language: String,
    /// Minimum spacing between the start of consecutive lookups; zero disables.
    pub min_delay: Duration,
    /// Timeout for per-request lookups.
    pub query_timeout: Duration,
    /// Timeout for batched lookups.
    pub batch_query_timeout: Duration,
    /// HTTP connect timeout.
    pub connect_timeout: Duration,
    /// Search hits verified by the fuzzy fallback.
    pub search_limit: usize,
    /// Maximum lookup values per batched query.
    pub batch_size: usize,
    /// User-Agent header sent on every request.
    pub user_agent: String,
    /// Run the per-request fallback strategies for keys the batch pass missed.
    pub fallback_after_batch: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sparql_endpoint: DEFAULT_SPARQL_ENDPOINT.to_string(),
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            language: "en".to_string(),
            min_delay: Duration::from_millis(DEFAULT_MIN_DELAY_MS),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            batch_query_timeout: Duration::from_secs(DEFAULT_BATCH_QUERY_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            search_limit: DEFAULT_SEARCH_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
            user_agent: user_agent::default_user_agent(),
            fallback_after_batch: true,
        }
    }
}

impl EngineConfig {
    /// Checks endpoint URLs, the language tag and numeric ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint("sparql_endpoint", &self.sparql_endpoint)?;
        validate_endpoint("search_endpoint", &self.search_endpoint)?;
        validate_language(&self.language)?;
        check_range(
            "min_delay_ms",
            u64::try_from(self.min_delay.as_millis()).unwrap_or(u64::MAX),
            0,
            MAX_MIN_DELAY_MS,
            "0..=60000",
        )?;
        check_range(
            "query_timeout_secs",
            self.query_timeout.as_secs(),
            1,
            3600,
            "1..=3600",
        )?;
        check_range(
            "batch_query_timeout_secs",
            self.batch_query_timeout.as_secs(),
            1,
            3600,
            "1..=3600",
        )?;
        check_range(
            "connect_timeout_secs",
            self.connect_timeout.as_secs(),
            1,
            3600,
            "1..=3600",
        )?;
        check_range("search_limit", self.search_limit as u64, 1, 50, "1..=50")?;
        check_range("batch_size", self.batch_size as u64, 1, 500, "1..=500")?;
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "user_agent",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Optional overrides read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// SPARQL endpoint URL.
    pub sparql_endpoint: Option<String>,
    /// Entity search endpoint URL.
    pub search_endpoint: Option<String>,
    /// Label language tag.
    pub language: Option<String>,
    /// Minimum delay between lookups in milliseconds (0..=60000).
    pub min_delay_ms: Option<u64>,
    /// Per-request lookup timeout in seconds (1..=3600).
    pub query_timeout_secs: Option<u64>,
    /// Batched lookup timeout in seconds (1..=3600).
    pub batch_query_timeout_secs: Option<u64>,
    /// HTTP connect timeout in seconds (1..=3600).
    pub connect_timeout_secs: Option<u64>,
    /// Fuzzy search hits to verify (1..=50).
    pub search_limit: Option<usize>,
    /// Lookup values per batched query (1..=500).
    pub batch_size: Option<usize>,
    /// Run per-request fallback strategies after the batch pass.
    pub fallback_after_batch: Option<bool>,
}

impl FileConfig {
    /// Validates present values against the same ranges the CLI accepts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(endpoint) = &self.sparql_endpoint {
            validate_endpoint("sparql_endpoint", endpoint)?;
        }
        if let Some(endpoint) = &self.search_endpoint {
            validate_endpoint("search_endpoint", endpoint)?;
        }
        if let Some(language) = &self.language {
            validate_language(language)?;
        }
        if let Some(value) = self.min_delay_ms {
            check_range("min_delay_ms", value, 0, MAX_MIN_DELAY_MS, "0..=60000")?;
        }
        validate_timeout_secs("query_timeout_secs", self.query_timeout_secs)?;
        validate_timeout_secs("batch_query_timeout_secs", self.batch_query_timeout_secs)?;
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        if let Some(value) = self.search_limit {
            check_range("search_limit", value as u64, 1, 50, "1..=50")?;
        }
        if let Some(value) = self.batch_size {
            check_range("batch_size", value as u64, 1, 500, "1..=500")?;
        }
        Ok(())
    }

    /// Overwrites `config` fields with the values present in this file.
    pub fn apply_to(&self, config: &mut EngineConfig) {
        if let Some(endpoint) = &self.sparql_endpoint {
            config.sparql_endpoint.clone_from(endpoint);
        }
        if let Some(endpoint) = &self.search_endpoint {
            config.search_endpoint.clone_from(endpoint);
        }
        if let Some(language) = &self.language {
            config.language.clone_from(language);
        }
        if let Some(ms) = self.min_delay_ms {
            config.min_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = self.query_timeout_secs {
            config.query_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.batch_query_timeout_secs {
            config.batch_query_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.connect_timeout_secs {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = self.search_limit {
            config.search_limit = limit;
        }
        if let Some(size) = self.batch_size {
            config.batch_size = size;
        }
        if let Some(fallback) = self.fallback_after_batch {
            config.fallback_after_batch = fallback;
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists.
    pub config: Option<FileConfig>,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/series-resolver/config.toml`
/// 2. `$HOME/.config/series-resolver/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("series-resolver")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("series-resolver")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config from the default path if the file exists.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file exists but is unreadable or invalid.
pub fn load_default_file_config() -> Result<LoadedConfig, ConfigError> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

/// Reads, parses and validates a config file.
///
/// # Errors
///
/// Returns [`ConfigError`] when the file is unreadable, not valid TOML, has
/// unknown keys, or has out-of-range values.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: FileConfig = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

fn validate_timeout_secs(field: &'static str, value: Option<u64>) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    check_range(field, value, 1, 3600, "1..=3600")
}

fn check_range(
    field: &'static str,
    value: u64,
    min: u64,
    max: u64,
    range: &'static str,
) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            range,
        })
    }
}

fn validate_endpoint(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::Invalid {
        field,
        reason: format!("'{value}' is not a valid URL ({e})"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("'{value}' must use http or https"),
        });
    }
    Ok(())
}

fn validate_language(value: &str) -> Result<(), ConfigError> {
    let well_formed = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if well_formed {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field: "language",
            reason: format!("'{value}' is not a language tag such as \"en\""),
        })
    }
}
