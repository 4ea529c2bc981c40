use crate::error::ConfigError;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the conformance tester.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub bank: CollaboratorConfig,
    pub log: CollaboratorConfig,
    pub tester: TesterConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            bank: CollaboratorConfig::default(),
            log: CollaboratorConfig {
                endpoint: "http://127.0.0.1:5516".to_string(),
                app_id: String::new(),
            },
            tester: TesterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// The exchange web service under test.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Base URL of the exchange, e.g. "http://127.0.0.1:5000".
    pub endpoint: String,
    /// Whether to call `POST /initialize` with the bank and log settings before the run.
    pub initialize: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000".to_string(),
            initialize: true,
        }
    }
}

/// Connection settings for one of the ground-truth services (bank ledger or audit log).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    pub endpoint: String,
    /// Bearer token the service expects. The exchange is handed the same value on initialize.
    pub app_id: String,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5515".to_string(),
            app_id: String::new(),
        }
    }
}

/// Timing knobs for the scenario engine and the exchange client.
///
/// All values are read from the file in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TesterConfig {
    /// Hard timeout for a single HTTP request to the exchange.
    #[serde(rename = "client_timeout_ms", deserialize_with = "millis")]
    pub client_timeout: Duration,
    /// A response slower than this is treated as a failure even if it succeeded.
    #[serde(rename = "retire_timeout_ms", deserialize_with = "millis")]
    pub retire_timeout: Duration,
    /// How long a trading track waits for its orders to match.
    #[serde(rename = "trade_timeout_ms", deserialize_with = "millis")]
    pub trade_timeout: Duration,
    /// How long a trading track waits for the audit log to catch up.
    #[serde(rename = "log_timeout_ms", deserialize_with = "millis")]
    pub log_timeout: Duration,
    #[serde(rename = "polling_interval_ms", deserialize_with = "millis")]
    pub polling_interval: Duration,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            client_timeout: Duration::from_secs(10),
            retire_timeout: Duration::from_secs(5),
            trade_timeout: Duration::from_secs(5),
            log_timeout: Duration::from_secs(10),
            polling_interval: Duration::from_millis(500),
        }
    }
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive. `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// Command-line overrides, applied on top of the file and environment.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct Overrides {
    /// Base URL of the exchange under test.
    #[cfg_attr(feature = "clap", arg(long = "target"))]
    pub target_endpoint: Option<String>,

    /// Base URL of the bank ledger service.
    #[cfg_attr(feature = "clap", arg(long = "bank"))]
    pub bank_endpoint: Option<String>,

    /// Base URL of the audit log service.
    #[cfg_attr(feature = "clap", arg(long = "log"))]
    pub log_endpoint: Option<String>,

    /// Log filter directive (e.g. "debug", "engine=trace").
    #[cfg_attr(feature = "clap", arg(long))]
    pub log_level: Option<String>,

    /// Skip `POST /initialize` before the run.
    #[cfg_attr(feature = "clap", arg(long))]
    pub no_initialize: bool,
}

impl Config {
    /// Checks the settings the engine relies on. Called by `load_config`, and
    /// again by callers after applying overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, endpoint) in [
            ("target.endpoint", &self.target.endpoint),
            ("bank.endpoint", &self.bank.endpoint),
            ("log.endpoint", &self.log.endpoint),
        ] {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, endpoint
                )));
            }
        }

        let tester = &self.tester;
        for (name, value) in [
            ("client_timeout_ms", tester.client_timeout),
            ("retire_timeout_ms", tester.retire_timeout),
            ("trade_timeout_ms", tester.trade_timeout),
            ("log_timeout_ms", tester.log_timeout),
            ("polling_interval_ms", tester.polling_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ValidationError(format!(
                    "tester.{} must be greater than zero",
                    name
                )));
            }
        }

        if tester.polling_interval > tester.trade_timeout
            || tester.polling_interval > tester.log_timeout
        {
            return Err(ConfigError::ValidationError(
                "tester.polling_interval_ms must not exceed the trade or log timeout".to_string(),
            ));
        }

        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(endpoint) = &overrides.target_endpoint {
            self.target.endpoint = endpoint.clone();
        }
        if let Some(endpoint) = &overrides.bank_endpoint {
            self.bank.endpoint = endpoint.clone();
        }
        if let Some(endpoint) = &overrides.log_endpoint {
            self.log.endpoint = endpoint.clone();
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
        if overrides.no_initialize {
            self.target.initialize = false;
        }
    }
}
