use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    CollaboratorConfig, Config, LoggingConfig, Overrides, TargetConfig, TesterConfig,
};

/// Environment variables with this prefix override file values, e.g.
/// `CONFORMANCE_TESTER__TRADE_TIMEOUT_MS=8000`.
pub const ENV_PREFIX: &str = "CONFORMANCE";

/// Loads the tester configuration.
///
/// The file at `path` is optional; every section falls back to its defaults.
/// Environment variables are layered on top. The result is not validated, so
/// callers can apply command-line overrides first and then call
/// `Config::validate`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(builder.try_deserialize::<Config>()?)
}
