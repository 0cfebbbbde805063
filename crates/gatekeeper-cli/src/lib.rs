//! Command-line front end for the gatekeeper primitives.
//!
//! Provides the TOML configuration layer, tracing setup and the exit code
//! contract used by the `gatekeeper` binary.

pub mod config;
pub mod logging;
pub mod outcome;

pub use config::{default_config_path, Config, ConfigError, EnvOverride};
pub use logging::{init_logging, LogConfig};
