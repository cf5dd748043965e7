//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → command-line overrides (cli.rs), re-validated
//!     → GatekeeperConfig (validated, immutable)
//!     → handed to the server at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    Environment, FixtureUser, GatekeeperConfig, LimiterConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, ShutdownConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
