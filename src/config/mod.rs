//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, apply env/CLI overrides)
//!     → validation.rs (semantic checks)
//!     → KoblingConfig (validated, immutable)
//!     → handed to lifecycle::startup to wire the worker
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - Most fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, Overrides};
pub use schema::{
    BaselinePolicy, ExporterConfig, KoblingConfig, ObservabilityConfig, ServerConfig,
    UpstreamConfig,
};
pub use validation::ValidationError;
