//! Spark client configuration.
//!
//! TOML-based configuration for credentials, chat defaults and session
//! limits. Every section has defaults except the credentials, which come
//! from the file or from `SPARK_*` environment variables.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::ConfigError;
pub use loader::{
    apply_env_overrides, create_default_config, default_config_path, load_default, load_from_path,
};
pub use schema::{ChatConfig, CredentialsConfig, SessionConfig, SparkConfig};
