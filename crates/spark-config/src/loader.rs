//! TOML config loading, environment overrides and template creation.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ConfigError;
use crate::schema::SparkConfig;
use crate::validation;

pub const ENV_APP_ID: &str = "SPARK_APP_ID";
pub const ENV_API_KEY: &str = "SPARK_API_KEY";
pub const ENV_API_SECRET: &str = "SPARK_API_SECRET";

/// Load config from a TOML file, apply `SPARK_*` overrides and validate.
pub fn load_from_path(path: &Path) -> Result<SparkConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::ParseError(format!("failed to read {}: {e}", path.display()))
    })?;

    let mut config: SparkConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validation::validate(&config)?;

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform default path.
///
/// A missing file is not an error: defaults plus environment overrides are
/// used instead, so credentials may come from the environment alone.
pub fn load_default() -> Result<SparkConfig, ConfigError> {
    let path = default_config_path()?;
    if path.exists() {
        return load_from_path(&path);
    }

    debug!("no config at {}, using defaults and environment", path.display());
    let mut config = SparkConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validation::validate(&config)?;
    Ok(config)
}

/// Overwrite credentials with any non-empty value `lookup` returns.
pub fn apply_env_overrides(config: &mut SparkConfig, lookup: impl Fn(&str) -> Option<String>) {
    let creds = &mut config.credentials;
    for (key, slot) in [
        (ENV_APP_ID, &mut creds.app_id),
        (ENV_API_KEY, &mut creds.api_key),
        (ENV_API_SECRET, &mut creds.api_secret),
    ] {
        if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
            debug!(key, "credential taken from environment");
            *slot = value;
        }
    }
}

/// Platform-specific default config file path.
///
/// On Linux: `~/.config/spark/config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))?;
    Ok(config_dir.join("spark").join("config.toml"))
}

/// Write a commented config template to `path`.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    std::fs::write(path, default_config_toml()).map_err(|e| {
        ConfigError::ParseError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;

    info!("created default config at {}", path.display());
    Ok(())
}

fn default_config_toml() -> String {
    let chat = crate::schema::ChatConfig::default();
    format!(
        r#"# Spark client configuration.

[credentials]
# Issued by the Spark console. SPARK_APP_ID, SPARK_API_KEY and
# SPARK_API_SECRET override these values.
app_id = ""
api_key = ""
api_secret = ""

[chat]
endpoint = "{endpoint}"
domain = "{domain}"
# (0, 1]
temperature = {temperature:?}
# [1, 6]
top_k = {top_k}
# [1, 8192]
max_tokens = {max_tokens}

[session]
# Deadline for one exchange in seconds. Leave unset to wait indefinitely.
# timeout_secs = 60
"#,
        endpoint = chat.endpoint,
        domain = chat.domain,
        temperature = chat.temperature,
        top_k = chat.top_k,
        max_tokens = chat.max_tokens,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
[credentials]
app_id = "app-1"
api_key = "key-1"
api_secret = "secret-1"

[chat]
domain = "generalv2"
max_tokens = 512

[session]
timeout_secs = 30
"#;

    #[test]
    fn load_from_nonexistent_returns_file_not_found() {
        let result = load_from_path(Path::new("/tmp/nonexistent_spark_config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn load_valid_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, VALID).unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.chat.domain, "generalv2");
        assert_eq!(config.chat.max_tokens, 512);
        assert_eq!(config.session.timeout_secs, Some(30));
        // Defaults preserved
        assert_eq!(config.chat.endpoint, crate::schema::DEFAULT_ENDPOINT);
        assert_eq!(config.chat.top_k, 4);
    }

    #[test]
    fn load_invalid_toml_returns_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        let result = load_from_path(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn load_out_of_range_returns_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, VALID.replace("max_tokens = 512", "max_tokens = 99999")).unwrap();

        let result = load_from_path(&path);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn env_overrides_replace_credentials() {
        let mut config = SparkConfig::default();
        config.credentials.api_key = "from-file".into();

        apply_env_overrides(&mut config, |key| match key {
            ENV_APP_ID => Some("env-app".into()),
            ENV_API_KEY => Some("  ".into()),
            ENV_API_SECRET => Some("env-secret".into()),
            _ => None,
        });

        assert_eq!(config.credentials.app_id, "env-app");
        assert_eq!(config.credentials.api_key, "from-file");
        assert_eq!(config.credentials.api_secret, "env-secret");
    }

    #[test]
    fn template_parses_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        create_default_config(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let config: SparkConfig = toml::from_str(&content).unwrap();
        let defaults = SparkConfig::default();
        assert_eq!(config.chat.endpoint, defaults.chat.endpoint);
        assert_eq!(config.chat.temperature, defaults.chat.temperature);
        assert_eq!(config.chat.top_k, defaults.chat.top_k);
        assert_eq!(config.chat.max_tokens, defaults.chat.max_tokens);
        assert_eq!(config.session.timeout_secs, None);
        assert!(config.credentials.app_id.is_empty());
    }
}
