//! Configuration validation.
//!
//! Collects every problem into a single `ConfigError::ValidationError`.

use crate::error::ConfigError;
use crate::schema::SparkConfig;

pub fn validate(config: &SparkConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    let creds = &config.credentials;
    for (name, value) in [
        ("credentials.app_id", &creds.app_id),
        ("credentials.api_key", &creds.api_key),
        ("credentials.api_secret", &creds.api_secret),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{name} is empty"));
        }
    }

    let chat = &config.chat;
    if !(chat.endpoint.starts_with("ws://") || chat.endpoint.starts_with("wss://")) {
        errors.push(format!(
            "chat.endpoint = {:?} must start with ws:// or wss://",
            chat.endpoint
        ));
    }
    if chat.domain.trim().is_empty() {
        errors.push("chat.domain is empty".into());
    }
    if !(chat.temperature > 0.0 && chat.temperature <= 1.0) {
        errors.push(format!(
            "chat.temperature = {} is out of range (0, 1]",
            chat.temperature
        ));
    }
    validate_range(&mut errors, "chat.top_k", chat.top_k, 1, 6);
    validate_range(&mut errors, "chat.max_tokens", chat.max_tokens, 1, 8192);

    if config.session.timeout_secs == Some(0) {
        errors.push("session.timeout_secs must be greater than 0".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_range(errors: &mut Vec<String>, name: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}
