use super::types::*;
use crate::config::{expand_env_vars, expand_tilde, unexpanded_env_vars};
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })
}

/// Parse and validate a YAML config held in memory.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;
    config.spool.path = expand_tilde(&config.spool.path);

    validate_config(&config)?;
    Ok(config)
}

fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let unexpanded = unexpanded_env_vars(yaml_string);
    if unexpanded.is_empty() {
        return Ok(());
    }

    let error_msg = if unexpanded.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with an actual value",
            unexpanded[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables\n\
             2. Replace the variables in the config file with actual values",
            unexpanded.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.spool.path.as_os_str().is_empty() {
        errors.push("spool.path cannot be empty".to_string());
    }
    if config.spool.capacity == 0 {
        errors.push("spool.capacity must be at least 1".to_string());
    }
    if config.spool.sweep_interval_seconds == 0 {
        errors.push("spool.sweep_interval_seconds must be at least 1".to_string());
    }
    if config.spool.retention_seconds == 0 {
        errors.push("spool.retention_seconds must be at least 1".to_string());
    }

    let url = config.collector.url.trim();
    if url.is_empty() {
        errors.push("collector.url cannot be empty".to_string());
    } else if !url.starts_with("http://") && !url.starts_with("https://") {
        errors.push(format!(
            "collector.url '{}' must start with http:// or https://",
            url
        ));
    }
    if config.collector.timeout.is_zero() {
        errors.push("collector.timeout must be greater than zero".to_string());
    }

    if config.drain.interval.is_zero() {
        errors.push("drain.interval must be greater than zero".to_string());
    }
    if config.drain.max_batches_per_pass == 0 {
        errors.push("drain.max_batches_per_pass must be at least 1".to_string());
    }

    if config.ingest.listen.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "ingest.listen '{}' is not a valid socket address",
            config.ingest.listen
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
