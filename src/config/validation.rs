//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check server identity (unique, usable as a key segment)
//! - Validate URLs and value ranges
//! - Require a configured destination
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: KoblingConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::{ExporterConfig, KoblingConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no servers configured")]
    NoServers,

    #[error("server #{index} has an empty name")]
    EmptyServerName { index: usize },

    #[error("server name '{0}' must not contain '/' or be all digits")]
    InvalidServerName(String),

    #[error("server name '{0}' is configured more than once")]
    DuplicateServer(String),

    #[error("server '{server}': {field} '{value}' is not an http(s) URL")]
    InvalidUrl {
        server: String,
        field: &'static str,
        value: String,
    },

    #[error("server '{0}' has an empty entry point name")]
    EmptyEntryPoint(String),

    #[error("run_every must be greater than zero")]
    ZeroInterval,

    #[error("root_key must be a single non-empty segment, not all digits")]
    InvalidRootKey,

    #[error("no exporter configured (set [exporter] or REDIS_URL)")]
    MissingExporter,

    #[error("redis exporter requires a url")]
    MissingRedisUrl,

    #[error("file exporter requires a path")]
    MissingFilePath,

    #[error("file exporter indent must be at least 1")]
    ZeroIndent,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &KoblingConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }

    let mut seen = HashSet::new();
    for (index, server) in config.servers.iter().enumerate() {
        if server.name.trim().is_empty() {
            errors.push(ValidationError::EmptyServerName { index });
            continue;
        }
        if server.name.contains('/') || is_numeric(&server.name) {
            errors.push(ValidationError::InvalidServerName(server.name.clone()));
        }
        if !seen.insert(server.name.as_str()) {
            errors.push(ValidationError::DuplicateServer(server.name.clone()));
        }

        for (field, value) in [
            ("api_address", &server.api_address),
            ("destination_address", &server.destination_address),
        ] {
            if !is_http_url(value) {
                errors.push(ValidationError::InvalidUrl {
                    server: server.name.clone(),
                    field,
                    value: value.clone(),
                });
            }
        }

        if server
            .entry_points
            .iter()
            .any(|(global, local)| global.trim().is_empty() || local.trim().is_empty())
        {
            errors.push(ValidationError::EmptyEntryPoint(server.name.clone()));
        }
    }

    if config.run_every == 0 {
        errors.push(ValidationError::ZeroInterval);
    }

    if config.root_key.trim().is_empty()
        || config.root_key.contains('/')
        || is_numeric(&config.root_key)
    {
        errors.push(ValidationError::InvalidRootKey);
    }

    match &config.exporter {
        None => errors.push(ValidationError::MissingExporter),
        Some(ExporterConfig::Redis { url }) if url.trim().is_empty() => {
            errors.push(ValidationError::MissingRedisUrl)
        }
        Some(ExporterConfig::File { path, indent }) => {
            if path.trim().is_empty() {
                errors.push(ValidationError::MissingFilePath);
            }
            if *indent == 0 {
                errors.push(ValidationError::ZeroIndent);
            }
        }
        Some(ExporterConfig::Redis { .. }) => {}
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Numeric segments read as sequence slots in the file document.
fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServerConfig;
    use std::collections::BTreeMap;

    fn server(name: &str) -> ServerConfig {
        ServerConfig {
            name: name.into(),
            api_address: "http://localhost:8080".into(),
            api_host: None,
            destination_address: "http://10.0.0.1".into(),
            entry_points: BTreeMap::from([("web".into(), "web".into())]),
            forward_middlewares: None,
            forward_services: None,
        }
    }

    fn valid() -> KoblingConfig {
        KoblingConfig {
            servers: vec![server("a"), server("b")],
            exporter: Some(ExporterConfig::Redis { url: "redis://localhost".into() }),
            ..KoblingConfig::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_no_servers_and_no_exporter() {
        let errors = validate_config(&KoblingConfig::default()).unwrap_err();
        assert!(errors.contains(&ValidationError::NoServers));
        assert!(errors.contains(&ValidationError::MissingExporter));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.servers.push(server("a"));
        config.servers[1].destination_address = "not a url".into();
        config.servers[1].api_address = "ftp://host".into();
        config.run_every = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::DuplicateServer("a".into())));
        assert!(errors.contains(&ValidationError::ZeroInterval));
    }

    #[test]
    fn test_server_name_is_a_key_segment() {
        let mut config = valid();
        config.servers[0].name = "a/b".into();
        config.servers[1].name = " ".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidServerName("a/b".into())));
        assert!(errors.contains(&ValidationError::EmptyServerName { index: 1 }));
    }

    #[test]
    fn test_numeric_names_rejected() {
        let mut config = valid();
        config.servers[0].name = "007".into();
        config.servers[1].name = "7b".into();
        config.root_key = "1".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidServerName("007".into()),
                ValidationError::InvalidRootKey,
            ]
        );
    }

    #[test]
    fn test_file_exporter_parameters() {
        let mut config = valid();
        config.exporter = Some(ExporterConfig::File { path: "".into(), indent: 0 });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingFilePath, ValidationError::ZeroIndent]);
    }
}
