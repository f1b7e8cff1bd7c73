//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{ExporterConfig, KoblingConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Values that take precedence over the file (environment or command line).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Publish to this Redis instance instead of the configured exporter.
    pub redis_url: Option<String>,
    /// Poll interval in seconds.
    pub run_every: Option<u64>,
}

impl Overrides {
    pub fn apply(&self, config: &mut KoblingConfig) {
        if let Some(url) = &self.redis_url {
            config.exporter = Some(ExporterConfig::Redis { url: url.clone() });
        }
        if let Some(run_every) = self.run_every {
            config.run_every = run_every;
        }
    }
}

/// Parse, override and validate configuration text.
pub fn parse_config(content: &str, overrides: &Overrides) -> Result<KoblingConfig, ConfigError> {
    let mut config: KoblingConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path, overrides: &Overrides) -> Result<KoblingConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content, overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
        [[servers]]
        name = "a"
        api_address = "http://localhost:8080"
        destination_address = "http://10.0.0.1"
    "#;

    #[test]
    fn test_missing_exporter_is_fatal() {
        let err = parse_config(BASE, &Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e == &vec![ValidationError::MissingExporter]));
        assert!(err.to_string().contains("no exporter configured"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let overrides = Overrides {
            redis_url: Some("redis://cache:6379".into()),
            run_every: Some(5),
        };
        let config = parse_config(BASE, &overrides).unwrap();
        assert_eq!(config.run_every, 5);
        assert_eq!(
            config.exporter,
            Some(ExporterConfig::Redis { url: "redis://cache:6379".into() })
        );
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("servers = 3", &Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let content = format!("{BASE}\n[exporter]\ntype = \"file\"\npath = \"/tmp/out.yml\"\n");
        std::fs::write(&path, content).unwrap();

        let config = load_config(&path, &Overrides::default()).unwrap();
        assert_eq!(config.servers.len(), 1);

        let missing = load_config(&dir.path().join("nope.toml"), &Overrides::default());
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
