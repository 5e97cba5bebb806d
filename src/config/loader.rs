//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::config::validation::{validate_config, ConfigIssue};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_issues(.0))]
    Validation(Vec<ConfigIssue>),
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<RouterConfig, ConfigError> {
    let config: RouterConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Read configuration from a TOML file without semantic checks.
pub fn read_config(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_dir = \"routes\"\napi_base_path = \"/v1\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.api_dir, Path::new("routes"));
        assert_eq!(config.api_base_path, "/v1");
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            load_config(Path::new("/no/such/file.toml")),
            Err(ConfigError::Io(_))
        ));
        assert!(matches!(parse_config("api_dir = ["), Err(ConfigError::Parse(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_body_bytes = 0").unwrap();
        assert_eq!(read_config(file.path()).unwrap().max_body_bytes, 0);
        assert!(matches!(load_config(file.path()), Err(ConfigError::Validation(_))));

        let err = parse_config("max_body_bytes = 0").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed: max_body_bytes: must be greater than 0"
        );
    }
}
