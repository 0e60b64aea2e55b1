// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::core::EngineConfig;
use super::validation::ConfigValidator;
use crate::errors::EngineError;

pub struct ConfigLoader {
    config_path: PathBuf,
    format: ConfigFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref().to_path_buf();
        let format = Self::detect_format(&path)?;

        Ok(Self {
            config_path: path,
            format,
        })
    }

    pub fn with_format<P: AsRef<Path>>(config_path: P, format: ConfigFormat) -> Result<Self> {
        Ok(Self {
            config_path: config_path.as_ref().to_path_buf(),
            format,
        })
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| anyhow::anyhow!("Could not determine config file format"))?;

        match extension {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(anyhow::anyhow!("Unsupported config file format: {}", extension)),
        }
    }

    pub fn load_config(&self) -> Result<EngineConfig> {
        let content = std::fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file: {:?}", self.config_path))?;

        let mut config = Self::parse(&content, self.format)?;

        apply_env_overrides(&mut config)?;

        ConfigValidator::validate_engine_config(&config)?;

        Ok(config)
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<EngineConfig> {
        let config: EngineConfig = match format {
            ConfigFormat::Yaml => {
                if content.trim().is_empty() {
                    EngineConfig::default()
                } else {
                    serde_yaml::from_str(content).context("Failed to parse YAML config")?
                }
            }
            ConfigFormat::Toml => toml::from_str(content).context("Failed to parse TOML config")?,
            ConfigFormat::Json => {
                serde_json::from_str(content).context("Failed to parse JSON config")?
            }
        };
        Ok(config)
    }
}

/// Defaults plus environment overrides, for running without a config file
pub fn load_from_env() -> Result<EngineConfig> {
    let mut config = EngineConfig::default();
    apply_env_overrides(&mut config)?;
    ConfigValidator::validate_engine_config(&config)?;
    Ok(config)
}

/// Load from `path` when given, otherwise from defaults and environment.
/// Any failure surfaces as `EngineError::Config`.
pub fn load_engine_config(path: Option<&Path>) -> std::result::Result<EngineConfig, EngineError> {
    let loaded = match path {
        Some(path) => ConfigLoader::new(path).and_then(|loader| loader.load_config()),
        None => load_from_env(),
    };
    loaded.map_err(|e| EngineError::Config(format!("{:#}", e)))
}

fn apply_env_overrides(config: &mut EngineConfig) -> Result<()> {
    if let Ok(log_level) = std::env::var("SWARMSCAN_LOG_LEVEL") {
        config.observability.log_level = log_level;
    }

    if let Ok(test_url) = std::env::var("SWARMSCAN_PROXY_TEST_URL") {
        config.proxy.test_url = test_url;
    }

    if let Ok(interval) = std::env::var("SWARMSCAN_SCAN_INTERVAL_SECS") {
        config.scanner.scan_interval_secs = interval
            .parse()
            .context("Invalid SWARMSCAN_SCAN_INTERVAL_SECS")?;
    }

    if let Ok(timeout) = std::env::var("SWARMSCAN_REQUEST_TIMEOUT_SECS") {
        config.http.request_timeout_secs = timeout
            .parse()
            .context("Invalid SWARMSCAN_REQUEST_TIMEOUT_SECS")?;
    }

    if let Ok(chrome_path) = std::env::var("SWARMSCAN_CHROME_PATH") {
        config.browser.chrome_path = Some(chrome_path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::core::LogFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_failures_map_to_config_error() {
        let missing = load_engine_config(Some(Path::new("/nonexistent/swarmscan.yaml")));
        match missing {
            Err(EngineError::Config(reason)) => assert!(reason.contains("Failed to read config file")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }

        assert!(matches!(
            load_engine_config(Some(Path::new("swarmscan.ini"))),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            ConfigLoader::detect_format(Path::new("config.yaml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigLoader::detect_format(Path::new("config.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigLoader::detect_format(Path::new("config.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigLoader::detect_format(Path::new("config.ini")).is_err());
    }

    #[test]
    fn test_load_yaml_config() -> Result<()> {
        let yaml_content = r#"
http:
  request_timeout_secs: 5
proxy:
  test_timeout_secs: 3
  refresh_concurrency: 8
  proxies:
    - "socks5://127.0.0.1:9050"
scanner:
  scan_interval_secs: 30
observability:
  log_format: json
"#;

        let mut temp_file = NamedTempFile::new()?;
        temp_file.write_all(yaml_content.as_bytes())?;
        temp_file.flush()?;

        let loader = ConfigLoader::with_format(temp_file.path(), ConfigFormat::Yaml)?;
        let config = loader.load_config()?;

        assert_eq!(config.http.request_timeout_secs, 5);
        assert_eq!(config.proxy.refresh_concurrency, 8);
        assert_eq!(config.proxy.proxies.len(), 1);
        assert_eq!(config.scanner.scan_interval_secs, 30);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        // untouched sections keep their defaults
        assert_eq!(config.browser.navigation_interval_secs, 5);

        Ok(())
    }

    #[test]
    fn test_parse_toml_and_empty_yaml() -> Result<()> {
        let toml_content = r#"
[scanner]
scan_interval_secs = 15
metadata_url = "http://metadata.google.internal/computeMetadata/v1/"
"#;
        let config = ConfigLoader::parse(toml_content, ConfigFormat::Toml)?;
        assert_eq!(config.scanner.scan_interval_secs, 15);
        assert!(config.scanner.metadata_url.contains("metadata.google.internal"));

        let config = ConfigLoader::parse("", ConfigFormat::Yaml)?;
        assert_eq!(config.scanner.scan_interval_secs, 10);
        Ok(())
    }

    #[test]
    fn test_invalid_config_rejected() {
        let json_content = r#"{ "http": { "request_timeout_secs": 0 } }"#;
        let config = ConfigLoader::parse(json_content, ConfigFormat::Json).unwrap();
        assert!(ConfigValidator::validate_engine_config(&config).is_err());
    }
}
