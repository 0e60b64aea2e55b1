// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use validator::Validate;

use super::core::EngineConfig;
use crate::errors::EngineError;
use crate::types::RunConfig;

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate_engine_config(config: &EngineConfig) -> Result<()> {
        config
            .validate()
            .context("Configuration validation failed")?;

        Self::validate_observability(config)?;

        Ok(())
    }

    fn validate_observability(config: &EngineConfig) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.observability.log_level.to_lowercase().as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                config.observability.log_level,
                valid_log_levels
            ));
        }
        Ok(())
    }

    /// Reject a run configuration before anything is created.
    /// Every violated field is reported, not only the first.
    pub fn validate_run_config(config: &RunConfig) -> Result<(), EngineError> {
        let mut violations = Vec::new();

        let target = config.target_url.trim();
        if target.is_empty() {
            violations.push("targetUrl must not be empty".to_string());
        } else {
            match url::Url::parse(target) {
                Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
                Ok(parsed) => violations.push(format!(
                    "targetUrl scheme must be http or https, got {}",
                    parsed.scheme()
                )),
                Err(e) => violations.push(format!("targetUrl is not a valid URL: {}", e)),
            }
        }

        if config.requests_per_second < 1 {
            violations.push("requestsPerSecond must be >= 1".to_string());
        }

        if config.duration_seconds < 1 {
            violations.push("durationSeconds must be >= 1".to_string());
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(EngineError::ConfigValidation { violations })
        }
    }
}
