// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Engine Error Types
 * Error taxonomy for runs, proxies, probes and persistence
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use thiserror::Error;

/// Main engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    /// Per-request network or timeout failure. Recorded, never fatal.
    #[error("Transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// Request exceeded its bounded timeout
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// Pool is empty or every record is unhealthy
    #[error("No proxy available: {0}")]
    ProxyUnavailable(String),

    /// A single browser session could not be started
    #[error("Browser launch failed for session {session}: {reason}")]
    BrowserLaunch { session: usize, reason: String },

    /// Run configuration rejected before any run was created
    #[error("Invalid run configuration: {}", .violations.join("; "))]
    ConfigValidation { violations: Vec<String> },

    /// Engine configuration file could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Surfaced by the persistence collaborator
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid proxy URI '{uri}': {reason}")]
    InvalidProxyUri { uri: String, reason: String },

    #[error("Run not found: {0}")]
    RunNotFound(String),
}

impl EngineError {
    pub fn invalid_proxy(uri: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidProxyUri {
            uri: uri.to_string(),
            reason: reason.into(),
        }
    }

    /// Convert a fetch failure into the transport taxonomy
    pub fn from_fetch(url: &str, err: &anyhow::Error) -> Self {
        if let Some(req_err) = err.downcast_ref::<reqwest::Error>() {
            if req_err.is_timeout() {
                return EngineError::Timeout {
                    url: url.to_string(),
                };
            }
        }
        EngineError::Transport {
            url: url.to_string(),
            reason: format!("{:#}", err),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
