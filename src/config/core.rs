// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Engine-wide tunables. Every field has a default so an empty document is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    #[serde(default)]
    #[validate]
    pub http: HttpConfig,

    #[serde(default)]
    #[validate]
    pub proxy: ProxyConfig,

    #[serde(default)]
    #[validate]
    pub scanner: ScannerConfig,

    #[serde(default)]
    #[validate]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HttpConfig {
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    #[validate(range(min = 1024))]
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    #[serde(default = "default_pool_idle")]
    pub pool_max_idle_per_host: usize,

    /// Upper bound on per-proxy clients kept alive
    #[validate(range(min = 1))]
    #[serde(default = "default_proxied_client_cache")]
    pub proxied_client_cache: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProxyConfig {
    #[validate(url)]
    #[serde(default = "default_proxy_test_url")]
    pub test_url: String,

    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_proxy_test_timeout")]
    pub test_timeout_secs: u64,

    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_refresh_concurrency")]
    pub refresh_concurrency: usize,

    /// Proxy URIs admitted at startup
    #[serde(default)]
    pub proxies: Vec<String>,

    /// Plain-text feeds listing one host:port per line
    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default)]
    pub discover_on_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScannerConfig {
    #[validate(range(min = 1, max = 86400))]
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    #[validate(url)]
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,

    #[validate(length(min = 1))]
    #[serde(default = "default_exploit_parameter")]
    pub exploit_parameter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BrowserConfig {
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_navigation_interval")]
    pub navigation_interval_secs: u64,

    #[serde(default)]
    pub chrome_path: Option<String>,

    #[serde(default)]
    pub sandbox: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            navigation_timeout_secs: default_navigation_timeout(),
            max_body_size: default_max_body_size(),
            pool_max_idle_per_host: default_pool_idle(),
            proxied_client_cache: default_proxied_client_cache(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            test_url: default_proxy_test_url(),
            test_timeout_secs: default_proxy_test_timeout(),
            refresh_concurrency: default_refresh_concurrency(),
            proxies: Vec::new(),
            sources: Vec::new(),
            discover_on_start: false,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval(),
            metadata_url: default_metadata_url(),
            exploit_parameter: default_exploit_parameter(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            navigation_interval_secs: default_navigation_interval(),
            chrome_path: None,
            sandbox: false,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn default_request_timeout() -> u64 {
    10
}

fn default_navigation_timeout() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024
}

fn default_pool_idle() -> usize {
    32
}

fn default_proxy_test_url() -> String {
    "https://httpbin.org/ip".to_string()
}

fn default_proxy_test_timeout() -> u64 {
    10
}

fn default_refresh_concurrency() -> usize {
    20
}

fn default_proxied_client_cache() -> u64 {
    256
}

fn default_scan_interval() -> u64 {
    10
}

fn default_metadata_url() -> String {
    "http://169.254.169.254/latest/meta-data/".to_string()
}

fn default_exploit_parameter() -> String {
    "url".to_string()
}

fn default_navigation_interval() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}
