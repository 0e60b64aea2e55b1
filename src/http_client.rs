// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use moka::sync::Cache;
use rand::seq::SliceRandom;
use reqwest::Client;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::HttpConfig;
use crate::proxy::ProxyRecord;

/// Realistic browser User-Agents
const BROWSER_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Chrome on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    // Firefox on Linux
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    // Safari on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    // Safari on iPhone
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
    // Edge on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Pick a random realistic browser User-Agent
pub fn random_user_agent() -> &'static str {
    BROWSER_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(BROWSER_USER_AGENTS[0])
}

/// Headers a desktop browser sends on a top-level navigation
pub fn browser_headers() -> Vec<(String, String)> {
    vec![
        ("User-Agent".to_string(), random_user_agent().to_string()),
        (
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
                .to_string(),
        ),
        ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
        ("Cache-Control".to_string(), "no-cache".to_string()),
        ("Upgrade-Insecure-Requests".to_string(), "1".to_string()),
    ]
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
    pub duration_ms: u64,
}

impl HttpResponse {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn is_success(&self) -> bool {
        self.status_code < 400
    }
}

/// HTTP fetcher. Direct requests share one pooled client; proxied requests
/// use one client per egress record, built lazily and cached.
#[derive(Clone)]
pub struct HttpClient {
    direct: Client,
    proxied: Cache<String, Client>,
    timeout: Duration,
    max_body_size: usize,
    pool_idle: usize,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        Self::with_config(&HttpConfig {
            request_timeout_secs: timeout_secs,
            ..HttpConfig::default()
        })
    }

    pub fn with_config(config: &HttpConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let direct = Self::builder(timeout, config.pool_max_idle_per_host)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            direct,
            proxied: Cache::builder().max_capacity(config.proxied_client_cache).build(),
            timeout,
            max_body_size: config.max_body_size,
            pool_idle: config.pool_max_idle_per_host,
        })
    }

    fn builder(timeout: Duration, pool_idle: usize) -> reqwest::ClientBuilder {
        // ACCEPT_INVALID_CERTS=true is for self-signed lab targets only
        let accept_invalid_certs = std::env::var("ACCEPT_INVALID_CERTS")
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .redirect(reqwest::redirect::Policy::limited(5))
            .pool_max_idle_per_host(pool_idle)
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
    }

    fn client_for(&self, proxy: Option<&ProxyRecord>) -> Result<Client> {
        let proxy = match proxy {
            Some(p) => p,
            None => return Ok(self.direct.clone()),
        };

        let key = proxy.to_url();
        if let Some(client) = self.proxied.get(&key) {
            return Ok(client);
        }

        // credentials travel in the URI userinfo for every scheme
        let egress = reqwest::Proxy::all(key.as_str())
            .with_context(|| format!("Invalid proxy endpoint {}", proxy.id()))?;

        let client = Self::builder(self.timeout, self.pool_idle)
            .proxy(egress)
            .build()
            .with_context(|| format!("Failed to create client for proxy {}", proxy.id()))?;

        self.proxied.insert(key, client.clone());
        Ok(client)
    }

    /// Direct GET
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.fetch(url, None, Vec::new(), None).await
    }

    /// GET through an optional proxy
    pub async fn get_via(&self, url: &str, proxy: Option<&ProxyRecord>) -> Result<HttpResponse> {
        self.fetch(url, proxy, Vec::new(), None).await
    }

    /// GET through an optional proxy with extra headers and a per-request timeout
    pub async fn fetch(
        &self,
        url: &str,
        proxy: Option<&ProxyRecord>,
        headers: Vec<(String, String)>,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse> {
        let client = self.client_for(proxy)?;

        let mut request = client.get(url);
        for (key, value) in headers {
            request = request.header(key, value);
        }
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let started = Instant::now();
        let response = request
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status_code = response.status().as_u16();

        let headers_map = {
            let headers = response.headers();
            let mut map = HashMap::with_capacity(headers.len());
            for (k, v) in headers.iter() {
                if let Ok(value_str) = v.to_str() {
                    map.insert(k.as_str().to_string(), value_str.to_string());
                }
            }
            map
        };

        let body_bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read body from {}", url))?;
        let body = if body_bytes.len() > self.max_body_size {
            String::from_utf8_lossy(&body_bytes[..self.max_body_size]).to_string()
        } else {
            String::from_utf8_lossy(&body_bytes).to_string()
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        debug!("GET {} -> {} in {}ms", url, status_code, duration_ms);

        Ok(HttpResponse {
            status_code,
            body,
            headers: headers_map,
            duration_ms,
        })
    }
}

/// Append a query parameter, keeping any existing query string
pub fn with_query_param(base_url: &str, param: &str, value: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}{}={}",
        base_url,
        separator,
        param,
        urlencoding::encode(value)
    )
}
