// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Headless browser navigation sessions
//! Each session loads the target through its own proxy and feeds every
//! observed response into the security header audit.

use anyhow::{Context, Result};
use headless_chrome::protocol::cdp::Network::events::ResponseReceivedEventParams;
use headless_chrome::protocol::cdp::Network::GetResponseBodyReturnObject;
use headless_chrome::{Browser, LaunchOptions, Tab};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{BrowserConfig, HttpConfig};
use crate::errors::EngineError;
use crate::http_client::random_user_agent;
use crate::proxy::{ProxyPool, ProxyRecord};
use crate::results::{Outcome, SharedResults};
use crate::scanners::audit_headers;
use crate::types::Finding;

const RESPONSE_HANDLER: &str = "swarmscan-header-audit";

/// A network response seen by the browser during one navigation
#[derive(Debug, Clone)]
pub struct ObservedResponse {
    pub url: String,
    pub headers: HashMap<String, String>,
}

impl ObservedResponse {
    fn from_event(params: &ResponseReceivedEventParams) -> Self {
        let headers = serde_json::to_value(&params.response.headers)
            .map(headers_from_value)
            .unwrap_or_default();
        Self {
            url: params.response.url.clone(),
            headers,
        }
    }
}

/// Flatten a CDP header object into name/value pairs
pub fn headers_from_value(value: serde_json::Value) -> HashMap<String, String> {
    match value {
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (name, value)
            })
            .collect(),
        _ => HashMap::new(),
    }
}

/// Header audit over every response of one navigation
pub fn audit_observed(responses: &[ObservedResponse]) -> Vec<Finding> {
    responses
        .iter()
        .filter_map(|response| audit_headers(&response.headers, &response.url))
        .collect()
}

/// Session launch settings shared by every browser of a run
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub chrome_path: Option<PathBuf>,
    pub sandbox: bool,
    pub navigation_interval: Duration,
    pub navigation_timeout: Duration,
}

impl BrowserSettings {
    pub fn new(browser: &BrowserConfig, http: &HttpConfig) -> Self {
        Self {
            chrome_path: browser.chrome_path.as_ref().map(PathBuf::from),
            sandbox: browser.sandbox,
            navigation_interval: Duration::from_secs(browser.navigation_interval_secs),
            navigation_timeout: Duration::from_secs(http.navigation_timeout_secs),
        }
    }
}

/// One live browser with a single tab
struct Session {
    index: usize,
    _browser: Browser,
    tab: Arc<Tab>,
    observed: Arc<Mutex<Vec<ObservedResponse>>>,
}

impl Session {
    fn launch(
        index: usize,
        proxy: Option<&ProxyRecord>,
        user_agent: &str,
        settings: &BrowserSettings,
    ) -> Result<Self> {
        let proxy_server = proxy.map(|p| p.endpoint());

        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(settings.sandbox)
            .path(settings.chrome_path.clone())
            .proxy_server(proxy_server.as_deref())
            .idle_browser_timeout(settings.navigation_interval + settings.navigation_timeout * 2)
            .build()
            .map_err(|e| anyhow::anyhow!("Browser launch options error: {}", e))?;

        let browser = Browser::new(options).context("Failed to launch Chrome/Chromium")?;
        let tab = browser.new_tab().context("Failed to create new tab")?;
        tab.set_default_timeout(settings.navigation_timeout);

        if let Some(creds) = proxy.and_then(|p| p.credentials.as_ref()) {
            tab.enable_fetch(None, Some(true))
                .context("Failed to enable request interception")?;
            tab.authenticate(Some(creds.username.clone()), Some(creds.password.clone()))
                .context("Failed to register proxy credentials")?;
        }

        tab.set_user_agent(user_agent, Some("en-US,en;q=0.9"), None)
            .context("Failed to set user agent")?;

        let observed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&observed);
        tab.register_response_handling(
            RESPONSE_HANDLER,
            Box::new(
                move |params: ResponseReceivedEventParams,
                      _body: &dyn Fn() -> Result<GetResponseBodyReturnObject>| {
                    sink.lock().push(ObservedResponse::from_event(&params));
                },
            ),
        )
        .context("Failed to register response handler")?;

        Ok(Self {
            index,
            _browser: browser,
            tab,
            observed,
        })
    }

    /// Load the page and return every response observed while loading
    fn navigate(&self, url: &str) -> Result<Vec<ObservedResponse>> {
        self.observed.lock().clear();
        self.tab.navigate_to(url).context("Failed to navigate to URL")?;
        self.tab.wait_until_navigated().context("Navigation timeout")?;
        Ok(std::mem::take(&mut *self.observed.lock()))
    }

    fn close(&self) {
        if let Err(e) = self.tab.close(false) {
            warn!("[Browser] Session {} failed to close tab: {}", self.index, e);
        } else {
            debug!("[Browser] Session {} closed", self.index);
        }
    }
}

/// Releases the session when its loop ends or is aborted
struct SessionGuard(Arc<Session>);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let session = Arc::clone(&self.0);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || session.close());
            }
            Err(_) => session.close(),
        }
    }
}

#[derive(Clone)]
pub struct BrowserWorker {
    pool: Arc<ProxyPool>,
    results: Arc<SharedResults>,
    target_url: String,
    settings: BrowserSettings,
}

impl BrowserWorker {
    pub fn new(
        pool: Arc<ProxyPool>,
        results: Arc<SharedResults>,
        target_url: impl Into<String>,
        settings: BrowserSettings,
    ) -> Self {
        Self {
            pool,
            results,
            target_url: target_url.into(),
            settings,
        }
    }

    pub fn spawn(&self, instances: u32) -> Vec<JoinHandle<()>> {
        info!(
            "[Browser] Starting {} sessions against {}",
            instances, self.target_url
        );
        (0..instances as usize)
            .map(|index| {
                let worker = self.clone();
                tokio::spawn(async move { worker.run_session(index).await })
            })
            .collect()
    }

    async fn run_session(self, index: usize) {
        let proxy = self.pool.select_random().await;
        let proxy_id = proxy.as_ref().map(|p| p.id());
        let user_agent = random_user_agent();
        let settings = self.settings.clone();

        let launched = tokio::task::spawn_blocking(move || {
            Session::launch(index, proxy.as_ref(), user_agent, &settings)
        })
        .await
        .map_err(anyhow::Error::from)
        .and_then(|r| r);

        let session = match launched {
            Ok(session) => SessionGuard(Arc::new(session)),
            Err(e) => {
                let err = EngineError::BrowserLaunch {
                    session: index,
                    reason: format!("{:#}", e),
                };
                warn!("[Browser] {}", err);
                self.results.add_error(err.to_string(), proxy_id);
                return;
            }
        };

        info!(
            "[Browser] Session {} ready via {}",
            index,
            proxy_id.as_deref().unwrap_or("direct")
        );

        let mut ticker = interval(self.settings.navigation_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let tab_session = Arc::clone(&session.0);
            let url = self.target_url.clone();
            let started = Instant::now();
            let navigated = tokio::task::spawn_blocking(move || tab_session.navigate(&url))
                .await
                .map_err(anyhow::Error::from)
                .and_then(|r| r);
            let latency_ms = started.elapsed().as_millis() as u64;

            let (outcome, observed) = match navigated {
                Ok(observed) => (Outcome::Success, observed),
                Err(e) => {
                    debug!("[Browser] Session {} navigation failed: {:#}", index, e);
                    (
                        Outcome::Failure(format!("Navigation to {} failed: {:#}", self.target_url, e)),
                        Vec::new(),
                    )
                }
            };

            if !self.results.record_request(latency_ms, outcome, proxy_id.clone()) {
                break;
            }
            for finding in audit_observed(&observed) {
                self.results.add_finding(finding);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_handler_accepts_network_events() {
        fn convert(params: &ResponseReceivedEventParams) -> ObservedResponse {
            ObservedResponse::from_event(params)
        }
        let handler: fn(&ResponseReceivedEventParams) -> ObservedResponse = convert;
        assert!(std::mem::size_of_val(&handler) > 0);
    }

    #[test]
    fn test_headers_from_cdp_object() {
        let headers = headers_from_value(json!({
            "content-type": "text/html",
            "x-frame-options": "DENY",
            "content-length": 42
        }));
        assert_eq!(headers.get("x-frame-options").map(String::as_str), Some("DENY"));
        assert_eq!(headers.get("content-length").map(String::as_str), Some("42"));
        assert!(headers_from_value(serde_json::Value::Null).is_empty());
    }

    #[test]
    fn test_every_observed_response_is_audited() {
        let mut hardened = HashMap::new();
        for header in crate::scanners::SECURITY_HEADERS {
            hardened.insert(header.to_ascii_lowercase(), "set".to_string());
        }

        let observed = vec![
            ObservedResponse {
                url: "http://t.test/".to_string(),
                headers: HashMap::new(),
            },
            ObservedResponse {
                url: "http://t.test/app.js".to_string(),
                headers: hardened,
            },
            ObservedResponse {
                url: "http://t.test/style.css".to_string(),
                headers: HashMap::new(),
            },
        ];

        let findings = audit_observed(&observed);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].url, "http://t.test/");
        assert_eq!(findings[1].url, "http://t.test/style.css");
    }
}
