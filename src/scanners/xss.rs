// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

use super::catalog::class_of;
use crate::http_client::{with_query_param, HttpClient};
use crate::proxy::ProxyRecord;
use crate::types::{Finding, FindingType};

pub const XSS_PARAMETER: &str = "search";

pub const XSS_PAYLOADS: &[&str] = &[
    "<script>alert('xss')</script>",
    "\"><img src=x onerror=alert(1)>",
    "<svg/onload=alert(1)>",
    "'><body onload=alert(1)>",
];

/// Raw payload reflected verbatim, not HTML-escaped
pub fn is_reflected(body: &str, payload: &str) -> bool {
    body.contains(payload)
}

pub struct XssScanner {
    http_client: Arc<HttpClient>,
}

impl XssScanner {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self { http_client }
    }

    pub async fn probe(&self, base_url: &str, proxy: Option<&ProxyRecord>) -> Vec<Finding> {
        debug!("[XSS] Testing {} payloads against {}", XSS_PAYLOADS.len(), base_url);

        // requests own their proxy and URL; the probe future must be Send
        let requests = XSS_PAYLOADS.iter().copied().map(|payload| {
            let test_url = with_query_param(base_url, XSS_PARAMETER, payload);
            let client = Arc::clone(&self.http_client);
            let proxy = proxy.cloned();
            async move {
                match client.get_via(&test_url, proxy.as_ref()).await {
                    Ok(response) => Some((payload, test_url, response)),
                    Err(e) => {
                        debug!("[XSS] Request failed for payload {:?}: {:#}", payload, e);
                        None
                    }
                }
            }
        });
        let responses = join_all(requests).await;

        let class = class_of(FindingType::Xss);

        responses
            .into_iter()
            .flatten()
            .filter(|(payload, _, response)| is_reflected(&response.body, payload))
            .map(|(payload, test_url, _)| {
                info!("[XSS] Payload {:?} reflected on {}", payload, base_url);
                Finding::new(
                    FindingType::Xss,
                    class.severity,
                    &test_url,
                    format!("{} via parameter '{}'", class.title, XSS_PARAMETER),
                    format!("payload: {}", payload),
                )
            })
            .collect()
    }
}
