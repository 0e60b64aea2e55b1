// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - SQL Injection Probe
 * Error-based detection over a fixed ordered payload list
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

use super::catalog::{class_of, match_sql_error};
use crate::http_client::{with_query_param, HttpClient};
use crate::proxy::ProxyRecord;
use crate::types::{Finding, FindingType};

pub const SQLI_PARAMETER: &str = "id";

pub const SQLI_PAYLOADS: &[&str] = &[
    "'",
    "\"",
    "' OR '1'='1",
    "' OR 1=1--",
    "1' AND '1'='2",
    "1 AND 1=CONVERT(int, @@version)--",
];

pub struct SqliScanner {
    http_client: Arc<HttpClient>,
}

impl SqliScanner {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self { http_client }
    }

    /// One GET per payload in `id`; a database error signature in the body is
    /// a CRITICAL finding. Failed requests are skipped, never retried.
    pub async fn probe(&self, base_url: &str, proxy: Option<&ProxyRecord>) -> Vec<Finding> {
        debug!("[SQLi] Testing {} payloads against {}", SQLI_PAYLOADS.len(), base_url);

        // requests own their proxy and URL; the probe future must be Send
        let requests = SQLI_PAYLOADS.iter().copied().map(|payload| {
            let test_url = with_query_param(base_url, SQLI_PARAMETER, payload);
            let client = Arc::clone(&self.http_client);
            let proxy = proxy.cloned();
            async move {
                match client.get_via(&test_url, proxy.as_ref()).await {
                    Ok(response) => Some((payload, test_url, response)),
                    Err(e) => {
                        debug!("[SQLi] Request failed for payload {:?}: {:#}", payload, e);
                        None
                    }
                }
            }
        });
        let responses = join_all(requests).await;

        let class = class_of(FindingType::SqlInjection);
        let mut findings = Vec::new();

        for (payload, test_url, response) in responses.into_iter().flatten() {
            if let Some(database) = match_sql_error(&response.body) {
                info!(
                    "[SQLi] {} error signature for payload {:?} on {}",
                    database, payload, base_url
                );
                findings.push(Finding::new(
                    FindingType::SqlInjection,
                    class.severity,
                    &test_url,
                    format!(
                        "{} in parameter '{}' ({} error signature)",
                        class.title, SQLI_PARAMETER, database
                    ),
                    format!("payload: {}", payload),
                ));
            }
        }

        findings
    }
}
