// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scanner Modules
 * Passive library detection, active SQLi/XSS probes and header audit
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

pub mod catalog;
pub mod passive;
pub mod security_headers;
pub mod sqli;
pub mod xss;

pub use catalog::{exploitable_cve, match_sql_error, EXPLOITABLE_CVES, LIBRARY_CATALOG};
pub use passive::scan_body;
pub use security_headers::{audit_headers, missing_security_headers, SECURITY_HEADERS};
pub use sqli::SqliScanner;
pub use xss::XssScanner;

use std::sync::Arc;
use tracing::{debug, info};

use crate::http_client::HttpClient;
use crate::proxy::ProxyRecord;
use crate::types::Finding;

/// Runs every probe family against one target
pub struct ScanEngine {
    http_client: Arc<HttpClient>,
    sqli: SqliScanner,
    xss: XssScanner,
}

impl ScanEngine {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self {
            sqli: SqliScanner::new(Arc::clone(&http_client)),
            xss: XssScanner::new(Arc::clone(&http_client)),
            http_client,
        }
    }

    /// Fetch the page for passive checks, then run the active probes.
    /// Findings come back passive first, then SQLi, then XSS.
    pub async fn scan_target(&self, url: &str, proxy: Option<&ProxyRecord>) -> Vec<Finding> {
        let mut findings = Vec::new();

        match self.http_client.get_via(url, proxy).await {
            Ok(page) => {
                findings.extend(scan_body(&page.body, url));
                if let Some(finding) = audit_headers(&page.headers, url) {
                    findings.push(finding);
                }
            }
            Err(e) => debug!("[Scan] Failed to fetch {} for passive checks: {:#}", url, e),
        }

        findings.extend(self.sqli.probe(url, proxy).await);
        findings.extend(self.xss.probe(url, proxy).await);

        info!("[Scan] Cycle against {} produced {} findings", url, findings.len());
        findings
    }
}
