// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Proxy Pool
 * Egress records with health scoring, random and round-robin selection
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use chrono::Utc;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::record::{parse_proxy_uri, ProxyRecord};
use crate::config::ProxyConfig;
use crate::errors::EngineError;
use crate::http_client::HttpClient;

/// Result of a single probe through a proxy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    pub healthy: bool,
    pub response_time_ms: u64,
}

pub struct ProxyPool {
    records: RwLock<Vec<ProxyRecord>>,
    cursor: AtomicUsize,
    http: Arc<HttpClient>,
    test_url: String,
    test_timeout: Duration,
    refresh_concurrency: usize,
}

impl ProxyPool {
    pub fn new(http: Arc<HttpClient>, config: &ProxyConfig) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            cursor: AtomicUsize::new(0),
            http,
            test_url: config.test_url.clone(),
            test_timeout: Duration::from_secs(config.test_timeout_secs),
            refresh_concurrency: config.refresh_concurrency.max(1),
        }
    }

    /// Upsert by (host, port). Returns true when a new record was inserted.
    /// An existing record keeps its health and first-seen time.
    pub fn add(&self, record: ProxyRecord) -> bool {
        let mut records = self.records.write();
        if let Some(existing) = records.iter_mut().find(|r| r.same_identity(&record)) {
            existing.protocol = record.protocol;
            if record.credentials.is_some() {
                existing.credentials = record.credentials;
            }
            existing.source = record.source;
            if record.health.last_tested_at.is_some() {
                existing.health = record.health;
            }
            debug!("[ProxyPool] Merged {}", existing.id());
            false
        } else {
            debug!("[ProxyPool] Added {}", record.id());
            records.push(record);
            true
        }
    }

    /// Parse and admit a URI; an invalid URI leaves the pool untouched
    pub fn add_uri(&self, uri: &str) -> Result<bool, EngineError> {
        let record = parse_proxy_uri(uri)?.with_source("config");
        Ok(self.add(record))
    }

    /// Admit every valid URI, logging and skipping the rest
    pub fn add_uris(&self, uris: &[String]) -> usize {
        let mut admitted = 0;
        for uri in uris {
            match self.add_uri(uri) {
                Ok(_) => admitted += 1,
                Err(e) => warn!("[ProxyPool] Skipping proxy: {}", e),
            }
        }
        admitted
    }

    /// Remove by `host:port`; no-op if absent
    pub fn remove(&self, id: &str) -> Option<ProxyRecord> {
        let mut records = self.records.write();
        let index = records.iter().position(|r| r.id().eq_ignore_ascii_case(id))?;
        Some(records.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<ProxyRecord> {
        self.records
            .read()
            .iter()
            .find(|r| r.id().eq_ignore_ascii_case(id))
            .cloned()
    }

    pub fn list(&self) -> Vec<ProxyRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    pub(crate) fn refresh_fan_out(&self) -> usize {
        self.refresh_concurrency
    }

    pub(crate) fn http_client(&self) -> &HttpClient {
        &self.http
    }

    /// One bounded-timeout request through the proxy to the stable test endpoint
    pub async fn probe(&self, record: &ProxyRecord) -> ProbeOutcome {
        match self
            .http
            .fetch(&self.test_url, Some(record), Vec::new(), Some(self.test_timeout))
            .await
        {
            Ok(response) if response.is_success() => ProbeOutcome {
                healthy: true,
                response_time_ms: response.duration_ms,
            },
            Ok(response) => {
                debug!(
                    "[ProxyPool] {} answered probe with HTTP {}",
                    record.id(),
                    response.status_code
                );
                ProbeOutcome {
                    healthy: false,
                    response_time_ms: 0,
                }
            }
            Err(e) => {
                debug!("[ProxyPool] Probe through {} failed: {:#}", record.id(), e);
                ProbeOutcome {
                    healthy: false,
                    response_time_ms: 0,
                }
            }
        }
    }

    /// Test a single record. Success resets the score to a fresh baseline of 1;
    /// failure only stamps the test time. The stored copy is updated too.
    pub async fn test_one(&self, record: &mut ProxyRecord) -> bool {
        let outcome = self.probe(record).await;

        record.health.last_tested_at = Some(Utc::now());
        if outcome.healthy {
            record.health.response_time_ms = outcome.response_time_ms;
            record.health.success_rate = 1.0;
        }

        let mut records = self.records.write();
        if let Some(stored) = records.iter_mut().find(|r| r.same_identity(record)) {
            stored.health = record.health.clone();
        }

        outcome.healthy
    }

    /// Run `test_one` on every record with bounded fan-out, then nudge each
    /// score by ±0.1. A healthy record therefore ends at 1. Returns the number
    /// of healthy records.
    pub async fn refresh_all(&self) -> usize {
        let snapshot = self.list();
        if snapshot.is_empty() {
            return 0;
        }

        let outcomes: Vec<(ProxyRecord, bool)> = stream::iter(snapshot)
            .map(|mut record| async move {
                let healthy = self.test_one(&mut record).await;
                (record, healthy)
            })
            .buffer_unordered(self.refresh_concurrency)
            .collect()
            .await;

        let mut healthy = 0;
        let mut records = self.records.write();
        for (record, passed) in &outcomes {
            if let Some(stored) = records.iter_mut().find(|r| r.same_identity(record)) {
                stored.health.nudge(*passed);
            }
            if *passed {
                healthy += 1;
            }
        }

        info!(
            "[ProxyPool] Refreshed {} proxies, {} healthy",
            outcomes.len(),
            healthy
        );
        healthy
    }

    /// Uniform pick among records with a positive score. When none qualify the
    /// pool is refreshed and any record may be returned, healthy or not.
    pub async fn select_random(&self) -> Option<ProxyRecord> {
        {
            let records = self.records.read();
            if records.is_empty() {
                return None;
            }
            let healthy: Vec<&ProxyRecord> = records
                .iter()
                .filter(|r| r.health.success_rate > 0.0)
                .collect();
            if let Some(picked) = healthy.choose(&mut rand::thread_rng()) {
                return Some((*picked).clone());
            }
        }

        warn!(
            "[ProxyPool] {}, refreshing and falling back to any record",
            EngineError::ProxyUnavailable(format!("all {} records scored zero", self.len()))
        );
        self.refresh_all().await;

        let records = self.records.read();
        records.choose(&mut rand::thread_rng()).cloned()
    }

    /// Stateful cursor over the pool, wrapping at the end
    pub fn select_round_robin(&self) -> Option<ProxyRecord> {
        let records = self.records.read();
        if records.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % records.len();
        records.get(index).cloned()
    }

    /// Drop tested records whose score reached zero. Untested records stay.
    pub fn cleanup_unhealthy(&self) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| !(r.health.last_tested_at.is_some() && r.health.success_rate <= 0.0));
        let removed = before - records.len();
        if removed > 0 {
            info!("[ProxyPool] Removed {} unhealthy proxies", removed);
        }
        removed
    }

    #[cfg(test)]
    pub(crate) fn set_success_rate(&self, id: &str, rate: f64, tested: bool) {
        let mut records = self.records.write();
        if let Some(r) = records.iter_mut().find(|r| r.id() == id) {
            r.health.success_rate = rate.clamp(0.0, 1.0);
            r.health.last_tested_at = if tested { Some(Utc::now()) } else { None };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::record::ProxyProtocol;
    use std::collections::HashSet;

    fn pool() -> ProxyPool {
        let http = Arc::new(HttpClient::new(2).unwrap());
        let config = ProxyConfig {
            test_url: "http://127.0.0.1:1/ip".to_string(),
            test_timeout_secs: 1,
            ..ProxyConfig::default()
        };
        ProxyPool::new(http, &config)
    }

    #[test]
    fn test_add_upserts_by_identity() {
        let pool = pool();
        assert!(pool.add(ProxyRecord::new("10.0.0.1", 8080, ProxyProtocol::Http)));
        assert!(!pool.add(
            ProxyRecord::new("10.0.0.1", 8080, ProxyProtocol::Socks5).with_credentials("u", "p")
        ));
        assert!(pool.add(ProxyRecord::new("10.0.0.1", 8081, ProxyProtocol::Http)));

        assert_eq!(pool.len(), 2);
        let merged = pool.get("10.0.0.1:8080").unwrap();
        assert_eq!(merged.protocol, ProxyProtocol::Socks5);
        assert_eq!(merged.credentials.unwrap().username, "u");
    }

    #[test]
    fn test_add_uri_rejects_without_mutation() {
        let pool = pool();
        assert!(pool.add_uri("gopher://10.0.0.1:70").is_err());
        assert!(pool.is_empty());

        let admitted = pool.add_uris(&[
            "http://10.0.0.1:8080".to_string(),
            "not-a-proxy".to_string(),
            "socks5://u:p@10.0.0.2:1080".to_string(),
        ]);
        assert_eq!(admitted, 2);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let pool = pool();
        pool.add(ProxyRecord::new("10.0.0.1", 8080, ProxyProtocol::Http));
        assert!(pool.remove("10.9.9.9:1").is_none());
        assert_eq!(pool.len(), 1);
        assert!(pool.remove("10.0.0.1:8080").is_some());
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_select_random_on_empty_pool() {
        let pool = pool();
        assert!(pool.select_random().await.is_none());
        assert!(pool.select_round_robin().is_none());
    }

    #[tokio::test]
    async fn test_select_random_prefers_healthy() {
        let pool = pool();
        pool.add(ProxyRecord::new("10.0.0.1", 8080, ProxyProtocol::Http));
        pool.add(ProxyRecord::new("10.0.0.2", 8080, ProxyProtocol::Http));
        pool.add(ProxyRecord::new("10.0.0.3", 8080, ProxyProtocol::Http));
        pool.set_success_rate("10.0.0.1:8080", 0.0, true);
        pool.set_success_rate("10.0.0.3:8080", 0.0, true);

        for _ in 0..20 {
            let picked = pool.select_random().await.unwrap();
            assert_eq!(picked.id(), "10.0.0.2:8080");
        }
    }

    #[tokio::test]
    async fn test_select_random_falls_back_to_any() {
        let pool = pool();
        pool.add(ProxyRecord::new("127.0.0.1", 9, ProxyProtocol::Http));
        pool.set_success_rate("127.0.0.1:9", 0.0, true);

        let picked = pool.select_random().await;
        assert_eq!(picked.map(|p| p.id()), Some("127.0.0.1:9".to_string()));

        let stored = pool.get("127.0.0.1:9").unwrap();
        assert_eq!(stored.health.success_rate, 0.0);
        assert!(stored.health.last_tested_at.is_some());
    }

    #[test]
    fn test_round_robin_wraps() {
        let pool = pool();
        pool.add(ProxyRecord::new("10.0.0.1", 1, ProxyProtocol::Http));
        pool.add(ProxyRecord::new("10.0.0.2", 2, ProxyProtocol::Http));
        pool.add(ProxyRecord::new("10.0.0.3", 3, ProxyProtocol::Http));

        let picks: Vec<String> = (0..6)
            .map(|_| pool.select_round_robin().unwrap().id())
            .collect();
        assert_eq!(&picks[..3], &picks[3..]);
        let distinct: HashSet<_> = picks.iter().collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn test_cleanup_keeps_untested_records() {
        let pool = pool();
        pool.add(ProxyRecord::new("10.0.0.1", 1, ProxyProtocol::Http));
        pool.add(ProxyRecord::new("10.0.0.2", 2, ProxyProtocol::Http));
        pool.add(ProxyRecord::new("10.0.0.3", 3, ProxyProtocol::Http));
        pool.set_success_rate("10.0.0.1:1", 0.0, true);
        pool.set_success_rate("10.0.0.2:2", 0.0, false);
        pool.set_success_rate("10.0.0.3:3", 0.4, true);

        assert_eq!(pool.cleanup_unhealthy(), 1);
        assert!(pool.get("10.0.0.1:1").is_none());
        assert!(pool.get("10.0.0.2:2").is_some());
        assert!(pool.get("10.0.0.3:3").is_some());
    }

    #[tokio::test]
    async fn test_refresh_all_nudges_down_and_clamps() {
        let pool = pool();
        pool.add(ProxyRecord::new("127.0.0.1", 9, ProxyProtocol::Http));
        pool.set_success_rate("127.0.0.1:9", 0.15, true);

        assert_eq!(pool.refresh_all().await, 0);
        let rate = pool.get("127.0.0.1:9").unwrap().health.success_rate;
        assert!((rate - 0.05).abs() < 1e-9);

        pool.refresh_all().await;
        assert_eq!(pool.get("127.0.0.1:9").unwrap().health.success_rate, 0.0);
    }
}
