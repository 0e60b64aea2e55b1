// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Best-effort discovery of egress candidates from plain-text feeds.
//! A feed lists one `host:port` per line.

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::pool::ProxyPool;
use super::record::{parse_host_port, ProxyProtocol, ProxyRecord};

impl ProxyPool {
    /// Fetch every source, health-test parsed candidates and admit the healthy ones.
    /// Fetch failures are logged and skipped, malformed lines are dropped.
    pub async fn discover(&self, sources: &[String]) -> usize {
        let mut candidates: Vec<ProxyRecord> = Vec::new();

        for source in sources {
            let response = match self.http_client().get(source).await {
                Ok(r) if r.is_success() => r,
                Ok(r) => {
                    warn!("[Discovery] Source {} returned HTTP {}", source, r.status_code);
                    continue;
                }
                Err(e) => {
                    warn!("[Discovery] Failed to fetch {}: {:#}", source, e);
                    continue;
                }
            };

            let before = candidates.len();
            for line in response.body.lines() {
                if let Some((host, port)) = parse_host_port(line) {
                    let record = ProxyRecord::new(host, port, ProxyProtocol::Http)
                        .with_source(source.clone());
                    if !candidates.iter().any(|c| c.same_identity(&record)) {
                        candidates.push(record);
                    }
                }
            }
            debug!(
                "[Discovery] {} candidates from {}",
                candidates.len() - before,
                source
            );
        }

        let admitted: Vec<ProxyRecord> = stream::iter(candidates)
            .map(|mut record| async move {
                if self.test_one(&mut record).await {
                    Some(record)
                } else {
                    None
                }
            })
            .buffer_unordered(self.refresh_fan_out())
            .filter_map(|r| async move { r })
            .collect()
            .await;

        let count = admitted.len();
        for record in admitted {
            self.add(record);
        }

        info!("[Discovery] Admitted {} proxies from {} sources", count, sources.len());
        count
    }
}
