// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Request Generator
 * Rate-paced concurrent traffic loops egressing through the proxy pool
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::errors::EngineError;
use crate::http_client::{browser_headers, HttpClient};
use crate::proxy::ProxyPool;
use crate::results::{Outcome, SharedResults};
use crate::types::RunConfig;

/// Everything a traffic loop needs; cloned into each spawned task
#[derive(Clone)]
pub struct LoadGenerator {
    http_client: Arc<HttpClient>,
    pool: Arc<ProxyPool>,
    results: Arc<SharedResults>,
    target_url: String,
    tick: Duration,
    request_timeout: Duration,
}

impl LoadGenerator {
    pub fn new(
        http_client: Arc<HttpClient>,
        pool: Arc<ProxyPool>,
        results: Arc<SharedResults>,
        config: &RunConfig,
        request_timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            pool,
            results,
            target_url: config.target_url.clone(),
            tick: config.tick_interval(),
            request_timeout,
        }
    }

    /// Spawn `users` independent pacing loops. The caller owns the handles
    /// and cancels them as a unit.
    pub fn spawn(&self, users: u32) -> Vec<JoinHandle<()>> {
        info!(
            "[Load] Starting {} users at one request every {}ms against {}",
            users,
            self.tick.as_millis(),
            self.target_url
        );

        (0..users)
            .map(|user| {
                let worker = self.clone();
                tokio::spawn(async move { worker.pace(user).await })
            })
            .collect()
    }

    /// Ticks never overlap: a slow request delays the next tick rather than
    /// triggering catch-up bursts.
    async fn pace(self, user: u32) {
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !self.fire().await {
                debug!("[Load] User {} exiting, results sealed", user);
                break;
            }
        }
    }

    /// One request; returns false once the run's results are sealed
    pub async fn fire(&self) -> bool {
        let proxy = self.pool.select_random().await;
        let proxy_id = proxy.as_ref().map(|p| p.id());

        let started = Instant::now();
        let response = self
            .http_client
            .fetch(
                &self.target_url,
                proxy.as_ref(),
                browser_headers(),
                Some(self.request_timeout),
            )
            .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let outcome = match response {
            Ok(response) if response.is_success() => Outcome::Success,
            Ok(response) => Outcome::Failure(format!(
                "HTTP {} from {}",
                response.status_code, self.target_url
            )),
            Err(e) => Outcome::Failure(EngineError::from_fetch(&self.target_url, &e).to_string()),
        };

        self.results.record_request(latency_ms, outcome, proxy_id)
    }
}
