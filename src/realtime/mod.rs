// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Real-Time Run Notifications
 * Streams progress snapshots and new findings of a running swarm
 *
 * Features:
 * - Pluggable listener trait invoked on every results mutation
 * - Channel-backed listener for consumers on other tasks
 * - No-op listener for headless runs
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::types::{Finding, Results};

/// Receives run notifications. Called synchronously while the run's results
/// lock is held, so implementations must not block or call back into the run.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, run_id: &str, results: &Results);

    fn on_finding(&self, _run_id: &str, _finding: &Finding) {}
}

/// Progress snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub run_id: String,
    pub requests_total: u64,
    pub successful: u64,
    pub failed: u64,
    pub vulnerabilities_found: usize,
    pub exploitation_attempts: usize,
    pub average_response_time_ms: f64,
    pub timestamp: u64,
}

impl ProgressUpdate {
    pub fn from_results(run_id: &str, results: &Results) -> Self {
        Self {
            run_id: run_id.to_string(),
            requests_total: results.requests_total,
            successful: results.successful,
            failed: results.failed,
            vulnerabilities_found: results.vulnerabilities.len(),
            exploitation_attempts: results.exploitation_attempts.len(),
            average_response_time_ms: results.average_response_time_ms(),
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
        }
    }
}

/// Finding update (new vulnerability discovered)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingUpdate {
    pub run_id: String,
    pub finding: Finding,
    pub timestamp: u64,
}

/// Forwards notifications over unbounded channels
pub struct ChannelListener {
    progress_tx: mpsc::UnboundedSender<ProgressUpdate>,
    finding_tx: mpsc::UnboundedSender<FindingUpdate>,
}

impl ChannelListener {
    pub fn new() -> (
        Self,
        mpsc::UnboundedReceiver<ProgressUpdate>,
        mpsc::UnboundedReceiver<FindingUpdate>,
    ) {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (finding_tx, finding_rx) = mpsc::unbounded_channel();

        (Self { progress_tx, finding_tx }, progress_rx, finding_rx)
    }
}

impl ProgressListener for ChannelListener {
    fn on_progress(&self, run_id: &str, results: &Results) {
        if self
            .progress_tx
            .send(ProgressUpdate::from_results(run_id, results))
            .is_err()
        {
            debug!("[Realtime] Progress receiver for {} dropped", run_id);
        }
    }

    fn on_finding(&self, run_id: &str, finding: &Finding) {
        let update = FindingUpdate {
            run_id: run_id.to_string(),
            finding: finding.clone(),
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
        };
        if self.finding_tx.send(update).is_err() {
            debug!("[Realtime] Finding receiver for {} dropped", run_id);
        }
    }
}

pub struct NoopListener;

impl ProgressListener for NoopListener {
    fn on_progress(&self, _run_id: &str, _results: &Results) {}
}
