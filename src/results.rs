// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Run Results Accumulator
 * Single-lock accumulator shared by every worker of one run
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use parking_lot::Mutex;
use std::sync::Arc;

use crate::realtime::ProgressListener;
use crate::types::{ErrorRecord, ExploitationAttempt, Finding, Results};

/// Outcome of one unit of traffic (request or navigation)
#[derive(Debug, Clone)]
pub enum Outcome {
    Success,
    Failure(String),
}

struct Inner {
    results: Results,
    open: bool,
}

/// Every mutation and its progress notification happen under one lock, so
/// snapshots are internally consistent. Once closed, mutations are dropped
/// and report `false`.
pub struct SharedResults {
    run_id: String,
    inner: Mutex<Inner>,
    listener: Arc<dyn ProgressListener>,
}

impl SharedResults {
    pub fn new(run_id: impl Into<String>, listener: Arc<dyn ProgressListener>) -> Self {
        Self {
            run_id: run_id.into(),
            inner: Mutex::new(Inner {
                results: Results::default(),
                open: true,
            }),
            listener,
        }
    }

    /// One latency sample plus one success/failure outcome
    pub fn record_request(&self, latency_ms: u64, outcome: Outcome, proxy: Option<String>) -> bool {
        self.mutate(|results| {
            results.requests_total += 1;
            results.response_times_ms.push(latency_ms);
            match outcome {
                Outcome::Success => results.successful += 1,
                Outcome::Failure(message) => {
                    results.failed += 1;
                    results.errors.push(ErrorRecord::new(message, proxy));
                }
            }
        })
    }

    pub fn add_error(&self, message: impl Into<String>, proxy: Option<String>) -> bool {
        let record = ErrorRecord::new(message, proxy);
        self.mutate(|results| results.errors.push(record))
    }

    pub fn add_finding(&self, finding: Finding) -> bool {
        let mut inner = self.inner.lock();
        if !inner.open {
            return false;
        }
        self.listener.on_finding(&self.run_id, &finding);
        inner.results.vulnerabilities.push(finding);
        self.listener.on_progress(&self.run_id, &inner.results);
        true
    }

    pub fn add_exploitation(&self, attempt: ExploitationAttempt) -> bool {
        self.mutate(|results| results.exploitation_attempts.push(attempt))
    }

    pub fn snapshot(&self) -> Results {
        self.inner.lock().results.clone()
    }

    /// Seal the accumulator and return the final results
    pub fn close(&self) -> Results {
        let mut inner = self.inner.lock();
        inner.open = false;
        inner.results.clone()
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    fn mutate(&self, apply: impl FnOnce(&mut Results)) -> bool {
        let mut inner = self.inner.lock();
        if !inner.open {
            return false;
        }
        apply(&mut inner.results);
        self.listener.on_progress(&self.run_id, &inner.results);
        true
    }
}
