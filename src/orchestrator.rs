// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Run Orchestrator
 * Owns the run registry and drives each run from start to finalization
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use chrono::Utc;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::browser_worker::{BrowserSettings, BrowserWorker};
use crate::config::{ConfigValidator, EngineConfig};
use crate::errors::EngineError;
use crate::exploitation::Exploiter;
use crate::http_client::HttpClient;
use crate::load_generator::LoadGenerator;
use crate::persistence::RunStore;
use crate::proxy::ProxyPool;
use crate::realtime::ProgressListener;
use crate::results::SharedResults;
use crate::scanners::ScanEngine;
use crate::types::{Run, RunConfig, RunPatch, RunStatus};

/// Finalized runs kept answerable by `status`; least recently used go first
pub const FINISHED_RUN_CAPACITY: u64 = 1024;

/// Live state of one run
struct ActiveRun {
    run: Run,
    started: Instant,
    results: Arc<SharedResults>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Set exactly once; later finalizers observe it and back off
    finalized: tokio::sync::Mutex<bool>,
    /// Flips to true once the run has moved to the finished cache
    done: watch::Sender<bool>,
}

impl ActiveRun {
    fn snapshot(&self) -> Run {
        let mut run = self.run.clone();
        run.results = self.results.snapshot();
        run
    }
}

struct Inner {
    config: EngineConfig,
    pool: Arc<ProxyPool>,
    http_client: Arc<HttpClient>,
    store: Arc<dyn RunStore>,
    active: RwLock<HashMap<String, Arc<ActiveRun>>>,
    finished: Cache<String, Run>,
}

/// Cheap to clone; clones share one registry
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        config: EngineConfig,
        pool: Arc<ProxyPool>,
        http_client: Arc<HttpClient>,
        store: Arc<dyn RunStore>,
    ) -> Self {
        Self::with_finished_capacity(config, pool, http_client, store, FINISHED_RUN_CAPACITY)
    }

    pub fn with_finished_capacity(
        config: EngineConfig,
        pool: Arc<ProxyPool>,
        http_client: Arc<HttpClient>,
        store: Arc<dyn RunStore>,
        finished_capacity: u64,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                pool,
                http_client,
                store,
                active: RwLock::new(HashMap::new()),
                finished: Cache::builder()
                    .max_capacity(finished_capacity)
                    .eviction_policy(EvictionPolicy::lru())
                    .build(),
            }),
        }
    }

    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.inner.pool
    }

    /// Validate, register and launch a run. Invalid configurations are
    /// rejected before anything is created or persisted.
    pub async fn start(
        &self,
        config: RunConfig,
        listener: Arc<dyn ProgressListener>,
    ) -> Result<Run, EngineError> {
        ConfigValidator::validate_run_config(&config)?;

        let id = Uuid::new_v4().to_string();
        let run = Run {
            id: id.clone(),
            config: config.clone(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            duration_seconds: None,
            results: Default::default(),
        };

        if let Err(e) = self.inner.store.create_run(&run).await {
            warn!("[Orchestrator] Failed to persist new run {}: {}", id, e);
        }

        let results = Arc::new(SharedResults::new(id.clone(), listener));
        let workers = self.spawn_workers(&config, &results);

        let active = Arc::new(ActiveRun {
            run: run.clone(),
            started: Instant::now(),
            results,
            workers: Mutex::new(workers),
            timer: Mutex::new(None),
            finalized: tokio::sync::Mutex::new(false),
            done: watch::channel(false).0,
        });
        self.inner.active.write().insert(id.clone(), Arc::clone(&active));

        let timer = self.spawn_duration_timer(Arc::clone(&active), config.duration_seconds);
        *active.timer.lock() = Some(timer);

        info!(
            "[Orchestrator] Run {} started: {} users at {} rps, {} browsers, exploit={}, {}s against {}",
            id,
            config.concurrent_users,
            config.requests_per_second,
            config.browser_instances,
            config.exploit_vulnerabilities,
            config.duration_seconds,
            config.target_url
        );

        Ok(run)
    }

    /// Explicitly stop a run. Returns the finalized run, or `None` if it was
    /// already finalized. Every worker is halted before this returns.
    pub async fn stop(&self, run_id: &str) -> Result<Option<Run>, EngineError> {
        let active = self.inner.active.read().get(run_id).cloned();
        match active {
            Some(active) => Ok(self.finalize(active, RunStatus::Stopped, false).await),
            None if self.inner.finished.contains_key(run_id) => Ok(None),
            None => Err(EngineError::RunNotFound(run_id.to_string())),
        }
    }

    /// Current view of a run: live snapshot while active, final record after
    pub fn status(&self, run_id: &str) -> Result<Run, EngineError> {
        if let Some(active) = self.inner.active.read().get(run_id) {
            return Ok(active.snapshot());
        }
        self.inner
            .finished
            .get(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.to_string()))
    }

    pub fn active_runs(&self) -> Vec<String> {
        self.inner.active.read().keys().cloned().collect()
    }

    /// Resolves once the run has left the active registry
    pub async fn wait(&self, run_id: &str) -> Result<Run, EngineError> {
        let active = self.inner.active.read().get(run_id).cloned();
        if let Some(active) = active {
            let mut done = active.done.subscribe();
            while !*done.borrow_and_update() {
                // the sender lives in `active`, which we hold
                if done.changed().await.is_err() {
                    break;
                }
            }
        }
        self.status(run_id)
    }

    fn spawn_workers(&self, config: &RunConfig, results: &Arc<SharedResults>) -> Vec<JoinHandle<()>> {
        let engine = &self.inner.config;
        let mut workers = LoadGenerator::new(
            Arc::clone(&self.inner.http_client),
            Arc::clone(&self.inner.pool),
            Arc::clone(results),
            config,
            Duration::from_secs(engine.http.request_timeout_secs),
        )
        .spawn(config.concurrent_users);

        if config.browser_instances > 0 {
            let browsers = BrowserWorker::new(
                Arc::clone(&self.inner.pool),
                Arc::clone(results),
                config.target_url.clone(),
                BrowserSettings::new(&engine.browser, &engine.http),
            );
            workers.extend(browsers.spawn(config.browser_instances));
        }

        if config.exploit_vulnerabilities {
            let scan_loop = ScanLoop {
                engine: ScanEngine::new(Arc::clone(&self.inner.http_client)),
                exploiter: Exploiter::new(
                    Arc::clone(&self.inner.http_client),
                    Arc::clone(&self.inner.pool),
                    &engine.scanner,
                ),
                pool: Arc::clone(&self.inner.pool),
                results: Arc::clone(results),
                target_url: config.target_url.clone(),
                every: Duration::from_secs(engine.scanner.scan_interval_secs),
            };
            workers.push(tokio::spawn(scan_loop.run()));
        }

        workers
    }

    fn spawn_duration_timer(&self, active: Arc<ActiveRun>, duration_secs: u64) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(duration_secs)).await;
            debug!("[Orchestrator] Run {} reached its duration", active.run.id);
            orchestrator.finalize(active, RunStatus::Completed, true).await;
        })
    }

    /// Seal results, halt workers, persist, then move the run from the
    /// active registry to the finished map. Runs at most once per run.
    async fn finalize(&self, active: Arc<ActiveRun>, status: RunStatus, from_timer: bool) -> Option<Run> {
        let mut finalized = active.finalized.lock().await;
        if *finalized {
            return None;
        }

        let results = active.results.close();

        if !from_timer {
            if let Some(timer) = active.timer.lock().take() {
                timer.abort();
            }
        }

        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *active.workers.lock());
        for worker in &workers {
            worker.abort();
        }
        for worker in workers {
            if let Err(e) = worker.await {
                if !e.is_cancelled() {
                    warn!("[Orchestrator] Worker of run {} panicked: {}", active.run.id, e);
                }
            }
        }

        let patch = RunPatch {
            status,
            ended_at: Utc::now(),
            duration_seconds: active.started.elapsed().as_secs_f64(),
            results,
        };
        let mut run = active.run.clone();
        run.apply(patch.clone());

        if let Err(e) = self.inner.store.update_run(&run.id, patch).await {
            warn!("[Orchestrator] Failed to persist final state of run {}: {}", run.id, e);
        }

        self.inner.finished.insert(run.id.clone(), run.clone());
        self.inner.active.write().remove(&run.id);
        *finalized = true;
        active.done.send_replace(true);

        info!(
            "[Orchestrator] Run {} {} after {:.1}s: {} requests ({} ok, {} failed, {:.1}% success), {} findings, {} exploitation attempts",
            run.id,
            run.status,
            run.duration_seconds.unwrap_or_default(),
            run.results.requests_total,
            run.results.successful,
            run.results.failed,
            run.results.success_rate() * 100.0,
            run.results.vulnerabilities.len(),
            run.results.exploitation_attempts.len()
        );

        Some(run)
    }
}

/// Fixed-interval scan of the target followed by exploitation of newly
/// eligible findings
struct ScanLoop {
    engine: ScanEngine,
    exploiter: Exploiter,
    pool: Arc<ProxyPool>,
    results: Arc<SharedResults>,
    target_url: String,
    every: Duration,
}

impl ScanLoop {
    async fn run(self) {
        let mut ticker = interval(self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut exploited: HashSet<String> = HashSet::new();

        loop {
            ticker.tick().await;
            if !self.results.is_open() {
                return;
            }

            let proxy = self.pool.select_random().await;
            let findings = self.engine.scan_target(&self.target_url, proxy.as_ref()).await;

            let mut eligible = Vec::new();
            for finding in findings {
                if Exploiter::is_eligible(&finding) && exploited.insert(finding.key()) {
                    eligible.push(finding.clone());
                }
                if !self.results.add_finding(finding) {
                    return;
                }
            }

            for finding in eligible {
                if let Some(attempt) = self.exploiter.exploit(&finding, &self.target_url).await {
                    if !self.results.add_exploitation(attempt) {
                        return;
                    }
                }
            }
        }
    }
}
