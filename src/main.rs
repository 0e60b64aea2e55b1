// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Swarmscan - Proxied Load and Vulnerability Probe
 * Standalone CLI driving one run or managing the proxy pool
 *
 * (c) 2026 Bountyy Oy
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use swarmscan::config::{load_engine_config, EngineConfig, LogFormat};
use swarmscan::http_client::HttpClient;
use swarmscan::persistence::InMemoryRunStore;
use swarmscan::proxy::ProxyPool;
use swarmscan::realtime::ChannelListener;
use swarmscan::{Orchestrator, Run, RunConfig};

/// Swarmscan - proxied traffic generation with concurrent vulnerability probing
#[derive(Parser)]
#[command(name = "swarmscan")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version = "1.0.0")]
#[command(about = "Concurrent proxied load with a built-in weakness probe", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (YAML, TOML or JSON)
    #[arg(short, long, global = true, env = "SWARMSCAN_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run traffic and probes against one target
    Run {
        /// Target URL
        #[arg(short, long)]
        target: String,

        /// Concurrent request loops
        #[arg(short, long, default_value = "10")]
        users: u32,

        /// Requests per second per loop
        #[arg(short, long, default_value = "1")]
        rps: u32,

        /// Run duration in seconds
        #[arg(short, long, default_value = "60")]
        duration: u64,

        /// Headless browser sessions
        #[arg(short, long, default_value = "0")]
        browsers: u32,

        /// Scan the target and attempt follow-up exploitation
        #[arg(long)]
        exploit: bool,

        /// Proxy URI, repeatable (scheme://[user:pass@]host:port)
        #[arg(long = "proxy")]
        proxies: Vec<String>,

        /// Write the final run as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build, test and print the proxy pool
    Proxies {
        /// Proxy URI, repeatable
        #[arg(long = "proxy")]
        proxies: Vec<String>,

        /// Feed URL listing host:port lines, repeatable
        #[arg(long = "source")]
        sources: Vec<String>,

        /// Drop tested records with zero success rate
        #[arg(long)]
        cleanup: bool,
    },
}

fn init_tracing(config: &EngineConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.observability.log_level));

    match config.observability.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_engine_config(cli.config.as_deref())?;
    init_tracing(&config);

    info!("Swarmscan v1.0.0 - Starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("swarmscan-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli.command, config))
}

async fn async_main(command: Commands, config: EngineConfig) -> Result<()> {
    let http_client = Arc::new(HttpClient::with_config(&config.http)?);
    let pool = Arc::new(ProxyPool::new(Arc::clone(&http_client), &config.proxy));
    pool.add_uris(&config.proxy.proxies);

    match command {
        Commands::Run {
            target,
            users,
            rps,
            duration,
            browsers,
            exploit,
            proxies,
            output,
        } => {
            pool.add_uris(&proxies);
            if config.proxy.discover_on_start && !config.proxy.sources.is_empty() {
                let admitted = pool.discover(&config.proxy.sources).await;
                info!("Discovered {} healthy proxies", admitted);
            }

            let run_config = RunConfig {
                target_url: target,
                concurrent_users: users,
                requests_per_second: rps,
                duration_seconds: duration,
                browser_instances: browsers,
                exploit_vulnerabilities: exploit,
            };

            let orchestrator = Orchestrator::new(
                config,
                Arc::clone(&pool),
                http_client,
                Arc::new(InMemoryRunStore::new()),
            );
            let run = execute_run(&orchestrator, run_config).await?;

            let json = serde_json::to_string_pretty(&run)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Run written to {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Proxies {
            proxies,
            sources,
            cleanup,
        } => {
            pool.add_uris(&proxies);
            if !sources.is_empty() {
                let admitted = pool.discover(&sources).await;
                info!("Discovered {} healthy proxies", admitted);
            }

            let healthy = pool.refresh_all().await;
            info!("{} of {} proxies healthy", healthy, pool.len());

            if cleanup {
                let removed = pool.cleanup_unhealthy();
                info!("Removed {} unhealthy proxies", removed);
            }

            println!("{}", serde_json::to_string_pretty(&pool.list())?);
        }
    }

    Ok(())
}

/// Start the run, stream notifications, and finish on duration or Ctrl-C
async fn execute_run(orchestrator: &Orchestrator, run_config: RunConfig) -> Result<Run> {
    let (listener, mut progress_rx, mut finding_rx) = ChannelListener::new();
    let run = orchestrator.start(run_config, Arc::new(listener)).await?;
    let run_id = run.id.clone();

    let reporter = tokio::spawn(async move {
        let mut progress_open = true;
        let mut findings_open = true;
        while progress_open || findings_open {
            tokio::select! {
                update = progress_rx.recv(), if progress_open => match update {
                    Some(update) if update.requests_total % 50 == 0 => info!(
                        "Progress: {} requests, {} ok, {} failed, {} findings, avg {:.0}ms",
                        update.requests_total,
                        update.successful,
                        update.failed,
                        update.vulnerabilities_found,
                        update.average_response_time_ms
                    ),
                    Some(_) => {}
                    None => progress_open = false,
                },
                update = finding_rx.recv(), if findings_open => match update {
                    Some(update) => warn!(
                        "[{}] {}: {} ({})",
                        update.finding.severity,
                        update.finding.finding_type,
                        update.finding.description,
                        update.finding.url
                    ),
                    None => findings_open = false,
                },
            }
        }
    });

    let finished = tokio::select! {
        finished = orchestrator.wait(&run_id) => finished?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, stopping run {}", run_id);
            match orchestrator.stop(&run_id).await? {
                Some(run) => run,
                None => orchestrator.status(&run_id)?,
            }
        }
    };

    reporter.abort();
    Ok(finished)
}
