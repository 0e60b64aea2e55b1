// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Swarmscan Library
 * Proxied traffic generation with concurrent vulnerability probing
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod config;
pub mod errors;
pub mod types;

// Egress and fetching
pub mod http_client;
pub mod proxy;

// Detection and follow-up
pub mod exploitation;
pub mod scanners;

// Run machinery
pub mod browser_worker;
pub mod load_generator;
pub mod orchestrator;
pub mod persistence;
pub mod realtime;
pub mod results;

pub use errors::{EngineError, EngineResult};
pub use orchestrator::Orchestrator;
pub use types::{Finding, FindingType, Results, Run, RunConfig, RunStatus, Severity};
