// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Options accepted when starting a run. Unknown keys are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    pub target_url: String,

    #[serde(default = "default_concurrent_users")]
    pub concurrent_users: u32,

    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: u64,

    #[serde(default)]
    pub browser_instances: u32,

    #[serde(default)]
    pub exploit_vulnerabilities: bool,
}

fn default_concurrent_users() -> u32 {
    10
}

fn default_requests_per_second() -> u32 {
    1
}

fn default_duration_seconds() -> u64 {
    60
}

impl RunConfig {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            concurrent_users: default_concurrent_users(),
            requests_per_second: default_requests_per_second(),
            duration_seconds: default_duration_seconds(),
            browser_instances: 0,
            exploit_vulnerabilities: false,
        }
    }

    /// Pacing interval of a single request loop
    pub fn tick_interval(&self) -> std::time::Duration {
        let rps = self.requests_per_second.max(1) as u64;
        std::time::Duration::from_millis((1000 / rps).max(1))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Created,
    Running,
    Completed,
    Stopped,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Stopped | RunStatus::Failed
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Created => write!(f, "created"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Stopped => write!(f, "stopped"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub id: String,
    pub config: RunConfig,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    pub results: Results,
}

/// Fields written by the orchestrator when a run is finalized
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPatch {
    pub status: RunStatus,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub results: Results,
}

impl Run {
    pub fn apply(&mut self, patch: RunPatch) {
        self.status = patch.status;
        self.ended_at = Some(patch.ended_at);
        self.duration_seconds = Some(patch.duration_seconds);
        self.results = patch.results;
    }
}

/// Cumulative outcome of a run. Counters only grow and sequences are append-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    pub requests_total: u64,
    pub successful: u64,
    pub failed: u64,
    pub response_times_ms: Vec<u64>,
    pub errors: Vec<ErrorRecord>,
    pub vulnerabilities: Vec<Finding>,
    pub exploitation_attempts: Vec<ExploitationAttempt>,
}

impl Results {
    pub fn average_response_time_ms(&self) -> f64 {
        if self.response_times_ms.is_empty() {
            return 0.0;
        }
        self.response_times_ms.iter().sum::<u64>() as f64 / self.response_times_ms.len() as f64
    }

    pub fn success_rate(&self) -> f64 {
        if self.requests_total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.requests_total as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

impl ErrorRecord {
    pub fn new(message: impl Into<String>, proxy: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            proxy,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FindingType {
    VulnerableLibrary,
    SqlInjection,
    Xss,
    MissingSecurityHeaders,
}

impl std::fmt::Display for FindingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindingType::VulnerableLibrary => write!(f, "VulnerableLibrary"),
            FindingType::SqlInjection => write!(f, "SqlInjection"),
            FindingType::Xss => write!(f, "Xss"),
            FindingType::MissingSecurityHeaders => write!(f, "MissingSecurityHeaders"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    pub severity: Severity,
    pub description: String,
    pub evidence: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cves: Vec<String>,
    /// URL the evidence was observed on
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

impl Finding {
    pub fn new(
        finding_type: FindingType,
        severity: Severity,
        url: &str,
        description: impl Into<String>,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            finding_type,
            severity,
            description: description.into(),
            evidence: evidence.into(),
            cves: Vec::new(),
            url: url.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_cves(mut self, cves: &[&str]) -> Self {
        self.cves = cves.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Identity used to avoid repeating follow-up work for the same weakness
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.finding_type, self.evidence, self.cves.join(","))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExploitationAttempt {
    /// CVE identifier, or the finding type when no CVE applies
    pub target_finding: String,
    pub success: bool,
    pub payload: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_excerpt: Option<String>,
}
