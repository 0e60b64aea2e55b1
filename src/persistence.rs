// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Run Persistence
 * Storage seam for run records, with an in-process implementation
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::errors::EngineError;
use crate::types::{Run, RunPatch};

/// Durable store for run records. Called once at start and once at
/// finalization; errors are logged by the caller, never rolled back.
#[async_trait::async_trait]
pub trait RunStore: Send + Sync {
    async fn create_run(&self, run: &Run) -> Result<Run, EngineError>;

    async fn update_run(&self, id: &str, patch: RunPatch) -> Result<Run, EngineError>;

    async fn get_run(&self, id: &str) -> Result<Option<Run>, EngineError>;
}

#[derive(Default)]
pub struct InMemoryRunStore {
    runs: RwLock<HashMap<String, Run>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.runs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.read().is_empty()
    }
}

#[async_trait::async_trait]
impl RunStore for InMemoryRunStore {
    async fn create_run(&self, run: &Run) -> Result<Run, EngineError> {
        let mut runs = self.runs.write();
        if runs.contains_key(&run.id) {
            return Err(EngineError::Persistence(format!("run {} already exists", run.id)));
        }
        runs.insert(run.id.clone(), run.clone());
        debug!("[Store] Created run {}", run.id);
        Ok(run.clone())
    }

    async fn update_run(&self, id: &str, patch: RunPatch) -> Result<Run, EngineError> {
        let mut runs = self.runs.write();
        let run = runs
            .get_mut(id)
            .ok_or_else(|| EngineError::Persistence(format!("run {} does not exist", id)))?;
        run.apply(patch);
        debug!("[Store] Updated run {} -> {}", id, run.status);
        Ok(run.clone())
    }

    async fn get_run(&self, id: &str) -> Result<Option<Run>, EngineError> {
        Ok(self.runs.read().get(id).cloned())
    }
}
