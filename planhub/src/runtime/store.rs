//! Run persistence collaborator
//!
//! The runtime treats run storage as externally owned and thread-safe. The
//! in-memory implementation backs the server and tests; a database-backed
//! implementation slots in behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::RunResult;

/// Errors from the run store collaborator
#[derive(Debug, Error)]
pub enum RunStoreError {
    #[error("run store unavailable: {0}")]
    Unavailable(String),
}

/// Storage seam for finished and in-flight runs
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn save_run(&self, run: &RunResult) -> Result<(), RunStoreError>;

    async fn get_run(&self, run_id: &str) -> Result<Option<RunResult>, RunStoreError>;
}

/// In-memory run store
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    runs: RwLock<HashMap<String, RunResult>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn save_run(&self, run: &RunResult) -> Result<(), RunStoreError> {
        self.runs.write().await.insert(run.run_id.clone(), run.clone());
        Ok(())
    }

    async fn get_run(&self, run_id: &str) -> Result<Option<RunResult>, RunStoreError> {
        Ok(self.runs.read().await.get(run_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunStatus;

    #[tokio::test]
    async fn test_save_then_get_round_trips() {
        let store = MemoryRunStore::new();
        let mut run = RunResult::new("adjust_plan", &["load-context".to_string()]);
        run.finish(RunStatus::Completed);

        store.save_run(&run).await.unwrap();

        let loaded = store.get_run(&run.run_id).await.unwrap().expect("run stored");
        assert_eq!(loaded.run_id, run.run_id);
        assert_eq!(loaded.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryRunStore::new();
        assert!(store.get_run("nope").await.unwrap().is_none());
    }
}
