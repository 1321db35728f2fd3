use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::data_models::HarvestResult;
use crate::error::HarvestError;

/// Sink for the final collection of a harvest.
#[async_trait]
pub trait ResultWriter: Send + Sync {
    async fn write(&self, result: &HarvestResult) -> Result<(), HarvestError>;
}

/// Writes the candidates as a pretty-printed JSON array. Non-ASCII text is
/// kept as is.
pub struct JsonFileWriter {
    path: PathBuf,
}

impl JsonFileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResultWriter for JsonFileWriter {
    async fn write(&self, result: &HarvestResult) -> Result<(), HarvestError> {
        let body = serde_json::to_vec_pretty(&result.candidates)
            .map_err(|e| HarvestError::Write(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HarvestError::Write(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| HarvestError::Write(format!("{}: {e}", self.path.display())))?;

        log::info!(
            "saved {} candidates to {}",
            result.candidates.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Keeps every written result in memory.
#[derive(Default)]
pub struct MemoryWriter {
    written: Mutex<Vec<HarvestResult>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn written(&self) -> Vec<HarvestResult> {
        self.written.lock().await.clone()
    }
}

#[async_trait]
impl ResultWriter for MemoryWriter {
    async fn write(&self, result: &HarvestResult) -> Result<(), HarvestError> {
        self.written.lock().await.push(result.clone());
        Ok(())
    }
}
