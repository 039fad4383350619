use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::ai::schemas::CanonicalResult;

pub mod artifacts;
pub mod io;

pub use artifacts::{ArtifactDirs, FsArtifactStore};
pub use io::*;

pub type StorageResult<T> = Result<T>;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExtractedTextPaths {
    pub md_path: PathBuf,
    pub txt_path: PathBuf,
    pub length: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModelOutputPaths {
    pub raw_path: PathBuf,
    pub structured_path: PathBuf,
}

/// Write-only audit sink for intermediate artifacts, keyed by document id.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn save_extracted_text(&self, id: &str, text: &str) -> StorageResult<ExtractedTextPaths>;

    async fn save_manifest(&self, id: &str, file: &str, manifest: &Value) -> StorageResult<PathBuf>;

    async fn save_model_outputs(
        &self,
        id: &str,
        file: &str,
        raw: &Value,
        structured: &CanonicalResult,
    ) -> StorageResult<ModelOutputPaths>;

    /// Directory that receives fallback PDFs for one document.
    fn converted_pdf_dir(&self, id: &str) -> PathBuf;
}
