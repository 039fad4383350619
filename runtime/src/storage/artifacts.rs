use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::ai::schemas::CanonicalResult;

use super::{
    ArtifactSink, ExtractedTextPaths, ModelOutputPaths, StorageResult,
    io::{write_json_file, write_text_file},
};

#[derive(Debug, Clone)]
pub struct ArtifactDirs {
    pub extracted_md: PathBuf,
    pub extracted_txt: PathBuf,
    pub manifest: PathBuf,
    pub model_raw: PathBuf,
    pub model_structured: PathBuf,
    pub converted_pdf: PathBuf,
}

impl ArtifactDirs {
    pub fn under(working_dir: &Path) -> Self {
        Self {
            extracted_md: working_dir.join("extracted_md"),
            extracted_txt: working_dir.join("extracted_txt"),
            manifest: working_dir.join("manifest"),
            model_raw: working_dir.join("model_raw"),
            model_structured: working_dir.join("model_structured"),
            converted_pdf: working_dir.join("converted_pdf"),
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    id: &'a str,
    file: &'a str,
    created_at: String,
    result: &'a T,
}

impl<'a, T: Serialize> Envelope<'a, T> {
    fn new(id: &'a str, file: &'a str, result: &'a T) -> Self {
        Self {
            id,
            file,
            created_at: chrono::Utc::now().to_rfc3339(),
            result,
        }
    }
}

pub struct FsArtifactStore {
    dirs: ArtifactDirs,
}

impl FsArtifactStore {
    pub fn new(working_dir: &Path) -> Self {
        Self {
            dirs: ArtifactDirs::under(working_dir),
        }
    }

    pub fn dirs(&self) -> &ArtifactDirs {
        &self.dirs
    }
}

#[async_trait]
impl ArtifactSink for FsArtifactStore {
    async fn save_extracted_text(
        &self,
        id: &str,
        text: &str,
    ) -> StorageResult<ExtractedTextPaths> {
        let md_path = self.dirs.extracted_md.join(format!("{id}.md"));
        let txt_path = self.dirs.extracted_txt.join(format!("{id}.txt"));
        write_text_file(&md_path, text)
            .await
            .with_context(|| format!("failed to write {}", md_path.display()))?;
        write_text_file(&txt_path, text)
            .await
            .with_context(|| format!("failed to write {}", txt_path.display()))?;

        let length = text.chars().count();
        info!(id = %id, length, "RFP save: extracted text written");
        Ok(ExtractedTextPaths {
            md_path,
            txt_path,
            length,
        })
    }

    async fn save_manifest(&self, id: &str, file: &str, manifest: &Value) -> StorageResult<PathBuf> {
        let path = self.dirs.manifest.join(format!("{id}.json"));
        write_json_file(&path, &Envelope::new(id, file, manifest))
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    async fn save_model_outputs(
        &self,
        id: &str,
        file: &str,
        raw: &Value,
        structured: &CanonicalResult,
    ) -> StorageResult<ModelOutputPaths> {
        let raw_path = self.dirs.model_raw.join(format!("{id}.json"));
        let structured_path = self.dirs.model_structured.join(format!("{id}.json"));

        write_json_file(&raw_path, &Envelope::new(id, file, raw))
            .await
            .with_context(|| format!("failed to write {}", raw_path.display()))?;
        write_json_file(&structured_path, &Envelope::new(id, file, structured))
            .await
            .with_context(|| format!("failed to write {}", structured_path.display()))?;

        info!(id = %id, "RFP save: model outputs written");
        Ok(ModelOutputPaths {
            raw_path,
            structured_path,
        })
    }

    fn converted_pdf_dir(&self, id: &str) -> PathBuf {
        self.dirs.converted_pdf.join(id)
    }
}
