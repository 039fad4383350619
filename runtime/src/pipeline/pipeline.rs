use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    ai::{
        chat::ChatModel,
        prompts::context_header,
        runner::{ModelRun, ModelRunner, RunMeta},
        schemas::CanonicalResult,
    },
    config::AppConfig,
    storage::{ArtifactSink, FsArtifactStore},
};

use super::{
    converter::{PdfConverter, SofficeConverter},
    document_manager::{DocumentManager, extension_of},
    extractor::{
        CommandExtractor, DocumentExtractor, ExtractedText, RoutingExtractor, Utf8DocumentExtractor,
    },
    quality_gate::{FallbackReason, QualityGate, QualityMetrics},
    utils::{compute_mdhash_id, generate_job_id, normalize_extension},
};

const JOB_ID_PREFIX: &str = "rfp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    FastPath,
    FallbackPdf,
    PastedText,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMode::FastPath => "fast_path",
            ExtractionMode::FallbackPdf => "fallback_pdf",
            ExtractionMode::PastedText => "pasted_text",
        }
    }
}

/// Outcome of extraction plus the quality decision for one document.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRun {
    pub mode: ExtractionMode,
    pub extraction: ExtractedText,
    pub quality_metrics: QualityMetrics,
    pub fallback_used: bool,
    pub fallback_reason: Option<FallbackReason>,
    pub fallback_artifact_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub id: String,
    pub file: String,
    pub mode: ExtractionMode,
    pub fallback_used: bool,
    pub quality_metrics: Option<QualityMetrics>,
    pub meta: RunMeta,
    pub result: CanonicalResult,
}

pub struct Pipeline {
    doc_manager: DocumentManager,
    extractor: Arc<dyn DocumentExtractor>,
    converter: Arc<dyn PdfConverter>,
    quality_gate: QualityGate,
    runner: ModelRunner,
    artifacts: Arc<dyn ArtifactSink>,
    convertible_extensions: HashSet<String>,
}

impl Pipeline {
    pub fn new(config: &AppConfig, doc_manager: DocumentManager, chat: Arc<dyn ChatModel>) -> Self {
        let plain = Arc::new(Utf8DocumentExtractor::new(doc_manager.file_repo()));
        let rich = Arc::new(CommandExtractor::new(
            config.extraction.worker_command.clone(),
            config.extraction.timeout(),
        ));
        let extractor = Arc::new(RoutingExtractor::new(
            &config.extraction.plain_text_extensions,
            plain,
            rich,
        ));
        let converter = Arc::new(SofficeConverter::new(&config.conversion));
        let runner = ModelRunner::new(chat, config.llm.clone(), config.chunking.clone());
        let artifacts = Arc::new(FsArtifactStore::new(&config.working_dir()));

        Self::with_dependencies(
            doc_manager,
            extractor,
            converter,
            QualityGate::new(config.quality.clone()),
            runner,
            artifacts,
            &config.conversion.convertible_extensions,
        )
    }

    pub fn with_dependencies(
        doc_manager: DocumentManager,
        extractor: Arc<dyn DocumentExtractor>,
        converter: Arc<dyn PdfConverter>,
        quality_gate: QualityGate,
        runner: ModelRunner,
        artifacts: Arc<dyn ArtifactSink>,
        convertible_extensions: &[String],
    ) -> Self {
        Self {
            doc_manager,
            extractor,
            converter,
            quality_gate,
            runner,
            artifacts,
            convertible_extensions: convertible_extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
        }
    }

    pub fn document_manager(&self) -> &DocumentManager {
        &self.doc_manager
    }

    pub fn runner(&self) -> &ModelRunner {
        &self.runner
    }

    pub fn is_convertible(&self, file_extension: &str) -> bool {
        self.convertible_extensions
            .contains(&normalize_extension(file_extension))
    }

    /// PDF rendition of an upload for on-screen preview. PDFs are returned as
    /// they are; office formats are converted into a fresh directory.
    pub async fn preview_pdf(&self, source_path: &Path) -> Result<PathBuf> {
        let extension = extension_of(source_path).unwrap_or_default();
        if extension == "pdf" {
            return Ok(source_path.to_path_buf());
        }
        if !self.is_convertible(&extension) {
            bail!("unsupported preview type: {extension}");
        }
        let preview_id = generate_job_id("preview");
        let out_dir = self.artifacts.converted_pdf_dir(&preview_id);
        self.converter
            .convert(source_path, &out_dir)
            .await
            .context("Word preview conversion failed")
    }

    /// Extracts text, checks its quality and retries once through a PDF
    /// conversion when the gate fails on a convertible office format.
    /// Collaborator errors are returned to the caller untouched.
    pub async fn run(
        &self,
        source_path: &Path,
        file_extension: &str,
        job_id: &str,
    ) -> Result<ExtractionRun> {
        let extraction = self.extractor.extract(source_path).await?;
        let assessment = self.quality_gate.assess(&extraction.text);
        info!(
            doc_id = %job_id,
            text_chars = assessment.metrics.text_chars,
            placeholders = assessment.metrics.image_placeholder_count,
            needs_fallback = assessment.needs_fallback,
            "RFP extract: quality checked"
        );

        if !assessment.needs_fallback {
            return Ok(ExtractionRun {
                mode: ExtractionMode::FastPath,
                extraction,
                quality_metrics: assessment.metrics,
                fallback_used: false,
                fallback_reason: None,
                fallback_artifact_path: None,
            });
        }

        if !self.is_convertible(file_extension) {
            warn!(
                doc_id = %job_id,
                extension = %file_extension,
                reason = ?assessment.reason,
                "RFP extract: low quality text, no fallback for this format"
            );
            return Ok(ExtractionRun {
                mode: ExtractionMode::FastPath,
                extraction,
                quality_metrics: assessment.metrics,
                fallback_used: false,
                fallback_reason: assessment.reason,
                fallback_artifact_path: None,
            });
        }

        let out_dir = self.artifacts.converted_pdf_dir(job_id);
        let pdf_path = self.converter.convert(source_path, &out_dir).await?;
        let extraction = self.extractor.extract(&pdf_path).await?;
        let quality_metrics = self.quality_gate.metrics(&extraction.text);
        info!(
            doc_id = %job_id,
            pdf = %pdf_path.display(),
            text_chars = quality_metrics.text_chars,
            "RFP extract: fallback extraction complete"
        );

        Ok(ExtractionRun {
            mode: ExtractionMode::FallbackPdf,
            extraction,
            quality_metrics,
            fallback_used: true,
            fallback_reason: assessment.reason,
            fallback_artifact_path: Some(pdf_path),
        })
    }

    pub async fn process_file(
        &self,
        path: &Path,
        original_name: &str,
        model: Option<&str>,
    ) -> Result<DocumentReport> {
        self.process_file_until_cancelled(path, original_name, model, &CancellationToken::new())
            .await
    }

    pub async fn process_file_until_cancelled(
        &self,
        path: &Path,
        original_name: &str,
        model: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<DocumentReport> {
        let id = generate_job_id(JOB_ID_PREFIX);
        let extension = extension_of(path).unwrap_or_default();
        info!(doc_id = %id, file = %original_name, "RFP extract: starting document");

        let run = match self.run(path, &extension, &id).await {
            Ok(run) => run,
            Err(err) => {
                error!(doc_id = %id, error = %err, "RFP extract: extraction failed");
                for (depth, cause) in err.chain().skip(1).enumerate() {
                    error!(doc_id = %id, cause_depth = depth + 1, cause = %cause, "caused by");
                }
                return Err(err);
            }
        };

        self.artifacts
            .save_extracted_text(&id, &run.extraction.text)
            .await?;
        self.artifacts
            .save_manifest(&id, original_name, &manifest(path, &run))
            .await?;

        let header = context_header(original_name, run.mode.as_str());
        let model_run = self
            .runner
            .run_until_cancelled(&run.extraction.text, Some(&header), model, cancel)
            .await;
        self.persist_model_run(&id, original_name, &model_run).await?;

        Ok(DocumentReport {
            id,
            file: original_name.to_string(),
            mode: run.mode,
            fallback_used: run.fallback_used,
            quality_metrics: Some(run.quality_metrics),
            meta: model_run.meta,
            result: model_run.result,
        })
    }

    /// Runs the model path over pasted text. No extraction or quality gate.
    pub async fn process_text(&self, text: &str, model: Option<&str>) -> Result<DocumentReport> {
        if text.trim().is_empty() {
            bail!("RFP text is empty");
        }
        let id = generate_job_id(JOB_ID_PREFIX);
        let file = "pasted_text";
        self.artifacts.save_extracted_text(&id, text).await?;

        let model_run = self.runner.run(text, None, model).await;
        self.persist_model_run(&id, file, &model_run).await?;

        Ok(DocumentReport {
            id,
            file: file.to_string(),
            mode: ExtractionMode::PastedText,
            fallback_used: false,
            quality_metrics: None,
            meta: model_run.meta,
            result: model_run.result,
        })
    }

    async fn persist_model_run(&self, id: &str, file: &str, model_run: &ModelRun) -> Result<()> {
        let raw = json!({
            "chunks": model_run.chunks,
            "merged": model_run.result,
            "meta": model_run.meta,
        });
        let paths = self
            .artifacts
            .save_model_outputs(id, file, &raw, &model_run.result)
            .await
            .context("failed to persist model outputs")?;
        info!(
            doc_id = %id,
            raw = %paths.raw_path.display(),
            structured = %paths.structured_path.display(),
            "RFP extract: saved model outputs"
        );
        Ok(())
    }
}

fn manifest(source_path: &Path, run: &ExtractionRun) -> Value {
    json!({
        "source_path": source_path.display().to_string(),
        "mode": run.mode,
        "engine": run.extraction.engine,
        "text_length": run.extraction.length,
        "text_sha256": compute_mdhash_id(&run.extraction.text, ""),
        "pages_count": run.extraction.pages.len(),
        "artifacts_dir": display_path(run.extraction.artifacts_dir.as_deref()),
        "quality_metrics": run.quality_metrics,
        "fallback_used": run.fallback_used,
        "fallback_reason": run.fallback_reason,
        "fallback_artifact_path": display_path(run.fallback_artifact_path.as_deref()),
    })
}

fn display_path(path: Option<&Path>) -> Option<String> {
    path.map(|path| path.display().to_string())
}
