use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{process::Command, time::timeout};
use tracing::info;

use super::{
    document_manager::{FileRepository, FsFileRepository},
    utils::normalize_extension,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageText {
    pub page: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub length: usize,
    pub pages: Vec<PageText>,
    pub artifacts_dir: Option<PathBuf>,
    pub engine: String,
}

impl ExtractedText {
    pub fn new(text: String, engine: &str) -> Self {
        Self {
            length: text.chars().count(),
            text,
            pages: Vec::new(),
            artifacts_dir: None,
            engine: engine.to_string(),
        }
    }
}

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, file_path: &Path) -> Result<ExtractedText>;
}

#[derive(Clone)]
pub struct Utf8DocumentExtractor {
    file_repo: Arc<dyn FileRepository>,
}

impl Utf8DocumentExtractor {
    pub fn new(file_repo: Arc<dyn FileRepository>) -> Self {
        Self { file_repo }
    }
}

impl Default for Utf8DocumentExtractor {
    fn default() -> Self {
        Self::new(Arc::new(FsFileRepository))
    }
}

#[async_trait]
impl DocumentExtractor for Utf8DocumentExtractor {
    async fn extract(&self, file_path: &Path) -> Result<ExtractedText> {
        let bytes = self.file_repo.read(file_path).await?;
        if bytes.is_empty() {
            return Err(anyhow!("file content is empty"));
        }

        let text = String::from_utf8(bytes).map_err(|_| anyhow!("file is not valid UTF-8"))?;
        if text.trim().is_empty() {
            return Err(anyhow!("file contains only whitespace"));
        }

        Ok(ExtractedText::new(text, "utf8"))
    }
}

/// Payload printed on stdout by the extraction worker.
#[derive(Debug, Deserialize)]
struct WorkerPayload {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<PageText>,
    #[serde(default)]
    artifacts_dir: Option<PathBuf>,
    #[serde(default)]
    engine: Option<String>,
}

/// Runs an external document-AI worker in its own process and reads its
/// JSON result from stdout. The worker is killed when it overruns `timeout`
/// or when the awaiting request is dropped.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    command: Vec<String>,
    timeout: Duration,
}

impl CommandExtractor {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

#[async_trait]
impl DocumentExtractor for CommandExtractor {
    async fn extract(&self, file_path: &Path) -> Result<ExtractedText> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("extraction worker command is not configured"))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .arg("--file")
            .arg(file_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                anyhow!(
                    "extract_worker timed out after {}s",
                    self.timeout.as_secs_f64()
                )
            })?
            .with_context(|| format!("failed to launch extraction worker `{program}`"))?;
        info!(file = %file_path.display(), status = %output.status, "extraction worker finished");

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("extract_worker failed: {}", stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            bail!("extract_worker returned no output");
        }

        let payload: WorkerPayload =
            serde_json::from_str(stdout).context("extract_worker returned invalid JSON")?;
        if payload.text.is_empty() {
            bail!("extraction produced empty text for {}", file_path.display());
        }

        let engine = payload.engine.unwrap_or_else(|| "worker".to_string());
        let mut extracted = ExtractedText::new(payload.text, &engine);
        extracted.pages = payload.pages;
        extracted.artifacts_dir = payload.artifacts_dir;
        Ok(extracted)
    }
}

/// Sends plain-text uploads to one extractor and everything else to another.
pub struct RoutingExtractor {
    plain_text_extensions: Vec<String>,
    plain: Arc<dyn DocumentExtractor>,
    rich: Arc<dyn DocumentExtractor>,
}

impl RoutingExtractor {
    pub fn new(
        plain_text_extensions: &[String],
        plain: Arc<dyn DocumentExtractor>,
        rich: Arc<dyn DocumentExtractor>,
    ) -> Self {
        Self {
            plain_text_extensions: plain_text_extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
            plain,
            rich,
        }
    }
}

#[async_trait]
impl DocumentExtractor for RoutingExtractor {
    async fn extract(&self, file_path: &Path) -> Result<ExtractedText> {
        let extension = file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(normalize_extension)
            .unwrap_or_default();

        if self.plain_text_extensions.contains(&extension) {
            self.plain.extract(file_path).await
        } else {
            self.rich.extract(file_path).await
        }
    }
}
