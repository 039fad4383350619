use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use tokio::{process::Command, time::timeout};
use tracing::info;

use crate::config::ConversionConfig;

/// Converts an office document into a PDF placed inside `out_dir`.
#[async_trait]
pub trait PdfConverter: Send + Sync {
    async fn convert(&self, source: &Path, out_dir: &Path) -> Result<PathBuf>;
}

/// Headless LibreOffice conversion.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    binary: String,
    timeout: Duration,
}

impl SofficeConverter {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            binary: config.soffice_binary.clone(),
            timeout: config.timeout(),
        }
    }

    fn command(&self, source: &Path, out_dir: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        command
            .args([
                "--headless",
                "--nologo",
                "--nolockcheck",
                "--nodefault",
                "--nofirststartwizard",
                "--convert-to",
                "pdf",
                "--outdir",
            ])
            .arg(out_dir)
            .arg(source)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl PdfConverter for SofficeConverter {
    async fn convert(&self, source: &Path, out_dir: &Path) -> Result<PathBuf> {
        if !source.is_file() {
            bail!("Input file not found: {}", source.display());
        }
        tokio::fs::create_dir_all(out_dir)
            .await
            .with_context(|| format!("failed to create conversion dir {}", out_dir.display()))?;

        let output = timeout(self.timeout, self.command(source, out_dir).output())
            .await
            .map_err(|_| {
                anyhow!(
                    "LibreOffice conversion timed out after {}s",
                    self.timeout.as_secs()
                )
            })?
            .with_context(|| format!("failed to launch `{}`", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            bail!(
                "LibreOffice conversion failed: {}",
                if stderr.is_empty() { "unknown error" } else { stderr }
            );
        }

        let pdf_path = expected_pdf_path(source, out_dir)?;
        if !pdf_path.exists() {
            bail!("PDF conversion did not produce an output file");
        }
        info!(source = %source.display(), pdf = %pdf_path.display(), "converted document to PDF");
        Ok(pdf_path)
    }
}

fn expected_pdf_path(source: &Path, out_dir: &Path) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .ok_or_else(|| anyhow!("source has no file name: {}", source.display()))?;
    let mut file_name = stem.to_os_string();
    file_name.push(".pdf");
    Ok(out_dir.join(file_name))
}
