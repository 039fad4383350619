use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;

use super::utils::normalize_extension;

#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn create_dir_all(&self, path: &Path) -> Result<()>;
    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn exists(&self, path: &Path) -> bool;
}

#[derive(Debug, Default, Clone)]
pub struct FsFileRepository;

#[async_trait]
impl FileRepository for FsFileRepository {
    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .with_context(|| format!("failed to create directory {}", path.display()))
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("failed to write file {}", path.display()))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read file {}", path.display()))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Owns the directory where original uploads are kept.
#[derive(Clone)]
pub struct DocumentManager {
    input_dir: PathBuf,
    supported_extensions: HashSet<String>,
    file_repo: Arc<dyn FileRepository>,
}

impl DocumentManager {
    pub async fn new<P>(input_dir: P, supported_extensions: &[String]) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        Self::with_repository(input_dir, supported_extensions, Arc::new(FsFileRepository)).await
    }

    pub async fn with_repository<P>(
        input_dir: P,
        supported_extensions: &[String],
        file_repo: Arc<dyn FileRepository>,
    ) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let input_dir = input_dir.as_ref().to_path_buf();
        file_repo
            .create_dir_all(&input_dir)
            .await
            .with_context(|| {
                format!("failed to create input directory at {}", input_dir.display())
            })?;

        Ok(Self {
            input_dir,
            supported_extensions: supported_extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
            file_repo,
        })
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn file_repo(&self) -> Arc<dyn FileRepository> {
        self.file_repo.clone()
    }

    pub fn is_supported_file(&self, filename: &str) -> bool {
        match extension_of(Path::new(filename)) {
            Some(ext) => self.supported_extensions.contains(&ext),
            None => false,
        }
    }

    pub fn sanitize_filename(&self, raw: &str) -> Result<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("filename cannot be empty"));
        }

        if trimmed.contains('/') || trimmed.contains('\\') || matches!(trimmed, "." | "..") {
            return Err(anyhow!("invalid filename"));
        }

        Ok(trimmed.to_string())
    }

    /// Writes an upload into the input directory without overwriting an
    /// existing file and returns where it landed.
    pub async fn store_upload(&self, raw_filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let filename = self.sanitize_filename(raw_filename)?;
        if !self.is_supported_file(&filename) {
            return Err(anyhow!("unsupported file type: {filename}"));
        }
        let unique_name = self.unique_filename(&self.input_dir, &filename);
        let target = self.input_dir.join(unique_name);
        self.file_repo.write(&target, bytes).await?;
        Ok(target)
    }

    fn unique_filename(&self, dir: &Path, original: &str) -> String {
        if !self.file_repo.exists(&dir.join(original)) {
            return original.to_owned();
        }

        let original_path = Path::new(original);
        let stem = original_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(original)
            .to_string();
        let ext = original_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();

        let mut counter = 1usize;
        loop {
            let candidate_name = if ext.is_empty() {
                format!("{}_{}", stem, counter)
            } else {
                format!("{}_{}.{}", stem, counter, ext)
            };

            if !self.file_repo.exists(&dir.join(&candidate_name)) {
                return candidate_name;
            }

            counter += 1;
        }
    }
}

pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|os| os.to_str())
        .map(normalize_extension)
}
