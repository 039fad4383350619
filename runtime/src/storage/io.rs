use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::StorageResult;

pub async fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    Ok(())
}

/// Atomically write json to disk using a temp file + rename.
///
/// The write is fsync'd to ensure durability.
pub async fn write_json_file<T>(path: &Path, value: &T) -> StorageResult<()>
where
    T: Serialize,
{
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json).await
}

pub async fn write_text_file(path: &Path, text: &str) -> StorageResult<()> {
    write_atomic(path, text.as_bytes()).await
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    ensure_parent_dir(path).await?;

    let tmp_path = temp_path(path);

    let mut file = fs::File::create(&tmp_path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;

    fs::rename(&tmp_path, path).await?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let file_name = path
        .file_name()
        .map(|name| format!("{}.tmp", name.to_string_lossy()))
        .unwrap_or_else(|| "tmp.out".to_string());
    tmp.set_file_name(file_name);
    tmp
}
