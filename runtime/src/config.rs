use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config/app.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_working_dir")]
    pub working_dir: String,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chunking: ChunkConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            working_dir: default_working_dir(),
            llm: LlmConfig::default(),
            chunking: ChunkConfig::default(),
            quality: QualityConfig::default(),
            extraction: ExtractionConfig::default(),
            conversion: ConversionConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn working_dir(&self) -> PathBuf {
        PathBuf::from(&self.working_dir)
    }

    /// Applies the environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        if let Some(base) = env_string("LOCAL_LLM_BASE_URL") {
            self.llm.base_url = base;
        }
        if let Some(model) = env_string("LOCAL_LLM_DEFAULT_MODEL") {
            self.llm.default_model = model;
        }
        self.chunking.max_chars = env_parse("RFP_CHUNK_MAX_CHARS", self.chunking.max_chars);
        self.chunking.overlap_chars =
            env_parse("RFP_CHUNK_OVERLAP_CHARS", self.chunking.overlap_chars);
        self.quality.min_text_chars = env_parse("RFP_MIN_TEXT_CHARS", self.quality.min_text_chars);
        self.quality.max_image_placeholder_ratio = env_parse(
            "RFP_MAX_IMAGE_PLACEHOLDER_RATIO",
            self.quality.max_image_placeholder_ratio,
        );
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body cap for uploads, multipart framing included.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub default_model: String,
    pub allowed_models: Vec<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub models_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234".to_string(),
            default_model: "qwen2.5-vl-7b-instruct".to_string(),
            allowed_models: vec!["qwen2.5-vl-7b-instruct".to_string()],
            temperature: 0.3,
            max_tokens: 1200,
            timeout_secs: 180,
            models_timeout_secs: 5,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// A requested model is honoured only when it is on the allow-list.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim) {
            Some(name) if self.allowed_models.iter().any(|allowed| allowed == name) => {
                name.to_string()
            }
            _ => self.default_model.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    pub max_chars: i64,
    pub overlap_chars: i64,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: 12_000,
            overlap_chars: 2_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub min_text_chars: usize,
    pub max_image_placeholder_ratio: f64,
    pub image_placeholder_token: String,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 800,
            max_image_placeholder_ratio: 0.20,
            image_placeholder_token: "<!-- image -->".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Worker command; the source path is appended as `--file <path>`.
    pub worker_command: Vec<String>,
    pub plain_text_extensions: Vec<String>,
    pub supported_extensions: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            worker_command: vec!["python".to_string(), "scripts/extract_worker.py".to_string()],
            plain_text_extensions: vec!["txt".to_string(), "md".to_string()],
            supported_extensions: ["pdf", "doc", "docx", "ppt", "pptx", "txt", "md"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            timeout_secs: 600,
        }
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub soffice_binary: String,
    pub timeout_secs: u64,
    pub convertible_extensions: Vec<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            soffice_binary: "soffice".to_string(),
            timeout_secs: 300,
            convertible_extensions: ["doc", "docx", "ppt", "pptx"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl ConversionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub async fn load_config() -> Result<AppConfig> {
    let path = config_path();
    let mut config = if path.exists() {
        load_config_from(&path).await?
    } else {
        warn!(path = %path.display(), "Config file not found, using defaults");
        AppConfig::default()
    };
    config.apply_env_overrides();
    Ok(config)
}

pub async fn load_config_from(path: &Path) -> Result<AppConfig> {
    let contents = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config = parse_config(&contents)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    info!(path = %path.display(), "Configuration loaded from disk");
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    Ok(serde_yaml::from_str(contents)?)
}

fn config_path() -> PathBuf {
    env::var("APP_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(fallback)
}

fn default_working_dir() -> String {
    "uploads".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let config = parse_config(
            "working_dir: /tmp/rfp\nllm:\n  base_url: http://llm:1234\nchunking:\n  max_chars: 500\n",
        )
        .unwrap();
        assert_eq!(config.working_dir, "/tmp/rfp");
        assert_eq!(config.llm.base_url, "http://llm:1234");
        assert_eq!(config.llm.timeout_secs, 180);
        assert_eq!(config.chunking.max_chars, 500);
        assert_eq!(config.chunking.overlap_chars, 2_000);
        assert_eq!(config.quality.min_text_chars, 800);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_upload_bytes, 100 * 1024 * 1024);
        assert_eq!(config.extraction.timeout_secs, 600);
    }

    #[test]
    fn upload_cap_and_worker_timeout_are_configurable() {
        let config = parse_config(
            "server:\n  max_upload_bytes: 1048576\nextraction:\n  timeout_secs: 30\n",
        )
        .unwrap();
        assert_eq!(config.server.max_upload_bytes, 1_048_576);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.extraction.timeout().as_secs(), 30);
        assert_eq!(config.extraction.plain_text_extensions, vec!["txt", "md"]);
    }

    #[test]
    fn unknown_model_resolves_to_default() {
        let llm = LlmConfig::default();
        assert_eq!(llm.resolve_model(Some("gpt-unknown")), llm.default_model);
        assert_eq!(llm.resolve_model(None), llm.default_model);
        assert_eq!(
            llm.resolve_model(Some(" qwen2.5-vl-7b-instruct ")),
            "qwen2.5-vl-7b-instruct"
        );
    }
}
