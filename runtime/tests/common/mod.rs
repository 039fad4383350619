#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use rfp_extract::{
    ai::{
        chat::{ChatModel, ChatRequest},
        runner::ModelRunner,
    },
    config::{ChunkConfig, LlmConfig},
    pipeline::{DocumentExtractor, ExtractedText, PdfConverter},
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Replies with queued responses in order; `Err` entries simulate transport failures.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedModel {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, String>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn cancelling_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let calls = {
            let mut requests = self.requests.lock().expect("requests lock");
            requests.push(request.clone());
            requests.len()
        };
        if let Some((limit, token)) = &self.cancel_after {
            if calls >= *limit {
                token.cancel();
            }
        }
        let reply = self
            .replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err("no scripted reply left".to_string()));
        reply.map_err(|message| anyhow!(message))
    }
}

pub fn runner(model: Arc<dyn ChatModel>) -> ModelRunner {
    ModelRunner::new(model, LlmConfig::default(), ChunkConfig::default())
}

/// Extractor returning canned text per file name and recording every call.
#[derive(Default)]
pub struct FakeExtractor {
    texts: HashMap<String, Result<String, String>>,
    calls: Mutex<Vec<PathBuf>>,
}

impl FakeExtractor {
    pub fn with_text(mut self, file_name: &str, text: impl Into<String>) -> Self {
        self.texts.insert(file_name.to_string(), Ok(text.into()));
        self
    }

    pub fn with_error(mut self, file_name: &str, message: &str) -> Self {
        self.texts
            .insert(file_name.to_string(), Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl DocumentExtractor for FakeExtractor {
    async fn extract(&self, file_path: &Path) -> Result<ExtractedText> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(file_path.to_path_buf());
        let name = file_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        match self.texts.get(name) {
            Some(Ok(text)) => Ok(ExtractedText::new(text.clone(), "fake")),
            Some(Err(message)) => bail!("{message}"),
            None => bail!("no fixture for {name}"),
        }
    }
}

pub const FAKE_PDF: &[u8] = b"%PDF-1.4 fake";

/// Converter that writes a stub `<stem>.pdf` into the output directory.
#[derive(Default)]
pub struct FakeConverter {
    fail_with: Option<String>,
    calls: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl FakeConverter {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl PdfConverter for FakeConverter {
    async fn convert(&self, source: &Path, out_dir: &Path) -> Result<PathBuf> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((source.to_path_buf(), out_dir.to_path_buf()));
        if let Some(message) = &self.fail_with {
            bail!("LibreOffice conversion failed: {message}");
        }
        let stem = source
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("converted");
        let pdf_path = out_dir.join(format!("{stem}.pdf"));
        tokio::fs::create_dir_all(out_dir).await?;
        tokio::fs::write(&pdf_path, FAKE_PDF).await?;
        Ok(pdf_path)
    }
}

pub fn long_text(chars: usize) -> String {
    "Bidders shall submit. ".chars().cycle().take(chars).collect()
}

pub fn chunk_reply(value: Value) -> Result<String, String> {
    Ok(value.to_string())
}

pub fn title_reply(title: &str, requirement: &str) -> Result<String, String> {
    chunk_reply(json!({
        "rfp_title": title,
        "requirements_checklist": {
            "technical": [
                {"requirement": requirement, "strength": "mandatory"}
            ]
        }
    }))
}
