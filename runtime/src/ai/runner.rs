use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::{ChunkConfig, LlmConfig},
    pipeline::{
        chunker::{CharWindowChunker, Chunk, Chunker, into_chunks},
        merge::{merge, total_failure},
        normalize::{SchemaMatch, normalize},
        utils::truncate_chars,
    },
};

use super::{
    chat::{ChatModel, ChatRequest},
    prompts::{SYSTEM_PROMPT, user_prompt},
    schemas::CanonicalResult,
};

const RAW_LOG_CHARS: usize = 2000;
const SNIPPET_LOG_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    Parsed,
    Failed,
    Skipped,
}

/// What happened to one chunk, kept for the audit sink.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkTrace {
    pub index: usize,
    pub total: usize,
    pub status: ChunkStatus,
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub model: String,
    pub chunk_count: usize,
    pub chunk_lengths: Vec<usize>,
    pub failures: usize,
    pub unrecognized_chunks: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone)]
pub struct ModelRun {
    pub result: CanonicalResult,
    pub meta: RunMeta,
    pub chunks: Vec<ChunkTrace>,
}

struct ChunkAttempt {
    raw: Option<String>,
    parsed: Map<String, Value>,
}

pub struct ModelRunner {
    client: Arc<dyn ChatModel>,
    chunker: Arc<dyn Chunker>,
    llm: LlmConfig,
    chunking: ChunkConfig,
}

impl ModelRunner {
    pub fn new(client: Arc<dyn ChatModel>, llm: LlmConfig, chunking: ChunkConfig) -> Self {
        Self::with_chunker(client, Arc::new(CharWindowChunker), llm, chunking)
    }

    pub fn with_chunker(
        client: Arc<dyn ChatModel>,
        chunker: Arc<dyn Chunker>,
        llm: LlmConfig,
        chunking: ChunkConfig,
    ) -> Self {
        Self {
            client,
            chunker,
            llm,
            chunking,
        }
    }

    pub fn llm_config(&self) -> &LlmConfig {
        &self.llm
    }

    pub async fn run(
        &self,
        text: &str,
        context_header: Option<&str>,
        model_name: Option<&str>,
    ) -> ModelRun {
        self.run_until_cancelled(text, context_header, model_name, &CancellationToken::new())
            .await
    }

    /// Sends chunks one at a time in index order and folds each result into
    /// the accumulator as soon as it arrives. Cancellation is only observed
    /// between chunks.
    pub async fn run_until_cancelled(
        &self,
        text: &str,
        context_header: Option<&str>,
        model_name: Option<&str>,
        cancel: &CancellationToken,
    ) -> ModelRun {
        let model = self.llm.resolve_model(model_name);
        let chunks = into_chunks(self.chunker.chunk(text, &self.chunking), context_header);
        info!(model = %model, chunks = chunks.len(), "RFP model: starting run");

        let mut meta = RunMeta {
            model: model.clone(),
            chunk_count: chunks.len(),
            chunk_lengths: chunks.iter().map(|chunk| chunk.text.chars().count()).collect(),
            failures: 0,
            unrecognized_chunks: 0,
            cancelled: false,
        };
        let mut traces = Vec::with_capacity(chunks.len());
        let mut merged = CanonicalResult::default();

        for chunk in &chunks {
            if cancel.is_cancelled() {
                meta.cancelled = true;
                traces.push(ChunkTrace {
                    index: chunk.index,
                    total: chunk.total,
                    status: ChunkStatus::Skipped,
                    raw: None,
                });
                continue;
            }

            let attempt = self.process_chunk(chunk, &model).await;
            let normalized = normalize(&Value::Object(attempt.parsed));
            if normalized.schema == SchemaMatch::Unrecognized && attempt.raw.is_some() {
                meta.unrecognized_chunks += 1;
            }

            let status = if normalized.result.is_empty() {
                meta.failures += 1;
                warn!(chunk = chunk.index, total = chunk.total, "RFP model: chunk produced no usable data");
                ChunkStatus::Failed
            } else {
                merged = merge(merged, normalized.result);
                ChunkStatus::Parsed
            };

            traces.push(ChunkTrace {
                index: chunk.index,
                total: chunk.total,
                status,
                raw: attempt.raw,
            });
        }

        let attempted = traces
            .iter()
            .filter(|trace| trace.status != ChunkStatus::Skipped)
            .count();
        if attempted > 0 && meta.failures == attempted {
            warn!(failures = meta.failures, "RFP model: every chunk failed");
            merged = total_failure();
        }

        log_counts(&merged);
        ModelRun {
            result: merged,
            meta,
            chunks: traces,
        }
    }

    /// Calls the model for one chunk. Any failure yields an empty object.
    async fn process_chunk(&self, chunk: &Chunk, model: &str) -> ChunkAttempt {
        let request = ChatRequest::new(
            model,
            &self.llm,
            SYSTEM_PROMPT.to_string(),
            user_prompt(chunk),
        );

        let raw = match self.client.complete(&request).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(chunk = chunk.index, total = chunk.total, error = %err, "RFP model: request failed");
                for (depth, cause) in err.chain().skip(1).enumerate() {
                    warn!(chunk = chunk.index, cause_depth = depth + 1, cause = %cause, "caused by");
                }
                return ChunkAttempt {
                    raw: None,
                    parsed: Map::new(),
                };
            }
        };

        info!(
            chunk = chunk.index,
            total = chunk.total,
            raw_response = %truncate_chars(&raw, RAW_LOG_CHARS),
            "RFP model: raw response"
        );
        let parsed = recover_json_object(&raw, chunk.index);
        ChunkAttempt {
            raw: Some(raw),
            parsed,
        }
    }
}

/// Recovers a JSON object from free-form model text: strips code fences,
/// takes the span from the first `{` to the last `}` and parses it.
pub fn recover_json_object(raw: &str, chunk_index: usize) -> Map<String, Value> {
    let mut cleaned = raw.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    let cleaned = cleaned.trim();

    let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) else {
        return Map::new();
    };
    if end <= start {
        return Map::new();
    }

    let snippet = &cleaned[start..=end];
    match serde_json::from_str::<Value>(snippet) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(err) => {
            warn!(chunk = chunk_index, error = %err, "RFP model: json parse failed");
            warn!(
                chunk = chunk_index,
                snippet = %truncate_chars(snippet, SNIPPET_LOG_CHARS),
                "RFP model: json snippet"
            );
            Map::new()
        }
    }
}

fn log_counts(result: &CanonicalResult) {
    let checklist = &result.requirements_checklist;
    info!(
        company = checklist.company.len(),
        team = checklist.team.len(),
        technical = checklist.technical.len(),
        financial = checklist.financial.len(),
        submission = checklist.submission.len(),
        deliverables = checklist.deliverables_timeline.len(),
        evaluation = checklist.evaluation_criteria.len(),
        risks = checklist.risks_red_flags.len(),
        "RFP model: counts"
    );
}
