use std::sync::Arc;

pub mod ai;
pub mod config;
pub mod pipeline;
pub mod routes;
pub mod storage;

use ai::chat::ChatCompletionsClient;
use config::AppConfig;
use pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<Pipeline>,
    pub llm_client: Arc<ChatCompletionsClient>,
}
