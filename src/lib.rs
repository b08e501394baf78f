pub mod clustering;
pub mod customization;
pub mod db;
pub mod environment;
pub mod llm;
pub mod logging;
pub mod prompts;
pub mod workflow;

use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;

pub const TARGET_CLUSTERING: &str = "clustering";
pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_DB: &str = "db_query";

#[derive(Clone, Debug)]
pub enum LLMClient {
    Ollama(Ollama),
    OpenAI(OpenAIClient<OpenAIConfig>),
}

#[derive(Clone, Debug)]
pub struct LLMParams {
    pub llm_client: LLMClient,
    pub model: String,
    pub temperature: f32,
}

/// Text and token accounting returned by a single completed LLM call
#[derive(Clone, Debug, Default)]
pub struct LLMResponse {
    pub text: String,
    pub tokens_used: u32,
}
