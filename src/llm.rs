use anyhow::{anyhow, Result};
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use std::time::Duration;
use tokio::time::sleep;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::{LLMClient, LLMParams, LLMResponse, TARGET_LLM_REQUEST};

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Sends `prompt` to the configured LLM, retrying with exponential backoff.
///
/// Returns `None` once every attempt has failed or timed out.
pub async fn generate_llm_response(prompt: &str, params: &LLMParams) -> Option<LLMResponse> {
    let mut backoff = 2;

    debug!(target: TARGET_LLM_REQUEST, "Starting LLM response generation for prompt: {}", prompt);

    for retry_count in 0..MAX_RETRIES {
        match timeout(REQUEST_TIMEOUT, send_request(prompt, params)).await {
            Ok(Ok(response)) if !response.text.trim().is_empty() => {
                debug!(
                    target: TARGET_LLM_REQUEST,
                    "LLM response received ({} tokens): {}", response.tokens_used, response.text
                );
                return Some(response);
            }
            Ok(Ok(_)) => {
                warn!(target: TARGET_LLM_REQUEST, "LLM returned an empty response");
            }
            Ok(Err(e)) => {
                warn!(target: TARGET_LLM_REQUEST, "Error generating response: {}", e);
            }
            Err(_) => {
                warn!(target: TARGET_LLM_REQUEST, "LLM request timed out");
            }
        }

        if retry_count < MAX_RETRIES - 1 {
            info!(
                target: TARGET_LLM_REQUEST,
                "Retrying LLM request in {} seconds... ({}/{})",
                backoff,
                retry_count + 1,
                MAX_RETRIES
            );
            sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }

    error!(target: TARGET_LLM_REQUEST, "No response generated after {} attempts", MAX_RETRIES);
    None
}

async fn send_request(prompt: &str, params: &LLMParams) -> Result<LLMResponse> {
    match &params.llm_client {
        LLMClient::Ollama(ollama) => {
            let request = GenerationRequest::new(params.model.clone(), prompt.to_string())
                .options(GenerationOptions::default().temperature(params.temperature));

            let response = ollama.generate(request).await?;
            let tokens_used = response.prompt_eval_count.unwrap_or(0) as u32
                + response.eval_count.unwrap_or(0) as u32;

            Ok(LLMResponse {
                text: response.response,
                tokens_used,
            })
        }
        LLMClient::OpenAI(client) => {
            let request = CreateChatCompletionRequestArgs::default()
                .model(params.model.clone())
                .temperature(params.temperature)
                .messages([ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into()])
                .build()?;

            let response = client.chat().create(request).await?;
            let text = response
                .choices
                .first()
                .and_then(|choice| choice.message.content.clone())
                .ok_or_else(|| anyhow!("OpenAI response contained no content"))?;
            let tokens_used = response.usage.map(|u| u.total_tokens).unwrap_or(0);

            Ok(LLMResponse { text, tokens_used })
        }
    }
}
