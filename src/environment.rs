use anyhow::{anyhow, Result};
use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;
use std::env;
use std::str::FromStr;
use tracing::info;

use crate::clustering::{ClusteringOptions, ClusteringStrategy};
use crate::LLMClient;

/// Which LLM backend `LLM_TYPE` selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmType {
    Ollama,
    OpenAI,
}

/// Runtime configuration read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_path: String,
    pub log_dir: String,
    /// Raw `LLM_TYPE`, checked by [`Settings::build_llm_client`]
    pub llm_type: String,
    pub ollama_host: String,
    pub ollama_port: u16,
    pub openai_api_key: Option<String>,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub cost_per_1k_tokens: f64,
    /// Raw `CLUSTER_STRATEGY`, checked by [`Settings::clustering_options`]
    pub cluster_strategy: String,
    pub max_cluster_size: usize,
    pub min_cluster_size: usize,
    pub gpa_weight: Option<f64>,
    pub interest_weight: Option<f64>,
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// Unparseable numbers fall back to their defaults. `LLM_TYPE` and `CLUSTER_STRATEGY`
    /// are validated when they are used, so a bad value only fails the commands that need
    /// it.
    pub fn from_env() -> Self {
        Settings::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Settings::from_env`] with a caller-supplied lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_or = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let defaults = ClusteringOptions::default();

        Settings {
            database_path: string_or("DATABASE_PATH", "cohort.db"),
            log_dir: string_or("LOG_DIR", "logs"),
            llm_type: string_or("LLM_TYPE", "ollama"),
            ollama_host: string_or("OLLAMA_HOST", "localhost"),
            ollama_port: parsed(&lookup, "OLLAMA_PORT").unwrap_or(11434),
            openai_api_key: lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            llm_model: string_or("LLM_MODEL", "llama3.1"),
            llm_temperature: parsed(&lookup, "LLM_TEMPERATURE").unwrap_or(0.2),
            cost_per_1k_tokens: parsed(&lookup, "LLM_COST_PER_1K_TOKENS").unwrap_or(0.0),
            cluster_strategy: string_or("CLUSTER_STRATEGY", ClusteringStrategy::MajorLevel.as_str()),
            max_cluster_size: parsed(&lookup, "MAX_CLUSTER_SIZE").unwrap_or(defaults.max_cluster_size),
            min_cluster_size: parsed(&lookup, "MIN_CLUSTER_SIZE").unwrap_or(defaults.min_cluster_size),
            gpa_weight: parsed(&lookup, "GPA_WEIGHT"),
            interest_weight: parsed(&lookup, "INTEREST_WEIGHT"),
        }
    }

    /// Backend named by `LLM_TYPE`
    pub fn llm_type(&self) -> Result<LlmType> {
        match self.llm_type.to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmType::Ollama),
            "openai" => Ok(LlmType::OpenAI),
            other => Err(anyhow!("Unknown LLM_TYPE '{}', expected ollama or openai", other)),
        }
    }

    /// Clustering options from the configured strategy, size bounds and weights.
    ///
    /// `strategy` replaces `CLUSTER_STRATEGY` when given; whichever name is used must be a
    /// known strategy.
    pub fn clustering_options(&self, strategy: Option<&str>) -> Result<ClusteringOptions> {
        let strategy = ClusteringStrategy::from_str(strategy.unwrap_or(&self.cluster_strategy))?;

        Ok(ClusteringOptions {
            gpa_weight: self.gpa_weight,
            interest_weight: self.interest_weight,
            ..ClusteringOptions::new(strategy, self.min_cluster_size, self.max_cluster_size)
        })
    }

    /// Builds the configured LLM client.
    ///
    /// # Returns
    ///
    /// An error when `LLM_TYPE=openai` and no `OPENAI_API_KEY` is set.
    pub fn build_llm_client(&self) -> Result<LLMClient> {
        match self.llm_type()? {
            LlmType::OpenAI => {
                let api_key = self
                    .openai_api_key
                    .clone()
                    .ok_or_else(|| anyhow!("OPENAI_API_KEY must be set when LLM_TYPE=openai"))?;
                let config = OpenAIConfig::new().with_api_key(api_key);
                Ok(LLMClient::OpenAI(OpenAIClient::with_config(config)))
            }
            LlmType::Ollama => {
                let host = if self.ollama_host.starts_with("http") {
                    self.ollama_host.clone()
                } else {
                    format!("http://{}", self.ollama_host)
                };
                info!("Connecting to Ollama at {}:{}", host, self.ollama_port);
                Ok(LLMClient::Ollama(Ollama::new(host, self.ollama_port)))
            }
        }
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}
