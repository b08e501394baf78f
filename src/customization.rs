//! Per-cluster question customization.
//!
//! The LLM call sits behind [`QuestionCustomizer`], so callers and tests can swap the
//! model-backed [`LlmCustomizer`] for another implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clustering::{Cluster, ClusterCharacteristics, ClusterCriteria};
use crate::db::cluster::StoredCluster;
use crate::llm::generate_llm_response;
use crate::prompts::customization_prompt;
use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

/// Label used when a cluster spans several academic levels
pub const MIXED_LEVEL: &str = "Mixed";

/// What the LLM is told about a cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterProfile {
    pub major: String,
    pub academic_level: String,
    pub career_interests: Vec<String>,
    #[serde(rename = "averageGPA")]
    pub average_gpa: f64,
}

impl ClusterProfile {
    fn from_parts(characteristics: &ClusterCharacteristics, criteria: &ClusterCriteria) -> Self {
        ClusterProfile {
            major: characteristics
                .dominant_major
                .clone()
                .or_else(|| criteria.major.clone())
                .unwrap_or_else(|| "General".to_string()),
            academic_level: criteria
                .academic_level
                .map(|level| level.to_string())
                .unwrap_or_else(|| MIXED_LEVEL.to_string()),
            career_interests: characteristics.common_interests.clone(),
            average_gpa: characteristics.average_gpa,
        }
    }
}

impl From<&Cluster> for ClusterProfile {
    fn from(cluster: &Cluster) -> Self {
        ClusterProfile::from_parts(&cluster.characteristics, &cluster.criteria)
    }
}

impl From<&StoredCluster> for ClusterProfile {
    fn from(cluster: &StoredCluster) -> Self {
        ClusterProfile::from_parts(&cluster.characteristics, &cluster.criteria)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizationOptions {
    pub temperature: f32,
    pub preserve_difficulty: bool,
    pub include_context: bool,
}

impl Default for CustomizationOptions {
    fn default() -> Self {
        CustomizationOptions {
            temperature: 0.2,
            preserve_difficulty: true,
            include_context: true,
        }
    }
}

/// Result of customizing one question for one cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizationOutcome {
    pub customized_text: String,
    pub context: String,
    pub tokens_used: u32,
    pub cost: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CustomizationOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        CustomizationOutcome {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait QuestionCustomizer: Send + Sync {
    /// Rewrites `question` for the cluster described by `profile`. Never panics; failures
    /// come back as an outcome with `success == false`.
    async fn customize(
        &self,
        question: &str,
        profile: &ClusterProfile,
        options: &CustomizationOptions,
    ) -> CustomizationOutcome;
}

/// Cost of `tokens` at a price quoted per thousand tokens
pub fn estimate_cost(tokens: u32, cost_per_1k_tokens: f64) -> f64 {
    tokens as f64 / 1000.0 * cost_per_1k_tokens
}

#[derive(Deserialize)]
struct CustomizationReply {
    customized_question: String,
    #[serde(default)]
    context: String,
}

/// Extracts `(customized_text, context)` from a model reply.
///
/// Looks for the JSON object the prompt asks for, tolerating code fences and chatter
/// around it. Anything else is used verbatim with an empty context.
pub fn parse_customization_reply(reply: &str) -> (String, String) {
    let trimmed = reply.trim();

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(parsed) = serde_json::from_str::<CustomizationReply>(&trimmed[start..=end]) {
                if !parsed.customized_question.trim().is_empty() {
                    return (
                        parsed.customized_question.trim().to_string(),
                        parsed.context.trim().to_string(),
                    );
                }
            }
        }
    }

    (trimmed.to_string(), String::new())
}

/// Customizer backed by an Ollama or OpenAI model
pub struct LlmCustomizer {
    llm_client: LLMClient,
    model: String,
    cost_per_1k_tokens: f64,
}

impl LlmCustomizer {
    pub fn new(llm_client: LLMClient, model: &str, cost_per_1k_tokens: f64) -> Self {
        LlmCustomizer {
            llm_client,
            model: model.to_string(),
            cost_per_1k_tokens,
        }
    }
}

#[async_trait]
impl QuestionCustomizer for LlmCustomizer {
    async fn customize(
        &self,
        question: &str,
        profile: &ClusterProfile,
        options: &CustomizationOptions,
    ) -> CustomizationOutcome {
        let prompt = customization_prompt(question, profile, options);
        let params = LLMParams {
            llm_client: self.llm_client.clone(),
            model: self.model.clone(),
            temperature: options.temperature,
        };

        match generate_llm_response(&prompt, &params).await {
            Some(response) => {
                let (customized_text, context) = parse_customization_reply(&response.text);
                info!(
                    target: TARGET_LLM_REQUEST,
                    "Customized question for {} {} ({} tokens)",
                    profile.academic_level,
                    profile.major,
                    response.tokens_used
                );
                CustomizationOutcome {
                    customized_text,
                    context,
                    tokens_used: response.tokens_used,
                    cost: estimate_cost(response.tokens_used, self.cost_per_1k_tokens),
                    success: true,
                    error: None,
                }
            }
            None => {
                warn!(
                    target: TARGET_LLM_REQUEST,
                    "Failed to customize question for {} {}", profile.academic_level, profile.major
                );
                CustomizationOutcome::failure("LLM did not return a response")
            }
        }
    }
}
