//! Google Gemini `generateContent` client and adapter.

use async_trait::async_trait;
use scenegen_core::job::JobSpec;
use scenegen_core::result::{Completion, Usage};
use serde::{Deserialize, Serialize};

use crate::adapter::ProviderAdapter;
use crate::config::BackendConfig;
use crate::error::ProviderError;
use crate::http::{build_client, merge_params, parse_response};

const PROVIDER: &str = "gemini";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<&'static str>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// Body of `POST /v1beta/models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub generation_config: GenerationConfig,
    #[serde(skip)]
    pub extra: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: ResponseContent,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: Option<u64>,
    #[serde(default)]
    pub candidates_token_count: Option<u64>,
    #[serde(default)]
    pub total_token_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    pub model_version: Option<String>,
}

/// Prompt completion through Gemini.
pub struct GeminiPromptAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiPromptAdapter {
    pub fn new(config: &BackendConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            base_url: config.base_url.clone(),
            api_key: config.require_key(PROVIDER)?.to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ProviderAdapter for GeminiPromptAdapter {
    type Params = GenerateRequest;
    type Response = GenerateResponse;

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn prepare(&self, spec: &JobSpec) -> Result<GenerateRequest, ProviderError> {
        if spec.prompt.trim().is_empty() {
            return Err(ProviderError::InvalidInput("prompt must not be empty".into()));
        }
        Ok(GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: spec.prompt.clone(),
                }],
            }],
            system_instruction: spec.system_prompt.as_ref().map(|system| Content {
                role: None,
                parts: vec![Part {
                    text: system.clone(),
                }],
            }),
            generation_config: GenerationConfig {
                max_output_tokens: spec.max_tokens,
                temperature: spec.temperature,
            },
            extra: spec.additional_params.clone(),
        })
    }

    async fn invoke(&self, params: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let mut body = serde_json::to_value(&params)?;
        merge_params(&mut body, params.extra.as_ref());

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        parse_response(PROVIDER, response).await
    }

    fn extract(&self, response: &GenerateResponse) -> Result<String, ProviderError> {
        let text: String = response
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect()
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse(PROVIDER));
        }
        Ok(text)
    }

    fn summarize(&self, response: &GenerateResponse, content: String) -> Completion {
        let usage = response.usage_metadata.clone().unwrap_or_default();
        Completion {
            content,
            model: response
                .model_version
                .clone()
                .unwrap_or_else(|| self.model.clone()),
            usage: Usage::from_counts(
                usage.prompt_token_count,
                usage.candidates_token_count,
                usage.total_token_count,
            ),
        }
    }
}
