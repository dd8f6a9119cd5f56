//! Text-to-image generation against an OpenAI-compatible images endpoint.

use async_trait::async_trait;
use scenegen_core::job::JobSpec;
use scenegen_core::result::{Completion, Usage};
use serde::{Deserialize, Serialize};

use crate::adapter::ProviderAdapter;
use crate::config::BackendConfig;
use crate::error::ProviderError;
use crate::http::{build_client, merge_params, parse_response};

const PROVIDER: &str = "images";

/// Body of `POST /v1/images/generations`.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub n: u32,
    pub size: String,
    pub response_format: &'static str,
    #[serde(skip)]
    pub extra: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub b64_json: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageUsage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageResponse {
    #[serde(default)]
    pub data: Vec<ImageData>,
    #[serde(default)]
    pub usage: Option<ImageUsage>,
}

/// Generates one image per job. The content is a `data:image/png;base64,`
/// URI, or the hosted URL when the backend ignores `response_format`.
pub struct ImageGenerationAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    size: String,
}

impl ImageGenerationAdapter {
    pub fn new(config: &BackendConfig, size: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            base_url: config.base_url.clone(),
            api_key: config.require_key(PROVIDER)?.to_string(),
            model: config.model.clone(),
            size: size.to_string(),
        })
    }
}

#[async_trait]
impl ProviderAdapter for ImageGenerationAdapter {
    type Params = ImageRequest;
    type Response = ImageResponse;

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn prepare(&self, spec: &JobSpec) -> Result<ImageRequest, ProviderError> {
        if spec.prompt.trim().is_empty() {
            return Err(ProviderError::InvalidInput("prompt must not be empty".into()));
        }
        Ok(ImageRequest {
            model: self.model.clone(),
            prompt: spec.prompt.clone(),
            n: 1,
            size: self.size.clone(),
            response_format: "b64_json",
            extra: spec.additional_params.clone(),
        })
    }

    async fn invoke(&self, params: ImageRequest) -> Result<ImageResponse, ProviderError> {
        let mut body = serde_json::to_value(&params)?;
        merge_params(&mut body, params.extra.as_ref());

        let response = self
            .client
            .post(format!("{}/v1/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        parse_response(PROVIDER, response).await
    }

    fn extract(&self, response: &ImageResponse) -> Result<String, ProviderError> {
        let first = response
            .data
            .first()
            .ok_or(ProviderError::EmptyResponse(PROVIDER))?;
        match (&first.b64_json, &first.url) {
            (Some(b64), _) if !b64.is_empty() => Ok(format!("data:image/png;base64,{b64}")),
            (_, Some(url)) if !url.is_empty() => Ok(url.clone()),
            _ => Err(ProviderError::EmptyResponse(PROVIDER)),
        }
    }

    fn summarize(&self, response: &ImageResponse, content: String) -> Completion {
        let usage = response.usage.clone().unwrap_or_default();
        Completion {
            content,
            model: self.model.clone(),
            usage: Usage::from_counts(usage.input_tokens, usage.output_tokens, usage.total_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    fn adapter() -> ImageGenerationAdapter {
        let config = BackendConfig {
            api_key: Some("k".into()),
            base_url: "http://127.0.0.1:9".into(),
            model: "dall-e-test".into(),
            timeout: Duration::from_secs(1),
        };
        ImageGenerationAdapter::new(&config, "512x512").unwrap()
    }

    #[test]
    fn prepare_requests_one_base64_image() {
        let req = adapter().prepare(&JobSpec::from_prompt("a red cube")).unwrap();
        assert_eq!(req.n, 1);
        assert_eq!(req.size, "512x512");
        assert_eq!(req.response_format, "b64_json");
    }

    #[test]
    fn extract_prefers_inline_data_over_url() {
        let response: ImageResponse = serde_json::from_value(serde_json::json!({
            "data": [{"b64_json": "AAAA", "url": "https://img"}]
        }))
        .unwrap();
        assert_eq!(adapter().extract(&response).unwrap(), "data:image/png;base64,AAAA");
    }

    #[test]
    fn extract_falls_back_to_url() {
        let response: ImageResponse =
            serde_json::from_value(serde_json::json!({"data": [{"url": "https://img"}]})).unwrap();
        assert_eq!(adapter().extract(&response).unwrap(), "https://img");
    }

    #[test]
    fn empty_data_is_empty_response() {
        let response: ImageResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert_matches!(adapter().extract(&response), Err(ProviderError::EmptyResponse(_)));
    }
}
