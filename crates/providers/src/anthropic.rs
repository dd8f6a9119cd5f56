//! Anthropic Messages API client and the two adapters built on it.
//!
//! - [`TextCompletionAdapter`]: plain prompt completion.
//! - [`SceneSynthesisAdapter`]: turns a drawing into Three.js scene code
//!   using a vision content block.

use async_trait::async_trait;
use scenegen_core::image::decode_inline_image;
use scenegen_core::job::JobSpec;
use scenegen_core::result::{Completion, Usage};
use serde::{Deserialize, Serialize};

use crate::adapter::ProviderAdapter;
use crate::config::BackendConfig;
use crate::error::ProviderError;
use crate::http::{build_client, merge_params, parse_response};

const PROVIDER: &str = "anthropic";

/// Value of the `anthropic-version` header.
const API_VERSION: &str = "2023-06-01";

/// Instructions given to the model for drawing-to-scene jobs unless the
/// request brings its own system prompt.
pub const SCENE_SYSTEM_PROMPT: &str = "\
You are an expert 3D modeler and Three.js developer who turns 2D drawings and \
wireframes into interactive 3D scenes.

Interpretation:
- Identify the distinct shapes in the image and how they relate in space.
- Model only the main object of the drawing and ignore its surroundings.
- Keep the result faithful to the drawing.

Implementation:
- Do not import libraries; Three.js and OrbitControls are already available.
- Set up a camera, ambient and directional lighting, and OrbitControls.
- Pick materials and colors that match the drawing.
- Group related meshes under parent objects.
- Add a ground plane unless the drawing suggests floating objects.
- Add a subtle animation and keep the scene responsive to its container.

Reply with JavaScript only, wrapped in a ```javascript fenced block.";

/// First text block of every drawing-to-scene request.
pub const SCENE_REQUEST: &str = "\
Transform this 2D drawing into an interactive Three.js 3D scene. Create \
geometries for the shapes in the image, use materials matching its colors, \
enable OrbitControls, light the scene for depth, add subtle animation, and \
keep it responsive to the container size. Return only the JavaScript code.";

/// Prefix of the optional text block listing text found in the drawing.
pub const SCENE_TEXT_HINT: &str = "Here's a list of text that we found in the design:\n";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageSource {
    /// Always `"base64"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Message {
    pub role: &'static str,
    pub content: Vec<ContentPart>,
}

/// Body of `POST /v1/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
    /// Caller-supplied fields merged over the body at send time.
    #[serde(skip)]
    pub extra: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageUsage {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

/// Response of `POST /v1/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub usage: Option<MessageUsage>,
}

impl MessageResponse {
    /// Concatenated text of all `text` blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the Messages API.
pub struct AnthropicApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicApi {
    pub fn new(config: &BackendConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            base_url: config.base_url.clone(),
            api_key: config.require_key(PROVIDER)?.to_string(),
            model: config.model.clone(),
        })
    }

    /// Send one message request.
    pub async fn create_message(
        &self,
        request: MessageRequest,
    ) -> Result<MessageResponse, ProviderError> {
        let mut body = serde_json::to_value(&request)?;
        merge_params(&mut body, request.extra.as_ref());

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        parse_response(PROVIDER, response).await
    }

    fn request(
        &self,
        spec: &JobSpec,
        system: Option<String>,
        content: Vec<ContentPart>,
    ) -> MessageRequest {
        MessageRequest {
            model: self.model.clone(),
            max_tokens: spec.max_tokens,
            temperature: spec.temperature,
            system,
            messages: vec![Message {
                role: "user",
                content,
            }],
            extra: spec.additional_params.clone(),
        }
    }

    fn completion(&self, response: &MessageResponse, content: String) -> Completion {
        let usage = response.usage.clone().unwrap_or_default();
        Completion {
            content,
            model: response
                .model
                .clone()
                .unwrap_or_else(|| self.model.clone()),
            usage: Usage::from_counts(usage.input_tokens, usage.output_tokens, None),
        }
    }
}

fn non_empty_text(response: &MessageResponse) -> Result<String, ProviderError> {
    let text = response.text();
    if text.is_empty() {
        return Err(ProviderError::EmptyResponse(PROVIDER));
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

/// Plain prompt completion.
pub struct TextCompletionAdapter {
    api: AnthropicApi,
}

impl TextCompletionAdapter {
    pub fn new(config: &BackendConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            api: AnthropicApi::new(config)?,
        })
    }
}

#[async_trait]
impl ProviderAdapter for TextCompletionAdapter {
    type Params = MessageRequest;
    type Response = MessageResponse;

    fn name(&self) -> &'static str {
        "anthropic-text"
    }

    fn prepare(&self, spec: &JobSpec) -> Result<MessageRequest, ProviderError> {
        if spec.prompt.trim().is_empty() {
            return Err(ProviderError::InvalidInput("prompt must not be empty".into()));
        }
        let content = vec![ContentPart::Text {
            text: spec.prompt.clone(),
        }];
        Ok(self.api.request(spec, spec.system_prompt.clone(), content))
    }

    async fn invoke(&self, params: MessageRequest) -> Result<MessageResponse, ProviderError> {
        self.api.create_message(params).await
    }

    fn extract(&self, response: &MessageResponse) -> Result<String, ProviderError> {
        non_empty_text(response)
    }

    fn summarize(&self, response: &MessageResponse, content: String) -> Completion {
        self.api.completion(response, content)
    }
}

/// Drawing-to-scene code synthesis.
pub struct SceneSynthesisAdapter {
    api: AnthropicApi,
}

impl SceneSynthesisAdapter {
    pub fn new(config: &BackendConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            api: AnthropicApi::new(config)?,
        })
    }
}

#[async_trait]
impl ProviderAdapter for SceneSynthesisAdapter {
    type Params = MessageRequest;
    type Response = MessageResponse;

    fn name(&self) -> &'static str {
        "anthropic-scene"
    }

    fn prepare(&self, spec: &JobSpec) -> Result<MessageRequest, ProviderError> {
        let raw = spec
            .image
            .as_deref()
            .ok_or_else(|| ProviderError::InvalidInput("image is required".into()))?;
        let image = decode_inline_image(raw)?;

        let mut content = vec![
            ContentPart::Text {
                text: SCENE_REQUEST.to_string(),
            },
            ContentPart::Image {
                source: ImageSource {
                    kind: "base64",
                    media_type: image.media_type,
                    data: image.data,
                },
            },
        ];
        if !spec.prompt.trim().is_empty() {
            content.push(ContentPart::Text {
                text: format!("{SCENE_TEXT_HINT}{}", spec.prompt),
            });
        }

        let system = spec
            .system_prompt
            .clone()
            .unwrap_or_else(|| SCENE_SYSTEM_PROMPT.to_string());
        Ok(self.api.request(spec, Some(system), content))
    }

    async fn invoke(&self, params: MessageRequest) -> Result<MessageResponse, ProviderError> {
        self.api.create_message(params).await
    }

    fn extract(&self, response: &MessageResponse) -> Result<String, ProviderError> {
        non_empty_text(response)
    }

    fn summarize(&self, response: &MessageResponse, content: String) -> Completion {
        self.api.completion(response, content)
    }
}
