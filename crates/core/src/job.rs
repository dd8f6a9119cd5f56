//! Job model: the unit of asynchronous generation work.
//!
//! A [`Job`] is built once at submission time from a [`SubmitJob`] request
//! and is immutable from then on. Validation happens here, before the job
//! ever reaches the queue, so an invalid request never produces an event or
//! a stored result.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::image::decode_inline_image;
use crate::types::{new_job_id, JobId, Timestamp};

/// Default completion budget when the request does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default sampling temperature when the request does not set one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Supported generation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Plain prompt completion (Anthropic Messages API).
    TextPrompt,
    /// Plain prompt completion (Google Gemini).
    GeminiPrompt,
    /// Text-to-image generation.
    ImageGeneration,
    /// Turn a drawing into Three.js scene code.
    ImageToScene,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::TextPrompt,
        JobKind::GeminiPrompt,
        JobKind::ImageGeneration,
        JobKind::ImageToScene,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextPrompt => "text_prompt",
            Self::GeminiPrompt => "gemini_prompt",
            Self::ImageGeneration => "image_generation",
            Self::ImageToScene => "image_to_scene",
        }
    }

    /// Whether this kind consumes the inline `image` field.
    pub fn requires_image(&self) -> bool {
        matches!(self, Self::ImageToScene)
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = CoreError;

    /// Parse a kind name. The legacy short names `3d` and `image` are
    /// accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text_prompt" => Ok(Self::TextPrompt),
            "gemini_prompt" => Ok(Self::GeminiPrompt),
            "image_generation" | "image" => Ok(Self::ImageGeneration),
            "image_to_scene" | "3d" => Ok(Self::ImageToScene),
            other => Err(CoreError::UnsupportedKind(other.to_string())),
        }
    }
}

/// Backend-agnostic generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Inline image, bare base64 or a `data:` URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Extra request fields merged verbatim into the provider call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_params: Option<serde_json::Map<String, serde_json::Value>>,
}

impl JobSpec {
    /// A spec with only a prompt and default limits.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            image: None,
            additional_params: None,
        }
    }

    /// Check the job spec against what `kind` needs.
    pub fn validate(&self, kind: JobKind) -> Result<(), CoreError> {
        if kind.requires_image() {
            let image = self.image.as_deref().ok_or_else(|| {
                CoreError::InvalidInput(format!("{kind} requires an inline image"))
            })?;
            decode_inline_image(image)?;
        } else if self.prompt.trim().is_empty() {
            return Err(CoreError::InvalidInput(format!("{kind} requires a prompt")));
        }

        if self.max_tokens == 0 {
            return Err(CoreError::InvalidInput(
                "max_tokens must be greater than zero".into(),
            ));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }

        Ok(())
    }
}

/// One unit of asynchronous generation work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub spec: JobSpec,
    pub created_at: Timestamp,
}

/// Submission body for `POST /api/v1/jobs`.
///
/// `kind` stays a raw string so that an unsupported value can be reported
/// by name instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitJob {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub additional_params: Option<serde_json::Map<String, serde_json::Value>>,
    pub image: Option<String>,
    pub job_id: Option<String>,
}

impl SubmitJob {
    /// Resolve the kind, validate the job spec and mint the immutable [`Job`].
    ///
    /// `kind_override` takes precedence over the body's `kind` field (used
    /// by the path-addressed submission route).
    pub fn into_job(self, kind_override: Option<&str>) -> Result<Job, CoreError> {
        let kind_name = kind_override
            .map(str::to_string)
            .or(self.kind)
            .ok_or_else(|| CoreError::InvalidInput("missing job kind".into()))?;
        let kind: JobKind = kind_name.parse()?;

        let id = match self.job_id {
            Some(id) if id.trim().is_empty() => {
                return Err(CoreError::InvalidInput("job_id must not be blank".into()))
            }
            Some(id) => id,
            None => new_job_id(),
        };

        let spec = JobSpec {
            prompt: self.prompt,
            system_prompt: self.system_prompt,
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            image: self.image,
            additional_params: self.additional_params,
        };
        spec.validate(kind)?;

        Ok(Job {
            id,
            kind,
            spec,
            created_at: chrono::Utc::now(),
        })
    }
}
