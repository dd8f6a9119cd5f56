//! Kind-to-backend dispatch and the per-worker adapter cache.

use scenegen_core::job::{JobKind, JobSpec};
use scenegen_core::result::Completion;

use crate::adapter::run;
use crate::anthropic::{SceneSynthesisAdapter, TextCompletionAdapter};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::gemini::GeminiPromptAdapter;
use crate::images::ImageGenerationAdapter;

/// The adapter implementations a job can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    AnthropicText,
    GeminiText,
    ImageGeneration,
    AnthropicScene,
}

/// Static routing table. Every [`JobKind`] has exactly one backend.
pub fn provider_for(kind: JobKind) -> ProviderKind {
    match kind {
        JobKind::TextPrompt => ProviderKind::AnthropicText,
        JobKind::GeminiPrompt => ProviderKind::GeminiText,
        JobKind::ImageGeneration => ProviderKind::ImageGeneration,
        JobKind::ImageToScene => ProviderKind::AnthropicScene,
    }
}

/// Build the adapter into `slot` on first use and hand back a reference.
fn get_or_init<'a, A>(
    slot: &'a mut Option<A>,
    init: impl FnOnce() -> Result<A, ProviderError>,
) -> Result<&'a A, ProviderError> {
    let adapter = match slot.take() {
        Some(adapter) => adapter,
        None => init()?,
    };
    Ok(slot.insert(adapter))
}

/// Adapters owned by one worker.
///
/// Each adapter is built the first time a job of its kind runs and then
/// reused for every later job on the same worker. A failed build is not
/// cached, so fixing the environment does not require a restart.
pub struct Providers {
    config: ProviderConfig,
    text: Option<TextCompletionAdapter>,
    gemini: Option<GeminiPromptAdapter>,
    images: Option<ImageGenerationAdapter>,
    scene: Option<SceneSynthesisAdapter>,
}

impl Providers {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            text: None,
            gemini: None,
            images: None,
            scene: None,
        }
    }

    /// Run one job spec through the backend selected for `kind`.
    pub async fn execute(
        &mut self,
        kind: JobKind,
        spec: &JobSpec,
    ) -> Result<Completion, ProviderError> {
        let provider = provider_for(kind);
        tracing::debug!(%kind, ?provider, "Dispatching to provider");

        let config = &self.config;
        match provider {
            ProviderKind::AnthropicText => {
                let adapter = get_or_init(&mut self.text, || {
                    TextCompletionAdapter::new(&config.anthropic)
                })?;
                run(adapter, spec).await
            }
            ProviderKind::GeminiText => {
                let adapter = get_or_init(&mut self.gemini, || {
                    GeminiPromptAdapter::new(&config.gemini)
                })?;
                run(adapter, spec).await
            }
            ProviderKind::ImageGeneration => {
                let adapter = get_or_init(&mut self.images, || {
                    ImageGenerationAdapter::new(&config.images, &config.image_size)
                })?;
                run(adapter, spec).await
            }
            ProviderKind::AnthropicScene => {
                let adapter = get_or_init(&mut self.scene, || {
                    SceneSynthesisAdapter::new(&config.anthropic)
                })?;
                run(adapter, spec).await
            }
        }
    }

    /// Whether the adapter for `provider` has been built.
    pub fn is_initialized(&self, provider: ProviderKind) -> bool {
        match provider {
            ProviderKind::AnthropicText => self.text.is_some(),
            ProviderKind::GeminiText => self.gemini.is_some(),
            ProviderKind::ImageGeneration => self.images.is_some(),
            ProviderKind::AnthropicScene => self.scene.is_some(),
        }
    }
}
