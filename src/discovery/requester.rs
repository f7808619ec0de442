use crate::llm::{CompletionOptions, FinishReason, LlmError, LlmProvider};
use std::sync::Arc;
use tracing::{debug, warn};

/// Sends recommendation prompts to the configured model.
#[derive(Clone)]
pub struct RecommendationRequester {
    provider: Arc<dyn LlmProvider>,
    options: CompletionOptions,
}

impl RecommendationRequester {
    pub fn new(provider: Arc<dyn LlmProvider>, options: CompletionOptions) -> Self {
        Self { provider, options }
    }

    /// Sends `prompt` as a single user message and returns the raw answer.
    pub async fn request(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(
            provider = self.provider.name(),
            model = self.provider.model(),
            prompt_len = prompt.len(),
            "Requesting recommendations"
        );

        let response = self.provider.complete(prompt, &self.options).await?;

        match response.finish_reason {
            FinishReason::MaxTokens => warn!(
                max_tokens = ?self.options.max_tokens,
                "Model answer was cut at the token limit"
            ),
            FinishReason::ContentFilter => warn!("Model answer was filtered by the provider"),
            FinishReason::Stop => {}
        }
        if let Some(usage) = response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model usage"
            );
        }

        Ok(response.text)
    }
}
