//! Narrative generation.
//!
//! Turns the numeric valuation into a short written analysis by calling an
//! external LLM. The valuation never depends on this step: any failure is
//! logged and replaced with a fixed fallback text.

mod azure;
mod prompt;

pub use azure::AzureOpenAiNarrator;
pub use prompt::{build_prompt, format_thousands, SYSTEM_PROMPT};

use async_trait::async_trait;
use valuator_common::util::{sanitize_for_log, truncate_with_ellipsis};
use valuator_common::Result;

use crate::request::ValuationRequest;
use crate::valuation::ValuationResult;

/// Text used when the LLM returns a response without content.
pub const EMPTY_COMPLETION: &str = "Analysis unavailable";

/// Text used when the narrative cannot be generated.
pub const FALLBACK_ANALYSIS: &str = "AI analysis temporarily unavailable. The valuation results are based on industry-standard methodologies and comparable company analysis.";

/// A source of written valuation analysis.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Whether the generator has what it needs to make a call.
    fn is_configured(&self) -> bool;

    /// Produce analysis text for the given user prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Generate the narrative for a valuation, falling back on any failure.
pub async fn generate_or_fallback(
    generator: &dyn NarrativeGenerator,
    request: &ValuationRequest,
    result: &ValuationResult,
) -> String {
    if !generator.is_configured() {
        tracing::debug!(
            provider = generator.name(),
            "Narrative generator not configured, using fallback text"
        );
        return FALLBACK_ANALYSIS.to_string();
    }

    let prompt = build_prompt(request, result);
    match generator.generate(&prompt).await {
        Ok(text) => {
            tracing::info!(
                provider = generator.name(),
                chars = text.chars().count(),
                preview = %truncate_with_ellipsis(&text, 80),
                "Narrative generated"
            );
            text
        }
        Err(e) => {
            tracing::warn!(
                provider = generator.name(),
                error = %sanitize_for_log(&e.to_string()),
                "Narrative generation failed, using fallback text"
            );
            FALLBACK_ANALYSIS.to_string()
        }
    }
}
