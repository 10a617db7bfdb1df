//! Injected text-provider capability.
//!
//! The pipeline never knows which concrete provider (if any) produced a
//! suggestion; it only consumes a plain string. Provider failure is treated as
//! "no suggested text" and falls back to caller-supplied text.

use crate::foundation::error::{MatchcutError, MatchcutResult};

/// Constraints handed to a provider when asking for text.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct PromptHints {
    /// Phrase the generated text should feature.
    pub phrase: String,
    /// Upper bound on generated length in characters, when the caller cares.
    #[serde(default)]
    pub max_chars: Option<usize>,
}

/// Capability interface for external text generation.
pub trait TextProvider {
    fn generate_text(&self, hints: &PromptHints) -> MatchcutResult<String>;
}

/// Resolve the text for a job: prefer the provider's suggestion, fall back to
/// the caller-supplied text on provider failure or empty output.
///
/// Errors only when no provider suggestion exists and no fallback was given.
pub fn resolve_text(
    provider: Option<&dyn TextProvider>,
    hints: &PromptHints,
    fallback: Option<&str>,
) -> MatchcutResult<String> {
    if let Some(p) = provider {
        match p.generate_text(hints) {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => {
                tracing::warn!("text provider returned empty text; falling back");
            }
            Err(e) => {
                tracing::warn!(error = %e, "text provider failed; falling back");
            }
        }
    }

    match fallback {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(MatchcutError::config(
            "no text available: provider produced nothing and no fallback text was supplied",
        )),
    }
}
