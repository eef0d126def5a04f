//! The two end-to-end flows: summarize an existing contract, generate a new one.
//!
//! Both run strictly in sequence (prompt, one model call, normalize, validate)
//! and share the same collaborators through trait objects so tests can swap in
//! scripted providers and analyzers.

pub mod generate;
pub mod summarize;

pub use generate::{default_filename, save_contract, GenerationOutcome, Generator};
pub use summarize::{Summarizer, SummaryReport};

use tracing::{debug, info};

use crate::error::{AssistantError, Result};
use crate::llm::{LLMProvider, LLMRequest};

/// One completion round trip; returns the raw model text.
async fn complete(
    provider: &dyn LLMProvider,
    prompt: anyhow::Result<(String, String)>,
    temperature: f32,
    dump_prompt: bool,
) -> Result<String> {
    let (system_prompt, user_prompt) =
        prompt.map_err(|e| AssistantError::Prompt(format!("{:#}", e)))?;

    let response = provider
        .complete(LLMRequest {
            system_prompt,
            user_prompt,
            temperature,
            dump_prompt,
        })
        .await?;

    info!(
        "{} used {} tokens ({} prompt, {} completion)",
        response.model,
        response.usage.total_tokens,
        response.usage.prompt_tokens,
        response.usage.completion_tokens
    );
    debug!("Raw model output:\n{}", response.content);

    Ok(response.content)
}
