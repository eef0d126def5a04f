//! LLM integration: provider abstraction, prompt composition and response recovery
//!
//! Prompts are rendered from fixed templates, sent through an [`LLMProvider`],
//! and the raw completion text goes through two stages. The normalizer turns
//! whatever the model produced into a JSON object, repairing unescaped content
//! inside string literals when needed. The schema layer then coerces that
//! object into a typed summary or generation result.

pub mod mock_provider;
pub mod normalizer;
pub mod prompts;
pub mod provider;
pub mod schemas;

pub use mock_provider::MockLLMProvider;
pub use normalizer::{normalize, NormalizeError};
pub use prompts::{PromptBuilder, PromptTemplate};
pub use provider::{LLMError, LLMProvider, LLMRequest, LLMResponse, OpenAIProvider, TokenUsage};
pub use schemas::{
    validate_generation, validate_summary, ContractGeneration, ContractSummary, FieldIssue,
    ValidationError,
};
