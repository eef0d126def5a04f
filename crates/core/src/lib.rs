//! Solscribe Core - LLM-assisted smart contract summarization and generation
//!
//! Two sequential pipelines share this crate. The summarizer resolves a target
//! (address, file, stdin or literal text) into an ABI, bytecode or Solidity
//! payload and asks the model for a structured summary. The generator turns a
//! natural-language requirement into Solidity source, which must pass the
//! static-analysis guardrail before it is persisted. Model output is never
//! trusted to be well-formed: the normalizer recovers JSON from fenced or
//! malformed text and the schema layer coerces it into typed results.

pub mod analysis;
pub mod chain;
pub mod config;
pub mod error;
pub mod input;
pub mod llm;
pub mod pipeline;

pub use analysis::{NoopAnalyzer, SourceGuardrail, StaticAnalyzer};
pub use config::{AppConfig, ConfigError};
pub use error::AssistantError;
pub use input::{InputError, InputKind, InputResolver, ResolvedInput};
pub use llm::{
    normalize, ContractGeneration, ContractSummary, LLMError, LLMProvider, NormalizeError,
    OpenAIProvider, ValidationError,
};
pub use pipeline::{GenerationOutcome, Generator, Summarizer, SummaryReport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
