use thiserror::Error;

use crate::config::ConfigError;
use crate::input::InputError;
use crate::llm::{LLMError, NormalizeError, ValidationError};

/// Every way a single summarize or generate run can fail.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Provide a contract requirement.")]
    EmptyRequirement,

    #[error("Failed to build prompt: {0}")]
    Prompt(String),

    #[error(transparent)]
    Llm(#[from] LLMError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Static analysis failed: {0}")]
    Analysis(String),
}

pub type Result<T, E = AssistantError> = std::result::Result<T, E>;
