use serde::Serialize;
use tracing::{info, warn};

use super::complete;
use crate::analysis::StaticAnalyzer;
use crate::config::SamplingSettings;
use crate::error::Result;
use crate::input::{InputKind, ResolvedInput};
use crate::llm::{normalize, validate_summary, ContractSummary, LLMProvider, PromptBuilder};

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub input_kind: InputKind,
    pub summary: ContractSummary,

    /// Advisory only; populated for Solidity input.
    pub static_issues: Vec<String>,
}

pub struct Summarizer<'a> {
    provider: &'a dyn LLMProvider,
    analyzer: &'a dyn StaticAnalyzer,
    prompts: PromptBuilder,
    temperature: f32,
    dump_prompt: bool,
}

impl<'a> Summarizer<'a> {
    pub fn new(provider: &'a dyn LLMProvider, analyzer: &'a dyn StaticAnalyzer) -> Self {
        Self {
            provider,
            analyzer,
            prompts: PromptBuilder::new(),
            temperature: SamplingSettings::default().summary_temperature,
            dump_prompt: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_dump_prompt(mut self, dump_prompt: bool) -> Self {
        self.dump_prompt = dump_prompt;
        self
    }

    pub async fn summarize(&self, input: &ResolvedInput) -> Result<SummaryReport> {
        let static_issues = self.advisory_issues(input);

        info!("Summarizing {} input ({} chars)", input.kind, input.payload.len());
        let prompt = self.prompts.summary_prompt(input.kind, &input.payload);
        let raw = complete(self.provider, prompt, self.temperature, self.dump_prompt).await?;

        let summary = validate_summary(normalize(&raw)?)?;

        Ok(SummaryReport {
            input_kind: input.kind,
            summary,
            static_issues,
        })
    }

    // Analyzer failures never block a summary.
    fn advisory_issues(&self, input: &ResolvedInput) -> Vec<String> {
        if input.kind != InputKind::Solidity {
            return Vec::new();
        }

        match self.analyzer.analyze(&input.payload) {
            Ok(issues) => issues,
            Err(e) => {
                warn!("Static analysis failed, continuing without it: {:#}", e);
                Vec::new()
            }
        }
    }
}
