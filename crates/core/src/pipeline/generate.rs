use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

use super::complete;
use crate::analysis::StaticAnalyzer;
use crate::config::SamplingSettings;
use crate::error::{AssistantError, Result};
use crate::llm::{normalize, validate_generation, ContractGeneration, LLMProvider, PromptBuilder};

pub const FALLBACK_FILENAME: &str = "Contract.sol";

/// A generated contract either passed the guardrail or was stopped by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Accepted(ContractGeneration),
    Rejected {
        generation: ContractGeneration,
        issues: Vec<String>,
    },
}

impl GenerationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

pub struct Generator<'a> {
    provider: &'a dyn LLMProvider,
    analyzer: &'a dyn StaticAnalyzer,
    prompts: PromptBuilder,
    temperature: f32,
    dump_prompt: bool,
}

impl<'a> Generator<'a> {
    pub fn new(provider: &'a dyn LLMProvider, analyzer: &'a dyn StaticAnalyzer) -> Self {
        Self {
            provider,
            analyzer,
            prompts: PromptBuilder::new(),
            temperature: SamplingSettings::default().generation_temperature,
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

    pub async fn generate(&self, requirement: &str) -> Result<GenerationOutcome> {
        let requirement = requirement.trim();
        if requirement.is_empty() {
            return Err(AssistantError::EmptyRequirement);
        }

        info!("Generating contract for requirement: {}", requirement);
        let prompt = self.prompts.generation_prompt(requirement);
        let raw = complete(self.provider, prompt, self.temperature, self.dump_prompt).await?;

        let generation = validate_generation(normalize(&raw)?)?;

        let issues = self
            .analyzer
            .analyze(&generation.code)
            .map_err(|e| AssistantError::Analysis(format!("{:#}", e)))?;

        if issues.is_empty() {
            Ok(GenerationOutcome::Accepted(generation))
        } else {
            warn!("Guardrail rejected generated contract with {} issue(s)", issues.len());
            Ok(GenerationOutcome::Rejected { generation, issues })
        }
    }
}

fn contract_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\bcontract\s+(\w+)").expect("contract pattern is valid"))
}

/// `<Name>.sol` for the first `contract <Name>` in `code`, else `Contract.sol`.
pub fn default_filename(code: &str) -> PathBuf {
    contract_name_pattern()
        .captures(code)
        .and_then(|captures| captures.get(1))
        .map(|name| PathBuf::from(format!("{}.sol", name.as_str())))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_FILENAME))
}

/// Creates or overwrites `path` with the generated code and returns its absolute path.
pub fn save_contract(generation: &ContractGeneration, path: &Path) -> io::Result<PathBuf> {
    fs::write(path, &generation.code)?;
    fs::canonicalize(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{NoopAnalyzer, SourceGuardrail};
    use crate::llm::{MockLLMProvider, ValidationError};
    use tempfile::TempDir;

    const TOKEN_CODE: &str = "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.13;\n\ncontract MyToken {\n    string public name = \"My \\\"Token\\\"\";\n}\n";

    // Literal newlines and quotes inside "code", as models often send it.
    fn unescaped_response(code: &str) -> String {
        format!(
            "```json\n{{\"code\": \"{}\", \"explanation\": [\"Uses Ownable\", \"No selfdestruct\"]}}\n```",
            code
        )
    }

    #[tokio::test]
    async fn test_generated_contract_saved_under_its_name() {
        let code = "contract MyToken {\n    string public symbol = \"MTK\";\n}";
        let provider = MockLLMProvider::new().with_response(unescaped_response(code));
        let generator = Generator::new(&provider, &NoopAnalyzer);

        let outcome = generator.generate("a token named MyToken").await.unwrap();
        let GenerationOutcome::Accepted(generation) = outcome else {
            panic!("expected the contract to be accepted");
        };
        assert_eq!(generation.code, code);
        assert_eq!(generation.explanation, "- Uses Ownable\n- No selfdestruct");

        let dir = TempDir::new().unwrap();
        let target = dir.path().join(default_filename(&generation.code));
        let saved = save_contract(&generation, &target).unwrap();

        assert!(saved.is_absolute());
        assert!(saved.ends_with("MyToken.sol"));
        assert_eq!(fs::read_to_string(saved).unwrap(), code);
    }

    #[tokio::test]
    async fn test_request_uses_generation_prompt() {
        let provider = MockLLMProvider::new().with_response(
            serde_json::json!({"code": TOKEN_CODE, "explanation": "Safe."}).to_string(),
        );
        let generator = Generator::new(&provider, &NoopAnalyzer).with_dump_prompt(false);

        let outcome = generator.generate("  an ERC-20 token  ").await.unwrap();
        assert!(outcome.is_accepted());

        let request = &provider.requests()[0];
        assert_eq!(request.system_prompt, "You generate secure Solidity smart contracts.");
        assert_eq!(request.temperature, 0.2);
        assert!(request.user_prompt.contains("\"an ERC-20 token\""));
    }

    #[tokio::test]
    async fn test_guardrail_issues_reject_contract() {
        let code = "contract Doomed {\n    function kill() external {\n        selfdestruct(payable(msg.sender));\n    }\n}";
        let provider = MockLLMProvider::new().with_response(
            serde_json::json!({"code": code, "explanation": "Has a kill switch."}).to_string(),
        );
        let guardrail = SourceGuardrail::new();
        let generator = Generator::new(&provider, &guardrail);

        match generator.generate("a destructible contract").await.unwrap() {
            GenerationOutcome::Rejected { generation, issues } => {
                assert_eq!(generation.code, code);
                assert_eq!(issues, vec!["[High] Dangerous selfdestruct at line 3"]);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_requirement_skips_model() {
        let provider = MockLLMProvider::new();
        let generator = Generator::new(&provider, &NoopAnalyzer);

        let err = generator.generate("   ").await.unwrap_err();

        assert!(matches!(err, AssistantError::EmptyRequirement));
        assert_eq!(err.to_string(), "Provide a contract requirement.");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_code_is_validation_error() {
        let provider = MockLLMProvider::new().with_response(r#"{"explanation": "nothing"}"#);
        let generator = Generator::new(&provider, &NoopAnalyzer);

        let err = generator.generate("anything").await.unwrap_err();
        match err {
            AssistantError::Validation(ValidationError { issues }) => {
                assert_eq!(issues.len(), 1);
                assert_eq!(issues[0].path, "code");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_default_filename() {
        assert_eq!(default_filename(TOKEN_CODE), PathBuf::from("MyToken.sol"));
        assert_eq!(
            default_filename("abstract contract Base {}\ncontract Child is Base {}"),
            PathBuf::from("Base.sol")
        );
        assert_eq!(default_filename("library Math {}"), PathBuf::from(FALLBACK_FILENAME));
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Out.sol");
        fs::write(&path, "old contents").unwrap();

        let generation = ContractGeneration {
            code: "contract Out {}".to_string(),
            explanation: String::new(),
        };
        save_contract(&generation, &path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "contract Out {}");
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let generation = ContractGeneration {
            code: "contract Out {}".to_string(),
            explanation: String::new(),
        };
        assert!(save_contract(&generation, &dir.path().join("missing/Out.sol")).is_err());
    }
}
