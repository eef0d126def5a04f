//! `generate-contract`: turn a requirement into Solidity, guarded by static analysis.

use anyhow::Result;
use clap::Parser;
use colored::*;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use solscribe_core::pipeline::{default_filename, save_contract};
use solscribe_core::{AppConfig, ContractGeneration, GenerationOutcome, Generator};

use crate::common;

#[derive(Parser, Debug)]
#[command(name = "generate-contract")]
#[command(about = "Generate a secure Solidity contract from a natural-language requirement")]
#[command(version)]
pub struct GenerateArgs {
    /// Requirement words, joined with spaces
    #[arg(value_name = "REQUIREMENT")]
    pub requirement: Vec<String>,

    /// Save generated contract to this path
    #[arg(long = "out", value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// YAML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the exact prompt sent to the model
    #[arg(long)]
    pub dump_prompt: bool,
}

impl GenerateArgs {
    pub fn requirement_text(&self) -> String {
        self.requirement.join(" ").trim().to_string()
    }
}

pub fn run(args: GenerateArgs) -> ExitCode {
    common::finish(execute(args))
}

fn execute(args: GenerateArgs) -> Result<ExitCode> {
    let config = common::load_config(args.config.as_deref())?;
    let runtime = common::runtime()?;
    runtime.block_on(generate(&args, &config))
}

/// What became of one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateStatus {
    Saved(PathBuf),
    SaveFailed(String),
    Rejected(Vec<String>),
}

impl GenerateStatus {
    // A failed write is reported but does not change the exit status.
    pub fn succeeded(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.succeeded() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

async fn generate(args: &GenerateArgs, config: &AppConfig) -> Result<ExitCode> {
    let provider = common::build_provider(config)?;
    let analyzer = common::build_analyzer(config);
    let generator = Generator::new(&provider, analyzer.as_ref())
        .with_temperature(config.sampling.generation_temperature)
        .with_dump_prompt(args.dump_prompt);

    let status = generate_with(&generator, args, Path::new(".")).await?;
    Ok(status.exit_code())
}

/// Runs `generator` for `args`; without `--out` the file lands in `base_dir`.
pub async fn generate_with(
    generator: &Generator<'_>,
    args: &GenerateArgs,
    base_dir: &Path,
) -> Result<GenerateStatus> {
    match generator.generate(&args.requirement_text()).await? {
        GenerationOutcome::Rejected { issues, .. } => {
            common::write_issues(
                &mut io::stderr().lock(),
                "Static analysis found issues:",
                &issues,
            )?;
            Ok(GenerateStatus::Rejected(issues))
        }
        GenerationOutcome::Accepted(generation) => {
            let destination = args
                .out
                .clone()
                .unwrap_or_else(|| base_dir.join(default_filename(&generation.code)));
            let status = persist(&generation, &destination);
            print_generation(&generation);
            Ok(status)
        }
    }
}

fn persist(generation: &ContractGeneration, destination: &Path) -> GenerateStatus {
    match save_contract(generation, destination) {
        Ok(saved) => {
            println!("Contract code saved to {}", saved.display());
            GenerateStatus::Saved(saved)
        }
        Err(e) => {
            let message = format!("Failed to save file: {}", e);
            eprintln!("{}", message.red());
            GenerateStatus::SaveFailed(message)
        }
    }
}

fn print_generation(generation: &ContractGeneration) {
    println!("\n{}\n", "=== Generated Solidity Contract ===".bright_cyan().bold());
    println!("{}", generation.code);
    println!("\n{}\n", "=== Security Considerations ===".bright_cyan().bold());
    println!("{}", generation.explanation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use solscribe_core::llm::MockLLMProvider;
    use solscribe_core::{NoopAnalyzer, SourceGuardrail};
    use std::fs;
    use tempfile::TempDir;

    const TOKEN_CODE: &str = "// SPDX-License-Identifier: MIT\npragma solidity ^0.8.20;\n\ncontract MyToken {\n    uint256 public totalSupply = 1000;\n}\n";

    const VAULT_CODE: &str = "pragma solidity ^0.8.20;\n\ncontract Vault {\n    address owner;\n    function close() external {\n        selfdestruct(payable(owner));\n    }\n}\n";

    fn response(code: &str) -> String {
        json!({"code": code, "explanation": ["Fixed supply", "No owner privileges"]}).to_string()
    }

    fn args(extra: &[&str]) -> GenerateArgs {
        let mut argv = vec!["generate-contract", "a", "token"];
        argv.extend_from_slice(extra);
        GenerateArgs::parse_from(argv)
    }

    fn entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_rejected_contract_is_not_written() {
        let dir = TempDir::new().unwrap();
        let provider = MockLLMProvider::new().with_response(response(VAULT_CODE));
        let guardrail = SourceGuardrail::new();
        let generator = Generator::new(&provider, &guardrail);

        let status = generate_with(&generator, &args(&[]), dir.path()).await.unwrap();

        let GenerateStatus::Rejected(issues) = &status else {
            panic!("expected rejection, got {:?}", status);
        };
        assert_eq!(issues, &vec!["[High] Dangerous selfdestruct at line 6".to_string()]);
        assert!(!status.succeeded());
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_accepted_contract_saved_as_contract_name() {
        let dir = TempDir::new().unwrap();
        let provider = MockLLMProvider::new().with_response(response(TOKEN_CODE));
        let guardrail = SourceGuardrail::new();
        let generator = Generator::new(&provider, &guardrail);

        let status = generate_with(&generator, &args(&[]), dir.path()).await.unwrap();

        let expected = fs::canonicalize(dir.path().join("MyToken.sol")).unwrap();
        assert_eq!(status, GenerateStatus::Saved(expected.clone()));
        assert!(status.succeeded());
        assert_eq!(fs::read_to_string(expected).unwrap(), TOKEN_CODE);
        assert_eq!(entries(dir.path()), 1);
    }

    #[tokio::test]
    async fn test_explicit_out_path_is_used() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("Custom.sol");
        let provider = MockLLMProvider::new().with_response(response(TOKEN_CODE));
        let generator = Generator::new(&provider, &NoopAnalyzer);

        let status = generate_with(&generator, &args(&["--out", out.to_str().unwrap()]), dir.path())
            .await
            .unwrap();

        assert!(matches!(status, GenerateStatus::Saved(_)));
        assert_eq!(fs::read_to_string(&out).unwrap(), TOKEN_CODE);
        assert!(!dir.path().join("MyToken.sol").exists());
    }

    #[tokio::test]
    async fn test_failed_write_still_succeeds() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("missing").join("Token.sol");
        let provider = MockLLMProvider::new().with_response(response(TOKEN_CODE));
        let generator = Generator::new(&provider, &NoopAnalyzer);

        let status = generate_with(&generator, &args(&["--out", out.to_str().unwrap()]), dir.path())
            .await
            .unwrap();

        let GenerateStatus::SaveFailed(message) = &status else {
            panic!("expected a failed write, got {:?}", status);
        };
        assert!(message.starts_with("Failed to save file:"));
        assert!(status.succeeded());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_requirement_words_are_joined() {
        let args = GenerateArgs::parse_from([
            "generate-contract",
            "an",
            "ERC-20",
            "token",
            "--out",
            "Token.sol",
        ]);
        assert_eq!(args.requirement_text(), "an ERC-20 token");
        assert_eq!(args.out, Some(PathBuf::from("Token.sol")));
    }

    #[test]
    fn test_requirement_may_be_empty() {
        let args = GenerateArgs::parse_from(["generate-contract"]);
        assert!(args.requirement.is_empty());
        assert_eq!(args.requirement_text(), "");
    }
}
