//! `explain-contract`: summarize a deployed address, a source file, stdin or literal text.

use anyhow::Result;
use clap::Parser;
use colored::*;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use solscribe_core::chain::{AbiRegistry, ChainRpc, EtherscanRegistry, JsonRpcClient};
use solscribe_core::{
    AppConfig, AssistantError, InputResolver, ResolvedInput, Summarizer, SummaryReport,
};

use crate::common;

#[derive(Parser, Debug)]
#[command(name = "explain-contract")]
#[command(about = "Explain a Sepolia contract address, a .sol file, stdin (-) or raw Solidity/ABI text")]
#[command(version)]
pub struct ExplainArgs {
    /// Contract address, path, `-` for stdin, or literal source
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Treat TARGET as raw Solidity text
    #[arg(long)]
    pub raw: bool,

    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// YAML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the exact prompt sent to the model
    #[arg(long)]
    pub dump_prompt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

pub fn run(args: ExplainArgs) -> ExitCode {
    common::finish(execute(args))
}

fn execute(args: ExplainArgs) -> Result<ExitCode> {
    let config = common::load_config(args.config.as_deref())?;
    let runtime = common::runtime()?;
    runtime.block_on(explain(&args, &config))
}

async fn explain(args: &ExplainArgs, config: &AppConfig) -> Result<ExitCode> {
    let input = resolve_target(args, config).await?;

    let provider = common::build_provider(config)?;
    let analyzer = common::build_analyzer(config);
    let summarizer = Summarizer::new(&provider, analyzer.as_ref())
        .with_temperature(config.sampling.summary_temperature)
        .with_dump_prompt(args.dump_prompt);

    let report = summarizer.summarize(&input).await?;
    emit_report(
        &report,
        args.format,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )?;

    Ok(ExitCode::SUCCESS)
}

async fn resolve_target(args: &ExplainArgs, config: &AppConfig) -> Result<ResolvedInput> {
    if args.raw {
        return Ok(ResolvedInput::solidity(args.target.clone()));
    }

    let rpc = config.rpc_url().ok().map(JsonRpcClient::new);
    let registry = EtherscanRegistry::from_settings(&config.chain)?;

    let resolver = InputResolver::new()
        .with_rpc(rpc.as_ref().map(|client| client as &dyn ChainRpc))
        .with_registry(registry.as_ref().map(|registry| registry as &dyn AbiRegistry));

    let input = resolver
        .resolve(&args.target)
        .await
        .map_err(AssistantError::from)?;
    Ok(input)
}

/// Advisory issues go to `err` first, then the report to `out`.
pub fn emit_report<W: Write, E: Write>(
    report: &SummaryReport,
    format: OutputFormat,
    out: &mut W,
    err: &mut E,
) -> Result<()> {
    if !report.static_issues.is_empty() {
        common::write_issues(err, "Static‑analysis issues:", &report.static_issues)?;
        writeln!(err)?;
        err.flush()?;
    }

    match format {
        OutputFormat::Text => write_report(out, report)?,
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(report)?)?,
    }
    out.flush()?;
    Ok(())
}

pub fn write_report<W: Write>(out: &mut W, report: &SummaryReport) -> io::Result<()> {
    writeln!(out, "\n{}\n", "=== Contract Summary ===".bright_cyan().bold())?;
    writeln!(out, "{}", report.summary.summary)?;

    write_section(out, "Key Functions", &report.summary.key_functions)?;
    write_section(out, "Permissions", &report.summary.permissions)?;
    write_section(out, "Security Patterns", &report.summary.security_patterns)
}

fn write_section<W: Write>(out: &mut W, title: &str, items: &[String]) -> io::Result<()> {
    writeln!(out, "\n{}", format!("{}:", title).bold())?;
    for item in items {
        writeln!(out, " • {}", item)?;
    }
    Ok(())
}
