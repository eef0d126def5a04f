use anyhow::{Context, Result};
use colored::*;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use solscribe_core::analysis::analyzer_for;
use solscribe_core::{AppConfig, OpenAIProvider, StaticAnalyzer};

/// Logs go to stderr so stdout stays a clean report; `RUST_LOG` overrides.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// `--config` wins over `SOLSCRIBE_CONFIG`; environment variables override both.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    Ok(AppConfig::load(explicit)?)
}

pub fn build_provider(config: &AppConfig) -> Result<OpenAIProvider> {
    let api_key = config.api_key()?;
    Ok(OpenAIProvider::from_settings(&config.provider, api_key))
}

pub fn build_analyzer(config: &AppConfig) -> Box<dyn StaticAnalyzer> {
    analyzer_for(&config.static_analysis)
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}

pub fn write_issues<W: Write>(out: &mut W, heading: &str, issues: &[String]) -> io::Result<()> {
    writeln!(out, "{}", heading.yellow().bold())?;
    for issue in issues {
        writeln!(out, " • {}", issue)?;
    }
    Ok(())
}

/// Prints `err` to stderr and yields exit status 1.
pub fn report_failure(err: &anyhow::Error) -> ExitCode {
    eprintln!("{}", err.to_string().red());
    ExitCode::FAILURE
}

pub fn finish(result: Result<ExitCode>) -> ExitCode {
    match result {
        Ok(code) => code,
        Err(err) => report_failure(&err),
    }
}
