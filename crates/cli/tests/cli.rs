use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const ISOLATED_VARS: [&str; 9] = [
    "OPENAI_API_KEY",
    "OPENAI_BASE_URL",
    "LLM_MODEL",
    "SEPOLIA_RPC",
    "ETHERSCAN_API_KEY",
    "ETHERSCAN_API_URL",
    "SOLSCRIBE_CONFIG",
    "SOLSCRIBE_STATIC_ANALYSIS",
    "RUST_LOG",
];

fn command(binary: &str, dir: &Path) -> Command {
    let mut command = Command::new(binary);
    command.current_dir(dir);
    for var in ISOLATED_VARS {
        command.env_remove(var);
    }
    command
}

fn explain(dir: &Path) -> Command {
    command(env!("CARGO_BIN_EXE_explain-contract"), dir)
}

fn generate(dir: &Path) -> Command {
    command(env!("CARGO_BIN_EXE_generate-contract"), dir)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn test_explain_requires_api_key() {
    let temp_dir = TempDir::new().unwrap();
    let output = explain(temp_dir.path())
        .args(["--raw", "contract A {}"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Missing OPENAI_API_KEY"));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_generate_requires_api_key() {
    let temp_dir = TempDir::new().unwrap();
    let output = generate(temp_dir.path())
        .args(["an", "ERC-20", "token"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Missing OPENAI_API_KEY"));
}

#[test]
fn test_address_without_rpc_is_input_error() {
    let temp_dir = TempDir::new().unwrap();
    let output = explain(temp_dir.path())
        .env("OPENAI_API_KEY", "test-key")
        .arg("0xAbC0000000000000000000000000000000000001")
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr(&output);
    assert!(stderr.contains("Input error:"), "stderr: {}", stderr);
    assert!(stderr.contains("SEPOLIA_RPC not set"), "stderr: {}", stderr);
}

#[test]
fn test_empty_requirement_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let output = generate(temp_dir.path())
        .env("OPENAI_API_KEY", "test-key")
        .arg("   ")
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Provide a contract requirement."));
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_invalid_config_file_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("solscribe.yaml");
    fs::write(&config_path, "provider: [unclosed").unwrap();

    let output = explain(temp_dir.path())
        .env("OPENAI_API_KEY", "test-key")
        .args(["--config", config_path.to_str().unwrap(), "--raw", "contract A {}"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("solscribe.yaml"));
}

#[test]
fn test_unknown_format_is_usage_error() {
    let temp_dir = TempDir::new().unwrap();
    let output = explain(temp_dir.path())
        .args(["--format", "markdown", "contract A {}"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown output format"));
}

#[test]
fn test_help_lists_options() {
    let temp_dir = TempDir::new().unwrap();

    let output = explain(temp_dir.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    assert!(help.contains("--raw"));
    assert!(help.contains("--format"));

    let output = generate(temp_dir.path()).arg("--help").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("--out"));
}
