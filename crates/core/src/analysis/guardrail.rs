use anyhow::{Context, Result};
use tracing::debug;

use super::finding::Finding;
use super::source::{
    SourceDangerousFunctionsScanner, SourceScanner, SourceTxOriginScanner, SourceUnit,
};
use super::StaticAnalyzer;

/// Built-in static analyzer: runs every registered source scanner over one parse.
pub struct SourceGuardrail {
    scanners: Vec<Box<dyn SourceScanner>>,
}

impl Default for SourceGuardrail {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceGuardrail {
    pub fn new() -> Self {
        Self::empty()
            .with_scanner(Box::new(SourceDangerousFunctionsScanner::new()))
            .with_scanner(Box::new(SourceTxOriginScanner::new()))
    }

    pub fn empty() -> Self {
        Self {
            scanners: Vec::new(),
        }
    }

    pub fn with_scanner(mut self, scanner: Box<dyn SourceScanner>) -> Self {
        self.scanners.push(scanner);
        self
    }

    pub fn scanner_ids(&self) -> Vec<&'static str> {
        self.scanners.iter().map(|scanner| scanner.id()).collect()
    }

    /// Findings from all scanners, ordered by line then severity (highest first).
    pub fn findings(&self, source: &str) -> Result<Vec<Finding>> {
        let unit = SourceUnit::parse(source)?;
        let mut findings = Vec::new();

        for scanner in &self.scanners {
            let found = scanner
                .scan(&unit)
                .with_context(|| format!("{} failed", scanner.name()))?;
            debug!(
                "{} (severity {}) reported {} finding(s)",
                scanner.id(),
                scanner.severity(),
                found.len()
            );
            findings.extend(found);
        }

        findings.sort_by(|a, b| a.line().cmp(&b.line()).then(b.severity.cmp(&a.severity)));
        Ok(findings)
    }
}

impl StaticAnalyzer for SourceGuardrail {
    fn analyze(&self, source: &str) -> Result<Vec<String>> {
        Ok(self
            .findings(source)?
            .iter()
            .map(Finding::issue_line)
            .collect())
    }
}
