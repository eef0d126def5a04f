//! Static-analysis guardrail
//!
//! The pipelines only see [`StaticAnalyzer`]: source text in, ordered issue
//! lines out. [`SourceGuardrail`] is the built-in implementation backed by
//! tree-sitter scanners; [`NoopAnalyzer`] stands in when analysis is turned off.

pub mod finding;
pub mod guardrail;
pub mod source;

pub use finding::{Confidence, Finding, Location, Severity};
pub use guardrail::SourceGuardrail;
pub use source::{SourceScanner, SourceUnit};

use anyhow::Result;

use crate::config::StaticAnalysisSettings;

pub trait StaticAnalyzer: Send + Sync {
    /// Issue descriptions for `source`; empty when nothing was found.
    fn analyze(&self, source: &str) -> Result<Vec<String>>;
}

/// Reports no issues for any source.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalyzer;

impl StaticAnalyzer for NoopAnalyzer {
    fn analyze(&self, _source: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

pub fn analyzer_for(settings: &StaticAnalysisSettings) -> Box<dyn StaticAnalyzer> {
    if settings.enabled {
        Box::new(SourceGuardrail::new())
    } else {
        Box::new(NoopAnalyzer)
    }
}
