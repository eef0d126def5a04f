use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Informational,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "Critical"),
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
            Self::Informational => write!(f, "Informational"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub end_line: Option<usize>,
    pub end_column: Option<usize>,
    pub snippet: Option<String>,
}

impl Location {
    /// Builds a 1-based line location spanning `node`.
    pub fn from_node(node: tree_sitter::Node<'_>, snippet: &str) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            line: start.row + 1,
            column: start.column,
            end_line: Some(end.row + 1),
            end_column: Some(end.column),
            snippet: Some(snippet.to_string()),
        }
    }
}

/// A single guardrail hit. Rendered to callers as one issue line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub scanner_id: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub title: String,
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Finding {
    pub fn new(
        scanner_id: impl Into<String>,
        severity: Severity,
        confidence: Confidence,
        title: String,
        description: String,
    ) -> Self {
        Self {
            scanner_id: scanner_id.into(),
            severity,
            confidence,
            title,
            description,
            location: None,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn line(&self) -> usize {
        self.location.as_ref().map_or(0, |location| location.line)
    }

    /// `[High] Dangerous selfdestruct at line 12`
    pub fn issue_line(&self) -> String {
        format!("[{}] {}", self.severity, self.title)
    }
}
