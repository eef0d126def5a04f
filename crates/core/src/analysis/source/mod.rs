//! Source-level scanners
//!
//! Each scanner walks a tree-sitter parse of the Solidity text and reports
//! patterns the generator must never persist. The parse is shared, so a
//! guardrail run parses the source once no matter how many scanners it holds.

pub mod dangerous_functions;
pub mod tx_origin;

pub use dangerous_functions::SourceDangerousFunctionsScanner;
pub use tx_origin::SourceTxOriginScanner;

use anyhow::Result;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::analysis::finding::{Finding, Severity};

/// Solidity text together with its syntax tree.
pub struct SourceUnit<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl<'a> SourceUnit<'a> {
    pub fn parse(source: &'a str) -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(&language())?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("Failed to parse source"))?;

        Ok(Self { source, tree })
    }

    pub fn text(&self, node: Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }

    /// Name of the contract declaration enclosing `node`, if any.
    pub fn enclosing_contract(&self, node: Node<'_>) -> Option<&'a str> {
        let mut current = node.parent();
        while let Some(candidate) = current {
            if candidate.kind() == "contract_declaration" {
                return candidate
                    .child_by_field_name("name")
                    .map(|name| self.text(name));
            }
            current = candidate.parent();
        }
        None
    }
}

pub fn language() -> Language {
    tree_sitter_solidity::LANGUAGE.into()
}

pub trait SourceScanner: Send + Sync {
    fn id(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn severity(&self) -> Severity;

    fn scan(&self, unit: &SourceUnit<'_>) -> Result<Vec<Finding>>;
}
