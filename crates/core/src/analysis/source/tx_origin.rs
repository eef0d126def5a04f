//! `tx.origin` authorization detector

use anyhow::Result;
use tree_sitter::{Node, TreeCursor};

use super::{SourceScanner, SourceUnit};
use crate::analysis::finding::{Confidence, Finding, Location, Severity};

const TX_ORIGIN: &str = "tx.origin";

pub struct SourceTxOriginScanner;

impl SourceTxOriginScanner {
    pub fn new() -> Self {
        Self
    }

    fn visit_node(&self, cursor: &mut TreeCursor, unit: &SourceUnit<'_>, findings: &mut Vec<Finding>) {
        let node = cursor.node();

        if is_innermost_tx_origin(unit, node) {
            if let Some(comparison) = comparison_around(unit, node) {
                let line = node.start_position().row + 1;
                let contract = unit.enclosing_contract(node).unwrap_or("unknown");
                findings.push(
                    Finding::new(
                        "tx-origin-authorization",
                        Severity::High,
                        Confidence::Medium,
                        format!("tx.origin used for authorization at line {}", line),
                        format!(
                            "Contract '{}' compares tx.origin at line {} (`{}`). Any contract the owner calls can pass this check; use msg.sender.",
                            contract, line, comparison
                        ),
                    )
                    .with_location(Location::from_node(node, comparison)),
                );
            }
            return;
        }

        if cursor.goto_first_child() {
            loop {
                self.visit_node(cursor, unit, findings);
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }
    }
}

impl Default for SourceTxOriginScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceScanner for SourceTxOriginScanner {
    fn id(&self) -> &'static str {
        "source-tx-origin"
    }

    fn name(&self) -> &'static str {
        "tx.origin Authorization Detector"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn scan(&self, unit: &SourceUnit<'_>) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        let mut cursor = unit.tree.root_node().walk();
        self.visit_node(&mut cursor, unit, &mut findings);
        Ok(findings)
    }
}

// Wrapper expression nodes share the member expression's text; only the
// deepest one counts.
fn is_innermost_tx_origin(unit: &SourceUnit<'_>, node: Node<'_>) -> bool {
    if unit.text(node) != TX_ORIGIN {
        return false;
    }

    let mut cursor = node.walk();
    let has_same_child = node
        .named_children(&mut cursor)
        .any(|child| unit.text(child) == TX_ORIGIN);
    !has_same_child
}

/// The first enclosing expression that differs from `tx.origin` itself,
/// when that expression is an equality check.
fn comparison_around<'a>(unit: &SourceUnit<'a>, node: Node<'_>) -> Option<&'a str> {
    let mut current = node.parent();
    while let Some(candidate) = current {
        let text = unit.text(candidate);
        if text != TX_ORIGIN {
            return (text.contains("==") || text.contains("!=")).then_some(text);
        }
        current = candidate.parent();
    }
    None
}
