//! Dangerous function detector
//!
//! Flags `selfdestruct`/`suicide` calls, `delegatecall` and inline assembly
//! that reaches for `selfdestruct`, `delegatecall` or `callcode`.

use anyhow::Result;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

use super::{language, SourceScanner, SourceUnit};
use crate::analysis::finding::{Confidence, Finding, Location, Severity};

const ASSEMBLY_OPCODES: [&str; 3] = ["selfdestruct", "delegatecall", "callcode"];

pub struct SourceDangerousFunctionsScanner;

impl SourceDangerousFunctionsScanner {
    pub fn new() -> Self {
        Self
    }

    fn scan_calls(&self, unit: &SourceUnit<'_>, findings: &mut Vec<Finding>) -> Result<()> {
        let query = Query::new(&language(), "(call_expression) @call")?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, unit.tree.root_node(), unit.source.as_bytes());

        matches.advance();
        while let Some(match_) = matches.get() {
            for capture in match_.captures {
                let call_node = capture.node;
                let call_text = unit.text(call_node);
                let callee = call_node
                    .child_by_field_name("function")
                    .map(|function| callee_of(unit.text(function)))
                    .unwrap_or_else(|| callee_of(call_text));
                let contract = unit.enclosing_contract(call_node).unwrap_or("unknown");
                let line = call_node.start_position().row + 1;

                if callee == "selfdestruct" || callee == "suicide" {
                    findings.push(
                        Finding::new(
                            "dangerous-selfdestruct",
                            Severity::High,
                            Confidence::High,
                            format!("Dangerous selfdestruct at line {}", line),
                            format!(
                                "Contract '{}' uses selfdestruct at line {}, which permanently destroys the contract.",
                                contract, line
                            ),
                        )
                        .with_location(Location::from_node(call_node, call_text)),
                    );
                } else if callee.ends_with(".delegatecall") {
                    findings.push(
                        Finding::new(
                            "dangerous-delegatecall",
                            Severity::High,
                            Confidence::High,
                            format!("Dangerous delegatecall at line {}", line),
                            format!(
                                "Contract '{}' uses delegatecall at line {}, which executes foreign code in its own storage context.",
                                contract, line
                            ),
                        )
                        .with_location(Location::from_node(call_node, call_text)),
                    );
                }
            }
            matches.advance();
        }

        Ok(())
    }

    fn scan_assembly(&self, unit: &SourceUnit<'_>, findings: &mut Vec<Finding>) -> Result<()> {
        let query = Query::new(&language(), "(assembly_statement) @asm")?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, unit.tree.root_node(), unit.source.as_bytes());

        matches.advance();
        while let Some(match_) = matches.get() {
            for capture in match_.captures {
                if let Some(finding) = self.assembly_finding(unit, capture.node) {
                    findings.push(finding);
                }
            }
            matches.advance();
        }

        Ok(())
    }

    fn assembly_finding(&self, unit: &SourceUnit<'_>, asm_node: Node<'_>) -> Option<Finding> {
        let asm_text = unit.text(asm_node);
        let opcode = ASSEMBLY_OPCODES
            .iter()
            .find(|opcode| asm_text.contains(*opcode))?;

        let line = asm_node.start_position().row + 1;
        let contract = unit.enclosing_contract(asm_node).unwrap_or("unknown");
        let snippet = asm_text.lines().take(3).collect::<Vec<_>>().join("\n");

        Some(
            Finding::new(
                "dangerous-assembly",
                Severity::Medium,
                Confidence::High,
                format!("Dangerous {} in assembly at line {}", opcode, line),
                format!(
                    "Contract '{}' uses inline assembly at line {} that bypasses Solidity's safety checks.",
                    contract, line
                ),
            )
            .with_location(Location::from_node(asm_node, &snippet)),
        )
    }
}

impl Default for SourceDangerousFunctionsScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceScanner for SourceDangerousFunctionsScanner {
    fn id(&self) -> &'static str {
        "source-dangerous-functions"
    }

    fn name(&self) -> &'static str {
        "Dangerous Functions Detector"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn scan(&self, unit: &SourceUnit<'_>) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        self.scan_calls(unit, &mut findings)?;
        self.scan_assembly(unit, &mut findings)?;
        Ok(findings)
    }
}

// `address(impl).delegatecall{gas: 5000}(data)` -> `address(impl).delegatecall`
fn callee_of(call_text: &str) -> &str {
    let without_args = strip_trailing_group(call_text, '(', ')');
    strip_trailing_group(without_args, '{', '}').trim()
}

// Drops one balanced `open ... close` group from the end of `text`.
fn strip_trailing_group(text: &str, open: char, close: char) -> &str {
    let text = text.trim_end();
    if !text.ends_with(close) {
        return text;
    }

    let mut depth = 0usize;
    for (i, c) in text.char_indices().rev() {
        if c == close {
            depth += 1;
        } else if c == open {
            depth -= 1;
            if depth == 0 {
                return text[..i].trim_end();
            }
        }
    }
    text
}
