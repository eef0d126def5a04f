use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

use crate::input::InputKind;

pub const SUMMARY_TEMPLATE: &str = "contract_summary";
pub const GENERATION_TEMPLATE: &str = "contract_generation";

/// Payloads longer than this many characters are cut down to both ends.
pub const MAX_PAYLOAD_CHARS: usize = 8000;
const PAYLOAD_EDGE_CHARS: usize = 4000;
const TRUNCATION_MARKER: &str = "\n…\n";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub system_prompt: String,
    pub user_prompt_template: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: String::new(),
            user_prompt_template: String::new(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_user_template(mut self, template: impl Into<String>) -> Self {
        self.user_prompt_template = template.into();
        self
    }
}

pub struct PromptBuilder {
    templates: HashMap<String, PromptTemplate>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            templates: HashMap::new(),
        };

        builder.add_template(Self::summary_template());
        builder.add_template(Self::generation_template());
        builder
    }

    pub fn add_template(&mut self, template: PromptTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    pub fn build_prompt(
        &self,
        template_name: &str,
        variables: &HashMap<&str, &str>,
    ) -> Result<(String, String)> {
        let template = self
            .templates
            .get(template_name)
            .ok_or_else(|| anyhow::anyhow!("Template '{}' not found", template_name))?;

        let system_prompt = substitute_variables(&template.system_prompt, variables);
        let user_prompt = substitute_variables(&template.user_prompt_template, variables);

        Ok((system_prompt, user_prompt))
    }

    /// `(system, user)` prompt asking for a four-key JSON summary of `payload`.
    pub fn summary_prompt(&self, kind: InputKind, payload: &str) -> Result<(String, String)> {
        let snippet = truncate_payload(payload);
        let variables = HashMap::from([("intro", intro_for(kind)), ("payload", snippet.as_ref())]);
        self.build_prompt(SUMMARY_TEMPLATE, &variables)
    }

    /// `(system, user)` prompt asking for `code` and `explanation` JSON.
    pub fn generation_prompt(&self, requirement: &str) -> Result<(String, String)> {
        let variables = HashMap::from([("requirement", requirement)]);
        self.build_prompt(GENERATION_TEMPLATE, &variables)
    }

    fn summary_template() -> PromptTemplate {
        PromptTemplate::new(SUMMARY_TEMPLATE)
            .with_system_prompt("You are a senior Solidity auditor.")
            .with_user_template(
                r#"{intro}

{payload}

Produce a concise technical summary **in JSON only** with these keys: summary, key_functions, permissions, security_patterns.

Formatting guidelines:
• **summary** – one sentence (≤ 50 words).
• **key_functions** – list of strings like "mint(address,uint256) – mints tokens to an address".
• **permissions** – list of strings like "mint: MINTER_ROLE" or "addMinter: DEFAULT_ADMIN_ROLE".
• **security_patterns** – list of plain strings (e.g. "Role-based access via AccessControl", "ReentrancyGuard used").

Access-control rule: any function that ultimately calls or is gated by OpenZeppelin's `grantRole`, `revokeRole`, `hasRole`, `onlyRole`, or an inherited modifier such as `onlyRole(MINTER_ROLE)` **is considered protected**. Do NOT mark it 'unprotected'.

Respond with valid minified JSON (no Markdown fences, no commentary)."#,
            )
    }

    fn generation_template() -> PromptTemplate {
        PromptTemplate::new(GENERATION_TEMPLATE)
            .with_system_prompt("You generate secure Solidity smart contracts.")
            .with_user_template(
                r#"You are a Solidity security expert.
Generate a minimal, secure Solidity contract for:
"{requirement}"

• Use Solidity ^0.8.13 with OpenZeppelin audited contracts.
• Apply proper access control.
• Avoid reentrancy/public mint/self-destruct.
Respond only in JSON with keys `code` and `explanation` (array preferred)."#,
            )
    }
}

pub fn intro_for(kind: InputKind) -> &'static str {
    match kind {
        InputKind::Abi => "Here is the JSON ABI of a smart contract:",
        InputKind::Bytecode => "Here is the EVM bytecode (hex):",
        InputKind::Solidity => "Here is the Solidity source code:",
    }
}

/// Keeps the first and last 4000 characters of an oversized payload.
pub fn truncate_payload(payload: &str) -> Cow<'_, str> {
    let total = payload.chars().count();
    if total <= MAX_PAYLOAD_CHARS {
        return Cow::Borrowed(payload);
    }

    let head_end = byte_offset(payload, PAYLOAD_EDGE_CHARS);
    let tail_start = byte_offset(payload, total - PAYLOAD_EDGE_CHARS);

    Cow::Owned(format!(
        "{}{}{}",
        &payload[..head_end],
        TRUNCATION_MARKER,
        &payload[tail_start..]
    ))
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

// Single pass: substituted values are never scanned for placeholders again.
fn substitute_variables(template: &str, variables: &HashMap<&str, &str>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        result.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match after
            .find('}')
            .and_then(|close| variables.get(&after[..close]).map(|value| (close, value)))
        {
            Some((close, value)) => {
                result.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                result.push('{');
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}
