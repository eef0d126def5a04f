//! Typed results and the coercion of model JSON into them.
//!
//! Models are loose about shapes: a list may arrive as a bare string, list
//! items may be objects, an explanation may be an array. Each field is first
//! read into an explicit intake enum and then converted, one function per
//! variant, into the canonical representation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

pub const ITEM_SEPARATOR: &str = " – ";
pub const BULLET: &str = "- ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSummary {
    pub summary: String,
    pub key_functions: Vec<String>,
    pub permissions: Vec<String>,
    pub security_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractGeneration {
    pub code: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Error)]
#[error("LLM response failed validation: {}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn paths(&self) -> Vec<&str> {
        self.issues.iter().map(|issue| issue.path.as_str()).collect()
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A list-typed field as the model sent it.
#[derive(Debug, Clone, PartialEq)]
pub enum ListIntake {
    Text(String),
    Items(Vec<ItemIntake>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemIntake {
    Text(String),
    Mapping(Map<String, Value>),
    Scalar(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExplanationIntake {
    Text(String),
    Lines(Vec<Value>),
}

impl ListIntake {
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Array(items) => Ok(Self::Items(items.into_iter().map(ItemIntake::from).collect())),
            other => Err(format!("expected a list of strings, found {}", type_name(&other))),
        }
    }

    pub fn into_strings(self) -> Vec<String> {
        match self {
            Self::Text(text) => vec![text],
            Self::Items(items) => items.into_iter().map(ItemIntake::into_text).collect(),
        }
    }
}

impl From<Value> for ItemIntake {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Object(mapping) => Self::Mapping(mapping),
            other => Self::Scalar(other),
        }
    }
}

impl ItemIntake {
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Mapping(mapping) => flatten_mapping(&mapping),
            Self::Scalar(value) => value_text(&value),
        }
    }
}

impl ExplanationIntake {
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Array(lines) => Ok(Self::Lines(lines)),
            other => Err(format!(
                "expected a string or a list of strings, found {}",
                type_name(&other)
            )),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Lines(lines) => lines
                .iter()
                .map(|line| format!("{}{}", BULLET, value_text(line)))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

fn flatten_mapping(mapping: &Map<String, Value>) -> String {
    mapping
        .values()
        .map(value_text)
        .collect::<Vec<_>>()
        .join(ITEM_SEPARATOR)
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn take_string(object: &mut Map<String, Value>, field: &str, issues: &mut Vec<FieldIssue>) -> Option<String> {
    match object.remove(field) {
        Some(Value::String(text)) => Some(text),
        Some(other) => {
            issues.push(FieldIssue {
                path: field.to_string(),
                message: format!("expected a string, found {}", type_name(&other)),
            });
            None
        }
        None => {
            issues.push(FieldIssue {
                path: field.to_string(),
                message: "field required".to_string(),
            });
            None
        }
    }
}

// An absent list is an empty list.
fn take_list(object: &mut Map<String, Value>, field: &str, issues: &mut Vec<FieldIssue>) -> Option<Vec<String>> {
    let Some(value) = object.remove(field) else {
        return Some(Vec::new());
    };

    match ListIntake::from_value(value) {
        Ok(intake) => Some(intake.into_strings()),
        Err(message) => {
            issues.push(FieldIssue {
                path: field.to_string(),
                message,
            });
            None
        }
    }
}

fn take_explanation(object: &mut Map<String, Value>, issues: &mut Vec<FieldIssue>) -> Option<String> {
    let field = "explanation";
    let Some(value) = object.remove(field) else {
        issues.push(FieldIssue {
            path: field.to_string(),
            message: "field required".to_string(),
        });
        return None;
    };

    match ExplanationIntake::from_value(value) {
        Ok(intake) => Some(intake.into_text()),
        Err(message) => {
            issues.push(FieldIssue {
                path: field.to_string(),
                message,
            });
            None
        }
    }
}

impl ContractSummary {
    pub fn from_json(mut object: Map<String, Value>) -> Result<Self, ValidationError> {
        let mut issues = Vec::new();

        let summary = take_string(&mut object, "summary", &mut issues);
        let key_functions = take_list(&mut object, "key_functions", &mut issues);
        let permissions = take_list(&mut object, "permissions", &mut issues);
        let security_patterns = take_list(&mut object, "security_patterns", &mut issues);

        match (summary, key_functions, permissions, security_patterns) {
            (Some(summary), Some(key_functions), Some(permissions), Some(security_patterns)) => {
                Ok(Self {
                    summary,
                    key_functions,
                    permissions,
                    security_patterns,
                })
            }
            _ => Err(ValidationError { issues }),
        }
    }
}

impl ContractGeneration {
    pub fn from_json(mut object: Map<String, Value>) -> Result<Self, ValidationError> {
        let mut issues = Vec::new();

        let code = take_string(&mut object, "code", &mut issues);
        let explanation = take_explanation(&mut object, &mut issues);

        match (code, explanation) {
            (Some(code), Some(explanation)) => Ok(Self { code, explanation }),
            _ => Err(ValidationError { issues }),
        }
    }
}

pub fn validate_summary(object: Map<String, Value>) -> Result<ContractSummary, ValidationError> {
    ContractSummary::from_json(object)
}

pub fn validate_generation(
    object: Map<String, Value>,
) -> Result<ContractGeneration, ValidationError> {
    ContractGeneration::from_json(object)
}
