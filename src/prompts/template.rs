//! `{variable}` prompt templates.
//!
//! A template is literal text with `{name}` placeholders, where `name` is an
//! identifier (`[A-Za-z_][A-Za-z0-9_]*`, whitespace inside the braces is
//! ignored). `{{` and `}}` produce literal braces. Templates are compiled once
//! into a segment list and rendered many times.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Values supplied for template variables.
pub type Variables = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unclosed '{{' at byte {position}")]
    UnclosedBrace { position: usize },

    #[error("unmatched '}}' at byte {position}")]
    UnmatchedClosingBrace { position: usize },

    #[error("empty placeholder at byte {position}")]
    EmptyPlaceholder { position: usize },

    #[error("invalid variable name '{name}' at byte {position}")]
    InvalidVariableName { name: String, position: usize },

    #[error("missing values for variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("values supplied for unknown variables: {}", .0.join(", "))]
    UnknownVariables(Vec<String>),

    #[error("unknown validation mode '{0}' (expected strict, warn, loose or none)")]
    UnknownMode(String),
}

/// How declared and supplied variables are reconciled when rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ValidationMode {
    /// Missing or unknown variables are errors.
    #[default]
    Strict,
    /// Mismatches are logged; missing placeholders stay in the output verbatim.
    Warn,
    /// Missing variables render as empty strings; unknown ones are ignored.
    Loose,
    /// No checks; missing placeholders stay in the output verbatim.
    None,
}

impl FromStr for ValidationMode {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "warn" | "warning" => Ok(ValidationMode::Warn),
            "loose" => Ok(ValidationMode::Loose),
            "none" | "off" => Ok(ValidationMode::None),
            _ => Err(TemplateError::UnknownMode(s.to_string())),
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationMode::Strict => "strict",
            ValidationMode::Warn => "warn",
            ValidationMode::Loose => "loose",
            ValidationMode::None => "none",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Variable(String),
}

/// Difference between the variables a template declares and those supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Declared but not supplied, in template order.
    pub missing: Vec<String>,
    /// Supplied but not declared, sorted.
    pub unknown: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unknown.is_empty()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

fn parse(source: &str) -> Result<Vec<Segment>, TemplateError> {
    let bytes = source.as_bytes();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    let mut run_start = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                literal.push_str(&source[run_start..i]);
                literal.push('{');
                i += 2;
                run_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                literal.push_str(&source[run_start..i]);
                literal.push('}');
                i += 2;
                run_start = i;
            }
            b'{' => {
                literal.push_str(&source[run_start..i]);
                let close = source[i + 1..]
                    .find(['{', '}'])
                    .map(|off| i + 1 + off)
                    .filter(|&j| bytes[j] == b'}')
                    .ok_or(TemplateError::UnclosedBrace { position: i })?;
                let name = source[i + 1..close].trim();
                if name.is_empty() {
                    return Err(TemplateError::EmptyPlaceholder { position: i });
                }
                if !is_identifier(name) {
                    return Err(TemplateError::InvalidVariableName {
                        name: name.to_string(),
                        position: i,
                    });
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Variable(name.to_string()));
                i = close + 1;
                run_start = i;
            }
            b'}' => return Err(TemplateError::UnmatchedClosingBrace { position: i }),
            _ => i += 1,
        }
    }
    literal.push_str(&source[run_start..]);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn unique_variables(segments: &[Segment]) -> Vec<String> {
    let mut seen = HashSet::new();
    segments
        .iter()
        .filter_map(|s| match s {
            Segment::Variable(name) if seen.insert(name.as_str()) => Some(name.clone()),
            _ => None,
        })
        .collect()
}

/// Unique variable names of `template`, in order of first appearance.
pub fn extract_variables(template: &str) -> Result<Vec<String>, TemplateError> {
    Ok(unique_variables(&parse(template)?))
}

/// Compare `declared` against `supplied` under `mode`.
///
/// Only [`ValidationMode::Strict`] returns an error; `Warn` logs the mismatch.
pub fn validate_variables(
    declared: &[String],
    supplied: &Variables,
    mode: ValidationMode,
) -> Result<ValidationReport, TemplateError> {
    let missing: Vec<String> = declared
        .iter()
        .filter(|d| !supplied.contains_key(d.as_str()))
        .cloned()
        .collect();
    let mut unknown: Vec<String> = supplied
        .keys()
        .filter(|k| !declared.iter().any(|d| d == *k))
        .cloned()
        .collect();
    unknown.sort();
    let report = ValidationReport { missing, unknown };

    match mode {
        ValidationMode::Strict => {
            if !report.missing.is_empty() {
                return Err(TemplateError::MissingVariables(report.missing));
            }
            if !report.unknown.is_empty() {
                return Err(TemplateError::UnknownVariables(report.unknown));
            }
        }
        ValidationMode::Warn => {
            if !report.missing.is_empty() {
                warn!(missing = ?report.missing, "template variables have no value");
            }
            if !report.unknown.is_empty() {
                warn!(unknown = ?report.unknown, "values supplied for undeclared template variables");
            }
        }
        ValidationMode::Loose | ValidationMode::None => {}
    }
    Ok(report)
}

/// A parsed template, ready to render repeatedly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
    variables: Vec<String>,
}

impl PromptTemplate {
    pub fn compile(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();
        let segments = parse(&source)?;
        let variables = unique_variables(&segments);
        Ok(Self {
            source,
            segments,
            variables,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn validate(&self, supplied: &Variables, mode: ValidationMode) -> Result<ValidationReport, TemplateError> {
        if mode == ValidationMode::None {
            return Ok(ValidationReport::default());
        }
        validate_variables(&self.variables, supplied, mode)
    }

    pub fn render(&self, vars: &Variables, mode: ValidationMode) -> Result<String, TemplateError> {
        self.validate(vars, mode)?;
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None if mode == ValidationMode::Loose => {}
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                },
            }
        }
        Ok(out)
    }
}

/// Render `template` through the process-wide compile cache.
pub fn render(template: &str, vars: &Variables, mode: ValidationMode) -> Result<String, TemplateError> {
    super::cache::global().get_or_compile(template)?.render(vars, mode)
}
