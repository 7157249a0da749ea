//! Ordered keep/drop rules matched against column names.

use crate::error::OutputError;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionAction {
    Keep,
    Drop,
}

/// One rule, e.g. `drop *_raw_*`. `*` matches any run of characters and
/// `?` a single character.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SelectionRule {
    pub action: SelectionAction,
    pub pattern: String,
}

impl SelectionRule {
    pub fn keep(pattern: impl Into<String>) -> Self {
        Self { action: SelectionAction::Keep, pattern: pattern.into() }
    }

    pub fn drop(pattern: impl Into<String>) -> Self {
        Self { action: SelectionAction::Drop, pattern: pattern.into() }
    }

    /// Parses the textual form `keep <pattern>` / `drop <pattern>`.
    pub fn parse(text: &str) -> Result<Self, OutputError> {
        let mut parts = text.split_whitespace();
        let (Some(action), Some(pattern), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(OutputError::InvalidConfiguration(format!(
                "selection rule '{}' must be '<keep|drop> <pattern>'",
                text
            )));
        };
        match action {
            "keep" => Ok(Self::keep(pattern)),
            "drop" => Ok(Self::drop(pattern)),
            other => Err(OutputError::InvalidConfiguration(format!(
                "unknown selection action '{}'",
                other
            ))),
        }
    }
}

/// Compiled rules. Every column starts out kept; rules are applied in
/// order and the last matching rule decides.
#[derive(Debug, Clone)]
pub struct SelectionRules {
    compiled: Vec<(SelectionAction, Regex)>,
}

impl SelectionRules {
    pub fn keep_all() -> Self {
        Self { compiled: Vec::new() }
    }

    pub fn compile(rules: &[SelectionRule]) -> Result<Self, OutputError> {
        let compiled = rules
            .iter()
            .map(|rule| Ok((rule.action, Regex::new(&glob_to_regex(&rule.pattern))?)))
            .collect::<Result<Vec<_>, OutputError>>()?;
        Ok(Self { compiled })
    }

    pub fn is_kept(&self, column_name: &str) -> bool {
        self.compiled
            .iter()
            .rev()
            .find(|(_, re)| re.is_match(column_name))
            .map_or(true, |(action, _)| *action == SelectionAction::Keep)
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}
