//! Keyword-driven priority selection.
//!
//! Rules are checked in order against the lowercased message body. The first
//! rule whose keyword appears wins; when none match the notification keeps
//! the default priority.

use crate::core::Priority;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maps a keyword to the priority it triggers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PriorityRule {
    pub keyword: String,
    pub priority: Priority,
}

impl PriorityRule {
    pub fn new(keyword: impl Into<String>, priority: Priority) -> Self {
        Self {
            keyword: keyword.into(),
            priority,
        }
    }
}

/// A rule whose keyword is blank would match every message.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("priority rule #{position} has an empty keyword")]
pub struct EmptyKeyword {
    /// One-based position of the offending rule.
    pub position: usize,
}

/// An ordered list of [`PriorityRule`]s.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(into = "Vec<PriorityRule>", try_from = "Vec<PriorityRule>")]
pub struct PriorityRules(Vec<PriorityRule>);

impl PriorityRules {
    pub fn new(rules: Vec<PriorityRule>) -> Self {
        Self(rules)
    }

    /// Picks the priority for `message`.
    pub fn classify(&self, message: &str) -> Priority {
        let haystack = message.to_lowercase();
        self.0
            .iter()
            .find(|rule| haystack.contains(&rule.keyword.to_lowercase()))
            .map(|rule| rule.priority)
            .unwrap_or(Priority::Default)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<PriorityRule>> for PriorityRules {
    type Error = EmptyKeyword;

    fn try_from(rules: Vec<PriorityRule>) -> Result<Self, Self::Error> {
        match rules.iter().position(|rule| rule.keyword.trim().is_empty()) {
            Some(index) => Err(EmptyKeyword { position: index + 1 }),
            None => Ok(Self(rules)),
        }
    }
}

impl From<PriorityRules> for Vec<PriorityRule> {
    fn from(rules: PriorityRules) -> Self {
        rules.0
    }
}

impl Default for PriorityRules {
    fn default() -> Self {
        Self(vec![PriorityRule::new("error", Priority::Max)])
    }
}
