//! JOIN descriptors and their linearization into JOIN clauses.
//!
//! A [`JoinDescriptor`] says "`table.key` joins into `linked.table.linked.key`".
//! Descriptors are collected into a [`JoinPlan`] innermost-first; the plan is
//! emitted in reverse push order (last pushed, first emitted) and is never
//! consumed, so one plan can be shared by concurrent statement builds.
//!
//! # Example
//! ```
//! use sqlscript::join::{JoinDescriptor, JoinKind, JoinPlan};
//!
//! let authors = JoinDescriptor::target("authors", "id");
//! let news = JoinDescriptor::new(JoinKind::Left, "news", "author_id", authors);
//! let plan = JoinPlan::new().push(news);
//!
//! assert_eq!(
//!     plan.linearize().unwrap(),
//!     vec!["LEFT OUTER JOIN authors ON authors.id = news.author_id"]
//! );
//! ```

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Kind of JOIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum JoinKind {
    Left,
    Right,
    Inner,
}

impl JoinKind {
    /// SQL keyword for this join kind.
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT OUTER JOIN",
            JoinKind::Right => "RIGHT OUTER JOIN",
            JoinKind::Inner => "INNER JOIN",
        }
    }
}

impl FromStr for JoinKind {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "left outer" => Ok(JoinKind::Left),
            "right" | "right outer" => Ok(JoinKind::Right),
            "inner" => Ok(JoinKind::Inner),
            _ => Err(BuildError::configuration(format!(
                "Unknown join type: {s}"
            ))),
        }
    }
}

impl TryFrom<String> for JoinKind {
    type Error = BuildError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<JoinKind> for String {
    fn from(kind: JoinKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinKind::Left => "left",
            JoinKind::Right => "right",
            JoinKind::Inner => "inner",
        })
    }
}

/// One link of a join chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinDescriptor {
    kind: Option<JoinKind>,
    table: String,
    key: String,
    linked: Option<Arc<JoinDescriptor>>,
    condition: Option<String>,
}

impl JoinDescriptor {
    /// A descriptor that `table.key` joins into `linked`.
    pub fn new(
        kind: JoinKind,
        table: impl Into<String>,
        key: impl Into<String>,
        linked: impl Into<Arc<JoinDescriptor>>,
    ) -> Self {
        Self {
            kind: Some(kind),
            table: table.into(),
            key: key.into(),
            linked: Some(linked.into()),
            condition: None,
        }
    }

    /// The end of a chain: a table and key that others join into.
    pub fn target(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind: None,
            table: table.into(),
            key: key.into(),
            linked: None,
            condition: None,
        }
    }

    /// Extra predicate ANDed onto the ON clause.
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into()).filter(|c: &String| !c.trim().is_empty());
        self
    }

    pub fn kind(&self) -> Option<JoinKind> {
        self.kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn linked(&self) -> Option<&JoinDescriptor> {
        self.linked.as_deref()
    }

    /// Render this descriptor as a JOIN clause.
    pub fn to_clause(&self) -> BuildResult<String> {
        let kind = self.kind.ok_or_else(|| {
            BuildError::configuration(format!(
                "Unknown execution join type for: {} (no join kind)",
                self.table
            ))
        })?;
        let linked = self.linked.as_deref().ok_or_else(|| {
            BuildError::configuration(format!(
                "Join descriptor for `{}` has no linked table",
                self.table
            ))
        })?;

        let mut clause = format!(
            "{} {} ON {}.{} = {}.{}",
            kind.keyword(),
            linked.table,
            linked.table,
            linked.key,
            self.table,
            self.key
        );
        if let Some(condition) = &self.condition {
            clause.push_str(" AND ");
            clause.push_str(condition);
        }
        Ok(clause)
    }
}

/// Ordered set of join descriptors, pushed innermost-first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinPlan {
    entries: Vec<Arc<JoinDescriptor>>,
}

impl JoinPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a descriptor; it will be emitted before everything pushed earlier.
    pub fn push(mut self, descriptor: impl Into<Arc<JoinDescriptor>>) -> Self {
        self.entries.push(descriptor.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Descriptors in emission order (last pushed first).
    pub fn iter(&self) -> impl Iterator<Item = &JoinDescriptor> {
        self.entries.iter().rev().map(|d| d.as_ref())
    }

    /// Render every descriptor as a JOIN clause, in emission order.
    pub fn linearize(&self) -> BuildResult<Vec<String>> {
        self.iter().map(JoinDescriptor::to_clause).collect()
    }
}

impl FromIterator<JoinDescriptor> for JoinPlan {
    fn from_iter<I: IntoIterator<Item = JoinDescriptor>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Arc::new).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn news_into_authors() -> JoinDescriptor {
        JoinDescriptor::new(
            JoinKind::Left,
            "news",
            "author_id",
            JoinDescriptor::target("authors", "id"),
        )
    }

    #[test]
    fn single_left_join() {
        let plan = JoinPlan::new().push(news_into_authors());
        assert_eq!(
            plan.linearize().unwrap(),
            vec!["LEFT OUTER JOIN authors ON authors.id = news.author_id"]
        );
    }

    #[test]
    fn emission_is_lifo_and_non_destructive() {
        let authors = Arc::new(JoinDescriptor::target("authors", "id"));
        let users = Arc::new(JoinDescriptor::target("users", "id"));
        let plan = JoinPlan::new()
            .push(JoinDescriptor::new(JoinKind::Inner, "news", "author_id", authors))
            .push(JoinDescriptor::new(JoinKind::Right, "authors", "user_id", users));

        let first = plan.linearize().unwrap();
        assert_eq!(
            first,
            vec![
                "RIGHT OUTER JOIN users ON users.id = authors.user_id",
                "INNER JOIN authors ON authors.id = news.author_id",
            ]
        );
        assert_eq!(plan.linearize().unwrap(), first);
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn extra_condition_is_anded() {
        let plan = JoinPlan::new().push(news_into_authors().condition("authors.sex = 1"));
        assert_eq!(
            plan.linearize().unwrap()[0],
            "LEFT OUTER JOIN authors ON authors.id = news.author_id AND authors.sex = 1"
        );
    }

    #[test]
    fn unknown_kind_is_a_configuration_error() {
        let err = "outer".parse::<JoinKind>().unwrap_err();
        assert!(err.is_configuration());
        assert_eq!("LEFT".parse::<JoinKind>().unwrap(), JoinKind::Left);
    }

    #[test]
    fn chain_end_cannot_be_emitted() {
        let plan = JoinPlan::new().push(JoinDescriptor::target("authors", "id"));
        assert!(plan.linearize().unwrap_err().is_configuration());
    }
}
