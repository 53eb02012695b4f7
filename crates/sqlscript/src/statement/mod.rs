//! Statement assembly from record metadata.
//!
//! [`StatementBuilder::build`] turns an operation kind, a record (or a slice of
//! records for batch operations) and per-operation [`OperationMetadata`] into
//! statement text, caching the text per operation key.

mod builder;
mod cache;


pub use builder::{StatementBuilder, StatementProvider, operation_key};
pub use cache::{CacheStats, CachedStatement, StatementCache};

use crate::error::{BuildError, BuildResult};
use crate::join::{JoinDescriptor, JoinPlan};
use crate::param::{Params, list_params, params_of};
use crate::script::is_script;
use serde::Serialize;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;

/// Operation names qualified by table when forming a cache key.
pub const RESERVED_OPERATIONS: &[&str] = &[
    "selectByCondition",
    "selectPage",
    "selectBatch",
    "insert",
    "insertBatch",
    "update",
    "updateBatch",
    "delete",
    "deleteBatch",
];

/// What a statement does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Select,
    SelectBatch,
    Insert,
    InsertBatch,
    Update,
    UpdateBatch,
    Delete,
    DeleteBatch,
}

impl OperationKind {
    pub fn is_batch(self) -> bool {
        matches!(
            self,
            Self::SelectBatch | Self::InsertBatch | Self::UpdateBatch | Self::DeleteBatch
        )
    }

    /// The batch variant of this kind.
    pub fn batch(self) -> Self {
        match self {
            Self::Select => Self::SelectBatch,
            Self::Insert => Self::InsertBatch,
            Self::Update => Self::UpdateBatch,
            Self::Delete => Self::DeleteBatch,
            batch => batch,
        }
    }

    /// Operation name used when the metadata does not name one.
    pub fn default_name(self) -> &'static str {
        match self {
            Self::Select => "selectByCondition",
            Self::SelectBatch => "selectBatch",
            Self::Insert => "insert",
            Self::InsertBatch => "insertBatch",
            Self::Update => "update",
            Self::UpdateBatch => "updateBatch",
            Self::Delete => "delete",
            Self::DeleteBatch => "deleteBatch",
        }
    }

    /// Whether the text is always wrapped in a `<script>` envelope.
    fn always_scripted(self) -> bool {
        matches!(
            self,
            Self::Select | Self::SelectBatch | Self::Delete | Self::DeleteBatch
        )
    }
}

impl FromStr for OperationKind {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "select" => Ok(Self::Select),
            "selectbatch" => Ok(Self::SelectBatch),
            "insert" => Ok(Self::Insert),
            "insertbatch" => Ok(Self::InsertBatch),
            "update" => Ok(Self::Update),
            "updatebatch" => Ok(Self::UpdateBatch),
            "delete" => Ok(Self::Delete),
            "deletebatch" => Ok(Self::DeleteBatch),
            _ => Err(BuildError::configuration(format!(
                "Unrecognized operation kind: {s}"
            ))),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Select => "select",
            Self::SelectBatch => "selectBatch",
            Self::Insert => "insert",
            Self::InsertBatch => "insertBatch",
            Self::Update => "update",
            Self::UpdateBatch => "updateBatch",
            Self::Delete => "delete",
            Self::DeleteBatch => "deleteBatch",
        })
    }
}

/// ORDER BY direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(BuildError::configuration(format!("Unknown sort order: {s}"))),
        }
    }
}

/// Declarative metadata for one operation.
#[derive(Debug, Clone, Default)]
pub struct OperationMetadata {
    /// Operation name; defaults to the kind's name.
    pub name: Option<String>,
    /// Table override; defaults to the record's table.
    pub table: Option<String>,
    pub order_by: Option<String>,
    pub order: Option<SortOrder>,
    pub group_by: Option<String>,
    pub having: Option<String>,
    /// Fields filtered with `LIKE` instead of equality.
    pub like: Vec<String>,
    /// Treat the operation as batch even for a single record input.
    pub batch: bool,
    pub joins: JoinPlan,
}

impl OperationMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn group_by(mut self, clause: impl Into<String>) -> Self {
        self.group_by = Some(clause.into());
        self
    }

    pub fn having(mut self, clause: impl Into<String>) -> Self {
        self.having = Some(clause.into());
        self
    }

    /// Add LIKE fields.
    pub fn like<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.like.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn batch(mut self, batch: bool) -> Self {
        self.batch = batch;
        self
    }

    /// Push one join; later joins are emitted first.
    pub fn join(mut self, descriptor: impl Into<Arc<JoinDescriptor>>) -> Self {
        self.joins = self.joins.push(descriptor);
        self
    }

    /// Replace the join plan.
    pub fn joins(mut self, plan: JoinPlan) -> Self {
        self.joins = plan;
        self
    }
}

/// Records a statement is built from.
#[derive(Debug)]
pub enum Input<'a, R> {
    One(&'a R),
    Many(&'a [R]),
}

impl<R> Clone for Input<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Input<'_, R> {}

impl<'a, R> Input<'a, R> {
    pub fn is_many(&self) -> bool {
        matches!(self, Input::Many(_))
    }

    /// The single record, when there is one.
    pub fn one(&self) -> Option<&'a R> {
        match *self {
            Input::One(record) => Some(record),
            Input::Many(_) => None,
        }
    }
}

impl<R: Serialize> Input<'_, R> {
    /// Parameters for rendering: the record's fields, or the records under `list`.
    pub fn params(&self) -> BuildResult<Params> {
        match self {
            Input::One(record) => params_of(*record),
            Input::Many(records) => list_params(records),
        }
    }
}

/// Assembled statement text, shared with the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SqlText(Arc<str>);

impl SqlText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the text is a `<script>` that must be assembled and rendered.
    pub fn is_script(&self) -> bool {
        is_script(&self.0)
    }
}

impl From<Arc<str>> for SqlText {
    fn from(text: Arc<str>) -> Self {
        Self(text)
    }
}

impl Deref for SqlText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SqlText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SqlText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
