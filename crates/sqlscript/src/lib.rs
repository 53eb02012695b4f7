//! # sqlscript
//!
//! Metadata-driven dynamic SQL composition.
//!
//! ## Features
//!
//! - **Statements from records**: SELECT/INSERT/UPDATE/DELETE (and batch variants)
//!   built from a record's populated fields via the `Record` trait
//! - **Dynamic scripts**: `<script>` templates with `if`, `choose`, `where`, `set`,
//!   `trim`, `foreach` and `bind`, rendered per call
//! - **Placeholders**: `${name}` text substitution with optional defaults,
//!   `:name` parameter references convertible to `$n`
//! - **Joins**: join chains linearized into `LEFT/RIGHT OUTER` and `INNER JOIN` clauses
//! - **Caching**: assembled statements cached per operation in an owned cache
//!
//! ## Example
//!
//! ```ignore
//! use sqlscript::prelude::*;
//!
//! #[derive(Record, Serialize, Default)]
//! #[record(table = "news")]
//! struct News {
//!     #[record(key)]
//!     id: Option<i64>,
//!     title: Option<String>,
//!     content: Option<String>,
//! }
//!
//! let builder = StatementBuilder::default();
//! let filter = News { content: Some("hot".into()), ..Default::default() };
//! let meta = OperationMetadata::new().like(["content"]);
//!
//! let sql = builder.select(Input::One(&filter), &meta)?;
//! let bound = builder.assemble(&sql)?.render(&params_of(&filter)?)?;
//! let positional = bound.to_positional()?;
//! // SELECT id, title, content FROM news WHERE content LIKE CONCAT('%', $1, '%')
//! ```

// Lets `#[derive(Record)]` output (which names `::sqlscript`) compile inside this crate.
extern crate self as sqlscript;

pub mod condition;
pub mod config;
pub mod error;
pub mod expr;
pub mod join;
pub mod param;
pub mod placeholder;
pub mod prelude;
pub mod record;
pub mod script;
pub mod statement;
pub mod token;

pub use condition::{Condition, ConditionBuilder, UpdateClauses};
pub use config::{CacheKeyPolicy, MapperConfig, ScriptConfig};
pub use error::{BuildError, BuildResult};
pub use join::{JoinDescriptor, JoinKind, JoinPlan};
pub use param::{Params, Value, params_of};
pub use placeholder::{PlaceholderResolver, substitute};
pub use record::{ColumnDescriptor, Membership, Record};
pub use script::{BoundSql, PositionalSql, ScriptAssembler, SqlSource};
pub use statement::{
    Input, OperationKind, OperationMetadata, SortOrder, SqlText, StatementBuilder, StatementCache,
    StatementProvider,
};
pub use token::TokenScanner;

#[cfg(feature = "derive")]
pub use sqlscript_derive::Record;
