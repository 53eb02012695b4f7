//! Convenient imports for typical `sqlscript` usage.
//!
//! ```ignore
//! use sqlscript::prelude::*;
//! ```

pub use crate::{
    BuildError, BuildResult, Input, JoinDescriptor, JoinKind, OperationKind, OperationMetadata,
    Record, ScriptConfig, SortOrder, SqlText, StatementBuilder, StatementProvider, params_of,
};
pub use serde::Serialize;
