//! Dynamic SQL scripts.
//!
//! A script is SQL text with a small set of control tags:
//!
//! ```text
//! <script>
//!   SELECT * FROM news
//!   <where>
//!     <if test="title != null">AND title = :title</if>
//!     <if test="ids != null and ids.size() > 0">
//!       AND id IN <foreach collection="ids" item="id" open="(" separator="," close=")">:id</foreach>
//!     </if>
//!   </where>
//! </script>
//! ```
//!
//! [`ScriptAssembler`] turns the text into a [`SqlSource`]; rendering it with
//! a set of parameters yields a [`BoundSql`].
//!
//! # Example
//! ```
//! use serde_json::json;
//! use sqlscript::param::params_of;
//! use sqlscript::script::assemble;
//!
//! let source = assemble(
//!     r#"<script>SELECT * FROM news <where><if test="title != null">AND title = :title</if></where></script>"#,
//! ).unwrap();
//!
//! let bound = source.render(&params_of(&json!({ "title": "hot" })).unwrap()).unwrap();
//! assert_eq!(bound.sql(), "SELECT * FROM news WHERE title = :title");
//!
//! let bound = source.render(&params_of(&json!({})).unwrap()).unwrap();
//! assert_eq!(bound.sql(), "SELECT * FROM news");
//! ```

mod assembler;
mod bound;
mod context;
mod node;
mod parser;
mod source;

#[cfg(test)]
mod tests;

pub use assembler::{ScriptAssembler, assemble, assemble_with};
pub use bound::{BoundSql, PositionalSql};
pub use context::{PARAMETER_OBJECT_KEY, RenderContext};
pub use node::{FOREACH_PREFIX, ForeachNode, SqlNode, TrimNode};
pub use parser::{KNOWN_TAGS, SCRIPT_TAG, ScriptElement, ScriptItem, is_script, parse_script};
pub use source::{DynamicSql, SqlSource};
