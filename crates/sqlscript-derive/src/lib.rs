//! Derive macros for sqlscript
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive `Record` metadata for a struct.
///
/// # Example
///
/// ```ignore
/// use sqlscript::Record;
///
/// #[derive(Record, Serialize)]
/// #[record(table = "news")]
/// struct News {
///     #[record(key)]
///     id: Option<i64>,
///     title: Option<String>,
///     #[record(column = "author_id", table = "news")]
///     author: Option<i64>,
///     #[record(in)]
///     status: Option<Vec<i32>>,
///     #[record(skip)]
///     cached_html: Option<String>,
/// }
/// ```
///
/// # Generated
///
/// - `TABLE` - table name
/// - `columns()` - one descriptor per non-skipped field, in declaration order
/// - `field_values()` - the same fields serialized to values
///
/// # Attributes
///
/// - `#[record(table = "name")]` - Table name (defaults to the snake_case struct name)
/// - `#[record(column = "name")]` - Map field to a different column name
/// - `#[record(table = "name")]` on a field - Qualify the column with its table
/// - `#[record(key)]` - Identity field: left out of INSERT, used as UPDATE/DELETE key
/// - `#[record(in)]` - Filter with `IN (...)` over the field's list value
/// - `#[record(skip)]` - Leave the field out of all SQL
///
/// Parameters are named after the key a field serializes under, so
/// `#[serde(rename = "...")]` carries into the statement text. Raw identifiers
/// drop their `r#` prefix. `#[serde(rename_all)]` and `#[serde(flatten)]` are
/// rejected, and a field serde skips must also be `#[record(skip)]`.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
