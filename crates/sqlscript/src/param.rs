//! Parameter values.
//!
//! Parameters, record fields and expression results all share one dynamic
//! representation, [`serde_json::Value`]. This module holds the conversions and
//! path lookups used throughout the crate.

use crate::error::BuildResult;
use serde::Serialize;
pub use serde_json::{Map, Value};

/// Named parameters passed to a script at render time.
pub type Params = Map<String, Value>;

/// Convert any serializable value into a parameter value.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> BuildResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// Wrap a serializable record as the root parameter object.
///
/// Structs serialize to an object whose keys are their field names. Anything
/// that is not an object is bound under `_parameter` (and `value`).
pub fn params_of<T: Serialize + ?Sized>(value: &T) -> BuildResult<Params> {
    Ok(match to_value(value)? {
        Value::Object(map) => map,
        other => {
            let mut map = Params::new();
            map.insert("value".to_string(), other.clone());
            map.insert("_parameter".to_string(), other);
            map
        }
    })
}

/// Parameters for a batch operation: the slice is bound under `list`.
pub fn list_params<T: Serialize>(items: &[T]) -> BuildResult<Params> {
    let mut map = Params::new();
    map.insert("list".to_string(), to_value(items)?);
    Ok(map)
}

/// Walk a dotted path (`author.name`, `ids.0`) below `root`.
pub fn lookup_path<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Option<&'a Value> {
    let mut current = root;
    for segment in path {
        let segment = segment.as_ref();
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Split a dotted path into its segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('.').map(str::trim).collect()
}

/// Truthiness used by `<if test>`: null and `false` are false, numbers are
/// true when non-zero, everything else is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => true,
    }
}

/// Render a value as substitution text: strings are unquoted, null is empty.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
