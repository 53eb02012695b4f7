//! Rendered SQL and its `:name` parameter references.

use crate::error::{BuildError, BuildResult};
use crate::param::{Params, Value, lookup_path, split_path};
use std::collections::HashMap;

/// SQL produced by rendering a script for one invocation.
///
/// The text still uses `:name` parameter references; [`BoundSql::to_positional`]
/// converts them into `$1, $2, ...` with the matching values.
#[derive(Debug, Clone)]
pub struct BoundSql {
    sql: String,
    parameters: Vec<String>,
    values: Params,
}

/// SQL with positional placeholders and the values to bind, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalSql {
    pub sql: String,
    pub values: Vec<Value>,
}

impl BoundSql {
    pub(crate) fn new(sql: String, values: Params) -> Self {
        let mut parameters = Vec::new();
        rewrite_param_refs(&sql, |name| {
            parameters.push(name.to_string());
            None
        });
        Self {
            sql,
            parameters,
            values,
        }
    }

    /// The rendered SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// `:name` references in order of appearance.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// All values visible to the statement: invocation parameters plus
    /// bindings created while rendering (loop items, `<bind>` variables).
    pub fn values(&self) -> &Params {
        &self.values
    }

    /// Look up the value for one parameter reference.
    pub fn value(&self, name: &str) -> Option<&Value> {
        let path = split_path(name);
        let (first, rest) = path.split_first()?;
        lookup_path(self.values.get(*first)?, rest)
    }

    /// Rewrite `:name` references into `$n` and collect their values.
    ///
    /// A name that appears more than once reuses its first position.
    pub fn to_positional(&self) -> BuildResult<PositionalSql> {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut values = Vec::new();
        let mut missing = None;

        let sql = rewrite_param_refs(&self.sql, |name| {
            if let Some(pos) = positions.get(name) {
                return Some(format!("${pos}"));
            }
            match self.value(name) {
                Some(value) => {
                    values.push(value.clone());
                    let pos = values.len();
                    positions.insert(name.to_string(), pos);
                    Some(format!("${pos}"))
                }
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    None
                }
            }
        });

        if let Some(name) = missing {
            return Err(BuildError::binding(format!(
                "No value bound for parameter `:{name}`"
            )));
        }
        Ok(PositionalSql { sql, values })
    }
}

/// Visit every `:name` reference outside single-quoted literals.
///
/// `f` receives the dotted name and returns the text that replaces the whole
/// reference, colon included, or `None` to keep it. `::` casts are not
/// references.
pub(crate) fn rewrite_param_refs<F>(text: &str, mut f: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut copied = 0;
    let mut in_quote = false;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' {
            in_quote = !in_quote;
            i += 1;
            continue;
        }
        if in_quote || b != b':' {
            i += 1;
            continue;
        }
        // `::type` casts
        if bytes.get(i + 1) == Some(&b':') {
            i += 2;
            continue;
        }
        if i > 0 && bytes[i - 1] == b':' {
            i += 1;
            continue;
        }
        let start = i + 1;
        let end = scan_name(bytes, start);
        if end == start {
            i += 1;
            continue;
        }
        let name = &text[start..end];
        if let Some(replacement) = f(name) {
            out.push_str(&text[copied..i]);
            out.push_str(&replacement);
            copied = end;
        }
        i = end;
    }
    out.push_str(&text[copied..]);
    out
}

fn scan_name(bytes: &[u8], start: usize) -> usize {
    let ident_start = |b: u8| b == b'_' || b.is_ascii_alphabetic();
    let ident_char = |b: u8| b == b'_' || b.is_ascii_alphanumeric();

    if !bytes.get(start).copied().is_some_and(ident_start) {
        return start;
    }
    let mut end = start + 1;
    loop {
        while bytes.get(end).copied().is_some_and(ident_char) {
            end += 1;
        }
        // Continue through `.segment`, but not a trailing dot.
        if bytes.get(end) == Some(&b'.') && bytes.get(end + 1).copied().is_some_and(ident_char) {
            end += 1;
        } else {
            return end;
        }
    }
}

/// Collapse whitespace runs outside single-quoted literals and trim the ends.
pub(crate) fn shrink_whitespace(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_quote = false;
    let mut pending_space = false;

    for c in sql.trim().chars() {
        if !in_quote && c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if c == '\'' {
            in_quote = !in_quote;
        }
        out.push(c);
    }
    out
}
