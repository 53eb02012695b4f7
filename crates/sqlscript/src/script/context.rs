use crate::expr::Scope;
use crate::param::{Params, Value, lookup_path, split_path, to_text};
use crate::placeholder::VariableSource;

/// Name under which the whole parameter object is visible to expressions.
pub const PARAMETER_OBJECT_KEY: &str = "_parameter";

/// Per-invocation state threaded through a fragment tree while it renders.
///
/// Holds the invocation parameters, any variables bound during rendering
/// (`<bind>`, loop items) and the SQL buffer being written.
#[derive(Debug)]
pub struct RenderContext<'p> {
    params: &'p Params,
    bindings: Params,
    sql: String,
    unique: usize,
    pub(crate) enable_default_value: bool,
    pub(crate) default_value_separator: String,
}

impl<'p> RenderContext<'p> {
    pub fn new(params: &'p Params) -> Self {
        Self {
            params,
            bindings: Params::new(),
            sql: String::new(),
            unique: 0,
            enable_default_value: false,
            default_value_separator: crate::placeholder::DEFAULT_VALUE_SEPARATOR.to_string(),
        }
    }

    /// Append text exactly as given.
    pub fn append(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// Append text, inserting one space if it would otherwise touch the
    /// previous token.
    pub fn append_separated(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let touches = self
            .sql
            .chars()
            .last()
            .is_some_and(|c| !c.is_whitespace() && c != '(')
            && !text.starts_with(char::is_whitespace);
        if touches {
            self.sql.push(' ');
        }
        self.sql.push_str(text);
    }

    /// The SQL written so far.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Render into a fresh buffer, returning what was written.
    pub(crate) fn capture<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> (T, String) {
        let saved = std::mem::take(&mut self.sql);
        let result = f(self);
        let captured = std::mem::replace(&mut self.sql, saved);
        (result, captured)
    }

    /// Bind a variable for the rest of the render.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub(crate) fn unbind(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    pub(crate) fn next_unique(&mut self) -> usize {
        let n = self.unique;
        self.unique += 1;
        n
    }

    /// Look up a dotted path: bindings first, then the parameter object.
    pub fn lookup(&self, path: &[impl AsRef<str>]) -> Option<Value> {
        let (first, rest) = path.split_first()?;
        let first = first.as_ref();
        if let Some(bound) = self.bindings.get(first) {
            return lookup_path(bound, rest).cloned();
        }
        if first == PARAMETER_OBJECT_KEY {
            let root = Value::Object(self.params.clone());
            return lookup_path(&root, rest).cloned();
        }
        lookup_path(self.params.get(first)?, rest).cloned()
    }

    /// Finish rendering: the SQL text and the variables bound along the way.
    pub(crate) fn into_parts(self) -> (String, Params) {
        (self.sql, self.bindings)
    }
}

impl Scope for RenderContext<'_> {
    fn resolve(&self, path: &[String]) -> Option<Value> {
        self.lookup(path)
    }
}

impl VariableSource for RenderContext<'_> {
    fn variable(&self, key: &str) -> Option<String> {
        match self.lookup(&split_path(key))? {
            Value::Null => None,
            value => Some(to_text(&value)),
        }
    }
}
