//! `${...}` placeholder resolution.
//!
//! [`PlaceholderResolver`] maps the expression inside a `${...}` span to a
//! variable value. With the default-value feature enabled, `${key:fallback}`
//! resolves to `fallback` when `key` is absent. Anything that cannot be
//! resolved is returned as the original `${expr}` text so it stays visible in
//! the output.

use crate::token::PLACEHOLDER;
use std::collections::HashMap;

/// Variable key that enables the `${key:default}` syntax (`"true"` / `"false"`).
pub const KEY_ENABLE_DEFAULT_VALUE: &str = "sqlscript.placeholder.enable-default-value";

/// Variable key that overrides the key/default separator.
pub const KEY_DEFAULT_VALUE_SEPARATOR: &str = "sqlscript.placeholder.default-value-separator";

/// Default key/default separator.
pub const DEFAULT_VALUE_SEPARATOR: &str = ":";

/// A source of named string variables.
pub trait VariableSource {
    /// Look up a variable by name.
    fn variable(&self, key: &str) -> Option<String>;
}

impl VariableSource for HashMap<String, String> {
    fn variable(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<S: VariableSource + ?Sized> VariableSource for &S {
    fn variable(&self, key: &str) -> Option<String> {
        (**self).variable(key)
    }
}

/// Outcome of resolving one placeholder expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The key was found in the variable source.
    Value(String),
    /// The key was absent and the inline default was used.
    Default(String),
    /// Nothing matched; the caller should keep `${expr}` as-is.
    Unresolved,
}

/// Resolves `${...}` expressions against a [`VariableSource`].
#[derive(Debug, Clone)]
pub struct PlaceholderResolver<S> {
    variables: Option<S>,
    enable_default_value: bool,
    separator: String,
}

impl<S: VariableSource> PlaceholderResolver<S> {
    /// Create a resolver. The default-value switch and separator are read from
    /// the reserved variable keys, falling back to disabled / `":"`.
    pub fn new(variables: Option<S>) -> Self {
        let setting = |key: &str, fallback: &str| {
            variables
                .as_ref()
                .and_then(|v| v.variable(key))
                .unwrap_or_else(|| fallback.to_string())
        };
        let enable_default_value = setting(KEY_ENABLE_DEFAULT_VALUE, "false")
            .trim()
            .eq_ignore_ascii_case("true");
        let separator = setting(KEY_DEFAULT_VALUE_SEPARATOR, DEFAULT_VALUE_SEPARATOR);
        Self {
            variables,
            enable_default_value,
            separator,
        }
    }

    /// Override the default-value switch.
    pub fn enable_default_value(mut self, enabled: bool) -> Self {
        self.enable_default_value = enabled;
        self
    }

    /// Override the key/default separator.
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        if !separator.is_empty() {
            self.separator = separator;
        }
        self
    }

    /// Resolve `expr`, reporting how it was resolved.
    pub fn lookup(&self, expr: &str) -> Resolution {
        let Some(variables) = self.variables.as_ref() else {
            return Resolution::Unresolved;
        };

        if self.enable_default_value {
            if let Some((key, default)) = expr.split_once(self.separator.as_str()) {
                return match variables.variable(key) {
                    Some(value) => Resolution::Value(value),
                    None => Resolution::Default(default.to_string()),
                };
            }
        }

        match variables.variable(expr) {
            Some(value) => Resolution::Value(value),
            None => Resolution::Unresolved,
        }
    }

    /// Resolve `expr` to its replacement text.
    pub fn resolve(&self, expr: &str) -> String {
        match self.lookup(expr) {
            Resolution::Value(v) | Resolution::Default(v) => v,
            Resolution::Unresolved => format!("${{{expr}}}"),
        }
    }

    /// Substitute every `${...}` span in `text`.
    pub fn substitute(&self, text: &str) -> String {
        PLACEHOLDER.scan(text, |expr| self.resolve(expr))
    }
}

/// Substitute `${...}` spans in `text` from `variables`.
pub fn substitute(text: &str, variables: Option<&HashMap<String, String>>) -> String {
    PlaceholderResolver::new(variables).substitute(text)
}
