use super::bound::rewrite_param_refs;
use super::context::RenderContext;
use crate::error::{BuildError, BuildResult};
use crate::expr::TestExpr;
use crate::param::Value;
use crate::placeholder::{PlaceholderResolver, Resolution};
use crate::token::PLACEHOLDER;

/// Prefix of the per-iteration binding names produced by `<foreach>`.
pub const FOREACH_PREFIX: &str = "__frch_";

/// One node of an assembled script.
///
/// Every node appends its rendering to a [`RenderContext`] and reports whether
/// it bound any parameter while doing so.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlNode {
    /// Children rendered in order.
    Mixed(Vec<SqlNode>),
    /// Literal text.
    Static(String),
    /// Text containing `${...}` placeholders, substituted per render.
    Text(String),
    /// `<if test>` / `<when test>`.
    If { test: TestExpr, body: Box<SqlNode> },
    /// `<choose>`: first matching `when`, else `otherwise`.
    Choose {
        whens: Vec<(TestExpr, SqlNode)>,
        otherwise: Option<Box<SqlNode>>,
    },
    /// `<trim>`, `<where>` and `<set>`.
    Trim(TrimNode),
    /// `<foreach>`.
    Foreach(ForeachNode),
    /// `<bind name value>`.
    Bind { name: String, value: TestExpr },
}

impl SqlNode {
    /// Render into `ctx`.
    pub fn apply(&self, ctx: &mut RenderContext<'_>) -> BuildResult<bool> {
        match self {
            SqlNode::Mixed(children) => {
                let mut bound = false;
                for child in children {
                    bound |= child.apply(ctx)?;
                }
                Ok(bound)
            }
            SqlNode::Static(text) => {
                ctx.append(text);
                Ok(false)
            }
            SqlNode::Text(text) => Ok(apply_text(text, ctx)),
            SqlNode::If { test, body } => {
                if test.evaluate_bool(&*ctx)? {
                    return body.apply(ctx);
                }
                Ok(false)
            }
            SqlNode::Choose { whens, otherwise } => {
                for (test, body) in whens {
                    if test.evaluate_bool(&*ctx)? {
                        return body.apply(ctx);
                    }
                }
                match otherwise {
                    Some(body) => body.apply(ctx),
                    None => Ok(false),
                }
            }
            SqlNode::Trim(trim) => trim.apply(ctx),
            SqlNode::Foreach(foreach) => foreach.apply(ctx),
            SqlNode::Bind { name, value } => {
                let value = value.evaluate(&*ctx)?;
                ctx.bind(name.clone(), value);
                Ok(false)
            }
        }
    }

    /// Whether rendering can depend on the invocation parameters.
    pub fn is_dynamic(&self) -> bool {
        match self {
            SqlNode::Static(_) => false,
            SqlNode::Mixed(children) => children.iter().any(SqlNode::is_dynamic),
            _ => true,
        }
    }
}

fn apply_text(text: &str, ctx: &mut RenderContext<'_>) -> bool {
    let mut bound = false;
    let rendered = {
        let resolver = PlaceholderResolver::new(Some(&*ctx))
            .enable_default_value(ctx.enable_default_value)
            .separator(ctx.default_value_separator.clone());
        PLACEHOLDER.scan(text, |expr| match resolver.lookup(expr) {
            Resolution::Value(v) => {
                bound = true;
                v
            }
            Resolution::Default(v) => v,
            Resolution::Unresolved => format!("${{{expr}}}"),
        })
    };
    ctx.append(&rendered);
    bound
}

// ==================== Trim ====================

/// Trims override tokens from the rendered body, then wraps it in
/// prefix/suffix when anything is left.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimNode {
    body: Box<SqlNode>,
    prefix: String,
    suffix: String,
    prefix_overrides: Vec<String>,
    suffix_overrides: Vec<String>,
}

impl TrimNode {
    pub fn new(
        body: SqlNode,
        prefix: Option<&str>,
        suffix: Option<&str>,
        prefix_overrides: Option<&str>,
        suffix_overrides: Option<&str>,
    ) -> Self {
        Self {
            body: Box::new(body),
            prefix: prefix.unwrap_or_default().trim().to_string(),
            suffix: suffix.unwrap_or_default().trim().to_string(),
            prefix_overrides: parse_overrides(prefix_overrides.unwrap_or_default()),
            suffix_overrides: parse_overrides(suffix_overrides.unwrap_or_default()),
        }
    }

    /// `<where>`: `WHERE` prefix, leading `AND`/`OR` removed.
    pub fn where_clause(body: SqlNode) -> Self {
        Self::new(body, Some("WHERE"), None, Some("AND|OR"), None)
    }

    /// `<set>`: `SET` prefix, stray leading/trailing commas removed.
    pub fn set_clause(body: SqlNode) -> Self {
        Self::new(body, Some("SET"), None, Some(","), Some(","))
    }

    fn apply(&self, ctx: &mut RenderContext<'_>) -> BuildResult<bool> {
        let (bound, rendered) = ctx.capture(|ctx| self.body.apply(ctx));
        let bound = bound?;
        let trimmed = self.trim(&rendered);
        if !trimmed.is_empty() {
            ctx.append_separated(&trimmed);
        }
        Ok(bound)
    }

    /// Apply overrides and prefix/suffix to an already rendered body.
    pub fn trim(&self, rendered: &str) -> String {
        let mut body = rendered.trim();
        if let Some(rest) = strip_first_prefix(body, &self.prefix_overrides) {
            body = rest.trim_start();
        }
        if let Some(rest) = strip_first_suffix(body, &self.suffix_overrides) {
            body = rest.trim_end();
        }
        if body.is_empty() {
            return String::new();
        }

        let mut out = String::with_capacity(body.len() + self.prefix.len() + self.suffix.len() + 2);
        if !self.prefix.is_empty() {
            out.push_str(&self.prefix);
            out.push(' ');
        }
        out.push_str(body);
        if !self.suffix.is_empty() {
            out.push(' ');
            out.push_str(&self.suffix);
        }
        out
    }
}

/// Split `AND|OR` (or `AND,OR`) into tokens. A lone `,` is one token.
fn parse_overrides(spec: &str) -> Vec<String> {
    let parts: Vec<&str> = if spec.contains('|') {
        spec.split('|').collect()
    } else if spec.split(',').filter(|p| !p.trim().is_empty()).count() >= 2 {
        spec.split(',').collect()
    } else {
        vec![spec]
    };
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_word_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

fn strip_first_prefix<'a>(body: &'a str, tokens: &[String]) -> Option<&'a str> {
    tokens.iter().find_map(|token| {
        let n = token.len();
        if !body.is_char_boundary(n) || n > body.len() {
            return None;
        }
        if !body.as_bytes()[..n].eq_ignore_ascii_case(token.as_bytes()) {
            return None;
        }
        // `AND` must not eat the start of `ANDROID`.
        let word_token = token.bytes().last().is_some_and(is_word_byte);
        if word_token && body.as_bytes().get(n).copied().is_some_and(is_word_byte) {
            return None;
        }
        Some(&body[n..])
    })
}

fn strip_first_suffix<'a>(body: &'a str, tokens: &[String]) -> Option<&'a str> {
    tokens.iter().find_map(|token| {
        let n = token.len();
        if n > body.len() {
            return None;
        }
        let at = body.len() - n;
        if !body.is_char_boundary(at) {
            return None;
        }
        if !body.as_bytes()[at..].eq_ignore_ascii_case(token.as_bytes()) {
            return None;
        }
        let word_token = token.bytes().next().is_some_and(is_word_byte);
        if word_token && at > 0 && is_word_byte(body.as_bytes()[at - 1]) {
            return None;
        }
        Some(&body[..at])
    })
}

// ==================== Foreach ====================

/// Repeats its body once per element of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeachNode {
    body: Box<SqlNode>,
    collection: TestExpr,
    item: Option<String>,
    index: Option<String>,
    open: String,
    close: String,
    separator: String,
}

impl ForeachNode {
    pub fn new(body: SqlNode, collection: TestExpr) -> Self {
        Self {
            body: Box::new(body),
            collection,
            item: None,
            index: None,
            open: String::new(),
            close: String::new(),
            separator: String::new(),
        }
    }

    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn open(mut self, open: impl Into<String>) -> Self {
        self.open = open.into();
        self
    }

    pub fn close(mut self, close: impl Into<String>) -> Self {
        self.close = close.into();
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    fn entries(&self, ctx: &RenderContext<'_>) -> BuildResult<Vec<(Value, Value)>> {
        match self.collection.evaluate(ctx)? {
            Value::Array(items) => Ok(items
                .into_iter()
                .enumerate()
                .map(|(i, item)| (Value::from(i), item))
                .collect()),
            Value::Object(map) => Ok(map
                .into_iter()
                .map(|(k, v)| (Value::String(k), v))
                .collect()),
            Value::Null => Err(BuildError::binding(format!(
                "The expression '{}' evaluated to a null collection",
                self.collection
            ))),
            other => Err(BuildError::binding(format!(
                "The expression '{}' evaluated to a non-iterable value: {other}",
                self.collection
            ))),
        }
    }

    fn apply(&self, ctx: &mut RenderContext<'_>) -> BuildResult<bool> {
        let entries = self.entries(ctx)?;
        if entries.is_empty() {
            return Ok(false);
        }

        let saved_item = self.item.as_deref().and_then(|n| ctx.unbind(n));
        let saved_index = self.index.as_deref().and_then(|n| ctx.unbind(n));

        let mut parts = Vec::with_capacity(entries.len());
        let mut bound = false;
        for (index, item) in entries {
            let n = ctx.next_unique();
            let mut renames: Vec<(&str, String)> = Vec::with_capacity(2);
            if let Some(name) = &self.item {
                let unique = format!("{FOREACH_PREFIX}{name}_{n}");
                ctx.bind(name.clone(), item.clone());
                ctx.bind(unique.clone(), item);
                renames.push((name.as_str(), unique));
            }
            if let Some(name) = &self.index {
                let unique = format!("{FOREACH_PREFIX}{name}_{n}");
                ctx.bind(name.clone(), index.clone());
                ctx.bind(unique.clone(), index);
                renames.push((name.as_str(), unique));
            }

            let (result, rendered) = ctx.capture(|ctx| self.body.apply(ctx));
            bound |= result?;
            parts.push(rename_refs(rendered.trim(), &renames));
        }

        for (name, saved) in [(&self.item, saved_item), (&self.index, saved_index)] {
            if let Some(name) = name {
                ctx.unbind(name);
                if let Some(value) = saved {
                    ctx.bind(name.clone(), value);
                }
            }
        }

        ctx.append(&self.open);
        ctx.append(&parts.join(&self.separator));
        ctx.append(&self.close);
        Ok(bound)
    }
}

/// Point `:item` / `:item.x` references at this iteration's unique binding.
fn rename_refs(text: &str, renames: &[(&str, String)]) -> String {
    if renames.is_empty() {
        return text.to_string();
    }
    rewrite_param_refs(text, |name| {
        renames.iter().find_map(|(from, to)| {
            let rest = name.strip_prefix(from)?;
            (rest.is_empty() || rest.starts_with('.')).then(|| format!(":{to}{rest}"))
        })
    })
}
