use super::bound::{BoundSql, shrink_whitespace};
use super::context::RenderContext;
use super::node::SqlNode;
use crate::config::ScriptConfig;
use crate::error::BuildResult;
use crate::param::Params;
#[cfg(feature = "tracing")]
use crate::token::PLACEHOLDER;

/// Render-time settings captured when a source is assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RenderSettings {
    enable_default_value: bool,
    default_value_separator: String,
    shrink_whitespace: bool,
}

impl From<&ScriptConfig> for RenderSettings {
    fn from(config: &ScriptConfig) -> Self {
        Self {
            enable_default_value: config.enable_default_value,
            default_value_separator: config.default_value_separator.clone(),
            shrink_whitespace: config.shrink_whitespace,
        }
    }
}

impl RenderSettings {
    fn finish(&self, sql: &str) -> String {
        if self.shrink_whitespace {
            shrink_whitespace(sql)
        } else {
            sql.to_string()
        }
    }
}

/// An assembled script, ready to render once per invocation.
#[derive(Debug, Clone)]
pub enum SqlSource {
    /// No dynamic content: the SQL was rendered once at assembly.
    Raw(String),
    /// A fragment tree rendered against each invocation's parameters.
    Dynamic(DynamicSql),
}

/// The dynamic half of [`SqlSource`].
#[derive(Debug, Clone)]
pub struct DynamicSql {
    root: SqlNode,
    settings: RenderSettings,
}

impl SqlSource {
    pub(crate) fn raw(root: &SqlNode, settings: RenderSettings) -> BuildResult<Self> {
        let params = Params::new();
        let mut ctx = RenderContext::new(&params);
        root.apply(&mut ctx)?;
        Ok(SqlSource::Raw(settings.finish(ctx.sql())))
    }

    pub(crate) fn dynamic(root: SqlNode, settings: RenderSettings) -> Self {
        SqlSource::Dynamic(DynamicSql { root, settings })
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, SqlSource::Dynamic(_))
    }

    /// The pre-rendered SQL of a static source.
    pub fn static_sql(&self) -> Option<&str> {
        match self {
            SqlSource::Raw(sql) => Some(sql),
            SqlSource::Dynamic(_) => None,
        }
    }

    /// Render for one invocation.
    pub fn render(&self, params: &Params) -> BuildResult<BoundSql> {
        let dynamic = match self {
            SqlSource::Raw(sql) => return Ok(BoundSql::new(sql.clone(), params.clone())),
            SqlSource::Dynamic(dynamic) => dynamic,
        };

        let mut ctx = RenderContext::new(params);
        ctx.enable_default_value = dynamic.settings.enable_default_value;
        ctx.default_value_separator = dynamic.settings.default_value_separator.clone();
        dynamic.root.apply(&mut ctx)?;

        let (sql, bindings) = ctx.into_parts();
        let sql = dynamic.settings.finish(&sql);
        #[cfg(feature = "tracing")]
        if PLACEHOLDER.has_tokens(&sql) {
            tracing::warn!(target: "sqlscript", sql = %sql, "unresolved placeholder left in rendered SQL");
        }
        #[cfg(feature = "tracing")]
        tracing::trace!(target: "sqlscript", sql = %sql, "rendered script");

        let mut values = params.clone();
        values.extend(bindings);
        Ok(BoundSql::new(sql, values))
    }
}
