//! Script settings and TOML mapper configuration.
//!
//! ```toml
//! [settings]
//! enable_default_value = true
//! cache_key_policy = "operation_and_shape"
//!
//! [variables]
//! schema = "public"
//!
//! [fragments]
//! news_columns = "id, title, ${alias}.content"
//!
//! [operations.findNews]
//! kind = "select"
//! table = "news"
//! like = ["content"]
//! order_by = "created_at"
//! order = "desc"
//!
//! [[operations.findNews.joins]]
//! kind = "left"
//! table = "news"
//! key = "author_id"
//! into = { table = "authors", key = "id" }
//! ```

use crate::error::{BuildError, BuildResult};
use crate::join::{JoinDescriptor, JoinKind, JoinPlan};
use crate::placeholder::DEFAULT_VALUE_SEPARATOR;
use crate::statement::{OperationKind, OperationMetadata, SortOrder};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// How the statement cache derives its keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeyPolicy {
    /// One entry per operation; later calls reuse the first call's text.
    #[default]
    Operation,
    /// One entry per operation and set of populated fields.
    OperationAndShape,
}

/// Settings for script assembly, rendering and statement caching.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Allow `${key:default}` placeholders.
    pub enable_default_value: bool,
    /// Separator between key and default value.
    pub default_value_separator: String,
    /// Collapse whitespace in rendered SQL.
    pub shrink_whitespace: bool,
    /// Statement cache key policy.
    pub cache_key_policy: CacheKeyPolicy,
    /// Variables substituted into `${}` placeholders when a script is assembled.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
    /// Reusable script text referenced by `<include refid="...">`.
    #[serde(skip)]
    pub fragments: HashMap<String, String>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            enable_default_value: false,
            default_value_separator: DEFAULT_VALUE_SEPARATOR.to_string(),
            shrink_whitespace: true,
            cache_key_policy: CacheKeyPolicy::Operation,
            variables: HashMap::new(),
            fragments: HashMap::new(),
        }
    }
}

impl ScriptConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable `${key:default}` placeholders.
    pub fn enable_default_value(mut self, enabled: bool) -> Self {
        self.enable_default_value = enabled;
        self
    }

    /// Set the key/default separator.
    pub fn default_value_separator(mut self, separator: impl Into<String>) -> Self {
        self.default_value_separator = separator.into();
        self
    }

    pub fn shrink_whitespace(mut self, enabled: bool) -> Self {
        self.shrink_whitespace = enabled;
        self
    }

    /// Set the statement cache key policy.
    pub fn cache_key_policy(mut self, policy: CacheKeyPolicy) -> Self {
        self.cache_key_policy = policy;
        self
    }

    /// Add one assembly-time variable.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Replace all assembly-time variables.
    pub fn variables(mut self, variables: HashMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    /// Register one include fragment.
    pub fn fragment(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.fragments.insert(id.into(), text.into());
        self
    }
}

/// Mapper configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapperConfig {
    #[serde(default)]
    pub settings: ScriptConfig,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default)]
    pub fragments: HashMap<String, String>,
    #[serde(default)]
    pub operations: BTreeMap<String, OperationConfig>,
}

/// One `[operations.<name>]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OperationConfig {
    pub kind: Option<String>,
    pub table: Option<String>,
    pub like: Vec<String>,
    pub order_by: Option<String>,
    pub order: Option<String>,
    pub group_by: Option<String>,
    pub having: Option<String>,
    pub batch: bool,
    pub joins: Vec<JoinConfig>,
}

/// One `[[operations.<name>.joins]]` entry; `into` is the table joined into.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinConfig {
    pub kind: Option<String>,
    pub table: String,
    pub key: String,
    pub condition: Option<String>,
    pub into: Option<Box<JoinConfig>>,
}

impl MapperConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> BuildResult<Self> {
        let config: Self = toml::from_str(text)?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "sqlscript",
            operations = config.operations.len(),
            variables = config.variables.len(),
            fragments = config.fragments.len(),
            "loaded mapper configuration"
        );
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> BuildResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BuildError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Settings with the `[variables]` and `[fragments]` tables merged in.
    pub fn script_config(&self) -> ScriptConfig {
        let mut config = self.settings.clone();
        config
            .variables
            .extend(self.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        config
            .fragments
            .extend(self.fragments.iter().map(|(k, v)| (k.clone(), v.clone())));
        config
    }

    /// Metadata for one configured operation, named after its table key.
    pub fn operation(&self, name: &str) -> BuildResult<OperationMetadata> {
        let op = self.operations.get(name).ok_or_else(|| {
            BuildError::Config(format!("No operation named `{name}` is configured"))
        })?;
        op.to_metadata(name)
    }

    /// The declared kind of one configured operation.
    pub fn operation_kind(&self, name: &str) -> BuildResult<Option<OperationKind>> {
        match self.operations.get(name).and_then(|op| op.kind.as_deref()) {
            Some(kind) => kind.parse().map(Some),
            None => Ok(None),
        }
    }
}

impl OperationConfig {
    /// Convert into [`OperationMetadata`], validating join and order keywords.
    pub fn to_metadata(&self, name: &str) -> BuildResult<OperationMetadata> {
        let mut metadata = OperationMetadata::new()
            .name(name)
            .like(self.like.iter().cloned())
            .batch(self.batch);
        if let Some(table) = &self.table {
            metadata = metadata.table(table.clone());
        }
        if let Some(order_by) = &self.order_by {
            metadata = metadata.order_by(order_by.clone());
        }
        if let Some(order) = &self.order {
            metadata = metadata.order(order.parse::<SortOrder>()?);
        }
        if let Some(group_by) = &self.group_by {
            metadata = metadata.group_by(group_by.clone());
        }
        if let Some(having) = &self.having {
            metadata = metadata.having(having.clone());
        }

        let plan = self
            .joins
            .iter()
            .map(JoinConfig::to_descriptor)
            .collect::<BuildResult<Vec<_>>>()?
            .into_iter()
            .collect::<JoinPlan>();
        Ok(metadata.joins(plan))
    }
}

impl JoinConfig {
    fn to_descriptor(&self) -> BuildResult<JoinDescriptor> {
        let Some(into) = &self.into else {
            return Ok(JoinDescriptor::target(&self.table, &self.key));
        };
        let kind = match &self.kind {
            Some(kind) => kind.parse::<JoinKind>()?,
            None => {
                return Err(BuildError::configuration(format!(
                    "Join from `{}` into `{}` has no kind",
                    self.table, into.table
                )));
            }
        };
        let linked = Arc::new(into.to_descriptor()?);
        let mut descriptor = JoinDescriptor::new(kind, &self.table, &self.key, linked);
        if let Some(condition) = &self.condition {
            descriptor = descriptor.condition(condition.clone());
        }
        Ok(descriptor)
    }
}
