use super::cache::CachedStatement;
use super::{Input, OperationKind, OperationMetadata, RESERVED_OPERATIONS, SqlText, StatementCache};
use crate::condition::{ConditionBuilder, LIST_ITEM, list_loop, populated_fields};
use crate::config::{CacheKeyPolicy, ScriptConfig};
use crate::error::{BuildError, BuildResult};
use crate::record::{ColumnDescriptor, Record, insert_columns, key_columns, reflect, result_columns};
use crate::script::{SCRIPT_TAG, ScriptAssembler, SqlSource};
use std::sync::Arc;

/// Cache key for an operation: reserved names are qualified by table.
pub fn operation_key(table: &str, name: &str) -> String {
    if RESERVED_OPERATIONS.contains(&name) {
        format!("{table}.{name}")
    } else {
        name.to_string()
    }
}

/// One method per CRUD verb, for a dispatch layer.
pub trait StatementProvider {
    fn select<R: Record>(&self, input: Input<'_, R>, metadata: &OperationMetadata) -> BuildResult<SqlText>;
    fn insert<R: Record>(&self, input: Input<'_, R>, metadata: &OperationMetadata) -> BuildResult<SqlText>;
    fn update<R: Record>(&self, input: Input<'_, R>, metadata: &OperationMetadata) -> BuildResult<SqlText>;
    fn delete<R: Record>(&self, input: Input<'_, R>, metadata: &OperationMetadata) -> BuildResult<SqlText>;
}

/// Builds and caches statement text.
///
/// The cache is owned by the builder and can be shared between builders with
/// [`StatementBuilder::with_cache`].
#[derive(Debug, Clone, Default)]
pub struct StatementBuilder {
    config: ScriptConfig,
    cache: Arc<StatementCache>,
}

impl StatementBuilder {
    pub fn new(config: ScriptConfig) -> Self {
        Self {
            config,
            cache: Arc::new(StatementCache::new()),
        }
    }

    /// Builder that stores statements in an existing cache.
    pub fn with_cache(config: ScriptConfig, cache: Arc<StatementCache>) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<StatementCache> {
        &self.cache
    }

    /// Build (or fetch from cache) the statement for one operation.
    ///
    /// A slice input, or `metadata.batch`, selects the batch variant of `kind`.
    pub fn build<R: Record>(
        &self,
        kind: OperationKind,
        input: Input<'_, R>,
        metadata: &OperationMetadata,
    ) -> BuildResult<SqlText> {
        let kind = if metadata.batch || input.is_many() {
            kind.batch()
        } else {
            kind
        };
        let table = metadata.table.as_deref().unwrap_or(R::TABLE);
        let name = metadata.name.as_deref().unwrap_or(kind.default_name());

        let mut key = operation_key(table, name);
        if self.config.cache_key_policy == CacheKeyPolicy::OperationAndShape {
            if let Some(record) = input.one().filter(|_| !kind.is_batch()) {
                key.push('#');
                key.push_str(&populated_fields(record)?.join(","));
            }
        }

        if let Some(cached) = self.cache.get(&key) {
            #[cfg(feature = "tracing")]
            tracing::debug!(target: "sqlscript", key = %key, "statement cache hit");
            return cached_text(&key, kind, cached);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "sqlscript", key = %key, kind = %kind, "statement cache miss");

        let sql = Assembly {
            table,
            metadata,
        }
        .statement(kind, input)?;
        let sql = wrap(kind, sql);
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "sqlscript", key = %key, sql = %sql, "assembled statement");

        let stored = self
            .cache
            .insert_if_absent(key.clone(), CachedStatement::new(kind, sql));
        cached_text(&key, kind, stored)
    }

    /// Assemble statement text into a renderable source.
    pub fn assemble(&self, sql: &SqlText) -> BuildResult<SqlSource> {
        ScriptAssembler::new(&self.config).assemble_text(sql)
    }
}

impl StatementProvider for StatementBuilder {
    fn select<R: Record>(&self, input: Input<'_, R>, metadata: &OperationMetadata) -> BuildResult<SqlText> {
        self.build(OperationKind::Select, input, metadata)
    }

    fn insert<R: Record>(&self, input: Input<'_, R>, metadata: &OperationMetadata) -> BuildResult<SqlText> {
        self.build(OperationKind::Insert, input, metadata)
    }

    fn update<R: Record>(&self, input: Input<'_, R>, metadata: &OperationMetadata) -> BuildResult<SqlText> {
        self.build(OperationKind::Update, input, metadata)
    }

    fn delete<R: Record>(&self, input: Input<'_, R>, metadata: &OperationMetadata) -> BuildResult<SqlText> {
        self.build(OperationKind::Delete, input, metadata)
    }
}

/// A key names one operation; reusing it for another kind is an error.
fn cached_text(key: &str, kind: OperationKind, cached: CachedStatement) -> BuildResult<SqlText> {
    if cached.kind != kind {
        return Err(BuildError::configuration(format!(
            "operation `{key}` is cached as {}, not {kind}",
            cached.kind
        )));
    }
    Ok(SqlText::from(cached.sql))
}

/// SELECT and DELETE are always scripts; INSERT and UPDATE only when they
/// contain tags.
fn wrap(kind: OperationKind, sql: String) -> String {
    if kind.always_scripted() || sql.contains("<foreach") {
        format!("<{SCRIPT_TAG}>{sql}</{SCRIPT_TAG}>")
    } else {
        sql
    }
}

struct Assembly<'a> {
    table: &'a str,
    metadata: &'a OperationMetadata,
}

impl Assembly<'_> {
    fn statement<R: Record>(&self, kind: OperationKind, input: Input<'_, R>) -> BuildResult<String> {
        let conditions = ConditionBuilder::new(&self.metadata.like);
        match kind {
            OperationKind::Select => {
                let cond = conditions.qualified(true).filter(single(input, kind)?)?;
                self.select::<R>(&cond)
            }
            OperationKind::SelectBatch => {
                let cond = conditions.qualified(true).batch_key_filter::<R>()?;
                self.select::<R>(&cond)
            }
            OperationKind::Insert => self.insert(single(input, kind)?),
            OperationKind::InsertBatch => self.insert_batch::<R>(),
            OperationKind::Update => {
                let clauses = conditions.update(single(input, kind)?)?;
                Ok(format!(
                    "UPDATE {} SET {} WHERE {}",
                    self.table, clauses.set, clauses.key
                ))
            }
            OperationKind::UpdateBatch => self.update_batch::<R>(),
            OperationKind::Delete => {
                let cond = conditions.filter(single(input, kind)?)?;
                Ok(where_clause(format!("DELETE FROM {}", self.table), &cond))
            }
            OperationKind::DeleteBatch => {
                let cond = conditions.batch_key_filter::<R>()?;
                Ok(where_clause(format!("DELETE FROM {}", self.table), &cond))
            }
        }
    }

    fn select<R: Record>(&self, cond: &str) -> BuildResult<String> {
        let mut sql = format!("SELECT {} FROM {}", result_columns::<R>(), self.table);
        for join in self.metadata.joins.linearize()? {
            sql.push(' ');
            sql.push_str(&join);
        }
        let mut sql = where_clause(sql, cond);
        let m = self.metadata;
        if let Some(group_by) = &m.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(group_by);
        }
        if let Some(having) = &m.having {
            sql.push_str(" HAVING ");
            sql.push_str(having);
        }
        if let Some(order_by) = &m.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
            if let Some(order) = m.order {
                sql.push(' ');
                sql.push_str(order.keyword());
            }
        }
        Ok(sql)
    }

    fn insert<R: Record>(&self, record: &R) -> BuildResult<String> {
        let fields: Vec<_> = reflect(record)?
            .into_iter()
            .filter(|f| !f.descriptor.key && !f.is_null())
            .collect();
        if fields.is_empty() {
            return Err(BuildError::configuration(format!(
                "INSERT into `{}` has no populated columns",
                self.table
            )));
        }
        let columns = join_with(fields.iter().map(|f| f.descriptor.column.to_string()), ", ");
        let values = join_with(fields.iter().map(|f| format!(":{}", f.field())), ", ");
        Ok(format!(
            "INSERT INTO {} ({columns}) VALUES ({values})",
            self.table
        ))
    }

    fn insert_batch<R: Record>(&self) -> BuildResult<String> {
        let descriptors: Vec<&ColumnDescriptor> = insert_columns::<R>().collect();
        if descriptors.is_empty() {
            return Err(BuildError::configuration(format!(
                "INSERT into `{}` has no insertable columns",
                self.table
            )));
        }
        let columns = join_with(descriptors.iter().map(|d| d.column.to_string()), ", ");
        let tuple = join_with(
            descriptors.iter().map(|d| format!(":{LIST_ITEM}.{}", d.field)),
            ", ",
        );
        Ok(format!(
            "INSERT INTO {} ({columns}) VALUES {}",
            self.table,
            list_loop(&format!("({tuple})"), "", ",", "")
        ))
    }

    /// One UPDATE per element, separated by `;`.
    fn update_batch<R: Record>(&self) -> BuildResult<String> {
        let columns = R::columns();
        let mut keys: Vec<&ColumnDescriptor> = key_columns::<R>().collect();
        if keys.is_empty() {
            keys.extend(columns.first());
        }
        let set: Vec<&ColumnDescriptor> = columns
            .iter()
            .filter(|c| !keys.iter().any(|k| k.field == c.field))
            .collect();
        if keys.is_empty() || set.is_empty() {
            return Err(BuildError::configuration(format!(
                "Batch UPDATE on `{}` needs a key column and at least one other column",
                self.table
            )));
        }

        let assign = |d: &&ColumnDescriptor| format!("{} = :{LIST_ITEM}.{}", d.column, d.field);
        let body = format!(
            "UPDATE {} SET {} WHERE {}",
            self.table,
            join_with(set.iter().map(assign), ", "),
            join_with(keys.iter().map(assign), " AND ")
        );
        Ok(list_loop(&body, "", ";", ""))
    }
}

fn single<'a, R>(input: Input<'a, R>, kind: OperationKind) -> BuildResult<&'a R> {
    input.one().ok_or_else(|| {
        BuildError::configuration(format!("Operation `{kind}` takes a single record"))
    })
}

fn where_clause(mut sql: String, cond: &str) -> String {
    if !cond.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(cond);
    }
    sql
}

fn join_with(parts: impl Iterator<Item = String>, sep: &str) -> String {
    parts.collect::<Vec<_>>().join(sep)
}
