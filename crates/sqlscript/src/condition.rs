//! Predicates built from a record's populated fields.
//!
//! Every non-null field contributes one predicate, chosen in this order:
//!
//! 1. `column LIKE CONCAT('%', :field, '%')` when the field is listed as a LIKE field
//! 2. `column IN <foreach ...>` when the descriptor declares `in` membership
//! 3. `column = :field` otherwise
//!
//! Null fields contribute nothing; a record with no populated fields yields an
//! empty condition.

use crate::error::{BuildError, BuildResult};
use crate::record::{ColumnDescriptor, Membership, Record, ReflectedField, key_columns, reflect};

/// Collection name a batch statement iterates over.
pub const LIST_COLLECTION: &str = "list";

/// Item name bound per element of a batch loop.
pub const LIST_ITEM: &str = "item";

/// Conditions split for an UPDATE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateClauses {
    /// `WHERE` predicate over the key fields.
    pub key: String,
    /// `SET` assignments, comma-joined.
    pub set: String,
}

/// Output of [`ConditionBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Filter(String),
    Update(UpdateClauses),
}

/// Builds predicates from a record instance.
#[derive(Debug, Clone, Copy)]
pub struct ConditionBuilder<'m> {
    like: &'m [String],
    qualify: bool,
}

impl<'m> ConditionBuilder<'m> {
    /// A builder treating `like` field names as pattern matches.
    pub fn new(like: &'m [String]) -> Self {
        Self {
            like,
            qualify: false,
        }
    }

    /// Qualify columns with their owning table where one is declared.
    pub fn qualified(mut self, qualify: bool) -> Self {
        self.qualify = qualify;
        self
    }

    /// Filter condition, or the key/SET split when `is_update`.
    pub fn build<R: Record>(&self, record: &R, is_update: bool) -> BuildResult<Condition> {
        if is_update {
            self.update(record).map(Condition::Update)
        } else {
            self.filter(record).map(Condition::Filter)
        }
    }

    /// Populated fields ANDed together.
    pub fn filter<R: Record>(&self, record: &R) -> BuildResult<String> {
        self.check_like_fields::<R>()?;
        let predicates: Vec<String> = reflect(record)?
            .iter()
            .filter(|f| !f.is_null())
            .map(|f| self.predicate(f.descriptor))
            .collect();
        Ok(predicates.join(" AND "))
    }

    /// Key predicate and SET assignments for an UPDATE.
    ///
    /// Declared key fields form the key; without any, the first populated
    /// field does.
    pub fn update<R: Record>(&self, record: &R) -> BuildResult<UpdateClauses> {
        self.check_like_fields::<R>()?;
        let fields = reflect(record)?;
        let has_declared_key = fields.iter().any(|f| f.descriptor.key);

        let mut key = Vec::new();
        let mut set = Vec::new();
        for field in &fields {
            if has_declared_key && field.descriptor.key {
                if field.is_null() {
                    return Err(BuildError::configuration(format!(
                        "UPDATE on `{}` requires a value for key field `{}`",
                        R::TABLE,
                        field.field()
                    )));
                }
                key.push(self.equality(field.descriptor));
                continue;
            }
            if field.is_null() {
                continue;
            }
            if !has_declared_key && key.is_empty() {
                key.push(self.equality(field.descriptor));
            } else {
                set.push(self.predicate(field.descriptor));
            }
        }

        if key.is_empty() {
            return Err(BuildError::configuration(format!(
                "UPDATE on `{}` has no key field to match on",
                R::TABLE
            )));
        }
        if set.is_empty() {
            return Err(BuildError::configuration(format!(
                "UPDATE on `{}` has no fields to SET",
                R::TABLE
            )));
        }
        Ok(UpdateClauses {
            key: key.join(" AND "),
            set: set.join(", "),
        })
    }

    /// Key column `IN` the batch list: `id IN <foreach collection="list" ...>:item.id</foreach>`.
    pub fn batch_key_filter<R: Record>(&self) -> BuildResult<String> {
        let key = key_columns::<R>()
            .next()
            .or_else(|| R::columns().first())
            .ok_or_else(|| {
                BuildError::configuration(format!("Record `{}` declares no columns", R::TABLE))
            })?;
        Ok(format!(
            "{} IN {}",
            self.column(key),
            list_loop(&format!(":{LIST_ITEM}.{}", key.field), "(", ",", ")")
        ))
    }

    /// One predicate for a populated field.
    pub fn predicate(&self, descriptor: &ColumnDescriptor) -> String {
        let column = self.column(descriptor);
        let field = descriptor.field;
        if self.like.iter().any(|l| l == field) {
            return format!("{column} LIKE CONCAT('%', :{field}, '%')");
        }
        match descriptor.membership {
            Membership::In => format!(
                "{column} IN <foreach collection=\"{field}\" item=\"item\" index=\"index\" open=\"(\" separator=\",\" close=\")\">:item</foreach>"
            ),
            Membership::Plain => format!("{column} = :{field}"),
        }
    }

    fn equality(&self, descriptor: &ColumnDescriptor) -> String {
        format!("{} = :{}", self.column(descriptor), descriptor.field)
    }

    fn column(&self, descriptor: &ColumnDescriptor) -> String {
        if self.qualify {
            descriptor.qualified()
        } else {
            descriptor.column.to_string()
        }
    }

    fn check_like_fields<R: Record>(&self) -> BuildResult<()> {
        match self
            .like
            .iter()
            .find(|name| !R::columns().iter().any(|c| c.field == name.as_str()))
        {
            Some(name) => Err(BuildError::configuration(format!(
                "LIKE field `{name}` has no column on `{}`",
                R::TABLE
            ))),
            None => Ok(()),
        }
    }
}

/// A `<foreach>` over the batch list.
pub fn list_loop(body: &str, open: &str, separator: &str, close: &str) -> String {
    format!(
        "<foreach collection=\"{LIST_COLLECTION}\" item=\"{LIST_ITEM}\" index=\"index\" open=\"{open}\" separator=\"{separator}\" close=\"{close}\">{body}</foreach>"
    )
}

/// Names of the populated fields of `record`, in field order.
pub fn populated_fields<R: Record>(record: &R) -> BuildResult<Vec<&'static str>> {
    Ok(reflect(record)?
        .iter()
        .filter(|f| !f.is_null())
        .map(ReflectedField::field)
        .collect())
}

#[cfg(test)]
mod tests;
