//! Reference (parent-key) sources for referential integrity checks.
//!
//! The [`IntegrityValidator`](crate::validators::IntegrityValidator) never
//! reads parent tables itself. It asks a [`ReferenceSource`] for the set of
//! distinct parent keys, so the lookup can be pushed down to whatever engine
//! holds the data.
//!
//! - [`InMemoryReferenceSource`]: named [`Dataset`](crate::dataset::Dataset)s,
//!   for tests and for parents already loaded by the caller.
//! - [`DataFusionReferenceSource`]: tables registered in a DataFusion
//!   `SessionContext`, queried with `SELECT DISTINCT`.

use crate::core::{Severity, ValidationRule};
use crate::dataset::KeyTuple;
use crate::prelude::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;

mod memory;
mod session;

pub use self::memory::InMemoryReferenceSource;
pub use self::session::DataFusionReferenceSource;

/// A declared foreign key relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    /// Constraint name
    pub name: String,
    /// Child columns, in key order
    pub columns: Vec<String>,
    /// Parent table
    pub reference_table: String,
    /// Parent columns, same arity as `columns`
    pub reference_columns: Vec<String>,
}

impl ForeignKeyDef {
    /// Creates a single-column foreign key.
    pub fn new(
        name: impl Into<String>,
        column: impl Into<String>,
        reference_table: impl Into<String>,
        reference_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: vec![column.into()],
            reference_table: reference_table.into(),
            reference_columns: vec![reference_column.into()],
        }
    }

    /// Creates a composite foreign key.
    pub fn composite<I, J, S, T>(
        name: impl Into<String>,
        columns: I,
        reference_table: impl Into<String>,
        reference_columns: J,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            reference_table: reference_table.into(),
            reference_columns: reference_columns.into_iter().map(Into::into).collect(),
        }
    }

    /// The `auto_fk_<name>` ERROR rule that checks this relationship.
    pub fn to_rule(&self) -> ValidationRule {
        ValidationRule::new(format!("auto_fk_{}", self.name), Severity::Error)
            .with_description(format!(
                "Auto-discovered foreign key: {} -> {}.{}",
                self.columns.join(", "),
                self.reference_table,
                self.reference_columns.join(", ")
            ))
            .with_parameter("foreign_key", self.columns.clone())
            .with_parameter("reference_table", self.reference_table.clone())
            .with_parameter("reference_column", self.reference_columns.clone())
    }
}

/// Answers parent-key questions for referential integrity checks.
///
/// Implementations should answer every call of one validation run from the
/// same logical snapshot of the data. Keys containing a null are never
/// returned.
#[async_trait]
pub trait ReferenceSource: Debug + Send + Sync {
    /// The distinct non-null key tuples of `columns` in `table`.
    ///
    /// Values are rendered the same way as [`ColumnView::value`](crate::dataset::ColumnView::value)
    /// so child and parent keys compare equal when their values do.
    async fn distinct_keys(&self, table: &str, columns: &[String]) -> Result<HashSet<KeyTuple>>;

    /// True when `key` exists in `table`.
    async fn contains_key(&self, table: &str, columns: &[String], key: &KeyTuple) -> Result<bool> {
        Ok(self.distinct_keys(table, columns).await?.contains(key))
    }

    /// Foreign keys declared on `table`; none by default.
    async fn foreign_keys(&self, _table: &str) -> Result<Vec<ForeignKeyDef>> {
        Ok(Vec::new())
    }
}
