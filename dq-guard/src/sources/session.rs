use super::{ForeignKeyDef, ReferenceSource};
use crate::dataset::{key_at, Dataset, KeyTuple};
use crate::prelude::*;
use crate::security::SqlSecurity;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument};

/// Parent tables registered in a DataFusion [`SessionContext`].
///
/// Key lookups are pushed down as
/// `SELECT DISTINCT <cols> FROM <table> WHERE <col> IS NOT NULL AND ...`, so
/// only distinct keys are materialised. Table and column names are validated
/// and quoted with [`SqlSecurity`] before they reach the query.
///
/// ```rust,no_run
/// use datafusion::prelude::*;
/// use dq_guard::sources::DataFusionReferenceSource;
///
/// # async fn example() -> datafusion::error::Result<()> {
/// let ctx = SessionContext::new();
/// ctx.register_csv("clientes", "data/clientes.csv", CsvReadOptions::new()).await?;
/// let source = DataFusionReferenceSource::new(ctx);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DataFusionReferenceSource {
    ctx: SessionContext,
    foreign_keys: HashMap<String, Vec<ForeignKeyDef>>,
}

impl std::fmt::Debug for DataFusionReferenceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFusionReferenceSource")
            .field("session_id", &self.ctx.session_id())
            .field("foreign_keys", &self.foreign_keys)
            .finish()
    }
}

impl DataFusionReferenceSource {
    /// Wraps a session context.
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            foreign_keys: HashMap::new(),
        }
    }

    /// Declares a foreign key on `table` for auto-discovery.
    pub fn with_foreign_key(mut self, table: impl Into<String>, foreign_key: ForeignKeyDef) -> Self {
        self.foreign_keys
            .entry(table.into())
            .or_default()
            .push(foreign_key);
        self
    }

    /// The wrapped context.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    fn distinct_query(table: &str, columns: &[String]) -> Result<String> {
        if columns.is_empty() {
            return Err(DqError::reference_source(format!(
                "no key columns given for table '{table}'"
            )));
        }

        let table = SqlSecurity::escape_identifier(table)?;
        let columns = columns
            .iter()
            .map(|column| SqlSecurity::escape_identifier(column))
            .collect::<Result<Vec<_>>>()?;

        let projection = columns.join(", ");
        let filter = columns
            .iter()
            .map(|column| format!("{column} IS NOT NULL"))
            .collect::<Vec<_>>()
            .join(" AND ");

        Ok(format!(
            "SELECT DISTINCT {projection} FROM {table} WHERE {filter}"
        ))
    }
}

#[async_trait]
impl ReferenceSource for DataFusionReferenceSource {
    #[instrument(skip(self), fields(source.kind = "datafusion"))]
    async fn distinct_keys(&self, table: &str, columns: &[String]) -> Result<HashSet<KeyTuple>> {
        let sql = Self::distinct_query(table, columns)?;
        debug!(query = %sql, "Fetching distinct parent keys");

        let batches = self
            .ctx
            .sql(&sql)
            .await
            .with_context(|| format!("Failed to query reference table '{table}'"))?
            .collect()
            .await
            .with_context(|| format!("Failed to read keys of reference table '{table}'"))?;

        let mut keys = HashSet::new();
        for batch in batches {
            let dataset = Dataset::new(batch);
            let views = dataset.columns(columns)?;
            for row in 0..dataset.num_rows() {
                keys.insert(key_at(&views, row)?);
            }
        }

        debug!(keys = keys.len(), "Fetched distinct parent keys");
        Ok(keys)
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDef>> {
        Ok(self.foreign_keys.get(table).cloned().unwrap_or_default())
    }
}
