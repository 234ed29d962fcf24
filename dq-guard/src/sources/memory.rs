use super::{ForeignKeyDef, ReferenceSource};
use crate::dataset::{key_at, Dataset, KeyTuple};
use crate::prelude::*;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Parent tables held in memory.
///
/// ```rust
/// use arrow::array::{ArrayRef, Int64Array};
/// use dq_guard::dataset::Dataset;
/// use dq_guard::sources::{ForeignKeyDef, InMemoryReferenceSource};
/// use std::sync::Arc;
///
/// let clientes = Dataset::try_from_columns(vec![
///     ("id", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
/// ])
/// .unwrap();
///
/// let source = InMemoryReferenceSource::new()
///     .with_table("clientes", clientes)
///     .with_foreign_key("pedidos", ForeignKeyDef::new("fk_cliente", "id_cliente", "clientes", "id"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceSource {
    tables: HashMap<String, Dataset>,
    foreign_keys: HashMap<String, Vec<ForeignKeyDef>>,
}

impl InMemoryReferenceSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a table.
    pub fn with_table(mut self, name: impl Into<String>, dataset: Dataset) -> Self {
        self.tables.insert(name.into(), dataset);
        self
    }

    /// Declares a foreign key on `table`.
    pub fn with_foreign_key(mut self, table: impl Into<String>, foreign_key: ForeignKeyDef) -> Self {
        self.foreign_keys
            .entry(table.into())
            .or_default()
            .push(foreign_key);
        self
    }

    fn table(&self, name: &str) -> Result<&Dataset> {
        self.tables
            .get(name)
            .ok_or_else(|| DqError::reference_source(format!("table '{name}' is not registered")))
    }
}

#[async_trait]
impl ReferenceSource for InMemoryReferenceSource {
    async fn distinct_keys(&self, table: &str, columns: &[String]) -> Result<HashSet<KeyTuple>> {
        let dataset = self.table(table)?;
        let missing = dataset.missing_columns(columns);
        if !missing.is_empty() {
            return Err(DqError::reference_source(format!(
                "columns {missing:?} not found in reference table '{table}'"
            )));
        }

        let views = dataset.columns(columns)?;
        let mut keys = HashSet::new();
        for row in 0..dataset.num_rows() {
            let key = key_at(&views, row)?;
            if key.iter().all(Option::is_some) {
                keys.insert(key);
            }
        }
        Ok(keys)
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyDef>> {
        Ok(self.foreign_keys.get(table).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Int64Array, StringArray};
    use std::sync::Arc;

    fn lojas() -> Dataset {
        Dataset::try_from_columns(vec![
            ("id", Arc::new(Int64Array::from(vec![Some(1), Some(2), Some(2), None])) as ArrayRef),
            (
                "uf",
                Arc::new(StringArray::from(vec!["SP", "RJ", "RJ", "MG"])) as ArrayRef,
            ),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_distinct_keys_skip_nulls() {
        let source = InMemoryReferenceSource::new().with_table("lojas", lojas());
        let keys = source
            .distinct_keys("lojas", &["id".to_string(), "uf".to_string()])
            .await
            .unwrap();

        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&vec![Some("2".to_string()), Some("RJ".to_string())]));
        assert!(source
            .contains_key("lojas", &["id".to_string()], &vec![Some("1".to_string())])
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unknown_table_and_column() {
        let source = InMemoryReferenceSource::new().with_table("lojas", lojas());
        let err = source
            .distinct_keys("clientes", &["id".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, DqError::ReferenceSource { .. }));

        let err = source
            .distinct_keys("lojas", &["cnpj".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cnpj"));
    }

    #[tokio::test]
    async fn test_declared_foreign_keys() {
        let source = InMemoryReferenceSource::new()
            .with_foreign_key("pedidos", ForeignKeyDef::new("fk_loja", "id_loja", "lojas", "id"));
        assert_eq!(source.foreign_keys("pedidos").await.unwrap().len(), 1);
        assert!(source.foreign_keys("lojas").await.unwrap().is_empty());
    }
}
