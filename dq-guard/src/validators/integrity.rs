//! Referential integrity: child keys must exist among parent keys.

use super::ratio;
use crate::core::{RuleRegistry, ValidationResult, ValidationRule, Validator};
use crate::dataset::{key_at, Dataset, KeyTuple};
use crate::logging::{truncate_field, MAX_SAMPLE_LENGTH};
use crate::prelude::*;
use crate::security::SqlSecurity;
use crate::sources::ReferenceSource;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq)]
struct ForeignKeyConfig {
    foreign_key: Vec<String>,
    reference_table: String,
    reference_columns: Vec<String>,
    allow_nulls: bool,
    max_samples: usize,
}

impl ForeignKeyConfig {
    fn parse(rule: &ValidationRule) -> Result<Self> {
        let params = rule.parameters().reader(rule.name());
        let foreign_key = params.required("foreign_key", params.columns("foreign_key")?)?;
        let reference_table =
            params.required("reference_table", params.str("reference_table")?)?;
        let reference_columns =
            params.required("reference_column", params.columns("reference_column")?)?;

        if foreign_key.len() != reference_columns.len() {
            return Err(DqError::invalid_rule(
                rule.name(),
                format!(
                    "foreign_key and reference_column must have the same length, got {} and {}",
                    foreign_key.len(),
                    reference_columns.len()
                ),
            ));
        }

        std::iter::once(reference_table)
            .chain(reference_columns.iter().map(String::as_str))
            .try_for_each(SqlSecurity::validate_identifier)
            .map_err(|e| DqError::invalid_rule(rule.name(), e.to_string()))?;

        Ok(Self {
            foreign_key,
            reference_table: reference_table.to_string(),
            reference_columns,
            allow_nulls: params.bool("allow_nulls")?.unwrap_or(true),
            max_samples: params
                .u64("max_samples")?
                .map_or(IntegrityValidator::DEFAULT_MAX_SAMPLES, |n| n as usize),
        })
    }
}

#[derive(Debug, Default)]
struct IntegrityTally {
    nulls: u64,
    null_violations: u64,
    orphans: u64,
    samples: Vec<KeyTuple>,
}

/// Checks foreign keys against a parent table.
///
/// Parent keys come from an attached [`ReferenceSource`]. When the parent is
/// the table being validated (`reference_table == table_name`) the dataset's
/// own keys are used as well, so self-referencing hierarchies work without a
/// source. Source calls are bounded by [`with_query_timeout`](Self::with_query_timeout);
/// a timeout or source failure aborts the validator and the engine reports it
/// as a CRITICAL result.
///
/// There is no default rule. A validator without rules but with a source
/// asks the source for the table's declared foreign keys and checks each as
/// an `auto_fk_<name>` ERROR rule.
///
/// # Parameters
///
/// | key | default | |
/// |---|---|---|
/// | `foreign_key` | required | child column or columns |
/// | `reference_table` | required | parent table |
/// | `reference_column` | required | parent columns, same arity as `foreign_key` |
/// | `allow_nulls` | `true` | skip child keys containing a null; otherwise they are violations |
/// | `max_samples` | `10` | orphaned keys kept in details |
///
/// # Examples
///
/// ```rust
/// use dq_guard::core::{Severity, ValidationRule, Validator};
/// use dq_guard::sources::InMemoryReferenceSource;
/// use dq_guard::validators::IntegrityValidator;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let validator = IntegrityValidator::new()
///     .with_source(Arc::new(InMemoryReferenceSource::new()))
///     .with_query_timeout(Duration::from_secs(5))
///     .with_rule(
///         ValidationRule::new("pedidos_clientes", Severity::Error)
///             .with_parameter("foreign_key", "id_cliente")
///             .with_parameter("reference_table", "clientes")
///             .with_parameter("reference_column", "id"),
///     )
///     .unwrap();
///
/// assert_eq!(validator.rules().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct IntegrityValidator {
    rules: RuleRegistry<ForeignKeyConfig>,
    source: Option<Arc<dyn ReferenceSource>>,
    query_timeout: Duration,
}

impl IntegrityValidator {
    /// Validator name.
    pub const NAME: &'static str = "integrity";
    /// Orphaned keys kept in result details unless configured otherwise.
    pub const DEFAULT_MAX_SAMPLES: usize = 10;
    /// Bound on each reference source call unless configured otherwise.
    pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates the validator with no rules and no source.
    pub fn new() -> Self {
        Self {
            rules: RuleRegistry::new(),
            source: None,
            query_timeout: Self::DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Attaches the parent-key source.
    pub fn with_source(mut self, source: Arc<dyn ReferenceSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Bounds every reference source call.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Adds a rule, builder style.
    pub fn with_rule(mut self, rule: ValidationRule) -> Result<Self> {
        self.add_rule(rule)?;
        Ok(self)
    }

    /// The configured query timeout.
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    async fn bounded<T, F>(&self, operation: impl Into<String>, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.query_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DqError::Timeout {
                operation: operation.into(),
                timeout_ms: self.query_timeout.as_millis() as u64,
            }),
        }
    }

    async fn discover(&self, table_name: &str) -> Result<Vec<(ValidationRule, ForeignKeyConfig)>> {
        let Some(source) = &self.source else {
            return Ok(Vec::new());
        };

        let declared = self
            .bounded(
                format!("discovering foreign keys of '{table_name}'"),
                source.foreign_keys(table_name),
            )
            .await?;

        let mut discovered = Vec::with_capacity(declared.len());
        for foreign_key in declared {
            let rule = foreign_key.to_rule();
            let config = ForeignKeyConfig::parse(&rule)?;
            discovered.push((rule, config));
        }

        info!(
            table.name = %table_name,
            foreign_keys = discovered.len(),
            "Discovered foreign keys"
        );
        Ok(discovered)
    }

    async fn parent_keys(
        &self,
        config: &ForeignKeyConfig,
        dataset: &Dataset,
        table_name: &str,
    ) -> Result<HashSet<KeyTuple>> {
        let self_reference = config.reference_table == table_name;
        let mut keys = HashSet::new();

        if self_reference && dataset.missing_columns(&config.reference_columns).is_empty() {
            // Parents come from every row, children only from the sample.
            let parents = dataset.unsampled();
            let views = parents.columns(&config.reference_columns)?;
            for row in 0..parents.num_rows() {
                let key = key_at(&views, row)?;
                if key.iter().all(Option::is_some) {
                    keys.insert(key);
                }
            }
        }

        match &self.source {
            Some(source) => {
                let fetched = self
                    .bounded(
                        format!("fetching parent keys from '{}'", config.reference_table),
                        source.distinct_keys(&config.reference_table, &config.reference_columns),
                    )
                    .await?;
                keys.extend(fetched);
            }
            None if self_reference => {}
            None => {
                return Err(DqError::evaluation(
                    Self::NAME,
                    format!(
                        "no reference source attached to look up table '{}'",
                        config.reference_table
                    ),
                ));
            }
        }

        Ok(keys)
    }

    async fn evaluate_rule(
        &self,
        rule: &ValidationRule,
        config: &ForeignKeyConfig,
        dataset: &Dataset,
        table_name: &str,
    ) -> Result<ValidationResult> {
        let column_name = match config.foreign_key.as_slice() {
            [single] => Some(single.as_str()),
            _ => None,
        };

        let missing = dataset.missing_columns(&config.foreign_key);
        if !missing.is_empty() {
            return Ok(ValidationResult::for_rule(rule, table_name, column_name)
                .with_detail("skipped", true)
                .with_detail("missing_columns", missing.clone())
                .with_rows(0, dataset.num_rows() as u64)
                .passed(format!(
                    "Foreign key columns {missing:?} not found in table '{table_name}'; rule not applied"
                )));
        }

        let parents = self.parent_keys(config, dataset, table_name).await?;
        let views = dataset.columns(&config.foreign_key)?;
        let mut tally = IntegrityTally::default();

        for row in 0..dataset.num_rows() {
            let key = key_at(&views, row)?;
            if key.iter().any(Option::is_none) {
                tally.nulls += 1;
                if !config.allow_nulls {
                    tally.null_violations += 1;
                }
            } else if !parents.contains(&key) {
                tally.orphans += 1;
                if tally.samples.len() < config.max_samples && !tally.samples.contains(&key) {
                    tally.samples.push(key);
                }
            }
        }

        let total = dataset.num_rows() as u64;
        let affected = tally.orphans + tally.null_violations;
        let passed = affected == 0;

        debug!(
            rule.name = %rule.name(),
            reference.table = %config.reference_table,
            parent.keys = parents.len(),
            data.orphans = tally.orphans,
            data.null_violations = tally.null_violations,
            result.passed = passed,
            "Evaluated foreign key"
        );

        let message = if passed {
            if tally.nulls > 0 {
                format!(
                    "All {} non-null foreign key references are valid ({} nulls allowed)",
                    total - tally.nulls,
                    tally.nulls
                )
            } else {
                format!("All {total} foreign key references are valid")
            }
        } else {
            let mut issues = Vec::new();
            if tally.orphans > 0 {
                issues.push(format!("{} orphaned records", tally.orphans));
            }
            if tally.null_violations > 0 {
                issues.push(format!("{} null values", tally.null_violations));
            }
            format!("Foreign key validation failed: {}", issues.join(", "))
        };

        let samples: Vec<Value> = tally.samples.iter().map(sample_json).collect();

        Ok(ValidationResult::for_rule(rule, table_name, column_name)
            .with_detail("foreign_key_columns", config.foreign_key.clone())
            .with_detail("reference_table", config.reference_table.clone())
            .with_detail("reference_columns", config.reference_columns.clone())
            .with_detail("self_reference", config.reference_table == table_name)
            .with_detail("parent_keys", parents.len())
            .with_detail("valid_references", total - affected)
            .with_detail("orphaned_records", tally.orphans)
            .with_detail("null_violations", tally.null_violations)
            .with_detail("null_count", tally.nulls)
            .with_detail("allow_nulls", config.allow_nulls)
            .with_detail("integrity_ratio", ratio(total - affected, total))
            .with_detail("orphaned_values", samples)
            .with_rows(affected, total)
            .outcome(passed, message))
    }
}

fn sample_json(key: &KeyTuple) -> Value {
    let mut parts: Vec<Value> = key
        .iter()
        .map(|part| {
            part.as_deref()
                .map(|text| Value::String(truncate_field(text, MAX_SAMPLE_LENGTH)))
                .unwrap_or(Value::Null)
        })
        .collect();
    match parts.len() {
        1 => parts.remove(0),
        _ => Value::Array(parts),
    }
}

impl Default for IntegrityValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Validator for IntegrityValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Validates referential integrity by checking foreign key relationships"
    }

    fn rules(&self) -> Vec<&ValidationRule> {
        self.rules.rules()
    }

    fn add_rule(&mut self, rule: ValidationRule) -> Result<()> {
        let config = ForeignKeyConfig::parse(&rule)?;
        self.rules.insert(rule, config);
        Ok(())
    }

    #[instrument(skip(self, dataset), fields(
        validator.name = Self::NAME,
        table.name = %table_name,
        data.rows = dataset.num_rows()
    ))]
    async fn validate_table(
        &self,
        dataset: &Dataset,
        table_name: &str,
    ) -> Result<Vec<ValidationResult>> {
        let discovered = if self.rules.is_empty() {
            self.discover(table_name).await?
        } else {
            Vec::new()
        };

        let plan: Vec<(&ValidationRule, &ForeignKeyConfig)> = if discovered.is_empty() {
            self.rules.enabled().collect()
        } else {
            discovered.iter().map(|(rule, config)| (rule, config)).collect()
        };

        let mut results = Vec::with_capacity(plan.len());
        for (rule, config) in plan {
            results.push(self.evaluate_rule(rule, config, dataset, table_name).await?);
        }
        Ok(results)
    }
}
