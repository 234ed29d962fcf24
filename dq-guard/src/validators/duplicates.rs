//! Duplicate detection over single columns and composite keys.

use crate::core::{RuleRegistry, Severity, ValidationResult, ValidationRule, Validator};
use crate::dataset::{key_at, Dataset, KeyTuple};
use crate::logging::{truncate_field, MAX_SAMPLE_LENGTH};
use crate::prelude::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

/// How rows with a null in any key column take part in duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullHandling {
    /// Rows with a null key column are left out entirely, including from
    /// `total_rows`.
    #[default]
    Exclude,

    /// Null is an ordinary value: two rows with nulls in the same key
    /// positions and equal remaining values are duplicates.
    Include,

    /// Rows with a null key column are counted but never match any other
    /// row, so they can never be duplicates.
    Distinct,
}

impl fmt::Display for NullHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NullHandling::Exclude => write!(f, "exclude"),
            NullHandling::Include => write!(f, "include"),
            NullHandling::Distinct => write!(f, "distinct"),
        }
    }
}

impl FromStr for NullHandling {
    type Err = DqError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclude" => Ok(NullHandling::Exclude),
            "include" => Ok(NullHandling::Include),
            "distinct" => Ok(NullHandling::Distinct),
            other => Err(DqError::Configuration(format!(
                "Unknown null handling '{other}', expected exclude, include or distinct"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct DuplicatesConfig {
    columns: Option<Vec<String>>,
    null_handling: NullHandling,
    max_duplicates: u64,
    sample_size: usize,
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            columns: None,
            null_handling: NullHandling::Exclude,
            max_duplicates: 0,
            sample_size: DuplicatesValidator::DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl DuplicatesConfig {
    fn parse(rule: &ValidationRule) -> Result<Self> {
        let params = rule.parameters().reader(rule.name());

        let null_handling = match params.str("null_handling")? {
            Some(raw) => raw
                .parse()
                .map_err(|e: DqError| DqError::invalid_rule(rule.name(), e.to_string()))?,
            None => match params.bool("ignore_nulls")? {
                Some(false) => NullHandling::Include,
                _ => NullHandling::Exclude,
            },
        };

        Ok(Self {
            columns: params.columns("columns")?,
            null_handling,
            max_duplicates: params.u64("max_duplicates")?.unwrap_or(0),
            sample_size: params
                .u64("sample_size")?
                .map_or(DuplicatesValidator::DEFAULT_SAMPLE_SIZE, |n| n as usize),
        })
    }
}

/// Grouping outcome for one key.
#[derive(Debug, Default)]
struct DuplicateScan {
    considered: u64,
    groups: Vec<(KeyTuple, u64)>,
    unique_keys: u64,
}

impl DuplicateScan {
    fn affected_rows(&self) -> u64 {
        self.groups.iter().map(|(_, count)| count).sum()
    }

    fn excess_rows(&self) -> u64 {
        self.affected_rows() - self.groups.len() as u64
    }
}

fn scan(dataset: &Dataset, columns: &[String], null_handling: NullHandling) -> Result<DuplicateScan> {
    let views = dataset.columns(columns)?;
    let mut counts: HashMap<KeyTuple, u64> = HashMap::new();
    let mut considered = 0u64;

    for row in 0..dataset.num_rows() {
        let key = key_at(&views, row)?;
        if key.iter().any(Option::is_none) {
            match null_handling {
                NullHandling::Exclude => continue,
                NullHandling::Distinct => {
                    considered += 1;
                    continue;
                }
                NullHandling::Include => {}
            }
        }
        considered += 1;
        *counts.entry(key).or_insert(0) += 1;
    }

    let unique_keys = counts.len() as u64;
    let mut groups: Vec<(KeyTuple, u64)> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
    groups.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Ok(DuplicateScan {
        considered,
        groups,
        unique_keys,
    })
}

fn key_json(key: &KeyTuple) -> Value {
    let rendered: Vec<Value> = key
        .iter()
        .map(|part| match part {
            Some(text) => Value::String(truncate_field(text, MAX_SAMPLE_LENGTH)),
            None => Value::Null,
        })
        .collect();
    if rendered.len() == 1 {
        rendered.into_iter().next().unwrap_or(Value::Null)
    } else {
        Value::Array(rendered)
    }
}

/// Flags rows that share a key.
///
/// With a `columns` parameter the listed columns form one (possibly composite)
/// key and the rule yields a single result. Without it every column is checked
/// on its own and the rule yields one result per column.
///
/// `affected_rows` counts every row that belongs to a duplicate group and
/// `total_rows` the rows considered after null handling. The rule fails when
/// the excess rows (rows beyond the first of each group) exceed
/// `max_duplicates`, so with the default of `0` any duplicate group fails it.
///
/// # Parameters
///
/// | key | default | |
/// |---|---|---|
/// | `columns` | per-column mode | key columns, display order |
/// | `ignore_nulls` | `true` | `false` is shorthand for `null_handling = "include"` |
/// | `null_handling` | `"exclude"` | see [`NullHandling`]; overrides `ignore_nulls` |
/// | `max_duplicates` | `0` | tolerated excess rows |
/// | `sample_size` | `10` | duplicate keys reported in details |
#[derive(Debug, Clone)]
pub struct DuplicatesValidator {
    rules: RuleRegistry<DuplicatesConfig>,
}

impl DuplicatesValidator {
    /// Validator name.
    pub const NAME: &'static str = "duplicates";
    /// Name of the rule registered by [`DuplicatesValidator::new`].
    pub const DEFAULT_RULE: &'static str = "default_uniqueness";
    /// Duplicate keys kept in result details unless configured otherwise.
    pub const DEFAULT_SAMPLE_SIZE: usize = 10;

    /// Creates the validator with `default_uniqueness` registered.
    pub fn new() -> Self {
        let mut rules = RuleRegistry::new();
        rules.insert(
            ValidationRule::new(Self::DEFAULT_RULE, Severity::Error)
                .with_description("Default uniqueness check - no duplicate values allowed")
                .with_parameter("max_duplicates", 0)
                .with_parameter("ignore_nulls", true),
            DuplicatesConfig::default(),
        );
        Self { rules }
    }

    /// Creates the validator without any rule.
    pub fn empty() -> Self {
        Self {
            rules: RuleRegistry::new(),
        }
    }

    /// Adds a rule, builder style.
    pub fn with_rule(mut self, rule: ValidationRule) -> Result<Self> {
        self.add_rule(rule)?;
        Ok(self)
    }

    fn evaluate_key(
        &self,
        rule: &ValidationRule,
        config: &DuplicatesConfig,
        dataset: &Dataset,
        table_name: &str,
        columns: &[String],
    ) -> Result<ValidationResult> {
        let column_name = match columns {
            [single] => Some(single.as_str()),
            _ => None,
        };
        let label = match column_name {
            Some(column) => format!("Column '{column}'"),
            None => format!("Composite key ({})", columns.join(", ")),
        };

        let missing = dataset.missing_columns(columns);
        if !missing.is_empty() {
            return Ok(ValidationResult::for_rule(rule, table_name, column_name)
                .with_detail("skipped", true)
                .with_detail("missing_columns", missing.clone())
                .passed(format!(
                    "{label} not checked: columns {missing:?} not found in table '{table_name}'"
                )));
        }

        let scan = scan(dataset, columns, config.null_handling)?;
        let affected = scan.affected_rows();
        let excess = scan.excess_rows();
        let passed = excess <= config.max_duplicates;

        debug!(
            rule.name = %rule.name(),
            key.columns = ?columns,
            null_handling = %config.null_handling,
            data.considered = scan.considered,
            duplicate.groups = scan.groups.len(),
            duplicate.rows = affected,
            result.passed = passed,
            "Evaluated duplicates"
        );

        let message = match (passed, scan.groups.is_empty()) {
            (_, true) => format!("{label} has no duplicate values"),
            (true, false) => format!(
                "{label} has {excess} duplicate values (<= {} allowed)",
                config.max_duplicates
            ),
            (false, false) => format!(
                "{label} has {excess} duplicate values across {} keys (> {} allowed)",
                scan.groups.len(),
                config.max_duplicates
            ),
        };

        let samples: Vec<Value> = scan
            .groups
            .iter()
            .take(config.sample_size)
            .map(|(key, count)| json!({ "key": key_json(key), "count": count }))
            .collect();

        Ok(ValidationResult::for_rule(rule, table_name, column_name)
            .with_detail("key_columns", columns.to_vec())
            .with_detail("null_handling", config.null_handling.to_string())
            .with_detail("unique_keys", scan.unique_keys)
            .with_detail("duplicate_groups", scan.groups.len())
            .with_detail("duplicate_rows", affected)
            .with_detail("excess_rows", excess)
            .with_detail("max_duplicates", config.max_duplicates)
            .with_detail("sample_duplicates", samples)
            .with_rows(affected, scan.considered)
            .outcome(passed, message))
    }
}

impl Default for DuplicatesValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Validator for DuplicatesValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Validates data uniqueness by checking for duplicate values"
    }

    fn rules(&self) -> Vec<&ValidationRule> {
        self.rules.rules()
    }

    fn add_rule(&mut self, rule: ValidationRule) -> Result<()> {
        let config = DuplicatesConfig::parse(&rule)?;
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
        let mut results = Vec::new();

        for (rule, config) in self.rules.enabled() {
            match &config.columns {
                Some(columns) => {
                    results.push(self.evaluate_key(rule, config, dataset, table_name, columns)?);
                }
                None => {
                    let names = dataset.column_names();
                    if names.is_empty() {
                        results.push(
                            ValidationResult::for_rule(rule, table_name, None)
                                .passed(format!("Table '{table_name}' has no columns to check")),
                        );
                    }
                    for column in names {
                        let key = [column];
                        results.push(self.evaluate_key(rule, config, dataset, table_name, &key)?);
                    }
                }
            }
        }

        Ok(results)
    }
}
