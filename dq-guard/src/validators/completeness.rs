//! Completeness: the fraction of non-missing values per column.

use super::{meets_threshold, ratio, round4};
use crate::core::{RuleRegistry, Severity, ValidationResult, ValidationRule, Validator};
use crate::dataset::Dataset;
use crate::prelude::*;
use async_trait::async_trait;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq)]
struct CompletenessConfig {
    columns: Option<Vec<String>>,
    threshold: f64,
    empty_as_missing: bool,
}

impl Default for CompletenessConfig {
    fn default() -> Self {
        Self {
            columns: None,
            threshold: CompletenessValidator::DEFAULT_THRESHOLD,
            empty_as_missing: true,
        }
    }
}

impl CompletenessConfig {
    fn parse(rule: &ValidationRule) -> Result<Self> {
        let params = rule.parameters().reader(rule.name());
        Ok(Self {
            columns: params.columns("columns")?,
            threshold: params.threshold("threshold", CompletenessValidator::DEFAULT_THRESHOLD)?,
            empty_as_missing: params.bool("empty_as_missing")?.unwrap_or(true),
        })
    }
}

/// Checks that columns are filled in.
///
/// A value is missing when it is null or, unless `empty_as_missing` is
/// `false`, when it renders as an empty or blank string. A column passes when
/// `non_missing / rows >= threshold`; a table without rows passes with a
/// ratio of `1.0`.
///
/// # Parameters
///
/// | key | default | |
/// |---|---|---|
/// | `columns` | every column | string or list of strings |
/// | `threshold` | `0.95` | minimum completeness in `[0, 1]` |
/// | `empty_as_missing` | `true` | count blank strings as missing |
///
/// # Examples
///
/// ```rust
/// use dq_guard::core::{Severity, ValidationRule, Validator};
/// use dq_guard::validators::CompletenessValidator;
///
/// let mut validator = CompletenessValidator::new();
/// validator
///     .add_rule(
///         ValidationRule::new("email_filled", Severity::Error)
///             .with_parameter("columns", vec!["email"])
///             .with_parameter("threshold", 0.99),
///     )
///     .unwrap();
///
/// assert_eq!(validator.rules().len(), 2);
/// assert!(validator
///     .add_rule(ValidationRule::new("bad", Severity::Error).with_parameter("threshold", 2.0))
///     .is_err());
/// ```
#[derive(Debug, Clone)]
pub struct CompletenessValidator {
    rules: RuleRegistry<CompletenessConfig>,
}

impl CompletenessValidator {
    /// Validator name.
    pub const NAME: &'static str = "completeness";
    /// Name of the rule registered by [`CompletenessValidator::new`].
    pub const DEFAULT_RULE: &'static str = "default_completeness";
    /// Threshold used when a rule does not set one.
    pub const DEFAULT_THRESHOLD: f64 = 0.95;

    /// Creates the validator with `default_completeness` registered.
    pub fn new() -> Self {
        let mut rules = RuleRegistry::new();
        rules.insert(
            ValidationRule::new(Self::DEFAULT_RULE, Severity::Warning)
                .with_description("Default completeness check requiring 95% non-null values")
                .with_parameter("threshold", Self::DEFAULT_THRESHOLD),
            CompletenessConfig::default(),
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

    fn evaluate_column(
        &self,
        rule: &ValidationRule,
        config: &CompletenessConfig,
        dataset: &Dataset,
        table_name: &str,
        column_name: &str,
    ) -> Result<ValidationResult> {
        if !dataset.has_column(column_name) {
            return Ok(ValidationResult::for_rule(rule, table_name, Some(column_name))
                .with_detail("skipped", true)
                .with_rows(0, dataset.num_rows() as u64)
                .passed(format!(
                    "Column '{column_name}' not found in table '{table_name}'; rule not applied"
                )));
        }

        let column = dataset.column(column_name)?;
        let total = column.len() as u64;
        let missing = (0..column.len())
            .filter(|&row| column.is_missing(row, config.empty_as_missing))
            .count() as u64;
        let non_missing = total - missing;
        let completeness = ratio(non_missing, total);
        let passed = meets_threshold(completeness, config.threshold);

        debug!(
            rule.name = %rule.name(),
            column.name = %column_name,
            data.rows = total,
            data.missing = missing,
            completeness = completeness,
            result.passed = passed,
            "Evaluated completeness"
        );

        let comparison = if passed { ">=" } else { "<" };
        let message = format!(
            "Column '{column_name}' has {:.1}% completeness ({comparison} {:.1}% required)",
            completeness * 100.0,
            config.threshold * 100.0
        );

        Ok(ValidationResult::for_rule(rule, table_name, Some(column_name))
            .with_detail("completeness_ratio", completeness)
            .with_detail("missing_count", missing)
            .with_detail("non_missing_count", non_missing)
            .with_detail("threshold", config.threshold)
            .with_detail("missing_percentage", round4((1.0 - completeness) * 100.0))
            .with_detail("empty_as_missing", config.empty_as_missing)
            .with_rows(missing, total)
            .outcome(passed, message))
    }
}

impl Default for CompletenessValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Validator for CompletenessValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Validates data completeness by checking for null and missing values"
    }

    fn rules(&self) -> Vec<&ValidationRule> {
        self.rules.rules()
    }

    fn add_rule(&mut self, rule: ValidationRule) -> Result<()> {
        let config = CompletenessConfig::parse(&rule)?;
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
            let columns = match &config.columns {
                Some(columns) => columns.clone(),
                None => dataset.column_names(),
            };

            if columns.is_empty() {
                results.push(
                    ValidationResult::for_rule(rule, table_name, None)
                        .passed(format!("Table '{table_name}' has no columns to check")),
                );
                continue;
            }

            for column in &columns {
                results.push(self.evaluate_column(rule, config, dataset, table_name, column)?);
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{clientes_with_missing_emails, empty_clientes};
    use arrow::array::{ArrayRef, StringArray};
    use std::sync::Arc;

    fn email_rule(threshold: f64) -> ValidationRule {
        ValidationRule::new("email_completeness", Severity::Warning)
            .with_parameter("columns", vec!["email"])
            .with_parameter("threshold", threshold)
    }

    #[tokio::test]
    async fn test_three_missing_of_hundred_passes() {
        let validator = CompletenessValidator::empty().with_rule(email_rule(0.95)).unwrap();
        let dataset = clientes_with_missing_emails(100, 3);

        let results = validator.validate_table(&dataset, "clientes").await.unwrap();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert!(result.is_passed());
        assert_eq!(result.affected_rows(), 3);
        assert_eq!(result.total_rows(), 100);
        assert_eq!(result.column_name(), Some("email"));
        assert_eq!(result.detail("completeness_ratio").unwrap(), 0.97);
        assert_eq!(result.detail("missing_count").unwrap(), 3);
    }

    #[tokio::test]
    async fn test_six_missing_of_hundred_fails() {
        let validator = CompletenessValidator::empty().with_rule(email_rule(0.95)).unwrap();
        let dataset = clientes_with_missing_emails(100, 6);

        let results = validator.validate_table(&dataset, "clientes").await.unwrap();
        assert!(!results[0].is_passed());
        assert_eq!(results[0].detail("completeness_ratio").unwrap(), 0.94);
        assert!(results[0].message().contains("94.0%"));
    }

    #[tokio::test]
    async fn test_exact_boundary_passes() {
        let validator = CompletenessValidator::empty().with_rule(email_rule(0.95)).unwrap();
        let results = validator
            .validate_table(&clientes_with_missing_emails(100, 5), "clientes")
            .await
            .unwrap();
        assert!(results[0].is_passed());
    }

    #[tokio::test]
    async fn test_default_rule_covers_every_column() {
        let validator = CompletenessValidator::new();
        let dataset = clientes_with_missing_emails(20, 0);

        let results = validator.validate_table(&dataset, "clientes").await.unwrap();
        let columns: Vec<_> = results.iter().filter_map(|r| r.column_name()).collect();
        assert_eq!(columns, vec!["id_cliente", "email"]);
        assert!(results.iter().all(|r| r.rule_name() == "default_completeness"));
        assert!(results.iter().all(|r| r.severity() == Severity::Warning));
    }

    #[tokio::test]
    async fn test_empty_table_passes() {
        let validator = CompletenessValidator::new();
        let results = validator
            .validate_table(&empty_clientes(), "clientes")
            .await
            .unwrap();
        assert!(!results.is_empty());
        for result in results {
            assert!(result.is_passed());
            assert_eq!(result.detail("completeness_ratio").unwrap(), 1.0);
            assert_eq!(result.total_rows(), 0);
        }
    }

    #[tokio::test]
    async fn test_empty_strings_respect_flag() {
        let dataset = Dataset::try_from_columns(vec![(
            "nome",
            Arc::new(StringArray::from(vec![Some("Ana"), Some(""), Some("Bia"), Some("")]))
                as ArrayRef,
        )])
        .unwrap();

        let strict = CompletenessValidator::empty()
            .with_rule(ValidationRule::new("r", Severity::Warning).with_parameter("threshold", 0.5))
            .unwrap();
        let results = strict.validate_table(&dataset, "t").await.unwrap();
        assert_eq!(results[0].affected_rows(), 2);

        let lenient = CompletenessValidator::empty()
            .with_rule(
                ValidationRule::new("r", Severity::Warning)
                    .with_parameter("empty_as_missing", false),
            )
            .unwrap();
        let results = lenient.validate_table(&dataset, "t").await.unwrap();
        assert_eq!(results[0].affected_rows(), 0);
    }

    #[tokio::test]
    async fn test_missing_column_passes_with_explanation() {
        let validator = CompletenessValidator::empty()
            .with_rule(
                ValidationRule::new("phone", Severity::Warning)
                    .with_parameter("columns", vec!["telefone"]),
            )
            .unwrap();
        let results = validator
            .validate_table(&clientes_with_missing_emails(10, 0), "clientes")
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].is_passed());
        assert!(results[0].message().contains("not found"));
        assert_eq!(results[0].detail("skipped").unwrap(), true);
    }

    #[tokio::test]
    async fn test_disabled_rule_produces_nothing() {
        let mut validator = CompletenessValidator::new();
        validator
            .add_rule(
                ValidationRule::new(CompletenessValidator::DEFAULT_RULE, Severity::Warning)
                    .enabled(false),
            )
            .unwrap();
        let results = validator
            .validate_table(&clientes_with_missing_emails(10, 1), "clientes")
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_invalid_threshold_rejected_at_registration() {
        let mut validator = CompletenessValidator::new();
        let err = validator
            .add_rule(ValidationRule::new("bad", Severity::Warning).with_parameter("threshold", -0.1))
            .unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(validator.rules().len(), 1);
    }
}
