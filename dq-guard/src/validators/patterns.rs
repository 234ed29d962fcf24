//! Format conformance for identifiers, contact data and custom patterns.

use super::{meets_threshold, ratio};
use crate::checkdigit::{Cnpj, Cpf, IdentifierFormat};
use crate::core::{RuleRegistry, Severity, ValidationResult, ValidationRule, Validator};
use crate::dataset::Dataset;
use crate::logging::{truncate_field, MAX_SAMPLE_LENGTH};
use crate::prelude::*;
use crate::security::SqlSecurity;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

macro_rules! builtin_regex {
    ($name:ident, $pattern:expr) => {
        #[allow(clippy::expect_used)]
        static $name: Lazy<Regex> =
            Lazy::new(|| Regex::new($pattern).expect("hard-coded pattern is valid"));
    };
}

builtin_regex!(CNPJ_REGEX, r"^\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}$");
builtin_regex!(CPF_REGEX, r"^\d{3}\.?\d{3}\.?\d{3}-?\d{2}$");
builtin_regex!(EMAIL_REGEX, r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$");
builtin_regex!(
    PHONE_REGEX,
    r"^(?:\+55\s?)?(?:\(\d{2}\)\s?|\d{2}\s?)?\d{4,5}-?\d{4}$"
);
builtin_regex!(CEP_REGEX, r"^\d{5}-?\d{3}$");

/// Formats the pattern validator knows how to check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Brazilian company registry number, with check digits
    Cnpj,
    /// Brazilian individual taxpayer number, with check digits
    Cpf,
    /// E-mail address
    Email,
    /// Brazilian phone number, optional `+55` and area code
    Phone,
    /// Brazilian postal code
    Cep,
    /// User-supplied regular expression
    CustomRegex,
}

impl PatternType {
    /// The canonical parameter value.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Cnpj => "cnpj",
            PatternType::Cpf => "cpf",
            PatternType::Email => "email",
            PatternType::Phone => "phone",
            PatternType::Cep => "cep",
            PatternType::CustomRegex => "custom_regex",
        }
    }

    /// Short human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            PatternType::Cnpj => "Brazilian CNPJ format",
            PatternType::Cpf => "Brazilian CPF format",
            PatternType::Email => "Email format",
            PatternType::Phone => "Brazilian phone format",
            PatternType::Cep => "Brazilian CEP format",
            PatternType::CustomRegex => "Custom regex pattern",
        }
    }

    fn builtin(&self) -> Option<&'static Regex> {
        match self {
            PatternType::Cnpj => Some(&*CNPJ_REGEX),
            PatternType::Cpf => Some(&*CPF_REGEX),
            PatternType::Email => Some(&*EMAIL_REGEX),
            PatternType::Phone => Some(&*PHONE_REGEX),
            PatternType::Cep => Some(&*CEP_REGEX),
            PatternType::CustomRegex => None,
        }
    }

    /// Guesses the format of a column from its name.
    ///
    /// `cnpj`, `cpf`, `mail` and the phone keywords match anywhere in the
    /// name. `cep` must start a token so that names like `exception` do not
    /// match.
    ///
    /// ```rust
    /// use dq_guard::validators::PatternType;
    ///
    /// assert_eq!(PatternType::detect("cnpj_fornecedor"), Some(PatternType::Cnpj));
    /// assert_eq!(PatternType::detect("Telefone"), Some(PatternType::Phone));
    /// assert_eq!(PatternType::detect("cep_entrega"), Some(PatternType::Cep));
    /// assert_eq!(PatternType::detect("exception_code"), None);
    /// ```
    pub fn detect(column_name: &str) -> Option<PatternType> {
        let lower = column_name.to_lowercase();

        if lower.contains("cnpj") {
            Some(PatternType::Cnpj)
        } else if lower.contains("cpf") {
            Some(PatternType::Cpf)
        } else if lower.contains("mail") {
            Some(PatternType::Email)
        } else if ["phone", "telefone", "fone", "celular"]
            .iter()
            .any(|keyword| lower.contains(keyword))
        {
            Some(PatternType::Phone)
        } else if lower
            .split(['_', '-', '.', ' '])
            .any(|token| token.starts_with("cep"))
        {
            Some(PatternType::Cep)
        } else {
            None
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternType {
    type Err = DqError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cnpj" => Ok(PatternType::Cnpj),
            "cpf" => Ok(PatternType::Cpf),
            "email" => Ok(PatternType::Email),
            "phone" | "phone_br" => Ok(PatternType::Phone),
            "cep" => Ok(PatternType::Cep),
            "custom_regex" | "regex" => Ok(PatternType::CustomRegex),
            other => Err(DqError::Configuration(format!(
                "Unsupported pattern type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Selection {
    AutoDetect,
    Fixed(PatternType),
}

#[derive(Debug, Clone)]
struct PatternsConfig {
    selection: Selection,
    columns: Option<Vec<String>>,
    custom: Option<Regex>,
    threshold: f64,
    allow_nulls: bool,
    max_samples: usize,
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            selection: Selection::AutoDetect,
            columns: None,
            custom: None,
            threshold: PatternsValidator::DEFAULT_THRESHOLD,
            allow_nulls: true,
            max_samples: PatternsValidator::DEFAULT_MAX_SAMPLES,
        }
    }
}

impl PatternsConfig {
    fn parse(rule: &ValidationRule) -> Result<Self> {
        let params = rule.parameters().reader(rule.name());

        let selection = match params.str("pattern_type")? {
            None | Some("auto_detect") => Selection::AutoDetect,
            Some(raw) => Selection::Fixed(
                raw.parse()
                    .map_err(|e: DqError| DqError::invalid_rule(rule.name(), e.to_string()))?,
            ),
        };

        let custom = match selection {
            Selection::Fixed(PatternType::CustomRegex) => {
                let pattern = params.required("regex_pattern", params.str("regex_pattern")?)?;
                let regex = SqlSecurity::validate_regex_pattern(pattern)
                    .map_err(|e| DqError::invalid_rule(rule.name(), e.to_string()))?;
                Some(regex)
            }
            _ => None,
        };

        Ok(Self {
            selection,
            columns: params.columns("columns")?,
            custom,
            threshold: params.threshold("threshold", PatternsValidator::DEFAULT_THRESHOLD)?,
            allow_nulls: params.bool("allow_nulls")?.unwrap_or(true),
            max_samples: params
                .u64("max_samples")?
                .map_or(PatternsValidator::DEFAULT_MAX_SAMPLES, |n| n as usize),
        })
    }

    fn regex(&self, pattern_type: PatternType) -> Option<&Regex> {
        match pattern_type {
            PatternType::CustomRegex => self.custom.as_ref(),
            builtin => builtin.builtin(),
        }
    }

    fn is_valid(&self, pattern_type: PatternType, value: &str) -> bool {
        let Some(regex) = self.regex(pattern_type) else {
            return false;
        };
        if !regex.is_match(value) {
            return false;
        }
        match pattern_type {
            PatternType::Cnpj => Cnpj.is_valid(value),
            PatternType::Cpf => Cpf.is_valid(value),
            _ => true,
        }
    }
}

#[derive(Debug, Default)]
struct PatternTally {
    valid: u64,
    invalid: u64,
    missing: u64,
    samples: Vec<String>,
}

/// Checks that values follow a known format.
///
/// In auto-detect mode (the default rule) column names decide which format
/// applies, see [`PatternType::detect`]. With an explicit `pattern_type` every
/// targeted column is checked against it. CNPJ and CPF values must match the
/// format and carry valid check digits.
///
/// A column passes when the valid fraction reaches `threshold`. Missing
/// values (null or blank) are ignored when `allow_nulls` is set and count as
/// invalid otherwise. Values are trimmed before matching.
///
/// # Parameters
///
/// | key | default | |
/// |---|---|---|
/// | `pattern_type` | `auto_detect` | `cnpj`, `cpf`, `email`, `phone`, `cep`, `custom_regex` |
/// | `columns` | all (or all detected) | string or list |
/// | `regex_pattern` | | required for `custom_regex`, compiled on registration |
/// | `threshold` | `0.95` | minimum valid fraction |
/// | `allow_nulls` | `true` | |
/// | `max_samples` | `10` | invalid values kept in details |
///
/// # Examples
///
/// ```rust
/// use dq_guard::core::{Severity, ValidationRule, Validator};
/// use dq_guard::validators::PatternsValidator;
///
/// let mut validator = PatternsValidator::new();
/// let bad_regex = ValidationRule::new("sku", Severity::Error)
///     .with_parameter("pattern_type", "custom_regex")
///     .with_parameter("regex_pattern", "[A-Z");
///
/// assert!(validator.add_rule(bad_regex).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct PatternsValidator {
    rules: RuleRegistry<PatternsConfig>,
}

impl PatternsValidator {
    /// Validator name.
    pub const NAME: &'static str = "patterns";
    /// Name of the rule registered by [`PatternsValidator::new`].
    pub const DEFAULT_RULE: &'static str = "default_pattern_check";
    /// Threshold used when a rule does not set one.
    pub const DEFAULT_THRESHOLD: f64 = 0.95;
    /// Invalid values kept in result details unless configured otherwise.
    pub const DEFAULT_MAX_SAMPLES: usize = 10;

    /// Creates the validator with the auto-detecting `default_pattern_check`.
    pub fn new() -> Self {
        let mut rules = RuleRegistry::new();
        rules.insert(
            ValidationRule::new(Self::DEFAULT_RULE, Severity::Info)
                .with_description("Default pattern validation")
                .with_parameter("pattern_type", "auto_detect")
                .with_parameter("allow_nulls", true),
            PatternsConfig::default(),
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

    fn tally(
        config: &PatternsConfig,
        pattern_type: PatternType,
        dataset: &Dataset,
        column_name: &str,
    ) -> Result<PatternTally> {
        let column = dataset.column(column_name)?;
        let mut tally = PatternTally::default();

        for row in 0..column.len() {
            let value = match column.value(row)? {
                Some(value) if !value.trim().is_empty() => value,
                other => {
                    tally.missing += 1;
                    if !config.allow_nulls {
                        tally.invalid += 1;
                        if tally.samples.len() < config.max_samples {
                            tally.samples.push(other.unwrap_or_else(|| "null".to_string()));
                        }
                    }
                    continue;
                }
            };

            let trimmed = value.trim();
            if config.is_valid(pattern_type, trimmed) {
                tally.valid += 1;
            } else {
                tally.invalid += 1;
                if tally.samples.len() < config.max_samples {
                    tally.samples.push(truncate_field(trimmed, MAX_SAMPLE_LENGTH));
                }
            }
        }

        Ok(tally)
    }

    fn evaluate_column(
        rule: &ValidationRule,
        config: &PatternsConfig,
        pattern_type: PatternType,
        auto_detected: bool,
        dataset: &Dataset,
        table_name: &str,
        column_name: &str,
    ) -> Result<ValidationResult> {
        if !dataset.has_column(column_name) {
            return Ok(ValidationResult::for_rule(rule, table_name, Some(column_name))
                .with_detail("skipped", true)
                .with_detail("pattern_type", pattern_type.as_str())
                .passed(format!(
                    "Column '{column_name}' not found in table '{table_name}'; rule not applied"
                )));
        }

        let tally = Self::tally(config, pattern_type, dataset, column_name)?;
        let checked = tally.valid + tally.invalid;
        let valid_fraction = ratio(tally.valid, checked);
        let passed = meets_threshold(valid_fraction, config.threshold);

        debug!(
            rule.name = %rule.name(),
            column.name = %column_name,
            pattern.kind = %pattern_type,
            pattern.auto_detected = auto_detected,
            data.valid = tally.valid,
            data.invalid = tally.invalid,
            result.passed = passed,
            "Evaluated pattern"
        );

        let message = if tally.invalid == 0 {
            if tally.missing > 0 {
                format!(
                    "All {} non-null values in '{column_name}' match {pattern_type} pattern ({} nulls allowed)",
                    tally.valid, tally.missing
                )
            } else {
                format!(
                    "All {} values in '{column_name}' match {pattern_type} pattern",
                    tally.valid
                )
            }
        } else {
            format!(
                "Column '{column_name}' has {} values not matching {pattern_type} pattern ({:.1}% valid, {} {:.1}% required)",
                tally.invalid,
                valid_fraction * 100.0,
                if passed { ">=" } else { "<" },
                config.threshold * 100.0
            )
        };

        let pattern = config
            .regex(pattern_type)
            .map(|regex| regex.as_str().to_string())
            .unwrap_or_default();

        Ok(ValidationResult::for_rule(rule, table_name, Some(column_name))
            .with_detail("pattern_type", pattern_type.as_str())
            .with_detail("pattern_description", pattern_type.description())
            .with_detail("pattern", pattern)
            .with_detail("auto_detected", auto_detected)
            .with_detail("valid_count", tally.valid)
            .with_detail("invalid_count", tally.invalid)
            .with_detail("missing_count", tally.missing)
            .with_detail("valid_fraction", valid_fraction)
            .with_detail("threshold", config.threshold)
            .with_detail("allow_nulls", config.allow_nulls)
            .with_detail("invalid_samples", tally.samples)
            .with_rows(tally.invalid, dataset.num_rows() as u64)
            .outcome(passed, message))
    }
}

impl Default for PatternsValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Validator for PatternsValidator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Validates data format patterns (CNPJ, CPF, email, phone, CEP)"
    }

    fn rules(&self) -> Vec<&ValidationRule> {
        self.rules.rules()
    }

    fn add_rule(&mut self, rule: ValidationRule) -> Result<()> {
        let config = PatternsConfig::parse(&rule)?;
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

            match config.selection {
                Selection::Fixed(pattern_type) => {
                    if columns.is_empty() {
                        results.push(
                            ValidationResult::for_rule(rule, table_name, None)
                                .passed(format!("Table '{table_name}' has no columns to check")),
                        );
                    }
                    for column in &columns {
                        results.push(Self::evaluate_column(
                            rule,
                            config,
                            pattern_type,
                            false,
                            dataset,
                            table_name,
                            column,
                        )?);
                    }
                }
                Selection::AutoDetect => {
                    let before = results.len();
                    for column in &columns {
                        if let Some(pattern_type) = PatternType::detect(column) {
                            results.push(Self::evaluate_column(
                                rule,
                                config,
                                pattern_type,
                                true,
                                dataset,
                                table_name,
                                column,
                            )?);
                        }
                    }
                    if results.len() == before {
                        results.push(
                            ValidationResult::for_rule(rule, table_name, None)
                                .with_detail("pattern_type", "none")
                                .with_detail("auto_detected", true)
                                .with_rows(0, dataset.num_rows() as u64)
                                .passed(format!(
                                    "No specific pattern detected for columns of table '{table_name}'"
                                )),
                        );
                    }
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, StringArray};
    use std::sync::Arc;

    fn single(name: &str, values: Vec<Option<&str>>) -> Dataset {
        Dataset::try_from_columns(vec![(name, Arc::new(StringArray::from(values)) as ArrayRef)])
            .unwrap()
    }

    fn explicit(pattern_type: &str, column: &str) -> ValidationRule {
        ValidationRule::new(format!("{pattern_type}_check"), Severity::Error)
            .with_parameter("pattern_type", pattern_type)
            .with_parameter("columns", vec![column])
    }

    #[test]
    fn test_builtin_patterns() {
        let config = PatternsConfig::default();
        let cases = [
            (PatternType::Cnpj, "11.222.333/0001-81", true),
            (PatternType::Cnpj, "11222333000181", true),
            (PatternType::Cnpj, "11.222.333/0001-82", false),
            (PatternType::Cnpj, "11-222-333-0001-81", false),
            (PatternType::Cpf, "123.456.789-09", true),
            (PatternType::Cpf, "111.111.111-11", false),
            (PatternType::Email, "ana.souza@empresa.com.br", true),
            (PatternType::Email, "ana@empresa", false),
            (PatternType::Phone, "(11) 98765-4321", true),
            (PatternType::Phone, "+55 11 98765-4321", true),
            (PatternType::Phone, "3456-7890", true),
            (PatternType::Phone, "12-34", false),
            (PatternType::Cep, "01310-100", true),
            (PatternType::Cep, "01310100", true),
            (PatternType::Cep, "1310-100", false),
        ];
        for (pattern_type, value, expected) in cases {
            assert_eq!(
                config.is_valid(pattern_type, value),
                expected,
                "{pattern_type} {value}"
            );
        }
    }

    #[test]
    fn test_detect() {
        assert_eq!(PatternType::detect("CNPJ"), Some(PatternType::Cnpj));
        assert_eq!(PatternType::detect("cpf_titular"), Some(PatternType::Cpf));
        assert_eq!(PatternType::detect("e_mail"), Some(PatternType::Email));
        assert_eq!(PatternType::detect("celular"), Some(PatternType::Phone));
        assert_eq!(PatternType::detect("cep"), Some(PatternType::Cep));
        assert_eq!(PatternType::detect("endereco.cep"), Some(PatternType::Cep));
        assert_eq!(PatternType::detect("reception_date"), None);
        assert_eq!(PatternType::detect("nome"), None);
    }

    #[test]
    fn test_pattern_type_aliases() {
        assert_eq!("phone_br".parse::<PatternType>().unwrap(), PatternType::Phone);
        assert_eq!("regex".parse::<PatternType>().unwrap(), PatternType::CustomRegex);
        assert!("iban".parse::<PatternType>().is_err());
    }

    #[tokio::test]
    async fn test_cnpj_column_with_invalid_check_digit() {
        let validator = PatternsValidator::empty()
            .with_rule(explicit("cnpj", "cnpj").with_parameter("threshold", 1.0))
            .unwrap();
        let dataset = single(
            "cnpj",
            vec![
                Some("11.222.333/0001-81"),
                Some("11.444.777/0001-61"),
                Some("11.222.333/0001-80"),
                None,
            ],
        );

        let results = validator.validate_table(&dataset, "fornecedores").await.unwrap();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert!(!result.is_passed());
        assert_eq!(result.affected_rows(), 1);
        assert_eq!(result.total_rows(), 4);
        assert_eq!(result.detail("missing_count").unwrap(), 1);
        assert_eq!(
            result.detail("invalid_samples").unwrap(),
            &serde_json::json!(["11.222.333/0001-80"])
        );
    }

    #[tokio::test]
    async fn test_threshold_tolerates_some_invalid_values() {
        let mut values = vec![Some("01310-100"); 19];
        values.push(Some("abc"));
        let dataset = single("cep", values);

        let validator = PatternsValidator::empty().with_rule(explicit("cep", "cep")).unwrap();
        let result = &validator.validate_table(&dataset, "enderecos").await.unwrap()[0];
        assert!(result.is_passed());
        assert_eq!(result.detail("valid_fraction").unwrap(), 0.95);
        assert_eq!(result.affected_rows(), 1);
    }

    #[tokio::test]
    async fn test_disallowed_nulls_count_as_invalid() {
        let dataset = single("email", vec![Some("a@b.com"), None, Some(" ")]);
        let validator = PatternsValidator::empty()
            .with_rule(explicit("email", "email").with_parameter("allow_nulls", false))
            .unwrap();

        let result = &validator.validate_table(&dataset, "t").await.unwrap()[0];
        assert!(!result.is_passed());
        assert_eq!(result.detail("invalid_count").unwrap(), 2);
        assert_eq!(result.detail("missing_count").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_values_are_trimmed() {
        let dataset = single("cpf", vec![Some("  123.456.789-09 ")]);
        let validator = PatternsValidator::empty().with_rule(explicit("cpf", "cpf")).unwrap();
        assert!(validator.validate_table(&dataset, "t").await.unwrap()[0].is_passed());
    }

    #[tokio::test]
    async fn test_custom_regex() {
        let validator = PatternsValidator::empty()
            .with_rule(
                explicit("custom_regex", "sku")
                    .with_parameter("regex_pattern", r"^[A-Z]{3}-\d{3}$")
                    .with_parameter("threshold", 1.0),
            )
            .unwrap();
        let dataset = single("sku", vec![Some("ABC-123"), Some("abc-123")]);

        let result = &validator.validate_table(&dataset, "produtos").await.unwrap()[0];
        assert!(!result.is_passed());
        assert_eq!(result.detail("pattern").unwrap(), r"^[A-Z]{3}-\d{3}$");
    }

    #[test]
    fn test_custom_regex_requires_pattern() {
        let mut validator = PatternsValidator::new();
        let err = validator
            .add_rule(
                ValidationRule::new("sku", Severity::Error).with_parameter("pattern_type", "regex"),
            )
            .unwrap_err();
        assert!(err.to_string().contains("regex_pattern"));
        assert_eq!(validator.rules().len(), 1);
    }

    #[tokio::test]
    async fn test_auto_detect_runs_matched_columns_only() {
        let dataset = Dataset::try_from_columns(vec![
            (
                "nome",
                Arc::new(StringArray::from(vec!["Ana", "Bruno"])) as ArrayRef,
            ),
            (
                "email",
                Arc::new(StringArray::from(vec!["ana@x.com", "bruno@x"])) as ArrayRef,
            ),
            (
                "cpf",
                Arc::new(StringArray::from(vec!["123.456.789-09", "987.654.321-00"])) as ArrayRef,
            ),
        ])
        .unwrap();

        let results = PatternsValidator::new()
            .validate_table(&dataset, "clientes")
            .await
            .unwrap();
        let columns: Vec<_> = results.iter().filter_map(|r| r.column_name()).collect();
        assert_eq!(columns, vec!["email", "cpf"]);
        assert!(!results[0].is_passed());
        assert!(results[1].is_passed());
        assert!(results.iter().all(|r| r.severity() == Severity::Info));
    }

    #[tokio::test]
    async fn test_auto_detect_without_matches_reports_once() {
        let dataset = single("nome", vec![Some("Ana")]);
        let results = PatternsValidator::new()
            .validate_table(&dataset, "t")
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_passed());
        assert_eq!(results[0].detail("pattern_type").unwrap(), "none");
    }
}
