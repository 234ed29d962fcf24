//! Validation results and run summaries.

use super::{Severity, ValidationRule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Machine-readable specifics attached to a [`ValidationResult`].
pub type ResultDetails = Map<String, Value>;

/// The immutable outcome of evaluating one rule against one table (and
/// optionally one column).
///
/// Results are assembled with [`ValidationResult::for_rule`] and a few
/// consuming `with_*` steps, then sealed by [`ResultBuilder::passed`] or
/// [`ResultBuilder::failed`]. Once built there is no way to mutate them.
///
/// # Examples
///
/// ```rust
/// use dq_guard::core::{Severity, ValidationResult, ValidationRule};
///
/// let rule = ValidationRule::new("default_completeness", Severity::Warning);
/// let result = ValidationResult::for_rule(&rule, "clientes", Some("email"))
///     .with_detail("completeness_ratio", 0.97)
///     .with_rows(3, 100)
///     .passed("Column 'email' has 97.0% completeness");
///
/// assert!(result.is_passed());
/// assert_eq!(result.affected_rows(), 3);
/// assert!((result.pass_rate() - 97.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ResultRecord")]
pub struct ValidationResult {
    rule_name: String,
    table_name: String,
    column_name: Option<String>,
    severity: Severity,
    passed: bool,
    message: String,
    details: ResultDetails,
    timestamp: DateTime<Utc>,
    affected_rows: u64,
    total_rows: u64,
}

/// Wire form of [`ValidationResult`], checked before it becomes one.
#[derive(Deserialize)]
struct ResultRecord {
    rule_name: String,
    table_name: String,
    column_name: Option<String>,
    severity: Severity,
    passed: bool,
    message: String,
    details: ResultDetails,
    timestamp: DateTime<Utc>,
    affected_rows: u64,
    total_rows: u64,
}

impl TryFrom<ResultRecord> for ValidationResult {
    type Error = String;

    fn try_from(record: ResultRecord) -> Result<Self, Self::Error> {
        if record.affected_rows > record.total_rows {
            return Err(format!(
                "result '{}': affected_rows ({}) exceeds total_rows ({})",
                record.rule_name, record.affected_rows, record.total_rows
            ));
        }
        Ok(Self {
            rule_name: record.rule_name,
            table_name: record.table_name,
            column_name: record.column_name,
            severity: record.severity,
            passed: record.passed,
            message: record.message,
            details: record.details,
            timestamp: record.timestamp,
            affected_rows: record.affected_rows,
            total_rows: record.total_rows,
        })
    }
}

impl ValidationResult {
    /// Starts a result for a registered rule, inheriting its name and severity.
    pub fn for_rule(
        rule: &ValidationRule,
        table_name: impl Into<String>,
        column_name: Option<&str>,
    ) -> ResultBuilder {
        ResultBuilder::new(rule.name(), rule.severity(), table_name, column_name)
    }

    /// Starts a result that is not backed by a registered rule, such as the
    /// synthetic result the engine emits for a failed validator.
    pub fn builder(
        rule_name: impl Into<String>,
        severity: Severity,
        table_name: impl Into<String>,
    ) -> ResultBuilder {
        ResultBuilder::new(rule_name, severity, table_name, None)
    }

    /// Name of the rule that produced this result.
    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    /// Table the rule was evaluated against.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Column the rule was evaluated against, if column-scoped.
    pub fn column_name(&self) -> Option<&str> {
        self.column_name.as_deref()
    }

    /// Severity of the originating rule.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Whether the rule passed.
    pub fn is_passed(&self) -> bool {
        self.passed
    }

    /// Human-readable summary.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Machine-readable specifics.
    pub fn details(&self) -> &ResultDetails {
        &self.details
    }

    /// Shortcut for a single detail entry.
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    /// When the result was created.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Rows that violated the rule.
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// Rows the rule considered.
    pub fn total_rows(&self) -> u64 {
        self.total_rows
    }

    /// Percentage of considered rows that did not violate the rule.
    ///
    /// Defined as `100.0` when no rows were considered.
    pub fn pass_rate(&self) -> f64 {
        if self.total_rows == 0 {
            return 100.0;
        }
        self.total_rows.saturating_sub(self.affected_rows) as f64 / self.total_rows as f64 * 100.0
    }

    /// True when this is a failed result at or above the given severity.
    pub fn fails_at_least(&self, severity: Severity) -> bool {
        !self.passed && self.severity.is_at_least(severity)
    }
}

/// Staged construction of a [`ValidationResult`].
#[derive(Debug, Clone)]
#[must_use = "a result builder does nothing until `passed` or `failed` is called"]
pub struct ResultBuilder {
    rule_name: String,
    table_name: String,
    column_name: Option<String>,
    severity: Severity,
    details: ResultDetails,
    affected_rows: u64,
    total_rows: u64,
}

impl ResultBuilder {
    fn new(
        rule_name: impl Into<String>,
        severity: Severity,
        table_name: impl Into<String>,
        column_name: Option<&str>,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            table_name: table_name.into(),
            column_name: column_name.map(str::to_string),
            severity,
            details: Map::new(),
            affected_rows: 0,
            total_rows: 0,
        }
    }

    /// Adds one detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Merges a prepared detail map.
    pub fn with_details(mut self, details: ResultDetails) -> Self {
        self.details.extend(details);
        self
    }

    /// Sets the affected and total row counts.
    ///
    /// `affected_rows <= total_rows` must hold; a violating pair is a bug in
    /// the caller and widens `total_rows` in release builds.
    pub fn with_rows(mut self, affected_rows: u64, total_rows: u64) -> Self {
        debug_assert!(
            affected_rows <= total_rows,
            "affected_rows ({affected_rows}) exceeds total_rows ({total_rows})"
        );
        self.affected_rows = affected_rows;
        self.total_rows = total_rows.max(affected_rows);
        self
    }

    /// Overrides the severity inherited from the rule.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Seals a passing result.
    pub fn passed(self, message: impl Into<String>) -> ValidationResult {
        self.finish(true, message.into())
    }

    /// Seals a failing result.
    pub fn failed(self, message: impl Into<String>) -> ValidationResult {
        self.finish(false, message.into())
    }

    /// Seals a result whose outcome is computed.
    pub fn outcome(self, passed: bool, message: impl Into<String>) -> ValidationResult {
        self.finish(passed, message.into())
    }

    fn finish(self, passed: bool, message: String) -> ValidationResult {
        ValidationResult {
            rule_name: self.rule_name,
            table_name: self.table_name,
            column_name: self.column_name,
            severity: self.severity,
            passed,
            message,
            details: self.details,
            timestamp: Utc::now(),
            affected_rows: self.affected_rows,
            total_rows: self.total_rows,
        }
    }
}

/// Aggregate counts over a sequence of results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Number of results
    pub total: usize,
    /// Results that passed
    pub passed: usize,
    /// Results that failed
    pub failed: usize,
    /// Failed results with severity CRITICAL
    pub critical_issues: usize,
    /// Failed results with severity ERROR
    pub error_issues: usize,
    /// Failed results with severity WARNING
    pub warning_issues: usize,
    /// Failed results with severity INFO
    pub info_issues: usize,
}

impl ValidationSummary {
    /// Tallies a slice of results.
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            if result.is_passed() {
                summary.passed += 1;
                continue;
            }
            summary.failed += 1;
            match result.severity() {
                Severity::Critical => summary.critical_issues += 1,
                Severity::Error => summary.error_issues += 1,
                Severity::Warning => summary.warning_issues += 1,
                Severity::Info => summary.info_issues += 1,
            }
        }

        summary
    }

    /// Percentage of results that passed; `100.0` for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.passed as f64 / self.total as f64 * 100.0
        }
    }

    /// The most severe level among failed results, if any failed.
    pub fn highest_failed_severity(&self) -> Option<Severity> {
        [
            (Severity::Critical, self.critical_issues),
            (Severity::Error, self.error_issues),
            (Severity::Warning, self.warning_issues),
            (Severity::Info, self.info_issues),
        ]
        .into_iter()
        .find(|(_, count)| *count > 0)
        .map(|(severity, _)| severity)
    }

    /// True when no result failed at or above `severity`.
    pub fn passes_at(&self, severity: Severity) -> bool {
        self.highest_failed_severity()
            .map_or(true, |highest| highest < severity)
    }
}
