//! Validation rule configuration.

use super::Severity;
use crate::error::{DqError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named, configured check that a validator may apply.
///
/// Rules are plain configuration values. A validator parses a rule's
/// [`RuleParameters`] into its own typed configuration when the rule is
/// registered, so malformed parameters are reported immediately rather than
/// at evaluation time.
///
/// # Examples
///
/// ```rust
/// use dq_guard::core::{Severity, ValidationRule};
///
/// let rule = ValidationRule::new("email_completeness", Severity::Error)
///     .with_description("E-mail must be filled for 99% of customers")
///     .with_parameter("columns", vec!["email"])
///     .with_parameter("threshold", 0.99);
///
/// assert_eq!(rule.name(), "email_completeness");
/// assert_eq!(rule.parameters().get_f64("threshold").unwrap(), Some(0.99));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRule {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    severity: Severity,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(default)]
    parameters: RuleParameters,
}

fn enabled_by_default() -> bool {
    true
}

impl ValidationRule {
    /// Creates an enabled rule with no description and no parameters.
    pub fn new(name: impl Into<String>, severity: Severity) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            severity,
            enabled: true,
            parameters: RuleParameters::default(),
        }
    }

    /// Sets the human-readable description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets a single parameter, replacing any previous value for the key.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.0.insert(key.into(), value.into());
        self
    }

    /// Replaces the whole parameter map.
    pub fn with_parameters(mut self, parameters: RuleParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Enables or disables the rule. Disabled rules stay registered but are not evaluated.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The rule's unique name within its validator.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rule's description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The severity assigned to failures of this rule.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Whether the rule is evaluated.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The rule's raw parameters.
    pub fn parameters(&self) -> &RuleParameters {
        &self.parameters
    }
}

/// String-keyed rule parameters with typed, fail-fast accessors.
///
/// Every accessor returns `Ok(None)` when the key is absent and
/// [`DqError::InvalidRule`] when the key is present with the wrong type.
/// The rule name used in error messages is supplied through
/// [`RuleParameters::reader`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleParameters(Map<String, Value>);

impl RuleParameters {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value for a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns true if the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the parameter names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Inserts a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Binds the parameters to a rule name for error reporting.
    pub fn reader<'a>(&'a self, rule: &'a str) -> ParameterReader<'a> {
        ParameterReader { rule, params: self }
    }

    /// Reads a number.
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        self.reader("<unnamed>").f64(key)
    }

    /// Reads a boolean.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        self.reader("<unnamed>").bool(key)
    }

    /// Reads a string.
    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        self.reader("<unnamed>").str(key)
    }

    /// Reads a column list given either as one string or an array of strings.
    pub fn get_columns(&self, key: &str) -> Result<Option<Vec<String>>> {
        self.reader("<unnamed>").columns(key)
    }
}

impl From<Map<String, Value>> for RuleParameters {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Typed view over [`RuleParameters`] that names the owning rule in errors.
#[derive(Debug, Clone, Copy)]
pub struct ParameterReader<'a> {
    rule: &'a str,
    params: &'a RuleParameters,
}

impl<'a> ParameterReader<'a> {
    fn mistyped(&self, key: &str, expected: &str, found: &Value) -> DqError {
        DqError::invalid_rule(
            self.rule,
            format!("parameter '{key}' must be {expected}, got {found}"),
        )
    }

    /// Fails with a configuration error when the key is absent.
    pub fn required<T>(&self, key: &str, value: Option<T>) -> Result<T> {
        value.ok_or_else(|| {
            DqError::invalid_rule(self.rule, format!("missing required parameter '{key}'"))
        })
    }

    /// Reads a number.
    pub fn f64(&self, key: &str) -> Result<Option<f64>> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.mistyped(key, "a number", value)),
        }
    }

    /// Reads a non-negative integer.
    pub fn u64(&self, key: &str) -> Result<Option<u64>> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.mistyped(key, "a non-negative integer", value)),
        }
    }

    /// Reads a boolean.
    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.mistyped(key, "a boolean", value)),
        }
    }

    /// Reads a string.
    pub fn str(&self, key: &str) -> Result<Option<&'a str>> {
        match self.params.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| self.mistyped(key, "a string", value)),
        }
    }

    /// Reads a column list given either as one string or an array of strings.
    ///
    /// An empty list is rejected: a rule that names no columns is ambiguous.
    pub fn columns(&self, key: &str) -> Result<Option<Vec<String>>> {
        let columns = match self.params.get(key) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(column)) => vec![column.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.mistyped(key, "a list of column names", item))
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => return Err(self.mistyped(key, "a column name or list", other)),
        };

        if columns.is_empty() {
            return Err(DqError::invalid_rule(
                self.rule,
                format!("parameter '{key}' must name at least one column"),
            ));
        }
        Ok(Some(columns))
    }

    /// Reads a ratio in `[0, 1]`, falling back to `default` when absent.
    pub fn threshold(&self, key: &str, default: f64) -> Result<f64> {
        let value = self.f64(key)?.unwrap_or(default);
        if !(0.0..=1.0).contains(&value) {
            return Err(DqError::invalid_rule(
                self.rule,
                format!("{key} must be between 0.0 and 1.0, got {value}"),
            ));
        }
        Ok(value)
    }
}
