//! The validator contract and the per-validator rule registry.

use super::{ValidationResult, ValidationRule};
use crate::dataset::Dataset;
use crate::prelude::*;
use async_trait::async_trait;
use std::fmt::Debug;

/// A pluggable strategy that checks one aspect of data quality.
///
/// A validator owns an ordered set of [`ValidationRule`]s. Rules are parsed
/// and checked when they are added, so [`Validator::add_rule`] is the single
/// place configuration errors surface. Evaluation is read-only: a validator
/// may be shared across tasks and run against many tables at once.
///
/// Implementations must emit at least one result per enabled rule and must
/// report data problems as failed results rather than errors. An `Err` from
/// [`Validator::validate_table`] means the validator could not do its job at
/// all; the [`ValidationEngine`](super::ValidationEngine) contains it.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use dq_guard::core::{Severity, ValidationResult, ValidationRule, Validator};
/// use dq_guard::dataset::Dataset;
/// use dq_guard::error::Result;
///
/// #[derive(Debug)]
/// struct RowCountValidator {
///     rule: ValidationRule,
/// }
///
/// #[async_trait]
/// impl Validator for RowCountValidator {
///     fn name(&self) -> &str {
///         "row_count"
///     }
///
///     fn description(&self) -> &str {
///         "Fails on empty tables"
///     }
///
///     fn rules(&self) -> Vec<&ValidationRule> {
///         vec![&self.rule]
///     }
///
///     fn add_rule(&mut self, rule: ValidationRule) -> Result<()> {
///         self.rule = rule;
///         Ok(())
///     }
///
///     async fn validate_table(
///         &self,
///         dataset: &Dataset,
///         table_name: &str,
///     ) -> Result<Vec<ValidationResult>> {
///         let rows = dataset.num_rows() as u64;
///         let result = ValidationResult::for_rule(&self.rule, table_name, None)
///             .with_rows(0, rows)
///             .outcome(rows > 0, format!("{rows} rows"));
///         Ok(vec![result])
///     }
/// }
///
/// # let _ = RowCountValidator { rule: ValidationRule::new("non_empty", Severity::Error) };
/// ```
#[async_trait]
pub trait Validator: Debug + Send + Sync {
    /// Stable identifier, unique within an engine.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// The registered rules, in insertion order.
    fn rules(&self) -> Vec<&ValidationRule>;

    /// Registers a rule, replacing any rule with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`DqError::InvalidRule`] when the rule's parameters are
    /// missing, mistyped or out of range. The registry is left unchanged.
    fn add_rule(&mut self, rule: ValidationRule) -> Result<()>;

    /// Evaluates every enabled rule against `dataset`.
    async fn validate_table(
        &self,
        dataset: &Dataset,
        table_name: &str,
    ) -> Result<Vec<ValidationResult>>;
}

/// Ordered rules paired with the validator's parsed configuration for each.
///
/// Re-inserting a name replaces the entry in place, so the evaluation order
/// of a rule never changes once it has been registered.
#[derive(Debug, Clone)]
pub struct RuleRegistry<C> {
    entries: Vec<(ValidationRule, C)>,
}

impl<C> Default for RuleRegistry<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C> RuleRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a rule. Returns true when a rule was replaced.
    pub fn insert(&mut self, rule: ValidationRule, config: C) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.name() == rule.name())
        {
            Some(slot) => {
                *slot = (rule, config);
                true
            }
            None => {
                self.entries.push((rule, config));
                false
            }
        }
    }

    /// Looks a rule up by name.
    pub fn get(&self, name: &str) -> Option<(&ValidationRule, &C)> {
        self.entries
            .iter()
            .find(|(rule, _)| rule.name() == name)
            .map(|(rule, config)| (rule, config))
    }

    /// All rules in insertion order.
    pub fn rules(&self) -> Vec<&ValidationRule> {
        self.entries.iter().map(|(rule, _)| rule).collect()
    }

    /// Enabled rules with their configuration, in insertion order.
    pub fn enabled(&self) -> impl Iterator<Item = (&ValidationRule, &C)> {
        self.entries
            .iter()
            .filter(|(rule, _)| rule.is_enabled())
            .map(|(rule, config)| (rule, config))
    }

    /// Number of registered rules, enabled or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no rule is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
