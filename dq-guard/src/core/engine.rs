//! Orchestration of registered validators over one dataset.

use super::{Severity, ValidationResult, ValidationSummary, Validator};
use crate::dataset::Dataset;
use crate::prelude::*;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, instrument, warn};

/// Engine settings.
///
/// Deserialises with every field optional, so a partial document only
/// overrides what it names.
///
/// ```rust
/// use dq_guard::core::EngineConfig;
///
/// let config: EngineConfig = serde_json::from_str(r#"{"sample_seed": 7}"#).unwrap();
/// assert_eq!(config.sampling_threshold, 10_000);
/// assert_eq!(config.sample_seed, Some(7));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Datasets with more rows than this are sampled
    pub sampling_threshold: usize,
    /// Rows kept when sampling
    pub sample_size: usize,
    /// Fixed seed for reproducible samples
    pub sample_seed: Option<u64>,
    /// Wall-clock bound per validator, in milliseconds
    pub validator_timeout_ms: Option<u64>,
    /// Run validators concurrently
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sampling_threshold: 10_000,
            sample_size: 10_000,
            sample_seed: None,
            validator_timeout_ms: None,
            parallel: true,
        }
    }
}

impl EngineConfig {
    pub fn with_sampling_threshold(mut self, rows: usize) -> Self {
        self.sampling_threshold = rows;
        self
    }

    pub fn with_sample_size(mut self, rows: usize) -> Self {
        self.sample_size = rows;
        self
    }

    pub fn with_sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    pub fn with_validator_timeout(mut self, timeout: Duration) -> Self {
        self.validator_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The per-validator bound as a [`Duration`].
    pub fn validator_timeout(&self) -> Option<Duration> {
        self.validator_timeout_ms.map(Duration::from_millis)
    }

    /// Checks the settings for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.sample_size == 0 {
            return Err(DqError::Configuration(
                "sample_size must be greater than zero".to_string(),
            ));
        }
        if self.validator_timeout_ms == Some(0) {
            return Err(DqError::Configuration(
                "validator_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// How much of the input a run actually looked at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingInfo {
    /// Rows in the dataset handed to the engine
    pub source_rows: usize,
    /// Rows every validator saw
    pub analyzed_rows: usize,
    /// Whether a sample replaced the full dataset
    pub is_sampled: bool,
    /// `analyzed_rows / source_rows`, `1.0` for an empty dataset
    pub sampling_ratio: f64,
    /// Seed used for the sample, when one was configured
    pub seed: Option<u64>,
}

impl SamplingInfo {
    fn full(rows: usize) -> Self {
        Self {
            source_rows: rows,
            analyzed_rows: rows,
            is_sampled: false,
            sampling_ratio: 1.0,
            seed: None,
        }
    }
}

/// The outcome of one [`ValidationEngine::validate_data`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRun {
    table_name: String,
    results: Vec<ValidationResult>,
    sampling: SamplingInfo,
    started_at: DateTime<Utc>,
    duration_ms: u64,
}

impl ValidationRun {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Results in validator registration order.
    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn sampling(&self) -> &SamplingInfo {
        &self.sampling
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn summary(&self) -> ValidationSummary {
        ValidationSummary::from_results(&self.results)
    }

    pub fn into_results(self) -> Vec<ValidationResult> {
        self.results
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Error,
    Panic,
    Timeout,
}

impl FailureKind {
    fn as_str(self) -> &'static str {
        match self {
            FailureKind::Error => "error",
            FailureKind::Panic => "panic",
            FailureKind::Timeout => "timeout",
        }
    }
}

type Outcome = std::result::Result<Vec<ValidationResult>, (FailureKind, String)>;

/// Runs registered validators against a dataset and merges their results.
///
/// Validators are shared (`Arc`) and kept in registration order. Registering
/// the same instance twice is a no-op. Each call to
/// [`validate_data`](Self::validate_data) samples the input at most once and
/// hands the same view to every validator, each in its own tokio task. A
/// validator that returns an error, panics or exceeds its time budget is
/// replaced in the output by a single CRITICAL `<validator>_error` result;
/// the other validators are unaffected.
///
/// # Examples
///
/// ```rust
/// use arrow::array::{ArrayRef, StringArray};
/// use dq_guard::core::ValidationEngine;
/// use dq_guard::dataset::Dataset;
/// use dq_guard::validators::CompletenessValidator;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let dataset = Dataset::try_from_columns(vec![(
///     "email",
///     Arc::new(StringArray::from(vec![Some("a@b.com"), None])) as ArrayRef,
/// )])
/// .unwrap();
///
/// let mut engine = ValidationEngine::new();
/// engine.register_validator(Arc::new(CompletenessValidator::new()));
///
/// let run = engine.validate_data(&dataset, "clientes").await.unwrap();
/// assert_eq!(run.results().len(), 1);
/// assert!(!run.results()[0].is_passed());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    config: EngineConfig,
    validators: Vec<Arc<dyn Validator>>,
}

impl ValidationEngine {
    /// Creates an engine with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`DqError::Configuration`] when `config` fails
    /// [`EngineConfig::validate`].
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            validators: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Appends a validator. Returns `false` if this exact instance is
    /// already registered, in which case nothing changes.
    pub fn register_validator(&mut self, validator: Arc<dyn Validator>) -> bool {
        if self.validators.iter().any(|v| Arc::ptr_eq(v, &validator)) {
            debug!(
                validator.name = %validator.name(),
                "Validator instance already registered"
            );
            return false;
        }
        debug!(validator.name = %validator.name(), "Registered validator");
        self.validators.push(validator);
        true
    }

    /// Builder-style [`register_validator`](Self::register_validator).
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.register_validator(validator);
        self
    }

    /// Registered validators in registration order.
    pub fn validators(&self) -> &[Arc<dyn Validator>] {
        &self.validators
    }

    /// Runs every registered validator.
    ///
    /// # Errors
    ///
    /// Only precondition violations fail the call: a blank `table_name`
    /// yields [`DqError::InvalidInput`]. Validator failures are reported as
    /// CRITICAL results inside the returned run.
    pub async fn validate_data(&self, dataset: &Dataset, table_name: &str) -> Result<ValidationRun> {
        let selected: Vec<Arc<dyn Validator>> = self.validators.to_vec();
        self.run(selected, dataset, table_name).await
    }

    /// Runs only the validators whose name is in `names`. Unknown names are
    /// ignored; registration order still decides result order.
    pub async fn validate_with<S: AsRef<str>>(
        &self,
        dataset: &Dataset,
        table_name: &str,
        names: &[S],
    ) -> Result<ValidationRun> {
        let selected: Vec<Arc<dyn Validator>> = self
            .validators
            .iter()
            .filter(|v| names.iter().any(|n| n.as_ref() == v.name()))
            .cloned()
            .collect();
        self.run(selected, dataset, table_name).await
    }

    #[instrument(skip(self, validators, dataset), fields(
        table.name = %table_name,
        data.rows = dataset.num_rows(),
        engine.validators = validators.len(),
        engine.parallel = self.config.parallel
    ))]
    async fn run(
        &self,
        validators: Vec<Arc<dyn Validator>>,
        dataset: &Dataset,
        table_name: &str,
    ) -> Result<ValidationRun> {
        if table_name.trim().is_empty() {
            return Err(DqError::InvalidInput(
                "table name must not be empty".to_string(),
            ));
        }

        let started_at = Utc::now();
        let start = Instant::now();
        let (view, sampling) = self.prepare(dataset);

        info!(
            table.name = %table_name,
            engine.validators = validators.len(),
            sampling.source_rows = sampling.source_rows,
            sampling.analyzed_rows = sampling.analyzed_rows,
            sampling.is_sampled = sampling.is_sampled,
            "Starting validation run"
        );

        let timeout = self.config.validator_timeout();
        let outcomes: Vec<Outcome> = if self.config.parallel {
            let handles: Vec<_> = validators
                .iter()
                .map(|v| spawn_validator(Arc::clone(v), view.clone(), table_name, timeout))
                .collect();
            join_all(handles)
                .await
                .into_iter()
                .map(flatten_join)
                .collect()
        } else {
            let mut outcomes = Vec::with_capacity(validators.len());
            for v in &validators {
                let handle = spawn_validator(Arc::clone(v), view.clone(), table_name, timeout);
                outcomes.push(flatten_join(handle.await));
            }
            outcomes
        };

        let mut results = Vec::new();
        for (validator, outcome) in validators.iter().zip(outcomes) {
            match outcome {
                Ok(batch) => results.extend(batch),
                Err((kind, message)) => {
                    error!(
                        validator.name = %validator.name(),
                        table.name = %table_name,
                        failure.kind = kind.as_str(),
                        error = %message,
                        "Validator failed"
                    );
                    results.push(failure_result(
                        validator.name(),
                        table_name,
                        kind,
                        &message,
                        view.num_rows(),
                    ));
                }
            }
        }

        for result in results.iter().filter(|r| !r.is_passed()) {
            warn!(
                rule.name = %result.rule_name(),
                table.name = %table_name,
                column.name = ?result.column_name(),
                result.severity = %result.severity(),
                result.affected_rows = result.affected_rows(),
                result.message = %result.message(),
                "Validation failed"
            );
        }

        let run = ValidationRun {
            table_name: table_name.to_string(),
            results,
            sampling,
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        let summary = run.summary();
        info!(
            table.name = %table_name,
            run.total = summary.total,
            run.passed = summary.passed,
            run.failed = summary.failed,
            run.critical = summary.critical_issues,
            run.duration_ms = run.duration_ms,
            "Validation run completed"
        );

        Ok(run)
    }

    fn prepare(&self, dataset: &Dataset) -> (Dataset, SamplingInfo) {
        let rows = dataset.num_rows();
        if rows <= self.config.sampling_threshold || self.config.sample_size >= rows {
            return (dataset.clone(), SamplingInfo::full(rows));
        }

        let mut rng = match self.config.sample_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let sampled = dataset.sample(self.config.sample_size, &mut rng);
        let analyzed = sampled.num_rows();

        debug!(
            sampling.source_rows = rows,
            sampling.analyzed_rows = analyzed,
            sampling.seed = ?self.config.sample_seed,
            "Sampled dataset"
        );

        let info = SamplingInfo {
            source_rows: rows,
            analyzed_rows: analyzed,
            is_sampled: true,
            sampling_ratio: analyzed as f64 / rows as f64,
            seed: self.config.sample_seed,
        };
        (sampled, info)
    }
}

fn spawn_validator(
    validator: Arc<dyn Validator>,
    dataset: Dataset,
    table_name: &str,
    timeout: Option<Duration>,
) -> JoinHandle<Outcome> {
    let table_name = table_name.to_string();
    tokio::spawn(async move {
        let start = Instant::now();
        let evaluation = validator.validate_table(&dataset, &table_name);
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, evaluation).await {
                Ok(result) => result.map_err(|e| (FailureKind::Error, e.to_string())),
                Err(_) => Err((
                    FailureKind::Timeout,
                    format!("exceeded {}ms", limit.as_millis()),
                )),
            },
            None => evaluation
                .await
                .map_err(|e| (FailureKind::Error, e.to_string())),
        };
        debug!(
            validator.name = %validator.name(),
            validator.duration_ms = start.elapsed().as_millis() as u64,
            validator.ok = outcome.is_ok(),
            "Validator finished"
        );
        outcome
    })
}

fn flatten_join(joined: std::result::Result<Outcome, JoinError>) -> Outcome {
    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => Err((FailureKind::Panic, panic_message(e))),
        Err(e) => Err((FailureKind::Error, e.to_string())),
    }
}

fn panic_message(e: JoinError) -> String {
    let payload = e.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

fn failure_result(
    validator: &str,
    table_name: &str,
    kind: FailureKind,
    message: &str,
    rows: usize,
) -> ValidationResult {
    ValidationResult::builder(format!("{validator}_error"), Severity::Critical, table_name)
        .with_detail("validator", validator)
        .with_detail("error", message)
        .with_detail("failure_kind", kind.as_str())
        .with_rows(0, rows as u64)
        .failed(format!("Validator '{validator}' did not complete: {message}"))
}
