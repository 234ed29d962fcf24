//! Error types for the dq-guard validation framework.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`DqError`]. The variants follow the error taxonomy of the framework:
//!
//! - configuration errors ([`DqError::Configuration`], [`DqError::InvalidRule`])
//!   are raised synchronously when a rule is registered;
//! - evaluation failures ([`DqError::Evaluation`], [`DqError::ReferenceSource`],
//!   [`DqError::Timeout`], engine errors) are contained by the
//!   [`ValidationEngine`](crate::core::ValidationEngine) and surfaced as
//!   CRITICAL results;
//! - precondition violations ([`DqError::InvalidInput`]) abort a run outright.

use thiserror::Error;

/// The main error type for dq-guard.
#[derive(Error, Debug)]
pub enum DqError {
    /// Malformed configuration outside of a specific rule.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A rule's parameters are missing, mistyped or out of range.
    #[error("Invalid rule '{rule}': {message}")]
    InvalidRule {
        /// Name of the offending rule
        rule: String,
        /// What is wrong with it
        message: String,
    },

    /// A required column is not present in a dataset or reference table.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// A validator failed while processing a table.
    #[error("Validator '{validator}' failed: {message}")]
    Evaluation {
        /// Name of the failing validator
        validator: String,
        /// Detailed error message
        message: String,
    },

    /// The reference (parent-key) source could not answer a query.
    #[error("Reference source error: {message}")]
    ReferenceSource {
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An operation exceeded its time budget.
    #[error("Timed out after {timeout_ms}ms while {operation}")]
    Timeout {
        /// What was being attempted
        operation: String,
        /// The budget that was exceeded
        timeout_ms: u64,
    },

    /// A caller precondition was violated.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An identifier or pattern was rejected by the security checks.
    #[error("Security error: {0}")]
    SecurityError(String),

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, DqError>`.
pub type Result<T> = std::result::Result<T, DqError>;

impl DqError {
    /// Creates an invalid-rule error for the named rule.
    pub fn invalid_rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Creates an evaluation error for the named validator.
    pub fn evaluation(validator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Evaluation {
            validator: validator.into(),
            message: message.into(),
        }
    }

    /// Creates a reference source error without an underlying cause.
    pub fn reference_source(message: impl Into<String>) -> Self {
        Self::ReferenceSource {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a reference source error wrapping an underlying cause.
    pub fn reference_source_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::ReferenceSource {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Returns true for errors raised while registering or parsing configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DqError::Configuration(_) | DqError::InvalidRule { .. } | DqError::SecurityError(_)
        )
    }
}

/// Extension trait for adding context to errors.
///
/// DataFusion and Arrow failures become [`DqError::ReferenceSource`] with the
/// original error kept as the cause; timeouts, configuration and column
/// errors pass through unchanged.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<DqError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| wrap(msg, e.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| wrap(&f(), e.into()))
    }
}

fn wrap(msg: &str, base: DqError) -> DqError {
    match base {
        DqError::ReferenceSource { message, source } => DqError::ReferenceSource {
            message: format!("{msg}: {message}"),
            source,
        },
        DqError::DataFusion(e) => DqError::reference_source_with_source(msg, Box::new(e)),
        DqError::Arrow(e) => DqError::reference_source_with_source(msg, Box::new(e)),
        DqError::Internal(inner) => DqError::Internal(format!("{msg}: {inner}")),
        other => other,
    }
}
