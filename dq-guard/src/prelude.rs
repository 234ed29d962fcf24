//! Prelude for commonly used types and traits in dq-guard.

pub use crate::core::{
    Severity, ValidationEngine, ValidationResult, ValidationRule, ValidationRun, Validator,
};
pub use crate::dataset::Dataset;
pub use crate::error::{DqError, ErrorContext, Result};
