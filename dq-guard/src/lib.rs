//! # dq-guard - Rule-based data quality validation
//!
//! dq-guard checks tabular data held in Apache Arrow record batches against
//! configurable rules and reports one [`ValidationResult`](core::ValidationResult)
//! per rule and column. It ships four validators:
//!
//! - **Completeness**: share of non-missing values per column
//! - **Duplicates**: repeated single or composite keys, with explicit null handling
//! - **Patterns**: CNPJ, CPF, e-mail, phone and CEP formats, including
//!   check-digit arithmetic, or any custom regex
//! - **Integrity**: foreign keys against a parent table served by a
//!   [`ReferenceSource`](sources::ReferenceSource)
//!
//! ## Quick Start
//!
//! ```rust
//! use arrow::array::{ArrayRef, Int64Array, StringArray};
//! use dq_guard::prelude::*;
//! use dq_guard::validators::{CompletenessValidator, DuplicatesValidator, PatternsValidator};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> dq_guard::error::Result<()> {
//! let dataset = Dataset::try_from_columns(vec![
//!     ("id", Arc::new(Int64Array::from(vec![1, 2, 2])) as ArrayRef),
//!     (
//!         "cnpj",
//!         Arc::new(StringArray::from(vec![
//!             Some("11.222.333/0001-81"),
//!             Some("11.444.777/0001-61"),
//!             None,
//!         ])) as ArrayRef,
//!     ),
//! ])?;
//!
//! let engine = ValidationEngine::new()
//!     .with_validator(Arc::new(CompletenessValidator::new()))
//!     .with_validator(Arc::new(DuplicatesValidator::new()))
//!     .with_validator(Arc::new(PatternsValidator::new()));
//!
//! let run = engine.validate_data(&dataset, "empresas").await?;
//! for result in run.results() {
//!     println!("[{}] {}: {}", result.severity(), result.rule_name(), result.message());
//! }
//! assert!(!run.summary().passes_at(Severity::Error));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`core`**: rules, results, the [`Validator`](core::Validator) contract
//!   and the [`ValidationEngine`](core::ValidationEngine)
//! - **`validators`**: the built-in validators
//! - **`checkdigit`**: CPF and CNPJ check-digit arithmetic
//! - **`dataset`**: the read-only, optionally sampled view validators read
//! - **`sources`**: parent-key lookups for integrity checks (in memory or
//!   through DataFusion)
//! - **`security`**: identifier and regex hardening
//! - **`logging`**: `tracing` subscriber setup
//!
//! ## Failure model
//!
//! Bad rule parameters are rejected when the rule is added. Data problems
//! are failed results. A validator that errors, panics or times out is
//! contained by the engine and reported as a single CRITICAL result, so one
//! broken check never hides the others.

pub mod checkdigit;
pub mod core;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod security;
pub mod sources;
pub mod validators;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
