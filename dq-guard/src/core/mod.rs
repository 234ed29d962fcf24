//! Core types of the validation framework.
//!
//! ## Overview
//!
//! - **[`ValidationRule`]**: a named, severity-tagged unit of configuration
//!   owned by one validator
//! - **[`Validator`]**: the strategy contract every check implements
//! - **[`ValidationResult`]**: one immutable outcome of evaluating a rule
//! - **[`ValidationEngine`]**: runs validators over a dataset and merges
//!   their results, turning validator failures into CRITICAL results
//!
//! ## Architecture
//!
//! ```text
//! ValidationEngine
//!     ├── CompletenessValidator ── default_completeness, ...
//!     ├── DuplicatesValidator  ── default_uniqueness, ...
//!     └── IntegrityValidator   ── pedidos_clientes ──> ReferenceSource
//!              │
//!              ▼
//!     ValidationRun { results, sampling, summary() }
//! ```

pub mod engine;
pub mod level;
pub mod result;
pub mod rule;
pub mod validator;

pub use engine::{EngineConfig, SamplingInfo, ValidationEngine, ValidationRun};
pub use level::Severity;
pub use result::{ResultBuilder, ResultDetails, ValidationResult, ValidationSummary};
pub use rule::{ParameterReader, RuleParameters, ValidationRule};
pub use validator::{RuleRegistry, Validator};
