//! Built-in validators.
//!
//! | Validator | Default rule | Severity | Checks |
//! |---|---|---|---|
//! | [`CompletenessValidator`] | `default_completeness` | WARNING | fraction of non-missing values per column |
//! | [`DuplicatesValidator`] | `default_uniqueness` | ERROR | repeated single-column or composite keys |
//! | [`PatternsValidator`] | `default_pattern_check` | INFO | format conformance, CNPJ/CPF check digits |
//! | [`IntegrityValidator`] | none | ERROR | foreign keys present in the parent table |
//!
//! Every validator parses its rules when they are added, so a rule with bad
//! parameters is rejected by `add_rule` rather than at evaluation time.

pub mod completeness;
pub mod duplicates;
pub mod integrity;
pub mod patterns;

pub use completeness::CompletenessValidator;
pub use duplicates::{DuplicatesValidator, NullHandling};
pub use integrity::IntegrityValidator;
pub use patterns::{PatternType, PatternsValidator};

/// Absolute tolerance used when comparing a measured ratio to its threshold.
///
/// A column that is exactly at its threshold must pass even when the ratio
/// picks up rounding error along the way.
pub const RATIO_TOLERANCE: f64 = 1e-9;

/// True when `ratio` reaches `threshold`, within [`RATIO_TOLERANCE`].
pub fn meets_threshold(ratio: f64, threshold: f64) -> bool {
    ratio + RATIO_TOLERANCE >= threshold
}

/// Ratio of `part` to `whole`, `1.0` for an empty whole.
pub(crate) fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        1.0
    } else {
        part as f64 / whole as f64
    }
}

/// Rounds to four decimals for result details.
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
