//! Property-based tests for the validators and check-digit arithmetic.
//!
//! ## Properties
//!
//! - Completeness: the ratio is exact and a column sitting exactly on its
//!   threshold passes
//! - Duplicates: results do not depend on row order
//! - Check digits: completing any non-degenerate base yields a valid
//!   identifier, altering a check digit invalidates it, and repeated-digit
//!   identifiers are always rejected
//! - Idempotence: validating the same data twice gives the same results,
//!   details included, for completeness, duplicates and patterns

use arrow::array::{ArrayRef, Int64Array, StringArray, UInt32Array};
use dq_guard::checkdigit::{Cnpj, Cpf, IdentifierFormat};
use dq_guard::core::{Severity, ValidationRule, Validator};
use dq_guard::dataset::Dataset;
use dq_guard::validators::{CompletenessValidator, DuplicatesValidator, PatternsValidator};
use proptest::prelude::*;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

fn email_column(missing: &[bool]) -> Dataset {
    let values: Vec<Option<String>> = missing
        .iter()
        .enumerate()
        .map(|(i, &m)| (!m).then(|| format!("u{i}@example.com")))
        .collect();
    Dataset::try_from_columns(vec![(
        "email",
        Arc::new(StringArray::from(values)) as ArrayRef,
    )])
    .unwrap()
}

fn bump_digit(identifier: &str, position: usize, bump: u8) -> String {
    identifier
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            if i == position {
                char::from(b'0' + (b - b'0' + bump) % 10)
            } else {
                char::from(b)
            }
        })
        .collect()
}

fn digits(len: usize) -> impl Strategy<Value = String> {
    proptest::collection::vec(0u8..10, len)
        .prop_filter("all digits equal", |d| d.windows(2).any(|w| w[0] != w[1]))
        .prop_map(|d| d.into_iter().map(|x| char::from(b'0' + x)).collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn completeness_ratio_is_exact(missing in proptest::collection::vec(any::<bool>(), 1..200)) {
        let rt = runtime();
        let dataset = email_column(&missing);
        let expected_missing = missing.iter().filter(|&&m| m).count() as u64;
        let total = missing.len() as u64;

        let validator = CompletenessValidator::empty()
            .with_rule(ValidationRule::new("r", Severity::Warning).with_parameter("threshold", 0.0))
            .unwrap();
        let results = rt.block_on(validator.validate_table(&dataset, "t")).unwrap();

        prop_assert_eq!(results[0].affected_rows(), expected_missing);
        prop_assert_eq!(results[0].total_rows(), total);
        prop_assert!(results[0].is_passed());
    }

    #[test]
    fn completeness_exact_boundary_passes(total in 1usize..400, missing_seed in any::<usize>()) {
        let rt = runtime();
        let missing = missing_seed % (total + 1);
        let flags: Vec<bool> = (0..total).map(|i| i < missing).collect();
        let threshold = (total - missing) as f64 / total as f64;

        let validator = CompletenessValidator::empty()
            .with_rule(
                ValidationRule::new("boundary", Severity::Warning)
                    .with_parameter("threshold", threshold),
            )
            .unwrap();
        let results = rt.block_on(validator.validate_table(&email_column(&flags), "t")).unwrap();
        prop_assert!(results[0].is_passed());
    }

    #[test]
    fn completeness_one_past_boundary_fails(total in 1usize..400, percent in 0usize..=100) {
        let rt = runtime();
        let threshold = percent as f64 / 100.0;
        let allowed = total * (100 - percent) / 100;

        let validator = CompletenessValidator::empty()
            .with_rule(
                ValidationRule::new("boundary", Severity::Warning)
                    .with_parameter("threshold", threshold),
            )
            .unwrap();
        let run = |missing: usize| {
            let flags: Vec<bool> = (0..total).map(|i| i < missing).collect();
            rt.block_on(validator.validate_table(&email_column(&flags), "t"))
                .unwrap()[0]
                .is_passed()
        };

        prop_assert!(run(allowed));
        if allowed < total {
            prop_assert!(!run(allowed + 1));
        }
    }

    #[test]
    fn duplicates_ignore_row_order(
        values in proptest::collection::vec(proptest::option::of(0i64..8), 1..60),
        seed in any::<u64>(),
    ) {
        let rt = runtime();
        let forward = Dataset::try_from_columns(vec![(
            "k",
            Arc::new(Int64Array::from(values.clone())) as ArrayRef,
        )])
        .unwrap();

        let n = values.len() as u64;
        let mut order: Vec<u32> = (0..values.len() as u32).collect();
        order.sort_by_key(|&i| (u64::from(i).wrapping_mul(seed | 1)) % (n * 7919 + 1));
        let shuffled = Dataset::new(
            arrow::compute::take_record_batch(forward.batch(), &UInt32Array::from(order)).unwrap(),
        );

        for mode in ["exclude", "include", "distinct"] {
            let validator = DuplicatesValidator::empty()
                .with_rule(
                    ValidationRule::new("k_unique", Severity::Error)
                        .with_parameter("columns", "k")
                        .with_parameter("null_handling", mode),
                )
                .unwrap();
            let a = &rt.block_on(validator.validate_table(&forward, "t")).unwrap()[0];
            let b = &rt.block_on(validator.validate_table(&shuffled, "t")).unwrap()[0];

            prop_assert_eq!(a.is_passed(), b.is_passed());
            prop_assert_eq!(a.affected_rows(), b.affected_rows());
            prop_assert_eq!(a.total_rows(), b.total_rows());
            prop_assert_eq!(a.detail("sample_duplicates"), b.detail("sample_duplicates"));
        }
    }

    #[test]
    fn completed_cnpj_is_valid(base in digits(12), check in 12usize..14, bump in 1u8..10) {
        let full = Cnpj.complete(&base).unwrap();
        prop_assert!(Cnpj.is_valid(&full));
        prop_assert!(!Cnpj.is_valid(&bump_digit(&full, check, bump)));
    }

    #[test]
    fn completed_cpf_is_valid(base in digits(9), check in 9usize..11, bump in 1u8..10) {
        let full = Cpf.complete(&base).unwrap();
        prop_assert!(Cpf.is_valid(&full));
        prop_assert!(!Cpf.is_valid(&bump_digit(&full, check, bump)));
    }

    #[test]
    fn repeated_digits_never_validate(d in 0u8..10) {
        let c = char::from(b'0' + d);
        prop_assert!(!Cpf.is_valid(&c.to_string().repeat(11)));
        prop_assert!(!Cnpj.is_valid(&c.to_string().repeat(14)));
    }

    #[test]
    fn validation_is_idempotent(
        rows in proptest::collection::vec(
            (proptest::option::of(0i64..6), proptest::option::of("[a-c]{1,2}(@x\\.com)?")),
            0..100,
        ),
    ) {
        let rt = runtime();
        let (keys, emails): (Vec<Option<i64>>, Vec<Option<String>>) = rows.into_iter().unzip();
        let dataset = Dataset::try_from_columns(vec![
            ("codigo", Arc::new(Int64Array::from(keys)) as ArrayRef),
            ("email", Arc::new(StringArray::from(emails)) as ArrayRef),
        ])
        .unwrap();

        let composite = DuplicatesValidator::empty()
            .with_rule(
                ValidationRule::new("codigo_email", Severity::Error)
                    .with_parameter("columns", vec!["codigo", "email"])
                    .with_parameter("null_handling", "include"),
            )
            .unwrap();
        let validators: Vec<Box<dyn Validator>> = vec![
            Box::new(CompletenessValidator::new()),
            Box::new(DuplicatesValidator::new()),
            Box::new(composite),
            Box::new(PatternsValidator::new()),
        ];

        for validator in &validators {
            let first = rt.block_on(validator.validate_table(&dataset, "t")).unwrap();
            let second = rt.block_on(validator.validate_table(&dataset, "t")).unwrap();

            prop_assert_eq!(first.len(), second.len());
            for (a, b) in first.iter().zip(&second) {
                prop_assert_eq!(a.rule_name(), b.rule_name());
                prop_assert_eq!(a.column_name(), b.column_name());
                prop_assert_eq!(a.is_passed(), b.is_passed());
                prop_assert_eq!(a.affected_rows(), b.affected_rows());
                prop_assert_eq!(a.total_rows(), b.total_rows());
                prop_assert_eq!(a.message(), b.message());
                prop_assert_eq!(a.details(), b.details());
            }
        }
    }
}
