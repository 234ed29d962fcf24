//! Integration tests for the built-in validators through the public API.

use arrow::array::{ArrayRef, Int64Array, StringArray};
use dq_guard::core::{Severity, ValidationRule, Validator};
use dq_guard::dataset::Dataset;
use dq_guard::error::DqError;
use dq_guard::validators::{
    CompletenessValidator, DuplicatesValidator, NullHandling, PatternType, PatternsValidator,
};
use std::sync::Arc;

fn cadastro() -> Dataset {
    Dataset::try_from_columns(vec![
        (
            "cnpj_empresa",
            Arc::new(StringArray::from(vec![
                Some("11.222.333/0001-81"),
                Some("11444777000161"),
                Some("11.222.333/0001-80"),
                Some("00.000.000/0000-00"),
                None,
            ])) as ArrayRef,
        ),
        (
            "cpf",
            Arc::new(StringArray::from(vec![
                Some("123.456.789-09"),
                Some("98765432100"),
                Some("111.111.111-11"),
                Some(" 123.456.789-09 "),
                Some("123.456.789-0"),
            ])) as ArrayRef,
        ),
        (
            "email_contato",
            Arc::new(StringArray::from(vec![
                Some("ana@empresa.com.br"),
                Some("bia@empresa.com"),
                Some("carlos@empresa"),
                Some(""),
                Some("dani@empresa.com"),
            ])) as ArrayRef,
        ),
        (
            "cep_entrega",
            Arc::new(StringArray::from(vec![
                Some("01310-100"),
                Some("01310100"),
                Some("1310-100"),
                Some("20040-020"),
                Some("30130-010"),
            ])) as ArrayRef,
        ),
        (
            "exception_code",
            Arc::new(StringArray::from(vec!["E1", "E2", "E3", "E4", "E5"])) as ArrayRef,
        ),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_auto_detection_over_mixed_table() {
    let results = PatternsValidator::new()
        .validate_table(&cadastro(), "cadastro")
        .await
        .unwrap();

    let by_column = |name: &str| {
        results
            .iter()
            .find(|r| r.column_name() == Some(name))
            .unwrap_or_else(|| panic!("no result for {name}"))
    };

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.column_name() != Some("exception_code")));

    let cnpj = by_column("cnpj_empresa");
    assert_eq!(cnpj.detail("pattern_type").unwrap(), "cnpj");
    assert_eq!(cnpj.detail("valid_count").unwrap(), 2);
    assert_eq!(cnpj.detail("invalid_count").unwrap(), 2);
    assert_eq!(cnpj.detail("missing_count").unwrap(), 1);

    let cpf = by_column("cpf");
    assert_eq!(cpf.detail("valid_count").unwrap(), 3);
    assert_eq!(cpf.affected_rows(), 2);

    let email = by_column("email_contato");
    assert_eq!(email.detail("invalid_count").unwrap(), 1);
    assert_eq!(email.detail("missing_count").unwrap(), 1);

    let cep = by_column("cep_entrega");
    assert_eq!(cep.affected_rows(), 1);
    assert_eq!(
        cep.detail("invalid_samples").unwrap(),
        &serde_json::json!(["1310-100"])
    );

    assert!(results.iter().all(|r| r.severity() == Severity::Info));
}

#[tokio::test]
async fn test_explicit_pattern_with_strict_nulls() {
    let validator = PatternsValidator::empty()
        .with_rule(
            ValidationRule::new("cnpj_obrigatorio", Severity::Error)
                .with_parameter("pattern_type", "cnpj")
                .with_parameter("columns", "cnpj_empresa")
                .with_parameter("allow_nulls", false)
                .with_parameter("threshold", 0.4),
        )
        .unwrap();

    let results = validator.validate_table(&cadastro(), "cadastro").await.unwrap();
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.affected_rows(), 3);
    assert!(result.is_passed());
    assert_eq!(result.severity(), Severity::Error);
}

#[tokio::test]
async fn test_custom_regex_rule() {
    let validator = PatternsValidator::empty()
        .with_rule(
            ValidationRule::new("codigo_excecao", Severity::Warning)
                .with_parameter("pattern_type", "regex")
                .with_parameter("regex_pattern", r"^E[0-4]$")
                .with_parameter("columns", "exception_code"),
        )
        .unwrap();

    let result = &validator.validate_table(&cadastro(), "cadastro").await.unwrap()[0];
    assert_eq!(result.detail("pattern_type").unwrap(), "custom_regex");
    assert_eq!(result.affected_rows(), 1);
    assert!(!result.is_passed());
}

#[test]
fn test_custom_regex_is_checked_at_registration() {
    let mut validator = PatternsValidator::empty();
    let err = validator
        .add_rule(
            ValidationRule::new("broken", Severity::Warning)
                .with_parameter("pattern_type", "custom_regex")
                .with_parameter("regex_pattern", "(unclosed"),
        )
        .unwrap_err();
    assert!(err.is_configuration());

    let err = validator
        .add_rule(
            ValidationRule::new("no_pattern", Severity::Warning)
                .with_parameter("pattern_type", "custom_regex"),
        )
        .unwrap_err();
    assert!(matches!(err, DqError::InvalidRule { .. }));
    assert!(validator.rules().is_empty());
}

#[test]
fn test_pattern_type_parsing() {
    assert_eq!("phone_br".parse::<PatternType>().unwrap(), PatternType::Phone);
    assert_eq!("CNPJ".parse::<PatternType>().unwrap(), PatternType::Cnpj);
    assert!("iban".parse::<PatternType>().is_err());
    assert_eq!(PatternType::detect("cep_entrega"), Some(PatternType::Cep));
    assert_eq!(PatternType::detect("exception_code"), None);
}

fn itens() -> Dataset {
    Dataset::try_from_columns(vec![
        (
            "id_pedido",
            Arc::new(Int64Array::from(vec![
                Some(1),
                Some(1),
                Some(1),
                Some(2),
                None,
                None,
            ])) as ArrayRef,
        ),
        (
            "sku",
            Arc::new(StringArray::from(vec![
                Some("A"),
                Some("A"),
                Some("B"),
                Some("A"),
                Some("A"),
                Some("A"),
            ])) as ArrayRef,
        ),
    ])
    .unwrap()
}

fn composite_rule(null_handling: NullHandling) -> ValidationRule {
    ValidationRule::new("itens_unicos", Severity::Error)
        .with_parameter("columns", vec!["id_pedido", "sku"])
        .with_parameter("null_handling", null_handling.to_string())
}

#[tokio::test]
async fn test_composite_key_null_handling_modes() {
    let expectations = [
        (NullHandling::Exclude, 2, 4),
        (NullHandling::Include, 4, 6),
        (NullHandling::Distinct, 2, 6),
    ];

    for (mode, affected, total) in expectations {
        let validator = DuplicatesValidator::empty()
            .with_rule(composite_rule(mode))
            .unwrap();
        let results = validator.validate_table(&itens(), "itens").await.unwrap();

        assert_eq!(results.len(), 1, "{mode}");
        let result = &results[0];
        assert_eq!(result.column_name(), None, "{mode}");
        assert_eq!(result.affected_rows(), affected, "{mode}");
        assert_eq!(result.total_rows(), total, "{mode}");
        assert!(!result.is_passed(), "{mode}");
    }
}

#[tokio::test]
async fn test_duplicates_are_row_order_independent() {
    let forward = itens();
    let indices = arrow::array::UInt32Array::from(vec![5, 3, 1, 4, 0, 2]);
    let reversed = Dataset::new(
        arrow::compute::take_record_batch(forward.batch(), &indices).unwrap(),
    );

    let validator = DuplicatesValidator::empty()
        .with_rule(composite_rule(NullHandling::Include))
        .unwrap();
    let a = &validator.validate_table(&forward, "itens").await.unwrap()[0];
    let b = &validator.validate_table(&reversed, "itens").await.unwrap()[0];

    assert_eq!(a.affected_rows(), b.affected_rows());
    assert_eq!(a.detail("sample_duplicates"), b.detail("sample_duplicates"));
    assert_eq!(a.detail("duplicate_groups"), b.detail("duplicate_groups"));
}

#[tokio::test]
async fn test_completeness_per_column_thresholds() {
    let validator = CompletenessValidator::empty()
        .with_rule(
            ValidationRule::new("pedido_obrigatorio", Severity::Error)
                .with_parameter("columns", "id_pedido")
                .with_parameter("threshold", 1.0),
        )
        .unwrap()
        .with_rule(
            ValidationRule::new("sku_desejavel", Severity::Warning)
                .with_parameter("columns", "sku")
                .with_parameter("threshold", 0.5),
        )
        .unwrap();

    let results = validator.validate_table(&itens(), "itens").await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].rule_name(), "pedido_obrigatorio");
    assert!(!results[0].is_passed());
    assert_eq!(results[0].affected_rows(), 2);
    assert_eq!(results[1].rule_name(), "sku_desejavel");
    assert!(results[1].is_passed());
}

#[test]
fn test_rules_round_trip_through_json() {
    let rule = ValidationRule::new("cpf_check", Severity::Error)
        .with_description("CPF must carry valid check digits")
        .with_parameter("pattern_type", "cpf")
        .with_parameter("columns", vec!["cpf"]);

    let json = serde_json::to_string(&rule).unwrap();
    let parsed: ValidationRule = serde_json::from_str(&json).unwrap();

    let mut validator = PatternsValidator::empty();
    validator.add_rule(parsed).unwrap();
    assert_eq!(validator.rules()[0].name(), "cpf_check");
}
