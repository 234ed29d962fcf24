//! Basic validation example demonstrating dq-guard's core functionality.
//!
//! This example shows how to:
//! - Load a CSV file through DataFusion into a [`Dataset`]
//! - Register the four built-in validators with a [`ValidationEngine`]
//! - Check foreign keys against a parent table registered in the same session
//! - Read the results and the run summary
//!
//! Run with:
//! ```bash
//! cargo run -p dq-demos --example basic_validation
//! ```

use datafusion::prelude::*;
use dq_guard::core::{Severity, ValidationEngine, ValidationRule};
use dq_guard::dataset::Dataset;
use dq_guard::sources::DataFusionReferenceSource;
use dq_guard::validators::{
    CompletenessValidator, DuplicatesValidator, IntegrityValidator, PatternsValidator,
};
use std::sync::Arc;

const EMPRESAS: &str = "\
id_empresa,razao_social,cnpj,email,cep,id_grupo
1,Padaria Central,11.222.333/0001-81,contato@padaria.com.br,01310-100,10
2,Mercado Bom Preco,11.444.777/0001-61,vendas@mercado.com,20040-020,10
3,Oficina Rapida,11.222.333/0001-82,oficina@rapida,30130-010,20
4,Livraria Norte,,livros@norte.com.br,6904-000,99
4,Livraria Norte Filial,11.444.777/0001-61,filial@norte.com.br,69040-000,
";

const GRUPOS: &str = "\
id,nome
10,Alimentos
20,Servicos
";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("warn,dq_guard=info")
        .init();

    let ctx = SessionContext::new();
    let dir = std::env::temp_dir();
    for (name, contents) in [("empresas", EMPRESAS), ("grupos", GRUPOS)] {
        let path = dir.join(format!("dq_demo_{name}.csv"));
        std::fs::write(&path, contents)?;
        ctx.register_csv(name, &path.to_string_lossy(), CsvReadOptions::default())
            .await?;
    }

    let df = ctx.table("empresas").await?;
    let schema = Arc::new(df.schema().as_arrow().clone());
    let dataset = Dataset::from_batches(schema, &df.collect().await?)?;
    println!(
        "Loaded {} rows with columns {:?}\n",
        dataset.num_rows(),
        dataset.column_names()
    );

    let completeness = CompletenessValidator::empty().with_rule(
        ValidationRule::new("campos_obrigatorios", Severity::Error)
            .with_parameter("columns", vec!["id_empresa", "razao_social", "cnpj"])
            .with_parameter("threshold", 1.0),
    )?;

    let duplicates = DuplicatesValidator::empty().with_rule(
        ValidationRule::new("empresa_unica", Severity::Error).with_parameter("columns", "id_empresa"),
    )?;

    let patterns = PatternsValidator::new().with_rule(
        ValidationRule::new("cnpj_valido", Severity::Error)
            .with_parameter("pattern_type", "cnpj")
            .with_parameter("columns", "cnpj")
            .with_parameter("threshold", 1.0),
    )?;

    let integrity = IntegrityValidator::new()
        .with_source(Arc::new(DataFusionReferenceSource::new(ctx.clone())))
        .with_rule(
            ValidationRule::new("empresa_grupo", Severity::Error)
                .with_parameter("foreign_key", "id_grupo")
                .with_parameter("reference_table", "grupos")
                .with_parameter("reference_column", "id"),
        )?;

    let engine = ValidationEngine::new()
        .with_validator(Arc::new(completeness))
        .with_validator(Arc::new(duplicates))
        .with_validator(Arc::new(patterns))
        .with_validator(Arc::new(integrity));

    let run = engine.validate_data(&dataset, "empresas").await?;

    for result in run.results() {
        let status = if result.is_passed() { "PASS" } else { "FAIL" };
        let column = result.column_name().unwrap_or("-");
        println!(
            "{status} [{:<8}] {:<22} {:<14} {}",
            result.severity(),
            result.rule_name(),
            column,
            result.message()
        );
    }

    let summary = run.summary();
    println!(
        "\n{} results, {} passed, {} failed ({:.1}% success) in {}ms",
        summary.total,
        summary.passed,
        summary.failed,
        summary.success_rate(),
        run.duration_ms()
    );

    match summary.highest_failed_severity() {
        Some(severity) if severity >= Severity::Error => {
            println!("Data quality gate failed at {severity}");
        }
        Some(severity) => println!("Passed with {severity} findings"),
        None => println!("All checks passed"),
    }

    Ok(())
}
