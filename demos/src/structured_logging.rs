//! Structured logging example.
//!
//! Installs dq-guard's JSON subscriber and runs the validators over the
//! bundled fixtures, so every rule evaluation shows up as a JSON line with
//! dotted fields (`validator.name`, `rule.name`, `result.passed`, ...).
//!
//! Run with:
//! ```bash
//! cargo run -p dq-demos --example structured_logging
//! RUST_LOG=dq_guard=debug cargo run -p dq-demos --example structured_logging
//! ```

use dq_guard::core::{EngineConfig, Severity, ValidationEngine, ValidationRule};
use dq_guard::logging::setup::{init_logging, LoggingConfig};
use dq_guard::sources::{ForeignKeyDef, InMemoryReferenceSource};
use dq_guard::test_fixtures::{cadastro, clientes, pedidos};
use dq_guard::validators::{
    CompletenessValidator, DuplicatesValidator, IntegrityValidator, PatternsValidator,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::structured())?;

    let engine = ValidationEngine::with_config(
        EngineConfig::default().with_validator_timeout(Duration::from_secs(10)),
    )?
    .with_validator(Arc::new(CompletenessValidator::new()))
    .with_validator(Arc::new(PatternsValidator::new()));

    let run = engine.validate_data(&cadastro(), "cadastro").await?;
    info!(
        table.name = run.table_name(),
        run.failed = run.summary().failed,
        "cadastro checked"
    );

    let source = InMemoryReferenceSource::new()
        .with_table("clientes", clientes())
        .with_foreign_key(
            "pedidos",
            ForeignKeyDef::new("pedidos_cliente", "id_cliente", "clientes", "id"),
        )
        .with_foreign_key(
            "pedidos",
            ForeignKeyDef::composite(
                "pedidos_cliente_loja",
                ["id_cliente", "loja"],
                "clientes",
                ["id", "loja"],
            ),
        );

    let orders = ValidationEngine::new()
        .with_validator(Arc::new(
            DuplicatesValidator::empty().with_rule(
                ValidationRule::new("pedido_unico", Severity::Error)
                    .with_parameter("columns", "id_pedido"),
            )?,
        ))
        .with_validator(Arc::new(IntegrityValidator::new().with_source(Arc::new(source))));

    let run = orders.validate_data(&pedidos(), "pedidos").await?;
    info!(
        table.name = run.table_name(),
        run.failed = run.summary().failed,
        "pedidos checked"
    );

    println!("{}", serde_json::to_string_pretty(run.results())?);
    Ok(())
}
