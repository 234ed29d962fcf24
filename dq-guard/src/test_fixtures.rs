//! Shared datasets for tests, benchmarks and demos.
//!
//! Compiled for unit tests and behind the `test-utils` feature. The tables
//! mimic a small retail schema: `clientes` (customers), `pedidos` (orders)
//! and `cadastro`, a company registry with Brazilian identifiers.

use crate::checkdigit::{Cnpj, Cpf, IdentifierFormat};
use crate::dataset::Dataset;
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Customers with `rows` rows, `missing` of which have a null `email`.
///
/// Columns: `id_cliente` (Int64, 1-based, unique) and `email` (Utf8, unique
/// when present). Missing emails are spread evenly across the table.
pub fn clientes_with_missing_emails(rows: usize, missing: usize) -> Dataset {
    let missing = missing.min(rows);
    let ids: Vec<i64> = (1..=rows as i64).collect();
    let emails: Vec<Option<String>> = (0..rows)
        .map(|i| {
            let is_missing = missing > 0 && (i * missing) / rows != ((i + 1) * missing) / rows;
            (!is_missing).then(|| format!("cliente{}@example.com", i + 1))
        })
        .collect();

    Dataset::new(
        RecordBatch::try_from_iter(vec![
            ("id_cliente", Arc::new(Int64Array::from(ids)) as ArrayRef),
            ("email", Arc::new(StringArray::from(emails)) as ArrayRef),
        ])
        .expect("fixture columns have equal length"),
    )
}

/// The `clientes` schema with no rows.
pub fn empty_clientes() -> Dataset {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id_cliente", DataType::Int64, false),
        Field::new("email", DataType::Utf8, true),
    ]));
    Dataset::new(RecordBatch::new_empty(schema))
}

/// Parent table for integrity checks: `id` 1 to 5 and a store column.
pub fn clientes() -> Dataset {
    Dataset::new(
        RecordBatch::try_from_iter(vec![
            ("id", Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5])) as ArrayRef),
            (
                "loja",
                Arc::new(StringArray::from(vec!["SP01", "SP01", "RJ01", "RJ01", "MG01"]))
                    as ArrayRef,
            ),
        ])
        .expect("fixture columns have equal length"),
    )
}

/// Orders referencing [`clientes`].
///
/// Eight rows; `id_cliente` holds two orphans (`9`, `9`) and one null.
/// Against `(id, loja)` the pair (`2`, `RJ01`) is a further orphan.
pub fn pedidos() -> Dataset {
    Dataset::new(
        RecordBatch::try_from_iter(vec![
            (
                "id_pedido",
                Arc::new(Int64Array::from(vec![100, 101, 102, 103, 104, 105, 106, 107]))
                    as ArrayRef,
            ),
            (
                "id_cliente",
                Arc::new(Int64Array::from(vec![
                    Some(1),
                    Some(2),
                    Some(2),
                    Some(9),
                    None,
                    Some(3),
                    Some(9),
                    Some(5),
                ])) as ArrayRef,
            ),
            (
                "loja",
                Arc::new(StringArray::from(vec![
                    "SP01", "SP01", "RJ01", "SP01", "SP01", "RJ01", "RJ01", "MG01",
                ])) as ArrayRef,
            ),
        ])
        .expect("fixture columns have equal length"),
    )
}

/// Registry records with identifier columns named for auto-detection.
///
/// Ten rows. `cnpj`: 8 valid (formatted and bare), 1 bad check digit, 1
/// repeated-digit. `cpf`: 9 valid, 1 null. `email`: 9 valid, 1 malformed.
/// `cep`: all valid. `observacao` is free text that no detector claims.
pub fn cadastro() -> Dataset {
    let cnpj_bases = [
        "112223330001",
        "114447770001",
        "123456780001",
        "987654320001",
        "000000010001",
        "191000000001",
        "336833330001",
        "605746060001",
    ];
    let mut cnpjs: Vec<Option<String>> = cnpj_bases
        .iter()
        .enumerate()
        .map(|(i, base)| {
            let full = Cnpj.complete(base).expect("fixture CNPJ base is well formed");
            Some(if i % 2 == 0 { format_cnpj(&full) } else { full })
        })
        .collect();
    cnpjs.push(Some("11.222.333/0001-80".to_string()));
    cnpjs.push(Some("11.111.111/1111-11".to_string()));

    let cpf_bases = [
        "123456789",
        "987654321",
        "111444777",
        "529982247",
        "390533447",
        "246813579",
        "135792468",
        "314159265",
        "271828182",
    ];
    let mut cpfs: Vec<Option<String>> = cpf_bases
        .iter()
        .map(|base| Cpf.complete(base).map(|full| format_cpf(&full)))
        .collect();
    cpfs.push(None);

    let mut emails: Vec<Option<String>> = (1..=9)
        .map(|i| Some(format!("contato{i}@empresa.com.br")))
        .collect();
    emails.push(Some("sem-arroba.empresa.com".to_string()));

    let ceps: Vec<Option<String>> = (0..10)
        .map(|i| Some(format!("0131{i}-100")))
        .collect();

    let observacoes: Vec<Option<&str>> = vec![Some("cliente antigo"); 10];

    Dataset::new(
        RecordBatch::try_from_iter(vec![
            ("cnpj", Arc::new(StringArray::from(cnpjs)) as ArrayRef),
            ("cpf_responsavel", Arc::new(StringArray::from(cpfs)) as ArrayRef),
            ("email", Arc::new(StringArray::from(emails)) as ArrayRef),
            ("cep", Arc::new(StringArray::from(ceps)) as ArrayRef),
            ("observacao", Arc::new(StringArray::from(observacoes)) as ArrayRef),
        ])
        .expect("fixture columns have equal length"),
    )
}

fn format_cnpj(digits: &str) -> String {
    format!(
        "{}.{}.{}/{}-{}",
        &digits[0..2],
        &digits[2..5],
        &digits[5..8],
        &digits[8..12],
        &digits[12..14]
    )
}

fn format_cpf(digits: &str) -> String {
    format!(
        "{}.{}.{}-{}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..11]
    )
}
