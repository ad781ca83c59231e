pub mod warehouse_repo;
pub use warehouse_repo::WarehouseRepository;
pub mod bin_repo;
pub use bin_repo::{BinFilter, BinRepository, NewBin};

use crate::common::error::AppError;

// SQLSTATEs que viram erro de domínio
const UNDEFINED_TABLE: &str = "42P01";
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Erros do Postgres que o cliente ou o operador conseguem resolver:
/// tabela ausente (falta migração) e valor que não cabe na coluna.
pub(crate) fn map_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if let Some(mapped) = classify(db_err.code().as_deref(), db_err.message()) {
            return mapped;
        }
    }
    e.into()
}

fn classify(code: Option<&str>, message: &str) -> Option<AppError> {
    match code? {
        UNDEFINED_TABLE => Some(AppError::BinsTableMissing {
            table: missing_relation(message),
        }),
        NUMERIC_VALUE_OUT_OF_RANGE => Some(AppError::invalid_field(
            "value",
            "range",
            "Valor fora do intervalo aceito pelo banco.",
        )),
        _ => None,
    }
}

// `relation "warehouses" does not exist` -> "warehouses"
fn missing_relation(message: &str) -> String {
    message
        .split('"')
        .nth(1)
        .filter(|name| !name.is_empty())
        .unwrap_or("warehouse_bins")
        .to_string()
}
