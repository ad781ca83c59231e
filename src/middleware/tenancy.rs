// src/middleware/tenancy.rs

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::common::error::AppError;

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

// A organização que o utilizador quer aceder (validada pelo tenant_guard).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext(pub Uuid);

impl TenantContext {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let value = headers.get(TENANT_ID_HEADER).ok_or_else(|| {
            AppError::invalid_field("x-tenant-id", "required", "O cabeçalho X-Tenant-ID é obrigatório.")
        })?;

        value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .map(TenantContext)
            .ok_or_else(|| {
                AppError::invalid_field("x-tenant-id", "uuid", "Cabeçalho X-Tenant-ID inválido (não é um UUID).")
            })
    }
}
