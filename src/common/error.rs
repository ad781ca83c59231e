// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::models::warehouse::Coordinates;

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Corpo da requisição inválido: {0}")]
    MalformedBody(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Permissão '{0}' necessária")]
    PermissionDenied(&'static str),

    #[error("O cabeçalho X-Tenant-ID não corresponde à sessão")]
    TenantMismatch,

    #[error("Armazém não encontrado")]
    WarehouseNotFound,

    #[error("Já existe um armazém com o nome '{0}'")]
    WarehouseNameAlreadyExists(String),

    #[error("Bin não encontrado: {0}")]
    BinNotFound(Uuid),

    #[error("Produto não encontrado: {0}")]
    ProductNotFound(Uuid),

    #[error("Nenhuma alocação deste produto no bin de origem")]
    AllocationNotFound { bin_id: Uuid, product_id: Uuid },

    #[error("Já existe um bin em {0} neste armazém")]
    BinAlreadyExists(Coordinates),

    // A tabela não existe: o operador precisa rodar a migração
    #[error("Tabela {table} não encontrada")]
    BinsTableMissing { table: String },

    #[error("Capacidade do bin {coordinates} excedida")]
    CapacityExceeded {
        coordinates: Coordinates,
        capacity: i32,
        current: i32,
        requested: i32,
    },

    #[error("Volume do bin {coordinates} excedido")]
    VolumeExceeded {
        coordinates: Coordinates,
        capacity: rust_decimal::Decimal,
        current: rust_decimal::Decimal,
        requested: rust_decimal::Decimal,
    },

    #[error("Estoque insuficiente no bin de origem")]
    InsufficientStock { available: i32, requested: i32 },

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

// O erro já "renderizado" para o cliente, no idioma pedido.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.error, "code": self.code });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    /// Cria um erro de validação para um único campo (regras que o derive não cobre).
    pub fn invalid_field(field: &'static str, code: &'static str, message: &'static str) -> Self {
        let mut err = validator::ValidationError::new(code);
        err.message = Some(message.into());
        let mut errors = validator::ValidationErrors::new();
        errors.add(field, err);
        AppError::ValidationError(errors)
    }

    /// Chave usada no catálogo de mensagens.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::MalformedBody(_) => "malformed_body",
            AppError::InvalidToken => "invalid_token",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::TenantMismatch => "tenant_mismatch",
            AppError::WarehouseNotFound => "warehouse_not_found",
            AppError::WarehouseNameAlreadyExists(_) => "warehouse_name_exists",
            AppError::BinNotFound(_) => "bin_not_found",
            AppError::ProductNotFound(_) => "product_not_found",
            AppError::AllocationNotFound { .. } => "allocation_not_found",
            AppError::BinAlreadyExists(_) => "bin_already_exists",
            AppError::BinsTableMissing { .. } => "bins_table_missing",
            AppError::CapacityExceeded { .. } => "capacity_exceeded",
            AppError::VolumeExceeded { .. } => "volume_exceeded",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied(_) | AppError::TenantMismatch => StatusCode::FORBIDDEN,
            AppError::WarehouseNotFound
            | AppError::BinNotFound(_)
            | AppError::ProductNotFound(_)
            | AppError::AllocationNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::WarehouseNameAlreadyExists(_)
            | AppError::BinAlreadyExists(_)
            | AppError::CapacityExceeded { .. }
            | AppError::VolumeExceeded { .. }
            | AppError::InsufficientStock { .. } => StatusCode::CONFLICT,
            AppError::BinsTableMissing { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    // Parâmetros interpolados nas mensagens ({capacity}, {requested}...)
    fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            AppError::MalformedBody(reason) => vec![("reason", reason.clone())],
            AppError::PermissionDenied(slug) => vec![("permission", slug.to_string())],
            AppError::WarehouseNameAlreadyExists(name) => vec![("name", name.clone())],
            AppError::BinNotFound(id) => vec![("id", id.to_string())],
            AppError::BinsTableMissing { table } => vec![("table", table.clone())],
            AppError::ProductNotFound(id) => vec![("id", id.to_string())],
            AppError::BinAlreadyExists(coordinates) => vec![("coordinates", coordinates.to_string())],
            AppError::CapacityExceeded { coordinates, capacity, current, requested } => vec![
                ("coordinates", coordinates.to_string()),
                ("capacity", capacity.to_string()),
                ("current", current.to_string()),
                ("requested", requested.to_string()),
            ],
            AppError::VolumeExceeded { coordinates, capacity, current, requested } => vec![
                ("coordinates", coordinates.to_string()),
                ("capacity", capacity.normalize().to_string()),
                ("current", current.normalize().to_string()),
                ("requested", requested.normalize().to_string()),
            ],
            AppError::InsufficientStock { available, requested } => vec![
                ("available", available.to_string()),
                ("requested", requested.to_string()),
            ],
            _ => Vec::new(),
        }
    }

    fn details(&self, locale: &Locale, store: &I18nStore) -> Option<Value> {
        match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            store
                                .translate(&locale.0, &format!("validation.{}", e.code))
                                .or_else(|| e.message.as_ref().map(|m| m.to_string()))
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                Some(Value::Object(details))
            }
            AppError::CapacityExceeded { capacity, current, requested, .. } => Some(json!({
                "capacity": capacity,
                "current": current,
                "requested": requested,
            })),
            AppError::VolumeExceeded { capacity, current, requested, .. } => Some(json!({
                "capacity": capacity,
                "current": current,
                "requested": requested,
            })),
            AppError::InsufficientStock { available, requested } => Some(json!({
                "available": available,
                "requested": requested,
            })),
            AppError::AllocationNotFound { bin_id, product_id } => Some(json!({
                "bin_id": bin_id,
                "product_id": product_id,
            })),
            _ => None,
        }
    }

    /// Converte o erro de domínio na resposta HTTP, no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();
        let code = self.code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // O `tracing` loga a mensagem detalhada; o cliente recebe só a genérica.
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        let error = store
            .render(&locale.0, code, &self.params())
            .unwrap_or_else(|| self.to_string());

        ApiError {
            status,
            code,
            error,
            details: self.details(locale, store),
        }
    }
}
