// src/handlers/warehouses.rs

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermWarehouseRead, PermWarehouseWrite, RequirePermission},
    },
    models::{auth::Session, warehouse::Warehouse},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateWarehousePayload {
    #[validate(length(min = 1, max = 120, message = "O nome do armazém é obrigatório."))]
    pub name: String,

    #[validate(length(max = 32))]
    pub code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WarehouseCreated {
    pub warehouse: Warehouse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WarehouseList {
    pub warehouses: Vec<Warehouse>,
}

#[utoipa::path(
    post,
    path = "/api/warehouses",
    tag = "Warehouses",
    request_body = CreateWarehousePayload,
    responses(
        (status = 201, description = "Armazém criado", body = WarehouseCreated),
        (status = 409, description = "Nome já usado nesta organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_warehouse(
    State(app_state): State<AppState>,
    locale: Locale,
    session: Session,
    _guard: RequirePermission<PermWarehouseWrite>,
    body: Result<Json<CreateWarehousePayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Json(payload) = body.map_err(|e| to_api(AppError::MalformedBody(e.body_text())))?;
    payload.validate().map_err(|e| to_api(e.into()))?;
    if payload.name.trim().is_empty() {
        return Err(to_api(AppError::invalid_field("name", "required", "O nome do armazém é obrigatório.")));
    }

    // Código vazio é o mesmo que nenhum código
    let code = payload.code.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let warehouse = app_state
        .warehouse_service
        .create_warehouse(&session, &payload.name, code)
        .await
        .map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(WarehouseCreated { warehouse })))
}

#[utoipa::path(
    get,
    path = "/api/warehouses",
    tag = "Warehouses",
    responses(
        (status = 200, description = "Armazéns da organização", body = WarehouseList)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_warehouses(
    State(app_state): State<AppState>,
    locale: Locale,
    session: Session,
    _guard: RequirePermission<PermWarehouseRead>,
) -> Result<impl IntoResponse, ApiError> {
    let warehouses = app_state
        .warehouse_service
        .list_warehouses(&session)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(WarehouseList { warehouses }))
}
