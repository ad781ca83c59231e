// src/handlers/bins.rs

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    db::{BinFilter, NewBin},
    models::{
        auth::Session,
        warehouse::{
            volume_fits_column, AllocationResponse, Bin, BinMovement, BinView, Coordinates, MoveResponse,
            ProductStock, VOLUME_SCALE,
        },
    },
    middleware::{
        i18n::Locale,
        rbac::{PermWarehouseRead, PermWarehouseWrite, RequirePermission},
    },
    services::bin_ledger::{AllocateCommand, MoveCommand},
};

const DEFAULT_MAX_QUANTITY: i32 = 100;

// Volume: não negativo e cabendo em NUMERIC(14, 4)
fn validate_volume(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    if !volume_fits_column(*val) {
        let mut err = ValidationError::new("volume_precision");
        err.add_param("scale".into(), &VOLUME_SCALE);
        err.message = Some("No máximo 4 casas decimais e valor abaixo de 10000000000.".into());
        return Err(err);
    }
    Ok(())
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBinPayload {
    #[validate(required(message = "O campo 'warehouse_id' é obrigatório."))]
    pub warehouse_id: Option<Uuid>,

    pub section_id: Option<Uuid>,

    #[validate(required, range(min = 0))]
    pub x: Option<i32>,
    #[validate(required, range(min = 0))]
    pub y: Option<i32>,
    #[validate(required, range(min = 0))]
    pub z: Option<i32>,

    #[validate(length(max = 64))]
    pub bin_code: Option<String>,

    // Ausente -> 100
    #[validate(range(min = 1))]
    pub max_quantity: Option<i32>,

    // 0 = volume não controlado
    #[validate(custom(function = "validate_volume"))]
    #[serde(default)]
    #[schema(value_type = f64)]
    pub max_volume: Decimal,
}

impl CreateBinPayload {
    // Só chamado depois de `validate()`: os obrigatórios estão presentes.
    fn into_new_bin(self) -> Result<NewBin, AppError> {
        let missing = |field: &'static str| AppError::invalid_field(field, "required", "Campo obrigatório.");

        Ok(NewBin {
            warehouse_id: self.warehouse_id.ok_or_else(|| missing("warehouse_id"))?,
            section_id: self.section_id,
            coordinates: Coordinates {
                x: self.x.ok_or_else(|| missing("x"))?,
                y: self.y.ok_or_else(|| missing("y"))?,
                z: self.z.ok_or_else(|| missing("z"))?,
            },
            bin_code: self
                .bin_code
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty()),
            max_quantity: self.max_quantity.unwrap_or(DEFAULT_MAX_QUANTITY),
            max_volume: self.max_volume,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AllocatePayload {
    #[validate(required)]
    pub bin_id: Option<Uuid>,

    #[validate(required)]
    pub product_id: Option<Uuid>,

    #[validate(required, range(min = 1, message = "A quantidade deve ser pelo menos 1."))]
    pub quantity: Option<i32>,

    #[validate(custom(function = "validate_volume"))]
    #[serde(default)]
    #[schema(value_type = f64)]
    pub volume_used: Decimal,

    pub client_id: Option<Uuid>,
}

impl AllocatePayload {
    fn into_command(self) -> Result<AllocateCommand, AppError> {
        let missing = |field: &'static str| AppError::invalid_field(field, "required", "Campo obrigatório.");

        Ok(AllocateCommand {
            bin_id: self.bin_id.ok_or_else(|| missing("bin_id"))?,
            product_id: self.product_id.ok_or_else(|| missing("product_id"))?,
            quantity: self.quantity.ok_or_else(|| missing("quantity"))?,
            volume_used: self.volume_used,
            client_id: self.client_id,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MovePayload {
    #[validate(required)]
    pub from_bin_id: Option<Uuid>,

    #[validate(required)]
    pub to_bin_id: Option<Uuid>,

    #[validate(required)]
    pub product_id: Option<Uuid>,

    #[validate(required, range(min = 1, message = "A quantidade deve ser pelo menos 1."))]
    pub quantity: Option<i32>,
}

impl MovePayload {
    fn validate_consistency(&self) -> Result<(), AppError> {
        if self.from_bin_id.is_some() && self.from_bin_id == self.to_bin_id {
            return Err(AppError::invalid_field(
                "to_bin_id",
                "same_bin",
                "Source and destination must differ",
            ));
        }
        Ok(())
    }

    fn into_command(self) -> Result<MoveCommand, AppError> {
        let missing = |field: &'static str| AppError::invalid_field(field, "required", "Campo obrigatório.");

        Ok(MoveCommand {
            from_bin_id: self.from_bin_id.ok_or_else(|| missing("from_bin_id"))?,
            to_bin_id: self.to_bin_id.ok_or_else(|| missing("to_bin_id"))?,
            product_id: self.product_id.ok_or_else(|| missing("product_id"))?,
            quantity: self.quantity.ok_or_else(|| missing("quantity"))?,
        })
    }
}

// ---
// Query strings
// ---

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListBinsQuery {
    pub warehouse_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub z: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StockQuery {
    pub warehouse_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementsQuery {
    pub warehouse_id: Option<Uuid>,
    /// Padrão 50, limitado a 1..=500
    pub limit: Option<i64>,
}

fn require_warehouse(warehouse_id: Option<Uuid>) -> Result<Uuid, AppError> {
    warehouse_id.ok_or_else(|| {
        AppError::invalid_field("warehouse_id", "required", "O parâmetro 'warehouse_id' é obrigatório.")
    })
}

// ---
// Respostas em lista
// ---

#[derive(Debug, Serialize, ToSchema)]
pub struct BinCreated {
    pub bin: Bin,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BinList {
    pub bins: Vec<BinView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductStockList {
    pub products: Vec<ProductStock>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementList {
    pub movements: Vec<BinMovement>,
}

fn parse_payload<T>(value: Value) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate,
{
    let payload: T = serde_json::from_value(value).map_err(|e| AppError::MalformedBody(e.to_string()))?;
    payload.validate()?;
    Ok(payload)
}

fn is_allocation_request(body: &Value) -> bool {
    body.get("allocate").and_then(Value::as_bool).unwrap_or(false)
}

// ---
// Handlers
// ---

#[utoipa::path(
    post,
    path = "/api/warehouse/bins",
    tag = "Bins",
    request_body(
        content = CreateBinPayload,
        description = "Cria um bin. Com `\"allocate\": true` o corpo é um AllocatePayload."
    ),
    responses(
        (status = 201, description = "Bin criado", body = BinCreated),
        (status = 200, description = "Alocação feita (modo allocate)", body = AllocationResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Armazém não encontrado"),
        (status = 409, description = "Já existe um bin nestas coordenadas"),
        (status = 503, description = "Tabela de bins ausente (rode a migração)")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_bin(
    State(app_state): State<AppState>,
    locale: Locale,
    session: Session,
    _guard: RequirePermission<PermWarehouseWrite>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Json(body) = body.map_err(|e| to_api(AppError::MalformedBody(e.body_text())))?;

    if is_allocation_request(&body) {
        let cmd = parse_payload::<AllocatePayload>(body)
            .and_then(AllocatePayload::into_command)
            .map_err(to_api)?;

        let response = app_state.bin_service.allocate(&session, cmd).await.map_err(to_api)?;
        return Ok(Json(response).into_response());
    }

    let new_bin = parse_payload::<CreateBinPayload>(body)
        .and_then(CreateBinPayload::into_new_bin)
        .map_err(to_api)?;

    let bin = app_state.bin_service.create_bin(&session, new_bin).await.map_err(to_api)?;

    Ok((StatusCode::CREATED, Json(BinCreated { bin })).into_response())
}

#[utoipa::path(
    get,
    path = "/api/warehouse/bins",
    tag = "Bins",
    responses(
        (status = 200, description = "Bins do armazém, ordenados por x, y, z", body = BinList),
        (status = 400, description = "warehouse_id ausente"),
        (status = 503, description = "Tabela de bins ausente (rode a migração)")
    ),
    params(
        ListBinsQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_bins(
    State(app_state): State<AppState>,
    locale: Locale,
    session: Session,
    _guard: RequirePermission<PermWarehouseRead>,
    query: Result<Query<ListBinsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Query(query) = query.map_err(|e| to_api(AppError::MalformedBody(e.body_text())))?;
    let filter = BinFilter {
        warehouse_id: require_warehouse(query.warehouse_id).map_err(to_api)?,
        section_id: query.section_id,
        x: query.x,
        y: query.y,
        z: query.z,
    };

    let bins = app_state.bin_service.list_bins(&session, &filter).await.map_err(to_api)?;

    Ok(Json(BinList { bins }))
}

#[utoipa::path(
    post,
    path = "/api/warehouse/bins/allocate",
    tag = "Bins",
    request_body = AllocatePayload,
    responses(
        (status = 200, description = "Produto alocado", body = AllocationResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Bin ou produto não encontrado"),
        (status = 409, description = "Capacidade ou volume excedido")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn allocate(
    State(app_state): State<AppState>,
    locale: Locale,
    session: Session,
    _guard: RequirePermission<PermWarehouseWrite>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Json(body) = body.map_err(|e| to_api(AppError::MalformedBody(e.body_text())))?;
    let cmd = parse_payload::<AllocatePayload>(body)
        .and_then(AllocatePayload::into_command)
        .map_err(to_api)?;

    let response = app_state.bin_service.allocate(&session, cmd).await.map_err(to_api)?;

    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/warehouse/bins/move",
    tag = "Bins",
    request_body = MovePayload,
    responses(
        (status = 200, description = "Estoque movido entre bins", body = MoveResponse),
        (status = 400, description = "Dados inválidos (ex.: mesmo bin)"),
        (status = 404, description = "Bin ou alocação não encontrado"),
        (status = 409, description = "Estoque insuficiente ou destino sem espaço")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn move_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    session: Session,
    _guard: RequirePermission<PermWarehouseWrite>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Json(body) = body.map_err(|e| to_api(AppError::MalformedBody(e.body_text())))?;
    let payload = parse_payload::<MovePayload>(body).map_err(to_api)?;
    payload.validate_consistency().map_err(to_api)?;
    let cmd = payload.into_command().map_err(to_api)?;

    let response = app_state.bin_service.move_stock(&session, cmd).await.map_err(to_api)?;

    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/api/warehouse/bins/{bin_id}",
    tag = "Bins",
    responses(
        (status = 204, description = "Bin removido junto com as alocações"),
        (status = 404, description = "Bin não encontrado")
    ),
    params(
        ("bin_id" = Uuid, Path, description = "ID do Bin"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_bin(
    State(app_state): State<AppState>,
    locale: Locale,
    session: Session,
    _guard: RequirePermission<PermWarehouseWrite>,
    Path(bin_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .bin_service
        .delete_bin(&session, bin_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/warehouse/bins/stock",
    tag = "Bins",
    responses(
        (status = 200, description = "Saldo de cada produto somando todos os bins", body = ProductStockList)
    ),
    params(
        StockQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn product_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    session: Session,
    _guard: RequirePermission<PermWarehouseRead>,
    query: Result<Query<StockQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Query(query) = query.map_err(|e| to_api(AppError::MalformedBody(e.body_text())))?;
    let warehouse_id = require_warehouse(query.warehouse_id).map_err(to_api)?;

    let products = app_state
        .bin_service
        .product_stock(&session, warehouse_id)
        .await
        .map_err(to_api)?;

    Ok(Json(ProductStockList { products }))
}

#[utoipa::path(
    get,
    path = "/api/warehouse/bins/movements",
    tag = "Bins",
    responses(
        (status = 200, description = "Histórico de movimentações, mais recentes primeiro", body = MovementList)
    ),
    params(
        MovementsQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    session: Session,
    _guard: RequirePermission<PermWarehouseRead>,
    query: Result<Query<MovementsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let to_api = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

    let Query(query) = query.map_err(|e| to_api(AppError::MalformedBody(e.body_text())))?;
    let warehouse_id = require_warehouse(query.warehouse_id).map_err(to_api)?;

    let movements = app_state
        .bin_service
        .list_movements(&session, warehouse_id, query.limit)
        .await
        .map_err(to_api)?;

    Ok(Json(MovementList { movements }))
}
