// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Warehouses ---
        handlers::warehouses::create_warehouse,
        handlers::warehouses::list_warehouses,

        // --- Bins ---
        handlers::bins::create_bin,
        handlers::bins::list_bins,
        handlers::bins::allocate,
        handlers::bins::move_stock,
        handlers::bins::delete_bin,
        handlers::bins::product_stock,
        handlers::bins::list_movements,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,

            // --- Warehouse ---
            models::warehouse::Warehouse,
            models::warehouse::Bin,
            models::warehouse::Coordinates,
            models::warehouse::FillStatus,
            models::warehouse::BinAllocation,
            models::warehouse::ProductLabel,
            models::warehouse::AllocationView,
            models::warehouse::BinView,
            models::warehouse::ProductStock,
            models::warehouse::BinMovementKind,
            models::warehouse::BinMovement,
            models::warehouse::AllocationAction,
            models::warehouse::AllocationResponse,
            models::warehouse::MoveResponse,

            // --- Payloads / respostas ---
            handlers::warehouses::CreateWarehousePayload,
            handlers::warehouses::WarehouseCreated,
            handlers::warehouses::WarehouseList,
            handlers::bins::CreateBinPayload,
            handlers::bins::AllocatePayload,
            handlers::bins::MovePayload,
            handlers::bins::BinCreated,
            handlers::bins::BinList,
            handlers::bins::ProductStockList,
            handlers::bins::MovementList,
        )
    ),
    tags(
        (name = "Warehouses", description = "Armazéns da organização"),
        (name = "Bins", description = "Bins 3D: criação, alocação e movimentação de estoque")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
