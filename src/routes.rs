// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::auth::{auth_guard, tenant_guard},
};

pub fn build_router(app_state: AppState) -> Router {
    // Armazéns: o tenant vem da própria sessão
    let warehouse_routes = Router::new()
        .route("/"
               ,post(handlers::warehouses::create_warehouse)
               .get(handlers::warehouses::list_warehouses)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Bins: exigem X-Tenant-ID igual ao da sessão
    let bin_routes = Router::new()
        .route("/"
               ,post(handlers::bins::create_bin)
               .get(handlers::bins::list_bins)
        )
        .route("/allocate", post(handlers::bins::allocate))
        .route("/move", post(handlers::bins::move_stock))
        .route("/stock", get(handlers::bins::product_stock))
        .route("/movements", get(handlers::bins::list_movements))
        .route("/{bin_id}", delete(handlers::bins::delete_bin))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/warehouses", warehouse_routes)
        .nest("/api/warehouse/bins", bin_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
