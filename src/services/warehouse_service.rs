// src/services/warehouse_service.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::WarehouseRepository,
    models::{auth::Session, warehouse::Warehouse},
};

#[derive(Clone)]
pub struct WarehouseService {
    warehouse_repo: WarehouseRepository,
    pool: PgPool,
}

impl WarehouseService {
    pub fn new(warehouse_repo: WarehouseRepository, pool: PgPool) -> Self {
        Self { warehouse_repo, pool }
    }

    pub async fn create_warehouse(
        &self,
        session: &Session,
        name: &str,
        code: Option<&str>,
    ) -> Result<Warehouse, AppError> {
        let warehouse = self
            .warehouse_repo
            .create_warehouse(&self.pool, session.tenant_id, name.trim(), code)
            .await?;

        tracing::info!(warehouse_id = %warehouse.id, tenant_id = %session.tenant_id, "Armazém criado");
        Ok(warehouse)
    }

    pub async fn list_warehouses(&self, session: &Session) -> Result<Vec<Warehouse>, AppError> {
        self.warehouse_repo.list_for_tenant(session.tenant_id).await
    }
}
