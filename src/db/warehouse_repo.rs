// src/db/warehouse_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, db::map_db_error, models::warehouse::Warehouse};

#[derive(Clone)]
pub struct WarehouseRepository {
    pool: PgPool,
}

impl WarehouseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Leitura simples: usa a pool principal
    pub async fn list_for_tenant(&self, tenant_id: Uuid) -> Result<Vec<Warehouse>, AppError> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            "SELECT * FROM warehouses WHERE tenant_id = $1 ORDER BY name ASC",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(warehouses)
    }

    pub async fn find_for_tenant<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Option<Warehouse>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let warehouse = sqlx::query_as::<_, Warehouse>(
            "SELECT * FROM warehouses WHERE id = $1 AND tenant_id = $2",
        )
        .bind(warehouse_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await
        .map_err(map_db_error)?;
        Ok(warehouse)
    }

    pub async fn create_warehouse<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
        code: Option<&str>,
    ) -> Result<Warehouse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Warehouse>(
            r#"
            INSERT INTO warehouses (tenant_id, name, code)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .bind(code)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::WarehouseNameAlreadyExists(name.to_string());
                }
            }
            map_db_error(e)
        })
    }
}
