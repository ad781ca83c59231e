// src/db/bin_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::map_db_error,
    models::warehouse::{
        AllocationDetailRow, Bin, BinAllocation, BinMovement, BinMovementKind, Coordinates,
        ProductStock,
    },
};

// Dados para criar um bin (já validados e com os padrões aplicados)
#[derive(Debug, Clone)]
pub struct NewBin {
    pub warehouse_id: Uuid,
    pub section_id: Option<Uuid>,
    pub coordinates: Coordinates,
    pub bin_code: Option<String>,
    pub max_quantity: i32,
    pub max_volume: Decimal,
}

// Filtros opcionais da listagem
#[derive(Debug, Clone, Default)]
pub struct BinFilter {
    pub warehouse_id: Uuid,
    pub section_id: Option<Uuid>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub z: Option<i32>,
}

#[derive(Clone)]
pub struct BinRepository {
    pool: PgPool,
}

impl BinRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Funções de "Leitura"
    // ---

    pub async fn list_bins<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &BinFilter,
    ) -> Result<Vec<Bin>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Bin>(
            r#"
            SELECT b.*
            FROM warehouse_bins b
            JOIN warehouses w ON w.id = b.warehouse_id
            WHERE w.tenant_id = $1
              AND b.warehouse_id = $2
              AND ($3::uuid IS NULL OR b.section_id = $3)
              AND ($4::int IS NULL OR b.x = $4)
              AND ($5::int IS NULL OR b.y = $5)
              AND ($6::int IS NULL OR b.z = $6)
            ORDER BY b.x, b.y, b.z
            "#,
        )
        .bind(tenant_id)
        .bind(filter.warehouse_id)
        .bind(filter.section_id)
        .bind(filter.x)
        .bind(filter.y)
        .bind(filter.z)
        .fetch_all(executor)
        .await
        .map_err(map_db_error)
    }

    /// Alocações dos bins informados, já com o rótulo do produto.
    pub async fn list_allocation_details<'e, E>(
        &self,
        executor: E,
        bin_ids: &[Uuid],
    ) -> Result<Vec<AllocationDetailRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, AllocationDetailRow>(
            r#"
            SELECT a.id, a.bin_id, a.product_id, a.quantity, a.volume_used, a.client_id,
                   p.sku AS product_sku, p.name AS product_name
            FROM bin_allocations a
            JOIN products p ON p.id = a.product_id
            WHERE a.bin_id = ANY($1)
            ORDER BY p.name ASC
            "#,
        )
        .bind(bin_ids)
        .fetch_all(executor)
        .await
        .map_err(map_db_error)
    }

    /// Trava os bins (FOR UPDATE) sempre na mesma ordem (por id) para evitar deadlock
    /// entre movimentações concorrentes A->B e B->A.
    pub async fn lock_bins<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        bin_ids: &[Uuid],
    ) -> Result<Vec<Bin>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Bin>(
            r#"
            SELECT b.*
            FROM warehouse_bins b
            JOIN warehouses w ON w.id = b.warehouse_id
            WHERE b.id = ANY($1) AND w.tenant_id = $2
            ORDER BY b.id
            FOR UPDATE OF b
            "#,
        )
        .bind(bin_ids)
        .bind(tenant_id)
        .fetch_all(executor)
        .await
        .map_err(map_db_error)
    }

    pub async fn allocations_for_bins<'e, E>(
        &self,
        executor: E,
        bin_ids: &[Uuid],
    ) -> Result<Vec<BinAllocation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, BinAllocation>("SELECT * FROM bin_allocations WHERE bin_id = ANY($1)")
            .bind(bin_ids)
            .fetch_all(executor)
            .await
            .map_err(map_db_error)
    }

    pub async fn product_exists<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND tenant_id = $2)",
        )
        .bind(product_id)
        .bind(tenant_id)
        .fetch_one(executor)
        .await
        .map_err(map_db_error)?;
        Ok(exists)
    }

    pub async fn product_totals<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Vec<ProductStock>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ProductStock>(
            r#"
            SELECT a.product_id, p.sku, p.name,
                   SUM(a.quantity)::BIGINT AS total_quantity,
                   COUNT(*)::BIGINT AS bin_count
            FROM bin_allocations a
            JOIN warehouse_bins b ON b.id = a.bin_id
            JOIN warehouses w ON w.id = b.warehouse_id
            JOIN products p ON p.id = a.product_id
            WHERE w.tenant_id = $1 AND b.warehouse_id = $2
            GROUP BY a.product_id, p.sku, p.name
            ORDER BY p.name ASC
            "#,
        )
        .bind(tenant_id)
        .bind(warehouse_id)
        .fetch_all(executor)
        .await
        .map_err(map_db_error)
    }

    pub async fn list_movements(
        &self,
        tenant_id: Uuid,
        warehouse_id: Uuid,
        limit: i64,
    ) -> Result<Vec<BinMovement>, AppError> {
        sqlx::query_as::<_, BinMovement>(
            r#"
            SELECT m.*
            FROM bin_movements m
            JOIN warehouses w ON w.id = m.warehouse_id
            WHERE w.tenant_id = $1 AND m.warehouse_id = $2
            ORDER BY m.created_at DESC
            LIMIT $3
            "#,
        )
        .bind(tenant_id)
        .bind(warehouse_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)
    }

    // ---
    // Funções de "Escrita" (rodam dentro da transação do serviço)
    // ---

    pub async fn create_bin<'e, E>(&self, executor: E, new_bin: &NewBin) -> Result<Bin, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Bin>(
            r#"
            INSERT INTO warehouse_bins (warehouse_id, section_id, x, y, z, bin_code, max_quantity, max_volume)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new_bin.warehouse_id)
        .bind(new_bin.section_id)
        .bind(new_bin.coordinates.x)
        .bind(new_bin.coordinates.y)
        .bind(new_bin.coordinates.z)
        .bind(new_bin.bin_code.as_deref())
        .bind(new_bin.max_quantity)
        .bind(new_bin.max_volume)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::BinAlreadyExists(new_bin.coordinates);
                }
                if db_err.is_foreign_key_violation() {
                    return AppError::WarehouseNotFound;
                }
            }
            map_db_error(e)
        })
    }

    pub async fn delete_bin<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        bin_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // As alocações caem junto (ON DELETE CASCADE)
        let result = sqlx::query(
            r#"
            DELETE FROM warehouse_bins b
            USING warehouses w
            WHERE b.id = $1 AND w.id = b.warehouse_id AND w.tenant_id = $2
            "#,
        )
        .bind(bin_id)
        .bind(tenant_id)
        .execute(executor)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_allocation<'e, E>(
        &self,
        executor: E,
        allocation: &BinAllocation,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO bin_allocations (id, bin_id, product_id, quantity, volume_used, client_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(allocation.id)
        .bind(allocation.bin_id)
        .bind(allocation.product_id)
        .bind(allocation.quantity)
        .bind(allocation.volume_used)
        .bind(allocation.client_id)
        .bind(allocation.created_at)
        .bind(allocation.updated_at)
        .execute(executor)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    pub async fn update_allocation<'e, E>(
        &self,
        executor: E,
        allocation_id: Uuid,
        quantity: i32,
        volume_used: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE bin_allocations SET quantity = $2, volume_used = $3, updated_at = now() WHERE id = $1",
        )
        .bind(allocation_id)
        .bind(quantity)
        .bind(volume_used)
        .execute(executor)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    pub async fn delete_allocation<'e, E>(&self, executor: E, allocation_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM bin_allocations WHERE id = $1")
            .bind(allocation_id)
            .execute(executor)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    pub async fn update_bin_totals<'e, E>(
        &self,
        executor: E,
        bin_id: Uuid,
        current_quantity: i32,
        current_volume: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE warehouse_bins
            SET current_quantity = $2, current_volume = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(bin_id)
        .bind(current_quantity)
        .bind(current_volume)
        .execute(executor)
        .await
        .map_err(map_db_error)?;
        Ok(())
    }

    /// Registra a movimentação no livro-razão (auditoria).
    #[allow(clippy::too_many_arguments)]
    pub async fn record_movement<'e, E>(
        &self,
        executor: E,
        warehouse_id: Uuid,
        product_id: Uuid,
        from_bin_id: Option<Uuid>,
        to_bin_id: Option<Uuid>,
        quantity: i32,
        kind: BinMovementKind,
        user_id: Uuid,
    ) -> Result<BinMovement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, BinMovement>(
            r#"
            INSERT INTO bin_movements (warehouse_id, product_id, from_bin_id, to_bin_id, quantity, kind, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(warehouse_id)
        .bind(product_id)
        .bind(from_bin_id)
        .bind(to_bin_id)
        .bind(quantity)
        .bind(kind)
        .bind(user_id)
        .fetch_one(executor)
        .await
        .map_err(map_db_error)?;

        Ok(movement)
    }
}
