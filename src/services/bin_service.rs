// src/services/bin_service.rs

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BinFilter, BinRepository, NewBin, WarehouseRepository},
    models::{
        auth::Session,
        warehouse::{
            AllocationResponse, AllocationView, Bin, BinMovement, BinMovementKind, BinView,
            MoveResponse, ProductStock,
        },
    },
    services::bin_ledger::{AllocateCommand, BinLedger, LedgerChange, MoveCommand},
};

pub const DEFAULT_MOVEMENT_LIMIT: i64 = 50;
const MAX_MOVEMENT_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct BinService {
    bin_repo: BinRepository,
    warehouse_repo: WarehouseRepository,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl BinService {
    pub fn new(bin_repo: BinRepository, warehouse_repo: WarehouseRepository, pool: PgPool) -> Self {
        Self { bin_repo, warehouse_repo, pool }
    }

    async fn ensure_warehouse(&self, session: &Session, warehouse_id: Uuid) -> Result<(), AppError> {
        self.warehouse_repo
            .find_for_tenant(&self.pool, session.tenant_id, warehouse_id)
            .await?
            .map(|_| ())
            .ok_or(AppError::WarehouseNotFound)
    }

    // --- CREATE BIN ---
    pub async fn create_bin(&self, session: &Session, new_bin: NewBin) -> Result<Bin, AppError> {
        let mut tx = self.pool.begin().await?;

        // Armazém de outra organização é tratado como inexistente
        self.warehouse_repo
            .find_for_tenant(&mut *tx, session.tenant_id, new_bin.warehouse_id)
            .await?
            .ok_or(AppError::WarehouseNotFound)?;

        let bin = self.bin_repo.create_bin(&mut *tx, &new_bin).await?;

        tx.commit().await?;

        tracing::info!(
            bin_id = %bin.id,
            warehouse_id = %bin.warehouse_id,
            "Bin criado em {}",
            bin.coordinates()
        );
        Ok(bin)
    }

    // --- LIST BINS (com alocações e rótulo do produto) ---
    pub async fn list_bins(&self, session: &Session, filter: &BinFilter) -> Result<Vec<BinView>, AppError> {
        self.ensure_warehouse(session, filter.warehouse_id).await?;

        let bins = self.bin_repo.list_bins(&self.pool, session.tenant_id, filter).await?;
        if bins.is_empty() {
            return Ok(Vec::new());
        }

        let bin_ids: Vec<Uuid> = bins.iter().map(|b| b.id).collect();
        let details = self.bin_repo.list_allocation_details(&self.pool, &bin_ids).await?;

        let mut by_bin: HashMap<Uuid, Vec<AllocationView>> = HashMap::new();
        for row in details {
            by_bin.entry(row.bin_id).or_default().push(row.into());
        }

        Ok(bins
            .into_iter()
            .map(|bin| {
                let allocations = by_bin.remove(&bin.id).unwrap_or_default();
                BinView::new(bin, allocations)
            })
            .collect())
    }

    // --- DELETE BIN ---
    pub async fn delete_bin(&self, session: &Session, bin_id: Uuid) -> Result<(), AppError> {
        let deleted = self.bin_repo.delete_bin(&self.pool, session.tenant_id, bin_id).await?;
        if !deleted {
            return Err(AppError::BinNotFound(bin_id));
        }
        tracing::info!(bin_id = %bin_id, "Bin removido (alocações em cascata)");
        Ok(())
    }

    // --- ALLOCATE ---
    pub async fn allocate(&self, session: &Session, cmd: AllocateCommand) -> Result<AllocationResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Trava o bin: alocações concorrentes no mesmo bin ficam em fila
        let bins = self
            .bin_repo
            .lock_bins(&mut *tx, session.tenant_id, &[cmd.bin_id])
            .await?;
        if bins.is_empty() {
            return Err(AppError::BinNotFound(cmd.bin_id));
        }

        let product_known = self
            .bin_repo
            .product_exists(&mut *tx, session.tenant_id, cmd.product_id)
            .await?;
        if !product_known {
            return Err(AppError::ProductNotFound(cmd.product_id));
        }

        // 2. Regras de capacidade no razão em memória
        let allocations = self.bin_repo.allocations_for_bins(&mut *tx, &[cmd.bin_id]).await?;
        let mut ledger = BinLedger::from_rows(bins, allocations);
        let outcome = ledger.allocate(&cmd)?;

        // 3. Grava as mudanças e o histórico
        self.persist(&mut *tx, ledger.take_changes()).await?;
        self.bin_repo
            .record_movement(
                &mut *tx,
                outcome.warehouse_id,
                cmd.product_id,
                None,
                Some(cmd.bin_id),
                cmd.quantity,
                BinMovementKind::Allocation,
                session.user_id,
            )
            .await?;

        // 4. Commit (se algo falhar antes, o drop do tx faz rollback)
        tx.commit().await?;

        tracing::info!(
            bin_id = %cmd.bin_id,
            product_id = %cmd.product_id,
            quantity = cmd.quantity,
            action = ?outcome.action,
            "Produto alocado no bin {}",
            outcome.coordinates
        );

        Ok(AllocationResponse {
            allocation: outcome.allocation,
            action: outcome.action,
            coordinates: outcome.coordinates,
        })
    }

    // --- MOVE (bin -> bin, atômico) ---
    pub async fn move_stock(&self, session: &Session, cmd: MoveCommand) -> Result<MoveResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        // Os dois bins são travados juntos, em ordem de id
        let bin_ids = [cmd.from_bin_id, cmd.to_bin_id];
        let bins = self.bin_repo.lock_bins(&mut *tx, session.tenant_id, &bin_ids).await?;
        let allocations = self.bin_repo.allocations_for_bins(&mut *tx, &bin_ids).await?;

        let mut ledger = BinLedger::from_rows(bins, allocations);
        let outcome = ledger.move_stock(&cmd)?;

        // Débito + crédito + totais na mesma transação
        self.persist(&mut *tx, ledger.take_changes()).await?;
        self.bin_repo
            .record_movement(
                &mut *tx,
                outcome.warehouse_id,
                cmd.product_id,
                Some(cmd.from_bin_id),
                Some(cmd.to_bin_id),
                cmd.quantity,
                BinMovementKind::Transfer,
                session.user_id,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            from_bin_id = %cmd.from_bin_id,
            to_bin_id = %cmd.to_bin_id,
            product_id = %cmd.product_id,
            quantity = cmd.quantity,
            remaining = outcome.source_remaining,
            "Transferência {} -> {}",
            outcome.from,
            outcome.to
        );

        Ok(MoveResponse {
            success: true,
            message: format!("Moved {} units to bin {}", cmd.quantity, outcome.to),
            from_bin_id: cmd.from_bin_id,
            to_bin_id: cmd.to_bin_id,
            coordinates: outcome.to,
        })
    }

    // --- SALDO POR PRODUTO ---
    pub async fn product_stock(&self, session: &Session, warehouse_id: Uuid) -> Result<Vec<ProductStock>, AppError> {
        self.ensure_warehouse(session, warehouse_id).await?;
        self.bin_repo
            .product_totals(&self.pool, session.tenant_id, warehouse_id)
            .await
    }

    // --- HISTÓRICO ---
    pub async fn list_movements(
        &self,
        session: &Session,
        warehouse_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<BinMovement>, AppError> {
        self.ensure_warehouse(session, warehouse_id).await?;
        self.bin_repo
            .list_movements(session.tenant_id, warehouse_id, clamp_limit(limit))
            .await
    }

    async fn persist(&self, conn: &mut PgConnection, changes: Vec<LedgerChange>) -> Result<(), AppError> {
        for change in changes {
            match change {
                LedgerChange::InsertAllocation(allocation) => {
                    self.bin_repo.insert_allocation(&mut *conn, &allocation).await?;
                }
                LedgerChange::UpdateAllocation { id, quantity, volume_used } => {
                    self.bin_repo
                        .update_allocation(&mut *conn, id, quantity, volume_used)
                        .await?;
                }
                LedgerChange::DeleteAllocation { id } => {
                    self.bin_repo.delete_allocation(&mut *conn, id).await?;
                }
                LedgerChange::UpdateBinTotals { bin_id, current_quantity, current_volume } => {
                    self.bin_repo
                        .update_bin_totals(&mut *conn, bin_id, current_quantity, current_volume)
                        .await?;
                }
            }
        }
        Ok(())
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_MOVEMENT_LIMIT).clamp(1, MAX_MOVEMENT_LIMIT)
}
