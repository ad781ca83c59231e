// src/services/bin_ledger.rs
//
// Regras de alocação e transferência entre bins, sem banco de dados.
// O serviço carrega (e trava) as linhas envolvidas, roda a operação aqui e
// grava as mudanças do diário na mesma transação.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::warehouse::{volume_fits_column, AllocationAction, Bin, BinAllocation, Coordinates, VOLUME_SCALE},
};

/// Uma mudança de linha que o repositório precisa aplicar.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerChange {
    InsertAllocation(BinAllocation),
    UpdateAllocation { id: Uuid, quantity: i32, volume_used: Decimal },
    DeleteAllocation { id: Uuid },
    UpdateBinTotals { bin_id: Uuid, current_quantity: i32, current_volume: Decimal },
}

#[derive(Debug, Clone)]
pub struct AllocateCommand {
    pub bin_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub volume_used: Decimal,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct MoveCommand {
    pub from_bin_id: Uuid,
    pub to_bin_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    pub warehouse_id: Uuid,
    pub allocation: BinAllocation,
    pub action: AllocationAction,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub warehouse_id: Uuid,
    pub from: Coordinates,
    pub to: Coordinates,
    pub moved_volume: Decimal,
    pub source_remaining: i32,
}

#[derive(Debug, Clone, Default)]
pub struct BinLedger {
    bins: HashMap<Uuid, Bin>,
    allocations: HashMap<(Uuid, Uuid), BinAllocation>,
    journal: Vec<LedgerChange>,
    dirty_bins: BTreeSet<Uuid>,
}

impl BinLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monta o razão a partir das linhas do banco. Os totais dos bins são
    /// recalculados a partir das alocações; divergências ficam marcadas para
    /// serem corrigidas na próxima escrita.
    pub fn from_rows(bins: Vec<Bin>, allocations: Vec<BinAllocation>) -> Self {
        let mut ledger = Self::new();
        for bin in bins {
            ledger.bins.insert(bin.id, bin);
        }
        for allocation in allocations {
            if ledger.bins.contains_key(&allocation.bin_id) {
                ledger
                    .allocations
                    .insert((allocation.bin_id, allocation.product_id), allocation);
            }
        }
        ledger.reconcile_totals();
        ledger
    }

    fn reconcile_totals(&mut self) {
        let mut sums: HashMap<Uuid, (i64, Decimal)> = HashMap::new();
        for allocation in self.allocations.values() {
            let entry = sums.entry(allocation.bin_id).or_insert((0, Decimal::ZERO));
            entry.0 += i64::from(allocation.quantity);
            entry.1 += allocation.volume_used;
        }

        for bin in self.bins.values_mut() {
            let (quantity, volume) = sums.get(&bin.id).copied().unwrap_or((0, Decimal::ZERO));
            let quantity = i32::try_from(quantity).unwrap_or(i32::MAX);
            if bin.current_quantity != quantity || bin.current_volume != volume {
                tracing::warn!(
                    bin_id = %bin.id,
                    stored = bin.current_quantity,
                    computed = quantity,
                    "Total do bin divergente das alocações; será corrigido"
                );
                bin.current_quantity = quantity;
                bin.current_volume = volume;
                self.dirty_bins.insert(bin.id);
            }
        }
    }

    /// Adiciona um bin vazio, respeitando a unicidade (armazém, x, y, z).
    #[cfg(test)]
    fn insert_bin(&mut self, bin: Bin) -> Result<(), AppError> {
        let taken = self.bins.values().any(|other| {
            other.warehouse_id == bin.warehouse_id && other.coordinates() == bin.coordinates()
        });
        if taken {
            return Err(AppError::BinAlreadyExists(bin.coordinates()));
        }
        self.bins.insert(bin.id, bin);
        Ok(())
    }

    #[cfg(test)]
    fn bin(&self, bin_id: Uuid) -> Option<&Bin> {
        self.bins.get(&bin_id)
    }

    #[cfg(test)]
    fn allocation(&self, bin_id: Uuid, product_id: Uuid) -> Option<&BinAllocation> {
        self.allocations.get(&(bin_id, product_id))
    }

    #[cfg(test)]
    fn allocations_in(&self, bin_id: Uuid) -> impl Iterator<Item = &BinAllocation> {
        self.allocations.values().filter(move |a| a.bin_id == bin_id)
    }

    /// Quantidade total do produto somando todos os bins do armazém.
    #[cfg(test)]
    fn product_total(&self, warehouse_id: Uuid, product_id: Uuid) -> i64 {
        self.allocations
            .values()
            .filter(|a| a.product_id == product_id)
            .filter(|a| {
                self.bins
                    .get(&a.bin_id)
                    .is_some_and(|b| b.warehouse_id == warehouse_id)
            })
            .map(|a| i64::from(a.quantity))
            .sum()
    }

    /// Esvazia o diário: mudanças de alocação na ordem em que ocorreram,
    /// seguidas de um único UpdateBinTotals por bin alterado.
    pub fn take_changes(&mut self) -> Vec<LedgerChange> {
        let mut changes: Vec<LedgerChange> = self.journal.drain(..).collect();
        for bin_id in std::mem::take(&mut self.dirty_bins) {
            if let Some(bin) = self.bins.get(&bin_id) {
                changes.push(LedgerChange::UpdateBinTotals {
                    bin_id,
                    current_quantity: bin.current_quantity,
                    current_volume: bin.current_volume,
                });
            }
        }
        changes
    }

    // ---
    // Operações
    // ---

    pub fn allocate(&mut self, cmd: &AllocateCommand) -> Result<AllocationOutcome, AppError> {
        validate_quantity(cmd.quantity)?;
        if cmd.volume_used.is_sign_negative() {
            return Err(AppError::invalid_field(
                "volume_used",
                "range",
                "volume_used must not be negative",
            ));
        }
        if !volume_fits_column(cmd.volume_used) {
            return Err(AppError::invalid_field(
                "volume_used",
                "volume_precision",
                "volume_used must have at most 4 decimal places",
            ));
        }

        let bin = self.bins.get(&cmd.bin_id).ok_or(AppError::BinNotFound(cmd.bin_id))?;
        ensure_room(bin, cmd.quantity, cmd.volume_used)?;
        let warehouse_id = bin.warehouse_id;
        let coordinates = bin.coordinates();

        // Tudo validado: daqui em diante nada falha.
        let (allocation, action) = self.credit(
            cmd.bin_id,
            cmd.product_id,
            cmd.quantity,
            cmd.volume_used,
            cmd.client_id,
        );

        Ok(AllocationOutcome { warehouse_id, allocation, action, coordinates })
    }

    pub fn move_stock(&mut self, cmd: &MoveCommand) -> Result<MoveOutcome, AppError> {
        validate_quantity(cmd.quantity)?;
        if cmd.from_bin_id == cmd.to_bin_id {
            return Err(AppError::invalid_field(
                "to_bin_id",
                "same_bin",
                "Source and destination bin must be different",
            ));
        }

        let source = self
            .bins
            .get(&cmd.from_bin_id)
            .ok_or(AppError::BinNotFound(cmd.from_bin_id))?;
        let destination = self
            .bins
            .get(&cmd.to_bin_id)
            .ok_or(AppError::BinNotFound(cmd.to_bin_id))?;

        if source.warehouse_id != destination.warehouse_id {
            return Err(AppError::invalid_field(
                "to_bin_id",
                "different_warehouse",
                "Source and destination bins belong to different warehouses",
            ));
        }

        let source_allocation = self
            .allocations
            .get(&(cmd.from_bin_id, cmd.product_id))
            .ok_or(AppError::AllocationNotFound {
                bin_id: cmd.from_bin_id,
                product_id: cmd.product_id,
            })?;

        let available = source_allocation.quantity;
        if cmd.quantity > available {
            return Err(AppError::InsufficientStock { available, requested: cmd.quantity });
        }

        // O volume acompanha a mercadoria proporcionalmente
        let moved_volume = if cmd.quantity == available {
            source_allocation.volume_used
        } else {
            (source_allocation.volume_used * Decimal::from(cmd.quantity) / Decimal::from(available))
                .round_dp(VOLUME_SCALE)
        };

        ensure_room(destination, cmd.quantity, moved_volume)?;

        let warehouse_id = source.warehouse_id;
        let from = source.coordinates();
        let to = destination.coordinates();
        let client_id = source_allocation.client_id;

        // Débito e crédito só depois de todas as verificações.
        let source_remaining = self.debit(cmd.from_bin_id, cmd.product_id, cmd.quantity, moved_volume);
        self.credit(cmd.to_bin_id, cmd.product_id, cmd.quantity, moved_volume, client_id);

        Ok(MoveOutcome { warehouse_id, from, to, moved_volume, source_remaining })
    }

    // ---
    // Mutações internas (pré-condições já verificadas)
    // ---

    fn credit(
        &mut self,
        bin_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        volume: Decimal,
        client_id: Option<Uuid>,
    ) -> (BinAllocation, AllocationAction) {
        let now = Utc::now();
        let result = match self.allocations.get_mut(&(bin_id, product_id)) {
            Some(existing) => {
                existing.quantity += quantity;
                existing.volume_used += volume;
                existing.updated_at = now;
                self.journal.push(LedgerChange::UpdateAllocation {
                    id: existing.id,
                    quantity: existing.quantity,
                    volume_used: existing.volume_used,
                });
                (existing.clone(), AllocationAction::Updated)
            }
            None => {
                let allocation = BinAllocation {
                    id: Uuid::new_v4(),
                    bin_id,
                    product_id,
                    quantity,
                    volume_used: volume,
                    client_id,
                    created_at: now,
                    updated_at: now,
                };
                self.journal.push(LedgerChange::InsertAllocation(allocation.clone()));
                self.allocations.insert((bin_id, product_id), allocation.clone());
                (allocation, AllocationAction::Created)
            }
        };

        self.adjust_totals(bin_id, quantity, volume);
        result
    }

    // Retorna o que sobrou na origem; linha zerada é removida.
    fn debit(&mut self, bin_id: Uuid, product_id: Uuid, quantity: i32, volume: Decimal) -> i32 {
        let key = (bin_id, product_id);
        let remaining = match self.allocations.get_mut(&key) {
            Some(existing) if existing.quantity > quantity => {
                existing.quantity -= quantity;
                existing.volume_used = (existing.volume_used - volume).max(Decimal::ZERO);
                existing.updated_at = Utc::now();
                self.journal.push(LedgerChange::UpdateAllocation {
                    id: existing.id,
                    quantity: existing.quantity,
                    volume_used: existing.volume_used,
                });
                existing.quantity
            }
            Some(_) => {
                if let Some(removed) = self.allocations.remove(&key) {
                    self.journal.push(LedgerChange::DeleteAllocation { id: removed.id });
                }
                0
            }
            None => return 0,
        };

        self.adjust_totals(bin_id, -quantity, -volume);
        remaining
    }

    fn adjust_totals(&mut self, bin_id: Uuid, quantity: i32, volume: Decimal) {
        if let Some(bin) = self.bins.get_mut(&bin_id) {
            bin.current_quantity += quantity;
            bin.current_volume = (bin.current_volume + volume).max(Decimal::ZERO);
            bin.updated_at = Utc::now();
            self.dirty_bins.insert(bin_id);
        }
    }
}

fn validate_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(AppError::invalid_field("quantity", "range", "quantity must be at least 1"));
    }
    Ok(())
}

fn ensure_room(bin: &Bin, quantity: i32, volume: Decimal) -> Result<(), AppError> {
    if i64::from(quantity) > bin.free_quantity() {
        return Err(AppError::CapacityExceeded {
            coordinates: bin.coordinates(),
            capacity: bin.max_quantity,
            current: bin.current_quantity,
            requested: quantity,
        });
    }

    if bin.tracks_volume() && bin.current_volume + volume > bin.max_volume {
        return Err(AppError::VolumeExceeded {
            coordinates: bin.coordinates(),
            capacity: bin.max_volume,
            current: bin.current_volume,
            requested: volume,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn bin_at(warehouse_id: Uuid, x: i32, max_quantity: i32) -> Bin {
        let now = Utc::now();
        Bin {
            id: Uuid::new_v4(),
            warehouse_id,
            section_id: None,
            x,
            y: 0,
            z: 0,
            bin_code: None,
            max_quantity,
            current_quantity: 0,
            max_volume: Decimal::ZERO,
            current_volume: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    fn allocate(ledger: &mut BinLedger, bin_id: Uuid, product_id: Uuid, quantity: i32) -> Result<AllocationOutcome, AppError> {
        ledger.allocate(&AllocateCommand {
            bin_id,
            product_id,
            quantity,
            volume_used: Decimal::ZERO,
            client_id: None,
        })
    }

    fn move_qty(ledger: &mut BinLedger, from: Uuid, to: Uuid, product_id: Uuid, quantity: i32) -> Result<MoveOutcome, AppError> {
        ledger.move_stock(&MoveCommand { from_bin_id: from, to_bin_id: to, product_id, quantity })
    }

    fn assert_invariants(ledger: &BinLedger) {
        for bin in ledger.bins.values() {
            let sum: i32 = ledger.allocations_in(bin.id).map(|a| a.quantity).sum();
            assert_eq!(bin.current_quantity, sum, "total do bin {} diverge", bin.id);
            assert!(bin.current_quantity <= bin.max_quantity);
        }
        assert!(ledger.allocations.values().all(|a| a.quantity > 0));
    }

    #[test]
    fn allocate_until_full_then_reject() {
        let warehouse = Uuid::new_v4();
        let sku1 = Uuid::new_v4();
        let mut ledger = BinLedger::new();
        let bin = bin_at(warehouse, 0, 10);
        let bin_id = bin.id;
        ledger.insert_bin(bin).unwrap();

        let outcome = allocate(&mut ledger, bin_id, sku1, 10).unwrap();
        assert_eq!(outcome.action, AllocationAction::Created);
        assert_eq!(ledger.bin(bin_id).unwrap().current_quantity, 10);

        let err = allocate(&mut ledger, bin_id, sku1, 1).unwrap_err();
        assert!(matches!(
            err,
            AppError::CapacityExceeded { capacity: 10, current: 10, requested: 1, .. }
        ));
        assert_eq!(ledger.bin(bin_id).unwrap().current_quantity, 10);
        assert_invariants(&ledger);
    }

    #[test]
    fn second_allocation_increments_the_same_row() {
        let mut ledger = BinLedger::new();
        let bin = bin_at(Uuid::new_v4(), 0, 100);
        let bin_id = bin.id;
        let product = Uuid::new_v4();
        ledger.insert_bin(bin).unwrap();

        let first = allocate(&mut ledger, bin_id, product, 5).unwrap();
        let second = allocate(&mut ledger, bin_id, product, 3).unwrap();

        assert_eq!(second.action, AllocationAction::Updated);
        assert_eq!(first.allocation.id, second.allocation.id);
        assert_eq!(ledger.allocations_in(bin_id).count(), 1);
        assert_eq!(ledger.allocation(bin_id, product).unwrap().quantity, 8);
    }

    #[test]
    fn allocate_rejects_zero_and_unknown_bin() {
        let mut ledger = BinLedger::new();
        let bin = bin_at(Uuid::new_v4(), 0, 10);
        let bin_id = bin.id;
        ledger.insert_bin(bin).unwrap();

        assert!(matches!(
            allocate(&mut ledger, bin_id, Uuid::new_v4(), 0),
            Err(AppError::ValidationError(_))
        ));
        let missing = Uuid::new_v4();
        assert!(matches!(
            allocate(&mut ledger, missing, Uuid::new_v4(), 1),
            Err(AppError::BinNotFound(id)) if id == missing
        ));
        assert!(ledger.take_changes().is_empty());
    }

    #[test]
    fn move_conserves_total_and_prunes_nothing_when_partial() {
        let warehouse = Uuid::new_v4();
        let product = Uuid::new_v4();
        let mut ledger = BinLedger::new();
        let a = bin_at(warehouse, 0, 10);
        let b = bin_at(warehouse, 1, 10);
        let (a_id, b_id) = (a.id, b.id);
        ledger.insert_bin(a).unwrap();
        ledger.insert_bin(b).unwrap();
        allocate(&mut ledger, a_id, product, 10).unwrap();

        let outcome = move_qty(&mut ledger, a_id, b_id, product, 4).unwrap();

        assert_eq!(outcome.source_remaining, 6);
        assert_eq!(ledger.allocation(a_id, product).unwrap().quantity, 6);
        assert_eq!(ledger.allocation(b_id, product).unwrap().quantity, 4);
        assert_eq!(ledger.product_total(warehouse, product), 10);
        assert_invariants(&ledger);
    }

    #[test]
    fn moving_everything_deletes_the_source_row() {
        let warehouse = Uuid::new_v4();
        let product = Uuid::new_v4();
        let mut ledger = BinLedger::new();
        let a = bin_at(warehouse, 0, 10);
        let b = bin_at(warehouse, 1, 10);
        let (a_id, b_id) = (a.id, b.id);
        ledger.insert_bin(a).unwrap();
        ledger.insert_bin(b).unwrap();
        let created = allocate(&mut ledger, a_id, product, 5).unwrap();
        ledger.take_changes();

        move_qty(&mut ledger, a_id, b_id, product, 5).unwrap();

        assert!(ledger.allocation(a_id, product).is_none());
        let changes = ledger.take_changes();
        assert!(changes.contains(&LedgerChange::DeleteAllocation { id: created.allocation.id }));
        assert!(changes.iter().any(|c| matches!(c, LedgerChange::InsertAllocation(a) if a.bin_id == b_id)));
        let totals = changes
            .iter()
            .filter(|c| matches!(c, LedgerChange::UpdateBinTotals { .. }))
            .count();
        assert_eq!(totals, 2);
    }

    #[test]
    fn move_into_small_bin_is_rejected_atomically() {
        let warehouse = Uuid::new_v4();
        let product = Uuid::new_v4();
        let mut ledger = BinLedger::new();
        let a = bin_at(warehouse, 0, 10);
        let b = bin_at(warehouse, 1, 3);
        let (a_id, b_id) = (a.id, b.id);
        ledger.insert_bin(a).unwrap();
        ledger.insert_bin(b).unwrap();
        allocate(&mut ledger, a_id, product, 5).unwrap();
        ledger.take_changes();

        let err = move_qty(&mut ledger, a_id, b_id, product, 5).unwrap_err();

        assert!(matches!(err, AppError::CapacityExceeded { capacity: 3, current: 0, requested: 5, .. }));
        assert_eq!(ledger.allocation(a_id, product).unwrap().quantity, 5);
        assert_eq!(ledger.bin(b_id).unwrap().current_quantity, 0);
        assert!(ledger.take_changes().is_empty());
    }

    #[test]
    fn move_validation_errors() {
        let warehouse = Uuid::new_v4();
        let product = Uuid::new_v4();
        let mut ledger = BinLedger::new();
        let a = bin_at(warehouse, 0, 10);
        let b = bin_at(warehouse, 1, 10);
        let elsewhere = bin_at(Uuid::new_v4(), 0, 10);
        let (a_id, b_id, c_id) = (a.id, b.id, elsewhere.id);
        ledger.insert_bin(a).unwrap();
        ledger.insert_bin(b).unwrap();
        ledger.insert_bin(elsewhere).unwrap();
        allocate(&mut ledger, a_id, product, 2).unwrap();

        assert!(matches!(move_qty(&mut ledger, a_id, a_id, product, 1), Err(AppError::ValidationError(_))));
        assert!(matches!(move_qty(&mut ledger, a_id, b_id, product, 0), Err(AppError::ValidationError(_))));
        assert!(matches!(move_qty(&mut ledger, a_id, c_id, product, 1), Err(AppError::ValidationError(_))));
        assert!(matches!(
            move_qty(&mut ledger, b_id, a_id, product, 1),
            Err(AppError::AllocationNotFound { .. })
        ));
        assert!(matches!(
            move_qty(&mut ledger, a_id, b_id, product, 3),
            Err(AppError::InsufficientStock { available: 2, requested: 3 })
        ));
    }

    #[test]
    fn duplicate_coordinates_are_rejected_per_warehouse() {
        let warehouse = Uuid::new_v4();
        let mut ledger = BinLedger::new();
        ledger.insert_bin(bin_at(warehouse, 0, 10)).unwrap();

        assert!(matches!(
            ledger.insert_bin(bin_at(warehouse, 0, 10)),
            Err(AppError::BinAlreadyExists(_))
        ));
        ledger.insert_bin(bin_at(Uuid::new_v4(), 0, 10)).unwrap();
    }

    #[test]
    fn volume_limit_is_enforced_and_follows_moves() {
        let warehouse = Uuid::new_v4();
        let product = Uuid::new_v4();
        let mut ledger = BinLedger::new();
        let mut a = bin_at(warehouse, 0, 100);
        a.max_volume = Decimal::new(10, 0);
        let mut b = bin_at(warehouse, 1, 100);
        b.max_volume = Decimal::new(4, 0);
        let (a_id, b_id) = (a.id, b.id);
        ledger.insert_bin(a).unwrap();
        ledger.insert_bin(b).unwrap();

        ledger
            .allocate(&AllocateCommand {
                bin_id: a_id,
                product_id: product,
                quantity: 10,
                volume_used: Decimal::new(8, 0),
                client_id: None,
            })
            .unwrap();
        let err = ledger
            .allocate(&AllocateCommand {
                bin_id: a_id,
                product_id: product,
                quantity: 1,
                volume_used: Decimal::new(3, 0),
                client_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, AppError::VolumeExceeded { .. }));

        // 5 de 10 unidades levam metade do volume (4.0) e cabem em B
        let outcome = move_qty(&mut ledger, a_id, b_id, product, 5).unwrap();
        assert_eq!(outcome.moved_volume, Decimal::new(4, 0));
        assert_eq!(ledger.bin(b_id).unwrap().current_volume, Decimal::new(4, 0));
        assert_eq!(ledger.bin(a_id).unwrap().current_volume, Decimal::new(4, 0));

        // B está cheio em volume
        assert!(matches!(
            move_qty(&mut ledger, a_id, b_id, product, 1),
            Err(AppError::VolumeExceeded { .. })
        ));
    }

    #[test]
    fn volume_beyond_column_precision_is_rejected() {
        let mut ledger = BinLedger::new();
        let bin = bin_at(Uuid::new_v4(), 0, 100);
        let bin_id = bin.id;
        ledger.insert_bin(bin).unwrap();

        let err = ledger
            .allocate(&AllocateCommand {
                bin_id,
                product_id: Uuid::new_v4(),
                quantity: 1,
                volume_used: Decimal::new(4, 5), // 0.00004
                client_id: None,
            })
            .unwrap_err();

        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(ledger.bin(bin_id).unwrap().current_volume, Decimal::ZERO);
        assert!(ledger.take_changes().is_empty());
    }

    #[test]
    fn from_rows_repairs_drifted_totals() {
        let warehouse = Uuid::new_v4();
        let mut bin = bin_at(warehouse, 0, 10);
        bin.current_quantity = 9;
        let bin_id = bin.id;
        let now = Utc::now();
        let allocation = BinAllocation {
            id: Uuid::new_v4(),
            bin_id,
            product_id: Uuid::new_v4(),
            quantity: 4,
            volume_used: Decimal::ZERO,
            client_id: None,
            created_at: now,
            updated_at: now,
        };

        let mut ledger = BinLedger::from_rows(vec![bin], vec![allocation]);

        assert_eq!(ledger.bin(bin_id).unwrap().current_quantity, 4);
        assert_eq!(
            ledger.take_changes(),
            vec![LedgerChange::UpdateBinTotals {
                bin_id,
                current_quantity: 4,
                current_volume: Decimal::ZERO,
            }]
        );
    }

    #[derive(Debug, Clone)]
    enum Op {
        Allocate { bin: usize, product: usize, quantity: i32 },
        Move { from: usize, to: usize, product: usize, quantity: i32 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..3, 0usize..2, -2i32..15)
                .prop_map(|(bin, product, quantity)| Op::Allocate { bin, product, quantity }),
            (0usize..3, 0usize..3, 0usize..2, -2i32..15)
                .prop_map(|(from, to, product, quantity)| Op::Move { from, to, product, quantity }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn invariants_hold_for_any_sequence(
            capacities in prop::collection::vec(1i32..20, 3),
            ops in prop::collection::vec(op_strategy(), 1..40),
        ) {
            let warehouse = Uuid::new_v4();
            let products = [Uuid::new_v4(), Uuid::new_v4()];
            let mut ledger = BinLedger::new();
            let mut bin_ids = Vec::new();
            for (x, max) in capacities.iter().enumerate() {
                let bin = bin_at(warehouse, x as i32, *max);
                bin_ids.push(bin.id);
                ledger.insert_bin(bin).unwrap();
            }

            for op in ops {
                let before_bins = ledger.bins.clone();
                let before_allocations = ledger.allocations.clone();

                match op {
                    Op::Allocate { bin, product, quantity } => {
                        let total_before = ledger.product_total(warehouse, products[product]);
                        match allocate(&mut ledger, bin_ids[bin], products[product], quantity) {
                            Ok(_) => prop_assert_eq!(
                                ledger.product_total(warehouse, products[product]),
                                total_before + i64::from(quantity)
                            ),
                            Err(_) => {
                                prop_assert_eq!(&ledger.bins, &before_bins);
                                prop_assert_eq!(&ledger.allocations, &before_allocations);
                            }
                        }
                    }
                    Op::Move { from, to, product, quantity } => {
                        let total_before = ledger.product_total(warehouse, products[product]);
                        let result = move_qty(&mut ledger, bin_ids[from], bin_ids[to], products[product], quantity);
                        if result.is_err() {
                            prop_assert_eq!(&ledger.bins, &before_bins);
                            prop_assert_eq!(&ledger.allocations, &before_allocations);
                        }
                        prop_assert_eq!(ledger.product_total(warehouse, products[product]), total_before);
                    }
                }

                assert_invariants(&ledger);
                ledger.take_changes();
            }
        }
    }
}
