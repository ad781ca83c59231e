// src/models/warehouse.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Armazém ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Warehouse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[schema(example = "CD Guarulhos")]
    pub name: String,
    #[schema(example = "GRU-01")]
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 2. Bin (posição física x, y, z dentro do armazém) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Bin {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub section_id: Option<Uuid>,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    #[schema(example = "A-01-03")]
    pub bin_code: Option<String>,

    pub max_quantity: i32,
    pub current_quantity: i32, // Soma das alocações

    // Volume é opcional: 0 significa "não controlado"
    #[schema(value_type = f64)]
    pub max_volume: Decimal,
    #[schema(value_type = f64)]
    pub current_volume: Decimal,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bin {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates { x: self.x, y: self.y, z: self.z }
    }

    pub fn free_quantity(&self) -> i64 {
        i64::from(self.max_quantity) - i64::from(self.current_quantity)
    }

    pub fn tracks_volume(&self) -> bool {
        self.max_volume > Decimal::ZERO
    }

    pub fn fill_ratio(&self) -> f64 {
        if self.max_quantity <= 0 {
            return 0.0;
        }
        f64::from(self.current_quantity) / f64::from(self.max_quantity)
    }

    pub fn fill_status(&self) -> FillStatus {
        FillStatus::from_ratio(self.fill_ratio())
    }
}

// Colunas de volume são NUMERIC(14, 4)
pub const VOLUME_SCALE: u32 = 4;
const VOLUME_LIMIT: i64 = 10_000_000_000;

/// O volume cabe na coluna sem arredondar nem estourar.
pub fn volume_fits_column(volume: Decimal) -> bool {
    volume.normalize().scale() <= VOLUME_SCALE && volume.abs() < Decimal::from(VOLUME_LIMIT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

// Faixas usadas pelo visualizador 3D para colorir os cubos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FillStatus {
    Empty,
    Partial,
    Full,
}

impl FillStatus {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 1.0 {
            FillStatus::Full
        } else if ratio > 0.0 {
            FillStatus::Partial
        } else {
            FillStatus::Empty
        }
    }
}

// --- 3. Alocação (quantidade de um produto guardada num bin) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BinAllocation {
    pub id: Uuid,
    pub bin_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[schema(value_type = f64)]
    pub volume_used: Decimal,
    pub client_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Linha "achatada" do JOIN alocação + produto
#[derive(Debug, Clone, FromRow)]
pub struct AllocationDetailRow {
    pub id: Uuid,
    pub bin_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub volume_used: Decimal,
    pub client_id: Option<Uuid>,
    pub product_sku: String,
    pub product_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductLabel {
    pub id: Uuid,
    #[schema(example = "SKU-0001")]
    pub sku: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AllocationView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[schema(value_type = f64)]
    pub volume_used: Decimal,
    pub client_id: Option<Uuid>,
    pub product: ProductLabel,
}

impl From<AllocationDetailRow> for AllocationView {
    fn from(row: AllocationDetailRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
            volume_used: row.volume_used,
            client_id: row.client_id,
            product: ProductLabel {
                id: row.product_id,
                sku: row.product_sku,
                name: row.product_name,
            },
        }
    }
}

// O bin como o front (tabela + cena 3D) consome
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BinView {
    #[serde(flatten)]
    pub bin: Bin,
    pub fill_ratio: f64,
    pub fill_status: FillStatus,
    pub bin_allocations: Vec<AllocationView>,
}

impl BinView {
    pub fn new(bin: Bin, bin_allocations: Vec<AllocationView>) -> Self {
        Self {
            fill_ratio: bin.fill_ratio(),
            fill_status: bin.fill_status(),
            bin,
            bin_allocations,
        }
    }
}

// --- 4. Saldo de um produto somando todos os bins do armazém ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ProductStock {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub total_quantity: i64,
    pub bin_count: i64,
}

// --- 5. Histórico de movimentações ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "bin_movement_kind", rename_all = "SCREAMING_SNAKE_CASE")] // Banco
#[serde(rename_all = "SCREAMING_SNAKE_CASE")] // JSON
pub enum BinMovementKind {
    Allocation, // Vira "ALLOCATION"
    Transfer,   // Vira "TRANSFER"
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BinMovement {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub from_bin_id: Option<Uuid>,
    pub to_bin_id: Option<Uuid>,
    pub quantity: i32,
    pub kind: BinMovementKind,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// Resultado de uma alocação: o front mostra "criada" ou "atualizada"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AllocationAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AllocationResponse {
    pub allocation: BinAllocation,
    pub action: AllocationAction,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MoveResponse {
    pub success: bool,
    #[schema(example = "Moved 4 units to bin (1,0,2)")]
    pub message: String,
    pub from_bin_id: Uuid,
    pub to_bin_id: Uuid,
    pub coordinates: Coordinates,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin_with(current: i32, max: i32) -> Bin {
        let now = Utc::now();
        Bin {
            id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            section_id: None,
            x: 1,
            y: 2,
            z: 3,
            bin_code: None,
            max_quantity: max,
            current_quantity: current,
            max_volume: Decimal::ZERO,
            current_volume: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn fill_status_follows_visualizer_thresholds() {
        assert_eq!(bin_with(0, 10).fill_status(), FillStatus::Empty);
        assert_eq!(bin_with(1, 10).fill_status(), FillStatus::Partial);
        assert_eq!(bin_with(9, 10).fill_status(), FillStatus::Partial);
        assert_eq!(bin_with(10, 10).fill_status(), FillStatus::Full);
    }

    #[test]
    fn bin_view_flattens_bin_fields() {
        let view = BinView::new(bin_with(5, 10), vec![]);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["x"], 1);
        assert_eq!(json["current_quantity"], 5);
        assert_eq!(json["fill_ratio"], 0.5);
        assert_eq!(json["fill_status"], "partial");
        assert!(json["bin_allocations"].as_array().unwrap().is_empty());
    }

    #[test]
    fn coordinates_display_like_the_floor_plan() {
        assert_eq!(bin_with(0, 1).coordinates().to_string(), "(1,2,3)");
    }

    #[test]
    fn volume_must_fit_numeric_14_4() {
        assert!(volume_fits_column(Decimal::new(12345, 4)));
        assert!(volume_fits_column(Decimal::new(150000, 5))); // 1.50000
        assert!(volume_fits_column(Decimal::new(99_999_999_999_999, 4)));
        assert!(!volume_fits_column(Decimal::new(4, 5))); // 0.00004
        assert!(!volume_fits_column(Decimal::from(10_000_000_000i64)));
    }
}
