//! Inventory movement models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Every way stock can change. The wire and database spelling is the
/// historical one used by the shop (Spanish for document-driven kinds).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "movement_kind"))]
pub enum MovementKind {
    #[serde(rename = "VENTA")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "VENTA"))]
    Sale,
    #[serde(rename = "COMPRA_PROVEEDOR")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "COMPRA_PROVEEDOR"))]
    SupplierPurchase,
    #[serde(rename = "ENTRY")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ENTRY"))]
    Entry,
    #[serde(rename = "EXIT")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "EXIT"))]
    Exit,
    #[serde(rename = "ADJUSTMENT")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ADJUSTMENT"))]
    Adjustment,
    #[serde(rename = "DAMAGE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "DAMAGE"))]
    Damage,
    #[serde(rename = "AJUSTE_POSITIVO")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "AJUSTE_POSITIVO"))]
    PositiveCorrection,
    #[serde(rename = "AJUSTE_NEGATIVO")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "AJUSTE_NEGATIVO"))]
    NegativeCorrection,
}

impl MovementKind {
    pub const ALL: [MovementKind; 8] = [
        MovementKind::Sale,
        MovementKind::SupplierPurchase,
        MovementKind::Entry,
        MovementKind::Exit,
        MovementKind::Adjustment,
        MovementKind::Damage,
        MovementKind::PositiveCorrection,
        MovementKind::NegativeCorrection,
    ];

    /// +1 for kinds that add stock, -1 for kinds that remove it
    pub fn sign(&self) -> i32 {
        match self {
            MovementKind::SupplierPurchase
            | MovementKind::Entry
            | MovementKind::Adjustment
            | MovementKind::PositiveCorrection => 1,
            MovementKind::Sale
            | MovementKind::Exit
            | MovementKind::Damage
            | MovementKind::NegativeCorrection => -1,
        }
    }

    /// Kinds staff may record by hand; the rest are produced by documents
    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            MovementKind::Entry | MovementKind::Exit | MovementKind::Adjustment | MovementKind::Damage
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Sale => "VENTA",
            MovementKind::SupplierPurchase => "COMPRA_PROVEEDOR",
            MovementKind::Entry => "ENTRY",
            MovementKind::Exit => "EXIT",
            MovementKind::Adjustment => "ADJUSTMENT",
            MovementKind::Damage => "DAMAGE",
            MovementKind::PositiveCorrection => "AJUSTE_POSITIVO",
            MovementKind::NegativeCorrection => "AJUSTE_NEGATIVO",
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MovementKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown movement type: {s}"))
    }
}

/// Append-only audit record of a stock change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub movement_type: MovementKind,
    /// Absolute quantity moved, always positive
    pub quantity: i32,
    /// Signed delta applied to the product's stock
    pub quantity_change: i32,
    pub reason: String,
    pub notes: Option<String>,
    pub related_sale_id: Option<Uuid>,
    pub related_purchase_id: Option<Uuid>,
    /// Movement this one compensates (voids)
    pub reversal_of: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    /// New movement with the delta derived from the kind's sign
    pub fn record(
        product_id: Uuid,
        user_id: Uuid,
        movement_type: MovementKind,
        quantity: i32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            user_id,
            movement_type,
            quantity,
            quantity_change: movement_type.sign() * quantity,
            reason: reason.into(),
            notes: None,
            related_sale_id: None,
            related_purchase_id: None,
            reversal_of: None,
            created_at: Utc::now(),
        }
    }
}
