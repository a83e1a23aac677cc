//! Supplier purchase (goods receipt) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DocumentStatus;

/// Purchase header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub user_id: Uuid,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub total_amount: Decimal,
    pub purchase_date: DateTime<Utc>,
    pub status: DocumentStatus,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    pub fn is_voided(&self) -> bool {
        self.status == DocumentStatus::Voided
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseItem {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub cost_at_purchase: Decimal,
}

impl PurchaseItem {
    /// `None` when the product does not fit in a `Decimal`
    pub fn line_total(&self) -> Option<Decimal> {
        self.cost_at_purchase.checked_mul(Decimal::from(self.quantity))
    }
}
