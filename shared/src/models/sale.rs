//! Sales models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a sale was paid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "payment_type"))]
pub enum PaymentType {
    #[default]
    #[serde(rename = "EFECTIVO")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "EFECTIVO"))]
    Cash,
    #[serde(rename = "TARJETA")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "TARJETA"))]
    Card,
    #[serde(rename = "TRANSFERENCIA")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "TRANSFERENCIA"))]
    Transfer,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "EFECTIVO",
            PaymentType::Card => "TARJETA",
            PaymentType::Transfer => "TRANSFERENCIA",
        }
    }
}

/// Lifecycle of a sale or purchase. VOIDED is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "document_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    #[default]
    Completed,
    Voided,
}

/// Sale header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub cash_register_session_id: Option<Uuid>,
    pub payment_type: PaymentType,
    pub total_amount: Decimal,
    pub sale_date: DateTime<Utc>,
    pub status: DocumentStatus,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    pub fn is_voided(&self) -> bool {
        self.status == DocumentStatus::Voided
    }
}

/// One line of a sale, priced at the moment of sale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_sale: Decimal,
}

impl SaleItem {
    /// `None` when the product does not fit in a `Decimal`
    pub fn line_total(&self) -> Option<Decimal> {
        self.price_at_sale.checked_mul(Decimal::from(self.quantity))
    }
}
