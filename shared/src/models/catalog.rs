//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock at or below this level is reported as low unless configured otherwise
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

/// A sellable product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    /// Last purchase cost, overwritten on every supplier receipt
    pub cost: Decimal,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: bool,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Only active products with stock on hand can be rung up
    pub fn can_sell(&self) -> bool {
        self.is_active && self.stock > 0
    }

    pub fn stock_status(&self, low_stock_threshold: i32) -> StockStatus {
        StockStatus::classify(self.stock, low_stock_threshold)
    }

    /// Inventory value at last cost
    pub fn stock_value(&self) -> Decimal {
        self.cost * Decimal::from(self.stock)
    }
}

/// Stock level bucket shown at the register
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StockStatus {
    #[serde(rename = "sin_stock")]
    OutOfStock,
    #[serde(rename = "stock_bajo")]
    Low,
    #[serde(rename = "stock_normal")]
    Normal,
}

impl StockStatus {
    pub fn classify(stock: i32, low_stock_threshold: i32) -> Self {
        if stock <= 0 {
            StockStatus::OutOfStock
        } else if stock <= low_stock_threshold {
            StockStatus::Low
        } else {
            StockStatus::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "sin_stock",
            StockStatus::Low => "stock_bajo",
            StockStatus::Normal => "stock_normal",
        }
    }
}

/// Product grouping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Usage of a product across documents, used to decide soft vs hard delete
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductUsage {
    pub sale_items: i64,
    pub purchase_items: i64,
    pub movements: i64,
    pub return_items: i64,
}

impl ProductUsage {
    pub fn has_history(&self) -> bool {
        self.sale_items + self.purchase_items + self.movements + self.return_items > 0
    }
}
