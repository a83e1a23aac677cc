//! Unit-of-work abstraction the engine writes through

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::LedgerResult;
use crate::models::{InventoryMovement, Purchase, PurchaseItem, Sale, SaleItem};

/// Locked snapshot of the stock-relevant columns of a product
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductStock {
    pub id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub stock: i32,
    pub cost: Decimal,
    pub is_active: bool,
}

/// A sale with everything needed to void it
#[derive(Debug, Clone)]
pub struct SaleRecord {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    /// Movements linked to the sale, oldest first
    pub movements: Vec<InventoryMovement>,
    pub return_count: i64,
}

/// A purchase with everything needed to void it
#[derive(Debug, Clone)]
pub struct PurchaseRecord {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
    pub movements: Vec<InventoryMovement>,
}

/// One open unit of work.
///
/// Writes become visible only after [`commit`](StockLedger::commit). Reads of
/// products through [`lock_products`](StockLedger::lock_products) hold the
/// rows until the unit of work ends, so concurrent operations on the same
/// product serialize.
#[async_trait]
pub trait StockLedger: Send {
    /// Lock and return the given products, ordered by id. Unknown ids are
    /// simply absent from the result.
    async fn lock_products(&mut self, ids: &[Uuid]) -> LedgerResult<Vec<ProductStock>>;

    async fn supplier_exists(&mut self, id: Uuid) -> LedgerResult<bool>;

    async fn customer_exists(&mut self, id: Uuid) -> LedgerResult<bool>;

    /// Apply `delta` to the product's stock and, when given, overwrite its
    /// cost. Returns the new stock. Must fail with
    /// [`LedgerError::NegativeStock`](super::LedgerError::NegativeStock)
    /// rather than store a negative value.
    async fn apply_stock_change(
        &mut self,
        product_id: Uuid,
        delta: i32,
        cost: Option<Decimal>,
    ) -> LedgerResult<i32>;

    async fn insert_sale(&mut self, sale: &Sale, items: &[SaleItem]) -> LedgerResult<()>;

    async fn insert_purchase(
        &mut self,
        purchase: &Purchase,
        items: &[PurchaseItem],
    ) -> LedgerResult<()>;

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> LedgerResult<()>;

    /// Load and lock a sale
    async fn load_sale(&mut self, id: Uuid) -> LedgerResult<Option<SaleRecord>>;

    /// Load and lock a purchase
    async fn load_purchase(&mut self, id: Uuid) -> LedgerResult<Option<PurchaseRecord>>;

    async fn mark_sale_voided(
        &mut self,
        id: Uuid,
        voided_by: Uuid,
        at: DateTime<Utc>,
    ) -> LedgerResult<()>;

    async fn mark_purchase_voided(
        &mut self,
        id: Uuid,
        voided_by: Uuid,
        at: DateTime<Utc>,
    ) -> LedgerResult<()>;

    async fn commit(self) -> LedgerResult<()>
    where
        Self: Sized;

    async fn rollback(self) -> LedgerResult<()>
    where
        Self: Sized;
}
