//! Postgres implementation of the stock ledger
//!
//! One `PgLedger` wraps one database transaction. Product rows are taken with
//! `SELECT ... FOR UPDATE` in id order, so two sales of the same product
//! serialize instead of both reading the old stock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::stock::{
    LedgerError, LedgerResult, ProductStock, PurchaseRecord, SaleRecord, StockLedger,
};
use shared::{InventoryMovement, Purchase, PurchaseItem, Sale, SaleItem};

pub(crate) const MOVEMENT_COLUMNS: &str = "id, product_id, user_id, movement_type, quantity, \
     quantity_change, reason, notes, related_sale_id, related_purchase_id, reversal_of, created_at";

pub(crate) const SALE_COLUMNS: &str = "id, user_id, customer_id, cash_register_session_id, \
     payment_type, total_amount, sale_date, status, voided_at, voided_by, created_at";

pub(crate) const PURCHASE_COLUMNS: &str = "id, supplier_id, user_id, invoice_number, notes, \
     total_amount, purchase_date, status, voided_at, voided_by, created_at";

/// Stock ledger over a Postgres transaction
pub struct PgLedger {
    tx: Transaction<'static, Postgres>,
}

impl PgLedger {
    /// Open a transaction on the pool
    pub async fn begin(db: &PgPool) -> Result<Self, sqlx::Error> {
        Ok(Self { tx: db.begin().await? })
    }

    /// The underlying connection, for writes that belong to the same unit of
    /// work but are not stock operations (e.g. inserting a product row)
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }
}

#[async_trait]
impl StockLedger for PgLedger {
    async fn lock_products(&mut self, ids: &[Uuid]) -> LedgerResult<Vec<ProductStock>> {
        let rows = sqlx::query_as::<_, ProductStock>(
            r#"
            SELECT id, name, sku, stock, cost, is_active
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn supplier_exists(&mut self, id: Uuid) -> LedgerResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn customer_exists(&mut self, id: Uuid) -> LedgerResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn apply_stock_change(
        &mut self,
        product_id: Uuid,
        delta: i32,
        cost: Option<Decimal>,
    ) -> LedgerResult<i32> {
        // The stock guard makes the update a no-op instead of a CHECK violation
        let stock = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE products
            SET stock = stock + $2,
                cost = COALESCE($3, cost),
                updated_at = NOW()
            WHERE id = $1 AND stock + $2 >= 0
            RETURNING stock
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(cost)
        .fetch_optional(&mut *self.tx)
        .await?;

        stock.ok_or(LedgerError::NegativeStock { product_id })
    }

    async fn insert_sale(&mut self, sale: &Sale, items: &[SaleItem]) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sales (id, user_id, customer_id, cash_register_session_id, payment_type,
                               total_amount, sale_date, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(sale.id)
        .bind(sale.user_id)
        .bind(sale.customer_id)
        .bind(sale.cash_register_session_id)
        .bind(sale.payment_type)
        .bind(sale.total_amount)
        .bind(sale.sale_date)
        .bind(sale.status)
        .bind(sale.created_at)
        .execute(&mut *self.tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (id, sale_id, product_id, quantity, price_at_sale)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(item.id)
            .bind(item.sale_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price_at_sale)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn insert_purchase(
        &mut self,
        purchase: &Purchase,
        items: &[PurchaseItem],
    ) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO purchases (id, supplier_id, user_id, invoice_number, notes, total_amount,
                                   purchase_date, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(purchase.id)
        .bind(purchase.supplier_id)
        .bind(purchase.user_id)
        .bind(&purchase.invoice_number)
        .bind(&purchase.notes)
        .bind(purchase.total_amount)
        .bind(purchase.purchase_date)
        .bind(purchase.status)
        .bind(purchase.created_at)
        .execute(&mut *self.tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO purchase_items (id, purchase_id, product_id, quantity, cost_at_purchase)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(item.id)
            .bind(item.purchase_id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.cost_at_purchase)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> LedgerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_movements (id, product_id, user_id, movement_type, quantity,
                                             quantity_change, reason, notes, related_sale_id,
                                             related_purchase_id, reversal_of, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(movement.id)
        .bind(movement.product_id)
        .bind(movement.user_id)
        .bind(movement.movement_type)
        .bind(movement.quantity)
        .bind(movement.quantity_change)
        .bind(&movement.reason)
        .bind(&movement.notes)
        .bind(movement.related_sale_id)
        .bind(movement.related_purchase_id)
        .bind(movement.reversal_of)
        .bind(movement.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn load_sale(&mut self, id: Uuid) -> LedgerResult<Option<SaleRecord>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        let Some(sale) = sale else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, SaleItem>(
            "SELECT id, sale_id, product_id, quantity, price_at_sale FROM sale_items WHERE sale_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?;

        let movements = sqlx::query_as::<_, InventoryMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements WHERE related_sale_id = $1 ORDER BY created_at"
        ))
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?;

        let return_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sale_returns WHERE sale_id = $1")
                .bind(id)
                .fetch_one(&mut *self.tx)
                .await?;

        Ok(Some(SaleRecord {
            sale,
            items,
            movements,
            return_count,
        }))
    }

    async fn load_purchase(&mut self, id: Uuid) -> LedgerResult<Option<PurchaseRecord>> {
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        let Some(purchase) = purchase else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, PurchaseItem>(
            "SELECT id, purchase_id, product_id, quantity, cost_at_purchase FROM purchase_items WHERE purchase_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?;

        let movements = sqlx::query_as::<_, InventoryMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements WHERE related_purchase_id = $1 ORDER BY created_at"
        ))
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(Some(PurchaseRecord {
            purchase,
            items,
            movements,
        }))
    }

    async fn mark_sale_voided(
        &mut self,
        id: Uuid,
        voided_by: Uuid,
        at: DateTime<Utc>,
    ) -> LedgerResult<()> {
        sqlx::query(
            "UPDATE sales SET status = 'VOIDED', voided_at = $2, voided_by = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .bind(voided_by)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn mark_purchase_voided(
        &mut self,
        id: Uuid,
        voided_by: Uuid,
        at: DateTime<Utc>,
    ) -> LedgerResult<()> {
        sqlx::query(
            "UPDATE purchases SET status = 'VOIDED', voided_at = $2, voided_by = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .bind(voided_by)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self) -> LedgerResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> LedgerResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
