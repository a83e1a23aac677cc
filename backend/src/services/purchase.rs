//! Supplier purchase service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::stock::{
    PurchaseLine, PurchaseReceipt, PurchaseRequest, StockEngine, StockLedger, VoidReceipt,
};
use shared::{DocumentStatus, InventoryMovement, Purchase};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{PgLedger, MOVEMENT_COLUMNS, PURCHASE_COLUMNS};

#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
    engine: StockEngine,
}

/// Purchase row as listed, with supplier and receiver names
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseSummary {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub user_id: Uuid,
    pub username: String,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub total_amount: Decimal,
    pub purchase_date: DateTime<Utc>,
    pub status: DocumentStatus,
    pub item_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseItemDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub cost_at_purchase: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseDetail {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub supplier_name: String,
    pub items: Vec<PurchaseItemDetail>,
    pub movements: Vec<InventoryMovement>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePurchaseInput {
    pub supplier_id: Uuid,
    #[validate(length(max = 64, message = "Invoice number is too long"))]
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<PurchaseLine>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePurchaseInput {
    #[validate(length(max = 64, message = "Invoice number is too long"))]
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PurchaseFilter {
    pub supplier_id: Option<Uuid>,
    pub include_voided: Option<bool>,
}

/// Trimmed text from an edit request; `Some("")` means "clear"
fn edited_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// Voided purchases are read-only, so they fall through to "not found"
fn update_statement() -> String {
    format!(
        r#"
        UPDATE purchases
        SET invoice_number = CASE WHEN $2::TEXT IS NULL THEN invoice_number ELSE NULLIF($2, '') END,
            notes = CASE WHEN $3::TEXT IS NULL THEN notes ELSE NULLIF($3, '') END
        WHERE id = $1 AND status = 'COMPLETED'
        RETURNING {PURCHASE_COLUMNS}
        "#
    )
}

impl PurchaseService {
    pub fn new(db: PgPool, engine: StockEngine) -> Self {
        Self { db, engine }
    }

    pub async fn list(&self, filter: PurchaseFilter) -> AppResult<Vec<PurchaseSummary>> {
        let purchases = sqlx::query_as::<_, PurchaseSummary>(
            r#"
            SELECT p.id, p.supplier_id, s.name AS supplier_name, p.user_id, u.username,
                   p.invoice_number, p.notes, p.total_amount, p.purchase_date, p.status,
                   (SELECT COUNT(*) FROM purchase_items pi WHERE pi.purchase_id = p.id) AS item_count
            FROM purchases p
            JOIN suppliers s ON s.id = p.supplier_id
            JOIN users u ON u.id = p.user_id
            WHERE ($1::UUID IS NULL OR p.supplier_id = $1)
              AND ($2 OR p.status = 'COMPLETED')
            ORDER BY p.purchase_date DESC
            "#,
        )
        .bind(filter.supplier_id)
        .bind(filter.include_voided.unwrap_or(false))
        .fetch_all(&self.db)
        .await?;
        Ok(purchases)
    }

    pub async fn get(&self, purchase_id: Uuid) -> AppResult<PurchaseDetail> {
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = $1"
        ))
        .bind(purchase_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        let supplier_name =
            sqlx::query_scalar::<_, String>("SELECT name FROM suppliers WHERE id = $1")
                .bind(purchase.supplier_id)
                .fetch_one(&self.db)
                .await?;

        let items = sqlx::query_as::<_, PurchaseItemDetail>(
            r#"
            SELECT pi.id, pi.product_id, pr.name AS product_name, pr.sku,
                   pi.quantity, pi.cost_at_purchase
            FROM purchase_items pi
            JOIN products pr ON pr.id = pi.product_id
            WHERE pi.purchase_id = $1
            ORDER BY pr.name
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.db)
        .await?;

        let movements = sqlx::query_as::<_, InventoryMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements WHERE related_purchase_id = $1 ORDER BY created_at"
        ))
        .bind(purchase_id)
        .fetch_all(&self.db)
        .await?;

        Ok(PurchaseDetail {
            purchase,
            supplier_name,
            items,
            movements,
        })
    }

    /// Receive goods from a supplier
    pub async fn create(
        &self,
        actor_id: Uuid,
        input: CreatePurchaseInput,
    ) -> AppResult<PurchaseReceipt> {
        input.validate()?;

        let mut ledger = PgLedger::begin(&self.db).await?;
        let receipt = self
            .engine
            .record_purchase_receipt(
                &mut ledger,
                PurchaseRequest {
                    actor_id,
                    supplier_id: input.supplier_id,
                    invoice_number: input.invoice_number,
                    notes: input.notes,
                    items: input.items,
                },
            )
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Purchase rejected"))?;
        ledger.commit().await?;

        tracing::info!(
            purchase_id = %receipt.purchase.id,
            supplier_id = %receipt.purchase.supplier_id,
            total = %receipt.purchase.total_amount,
            items = receipt.items.len(),
            "Purchase received"
        );
        Ok(receipt)
    }

    /// Edit the invoice number and notes of a completed purchase; lines and
    /// stock are fixed once received. Omitted fields keep their value, an
    /// empty string clears it.
    pub async fn update(&self, purchase_id: Uuid, input: UpdatePurchaseInput) -> AppResult<Purchase> {
        input.validate()?;

        sqlx::query_as::<_, Purchase>(&update_statement())
            .bind(purchase_id)
            .bind(edited_text(input.invoice_number))
            .bind(edited_text(input.notes))
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Purchase".to_string()))
    }

    /// Void a purchase, taking its goods back out of stock
    pub async fn void(&self, purchase_id: Uuid, actor_id: Uuid) -> AppResult<VoidReceipt> {
        let mut ledger = PgLedger::begin(&self.db).await?;
        let receipt = self
            .engine
            .void_purchase(&mut ledger, purchase_id, actor_id, Utc::now())
            .await
            .inspect_err(|e| tracing::warn!(purchase_id = %purchase_id, error = %e, "Purchase void rejected"))?;
        ledger.commit().await?;

        tracing::info!(
            purchase_id = %purchase_id,
            voided_by = %actor_id,
            movements = receipt.movements.len(),
            "Purchase voided"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_fields_are_left_alone_and_blank_ones_cleared() {
        assert_eq!(edited_text(None), None);
        assert_eq!(edited_text(Some("  F-1029 ".to_string())).as_deref(), Some("F-1029"));
        assert_eq!(edited_text(Some("   ".to_string())).as_deref(), Some(""));

        let sql = update_statement();
        assert!(sql.contains("WHEN $2::TEXT IS NULL THEN invoice_number"));
        assert!(sql.contains("WHEN $3::TEXT IS NULL THEN notes"));
    }

    #[test]
    fn voided_purchases_cannot_be_edited() {
        assert!(update_statement().contains("WHERE id = $1 AND status = 'COMPLETED'"));
    }
}
