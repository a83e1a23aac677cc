//! Inventory service: movement history, manual adjustments and the stock report

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::stock::{Adjustment, AdjustmentRequest, StockEngine, StockLedger};
use shared::MovementKind;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::services::ledger::PgLedger;

/// Default and maximum size of the movement history
pub const DEFAULT_MOVEMENT_LIMIT: i64 = 50;
pub const MAX_MOVEMENT_LIMIT: i64 = 500;

const RECENT_MOVEMENT_DAYS: i64 = 7;
const RECENT_MOVEMENT_LIMIT: i64 = 20;

#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
    engine: StockEngine,
}

/// Movement with product and user names
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MovementListing {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: Option<String>,
    pub user_id: Uuid,
    pub username: String,
    pub movement_type: MovementKind,
    pub quantity: i32,
    pub quantity_change: i32,
    pub reason: String,
    pub notes: Option<String>,
    pub related_sale_id: Option<Uuid>,
    pub related_purchase_id: Option<Uuid>,
    pub reversal_of: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MovementFilter {
    pub product_id: Option<Uuid>,
    pub movement_type: Option<MovementKind>,
    pub limit: Option<i64>,
}

/// Manual movement as entered by staff
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMovementInput {
    pub product_id: Uuid,
    pub movement_type: MovementKind,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: i32,
    #[validate(length(max = 500, message = "Reason is too long"))]
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Product row in the report's stock lists
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockAlert {
    pub id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub stock: i32,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryStock {
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub product_count: i64,
    pub total_stock: i64,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    pub total_products: i64,
    pub active_products: i64,
    pub total_stock: i64,
    pub total_value: Decimal,
    pub low_stock_threshold: i32,
    pub low_stock: Vec<StockAlert>,
    pub out_of_stock: Vec<StockAlert>,
    pub recent_movements: Vec<MovementListing>,
    pub by_category: Vec<CategoryStock>,
}

const MOVEMENT_LISTING_SELECT: &str = r#"
    SELECT m.id, m.product_id, p.name AS product_name, p.sku, m.user_id, u.username,
           m.movement_type, m.quantity, m.quantity_change, m.reason, m.notes,
           m.related_sale_id, m.related_purchase_id, m.reversal_of, m.created_at
    FROM inventory_movements m
    JOIN products p ON p.id = m.product_id
    JOIN users u ON u.id = m.user_id
"#;

impl InventoryService {
    pub fn new(db: PgPool, engine: StockEngine) -> Self {
        Self { db, engine }
    }

    /// Movement history, newest first
    pub async fn list_movements(&self, filter: MovementFilter) -> AppResult<Vec<MovementListing>> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_MOVEMENT_LIMIT)
            .clamp(1, MAX_MOVEMENT_LIMIT);

        let movements = sqlx::query_as::<_, MovementListing>(&format!(
            r#"{MOVEMENT_LISTING_SELECT}
            WHERE ($1::UUID IS NULL OR m.product_id = $1)
              AND ($2::movement_kind IS NULL OR m.movement_type = $2)
            ORDER BY m.created_at DESC
            LIMIT $3"#
        ))
        .bind(filter.product_id)
        .bind(filter.movement_type)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(movements)
    }

    /// Record a manual ENTRY, EXIT, ADJUSTMENT or DAMAGE movement
    pub async fn create_movement(
        &self,
        actor_id: Uuid,
        input: CreateMovementInput,
    ) -> AppResult<Adjustment> {
        input.validate()?;

        let mut ledger = PgLedger::begin(&self.db).await?;
        let adjustment = self
            .engine
            .record_adjustment(
                &mut ledger,
                AdjustmentRequest {
                    actor_id,
                    product_id: input.product_id,
                    kind: input.movement_type,
                    quantity: input.quantity,
                    reason: input.reason,
                    notes: input.notes,
                },
            )
            .await
            .inspect_err(|e| {
                tracing::warn!(product_id = %input.product_id, error = %e, "Adjustment rejected")
            })?;
        ledger.commit().await?;

        tracing::info!(
            product_id = %input.product_id,
            movement_type = adjustment.movement.movement_type.as_str(),
            quantity_change = adjustment.movement.quantity_change,
            stock_after = adjustment.stock_after,
            "Inventory adjusted"
        );
        Ok(adjustment)
    }

    /// Stock overview across the catalog
    pub async fn report(&self, low_stock_threshold: i32) -> AppResult<InventoryReport> {
        let (total_products, active_products, total_stock, total_value) =
            sqlx::query_as::<_, (i64, i64, i64, Decimal)>(
                r#"
                SELECT COUNT(*),
                       COUNT(*) FILTER (WHERE is_active),
                       COALESCE(SUM(stock) FILTER (WHERE is_active), 0)::BIGINT,
                       COALESCE(SUM(stock * cost) FILTER (WHERE is_active), 0)
                FROM products
                "#,
            )
            .fetch_one(&self.db)
            .await?;

        let low_stock = sqlx::query_as::<_, StockAlert>(
            r#"
            SELECT p.id, p.name, p.sku, p.stock, c.name AS category_name
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.is_active AND p.stock > 0 AND p.stock <= $1
            ORDER BY p.stock ASC, p.name ASC
            "#,
        )
        .bind(low_stock_threshold)
        .fetch_all(&self.db)
        .await?;

        let out_of_stock = sqlx::query_as::<_, StockAlert>(
            r#"
            SELECT p.id, p.name, p.sku, p.stock, c.name AS category_name
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.is_active AND p.stock = 0
            ORDER BY p.name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let since = Utc::now() - Duration::days(RECENT_MOVEMENT_DAYS);
        let recent_movements = sqlx::query_as::<_, MovementListing>(&format!(
            r#"{MOVEMENT_LISTING_SELECT}
            WHERE m.created_at >= $1
            ORDER BY m.created_at DESC
            LIMIT $2"#
        ))
        .bind(since)
        .bind(RECENT_MOVEMENT_LIMIT)
        .fetch_all(&self.db)
        .await?;

        let by_category = sqlx::query_as::<_, CategoryStock>(
            r#"
            SELECT c.id AS category_id, c.name AS category_name,
                   COUNT(p.id) AS product_count,
                   COALESCE(SUM(p.stock), 0)::BIGINT AS total_stock,
                   COALESCE(SUM(p.stock * p.cost), 0) AS total_value
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.is_active
            GROUP BY c.id, c.name
            ORDER BY c.name ASC NULLS LAST
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(InventoryReport {
            total_products,
            active_products,
            total_stock,
            total_value,
            low_stock_threshold,
            low_stock,
            out_of_stock,
            recent_movements,
            by_category,
        })
    }
}
