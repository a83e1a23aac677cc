//! Sales service: register sales, history, edits and voids

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::stock::{SaleLine, SaleReceipt, SaleRequest, StockEngine, StockLedger, VoidReceipt};
use shared::{
    local_midnight, DocumentStatus, InventoryMovement, PaginatedResponse, Pagination, PaymentType,
    Sale,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{PgLedger, MOVEMENT_COLUMNS, SALE_COLUMNS};

#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
    engine: StockEngine,
}

/// Sale row as listed
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub customer_id: Option<Uuid>,
    pub customer_name: Option<String>,
    pub payment_type: PaymentType,
    pub total_amount: Decimal,
    pub sale_date: DateTime<Utc>,
    pub status: DocumentStatus,
    pub item_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleItemDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub price_at_sale: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub username: String,
    pub customer_name: Option<String>,
    pub items: Vec<SaleItemDetail>,
    pub movements: Vec<InventoryMovement>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSaleInput {
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub payment_type: PaymentType,
    pub cash_register_session_id: Option<Uuid>,
    pub items: Vec<SaleLine>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSaleInput {
    pub payment_type: Option<PaymentType>,
    pub customer_id: Option<Uuid>,
}

/// Sales history filters
#[derive(Debug, Deserialize, Default)]
pub struct SaleFilter {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub user_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub include_voided: Option<bool>,
}

/// Instant bounds for a `from_date`/`to_date` filter; `to_date` covers its whole local day
pub fn date_bounds(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    offset: FixedOffset,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    (
        from.map(|day| local_midnight(day, offset)),
        to.map(|day| local_midnight(day + Duration::days(1), offset)),
    )
}

impl SaleService {
    pub fn new(db: PgPool, engine: StockEngine) -> Self {
        Self { db, engine }
    }

    pub async fn list(
        &self,
        filter: SaleFilter,
        default_page_size: u32,
    ) -> AppResult<PaginatedResponse<SaleSummary>> {
        let pagination = Pagination::new(filter.page, filter.limit, default_page_size);
        let (start, end) = date_bounds(filter.from_date, filter.to_date, self.engine.utc_offset());
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));
        let include_voided = filter.include_voided.unwrap_or(false);

        const FILTERS: &str = r#"
            FROM sales s
            JOIN users u ON u.id = s.user_id
            LEFT JOIN customers c ON c.id = s.customer_id
            WHERE ($1::TIMESTAMPTZ IS NULL OR s.sale_date >= $1)
              AND ($2::TIMESTAMPTZ IS NULL OR s.sale_date < $2)
              AND ($3::UUID IS NULL OR s.user_id = $3)
              AND ($4::UUID IS NULL OR s.customer_id = $4)
              AND ($5 OR s.status = 'COMPLETED')
              AND ($6::TEXT IS NULL OR c.name ILIKE $6 OR u.username ILIKE $6 OR s.id::TEXT ILIKE $6)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {FILTERS}"))
            .bind(start)
            .bind(end)
            .bind(filter.user_id)
            .bind(filter.customer_id)
            .bind(include_voided)
            .bind(&search)
            .fetch_one(&self.db)
            .await?;

        let sales = sqlx::query_as::<_, SaleSummary>(&format!(
            r#"
            SELECT s.id, s.user_id, u.username, s.customer_id, c.name AS customer_name,
                   s.payment_type, s.total_amount, s.sale_date, s.status,
                   (SELECT COUNT(*) FROM sale_items si WHERE si.sale_id = s.id) AS item_count
            {FILTERS}
            ORDER BY s.sale_date DESC
            LIMIT $7 OFFSET $8
            "#
        ))
        .bind(start)
        .bind(end)
        .bind(filter.user_id)
        .bind(filter.customer_id)
        .bind(include_voided)
        .bind(&search)
        .bind(i64::from(pagination.limit))
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse {
            data: sales,
            pagination: pagination.meta(total.max(0) as u64),
        })
    }

    pub async fn get(&self, sale_id: Uuid) -> AppResult<SaleDetail> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = $1"
        ))
        .bind(sale_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

        let (username, customer_name) = sqlx::query_as::<_, (String, Option<String>)>(
            r#"
            SELECT u.username, c.name
            FROM users u
            LEFT JOIN customers c ON c.id = $2
            WHERE u.id = $1
            "#,
        )
        .bind(sale.user_id)
        .bind(sale.customer_id)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, SaleItemDetail>(
            r#"
            SELECT si.id, si.product_id, p.name AS product_name, p.sku,
                   si.quantity, si.price_at_sale, si.price_at_sale * si.quantity AS subtotal
            FROM sale_items si
            JOIN products p ON p.id = si.product_id
            WHERE si.sale_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?;

        let movements = sqlx::query_as::<_, InventoryMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements WHERE related_sale_id = $1 ORDER BY created_at"
        ))
        .bind(sale_id)
        .fetch_all(&self.db)
        .await?;

        Ok(SaleDetail {
            sale,
            username,
            customer_name,
            items,
            movements,
        })
    }

    /// Ring up a sale at the register
    pub async fn create(&self, actor_id: Uuid, input: CreateSaleInput) -> AppResult<SaleReceipt> {
        let mut ledger = PgLedger::begin(&self.db).await?;
        let receipt = self
            .engine
            .record_sale(
                &mut ledger,
                SaleRequest {
                    actor_id,
                    customer_id: input.customer_id,
                    payment_type: input.payment_type,
                    cash_register_session_id: input.cash_register_session_id,
                    sale_date: None,
                    items: input.items,
                },
            )
            .await
            .inspect_err(|e| tracing::warn!(user_id = %actor_id, error = %e, "Sale rejected"))?;
        ledger.commit().await?;

        tracing::info!(
            sale_id = %receipt.sale.id,
            user_id = %actor_id,
            total = %receipt.sale.total_amount,
            payment_type = receipt.sale.payment_type.as_str(),
            items = receipt.items.len(),
            "Sale recorded"
        );
        Ok(receipt)
    }

    /// Change payment type or customer of a completed sale
    pub async fn update(&self, sale_id: Uuid, input: UpdateSaleInput) -> AppResult<Sale> {
        if let Some(customer_id) = input.customer_id {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)",
            )
            .bind(customer_id)
            .fetch_one(&self.db)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Customer".to_string()));
            }
        }

        sqlx::query_as::<_, Sale>(&format!(
            r#"
            UPDATE sales
            SET payment_type = COALESCE($2, payment_type),
                customer_id = COALESCE($3, customer_id)
            WHERE id = $1 AND status = 'COMPLETED'
            RETURNING {SALE_COLUMNS}
            "#
        ))
        .bind(sale_id)
        .bind(input.payment_type)
        .bind(input.customer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))
    }

    /// Void a sale from the current business day and restock its items
    pub async fn void(&self, sale_id: Uuid, actor_id: Uuid) -> AppResult<VoidReceipt> {
        let mut ledger = PgLedger::begin(&self.db).await?;
        let receipt = self
            .engine
            .void_sale(&mut ledger, sale_id, actor_id, Utc::now())
            .await
            .inspect_err(|e| tracing::warn!(sale_id = %sale_id, error = %e, "Sale void rejected"))?;
        ledger.commit().await?;

        tracing::info!(
            sale_id = %sale_id,
            voided_by = %actor_id,
            movements = receipt.movements.len(),
            "Sale voided"
        );
        Ok(receipt)
    }
}
