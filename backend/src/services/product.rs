//! Product catalog service

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::stock::{AdjustmentRequest, StockEngine, StockLedger, INITIAL_STOCK_REASON};
use shared::{
    validate_non_negative_amount, validate_sku, MovementKind, Product, ProductUsage, StockStatus,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ledger::PgLedger;

/// Product service for catalog management
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
    engine: StockEngine,
}

/// Product with its category name
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub cost: Option<Decimal>,
    pub price: Decimal,
    /// Opening stock, recorded as an ENTRY movement
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    pub category_id: Option<Uuid>,
}

/// Input for updating a product. Stock is not editable here.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub cost: Option<Decimal>,
    pub price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub stock: Option<i32>,
}

/// Result of deleting a product
#[derive(Debug, Serialize)]
pub struct DeleteProductOutcome {
    pub message: String,
    pub deactivated: bool,
}

/// Whether a product can be removed for good
#[derive(Debug, Serialize)]
pub struct ProductDeletability {
    pub product_id: Uuid,
    pub can_delete_completely: bool,
    pub will_deactivate: bool,
    pub usage: ProductUsage,
}

/// Product as shown in the register search
#[derive(Debug, Clone, Serialize)]
pub struct PosProduct {
    pub id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category_name: Option<String>,
    pub can_sell: bool,
    pub stock_status: StockStatus,
}

const LISTING_SELECT: &str = r#"
    SELECT p.id, p.name, p.description, p.sku, p.cost, p.price, p.stock, p.is_active,
           p.category_id, p.created_at, p.updated_at, c.name AS category_name
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

fn normalize(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn check_sku(sku: Option<&str>) -> AppResult<()> {
    if let Some(sku) = sku {
        validate_sku(sku).map_err(|msg| AppError::validation("sku", msg, "SKU inválido"))?;
    }
    Ok(())
}

fn check_amount(field: &str, amount: Option<Decimal>) -> AppResult<()> {
    if let Some(amount) = amount {
        validate_non_negative_amount(amount).map_err(|msg| {
            AppError::validation(field, msg, "El monto no puede ser negativo")
        })?;
    }
    Ok(())
}

impl ProductService {
    pub fn new(db: PgPool, engine: StockEngine) -> Self {
        Self { db, engine }
    }

    /// List products, active first then by name
    pub async fn list(&self, include_inactive: bool) -> AppResult<Vec<ProductListing>> {
        let products = sqlx::query_as::<_, ProductListing>(&format!(
            "{LISTING_SELECT} WHERE ($1 OR p.is_active) ORDER BY p.is_active DESC, p.name ASC"
        ))
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;
        Ok(products)
    }

    pub async fn get(&self, product_id: Uuid) -> AppResult<ProductListing> {
        sqlx::query_as::<_, ProductListing>(&format!("{LISTING_SELECT} WHERE p.id = $1"))
            .bind(product_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Create a product. Opening stock goes through the stock engine so the
    /// product's first movement explains it.
    pub async fn create(&self, actor_id: Uuid, input: CreateProductInput) -> AppResult<Product> {
        input.validate()?;
        let sku = normalize(input.sku);
        check_sku(sku.as_deref())?;
        check_amount("price", Some(input.price))?;
        check_amount("cost", input.cost)?;

        let mut ledger = PgLedger::begin(&self.db).await?;
        let mut product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, sku, cost, price, stock, category_id)
            VALUES ($1, $2, $3, $4, $5, 0, $6)
            RETURNING id, name, description, sku, cost, price, stock, is_active,
                      category_id, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(normalize(input.description))
        .bind(&sku)
        .bind(input.cost.unwrap_or(Decimal::ZERO))
        .bind(input.price)
        .bind(input.category_id)
        .fetch_one(ledger.conn())
        .await?;

        let opening_stock = input.stock.unwrap_or(0);
        if opening_stock > 0 {
            let adjustment = self
                .engine
                .record_adjustment(
                    &mut ledger,
                    AdjustmentRequest {
                        actor_id,
                        product_id: product.id,
                        kind: MovementKind::Entry,
                        quantity: opening_stock,
                        reason: Some(INITIAL_STOCK_REASON.to_string()),
                        notes: None,
                    },
                )
                .await?;
            product.stock = adjustment.stock_after;
        }
        ledger.commit().await?;

        tracing::info!(product_id = %product.id, stock = product.stock, "Product created");
        Ok(product)
    }

    pub async fn update(&self, product_id: Uuid, input: UpdateProductInput) -> AppResult<Product> {
        input.validate()?;
        if input.stock.is_some() {
            return Err(AppError::validation(
                "stock",
                "Stock can only change through inventory movements, purchases or sales",
                "El stock solo cambia mediante movimientos de inventario, compras o ventas",
            ));
        }
        let sku = normalize(input.sku);
        check_sku(sku.as_deref())?;
        check_amount("price", input.price)?;
        check_amount("cost", input.cost)?;

        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                sku = COALESCE($4, sku),
                cost = COALESCE($5, cost),
                price = COALESCE($6, price),
                category_id = COALESCE($7, category_id),
                is_active = COALESCE($8, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, sku, cost, price, stock, is_active,
                      category_id, created_at, updated_at
            "#,
        )
        .bind(product_id)
        .bind(input.name.map(|n| n.trim().to_string()))
        .bind(normalize(input.description))
        .bind(&sku)
        .bind(input.cost)
        .bind(input.price)
        .bind(input.category_id)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Count the documents and movements that reference a product
    pub async fn usage(&self, product_id: Uuid) -> AppResult<ProductUsage> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(product_id)
            .fetch_one(&self.db)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Product".to_string()));
        }

        let (sale_items, purchase_items, movements, return_items) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM sale_items WHERE product_id = $1),
                    (SELECT COUNT(*) FROM purchase_items WHERE product_id = $1),
                    (SELECT COUNT(*) FROM inventory_movements WHERE product_id = $1),
                    (SELECT COUNT(*) FROM sale_return_items WHERE product_id = $1)
                "#,
            )
            .bind(product_id)
            .fetch_one(&self.db)
            .await?;

        Ok(ProductUsage {
            sale_items,
            purchase_items,
            movements,
            return_items,
        })
    }

    pub async fn can_delete(&self, product_id: Uuid) -> AppResult<ProductDeletability> {
        let usage = self.usage(product_id).await?;
        Ok(ProductDeletability {
            product_id,
            can_delete_completely: !usage.has_history(),
            will_deactivate: usage.has_history(),
            usage,
        })
    }

    /// Deactivate a product with history, remove one without
    pub async fn delete(&self, product_id: Uuid) -> AppResult<DeleteProductOutcome> {
        let usage = self.usage(product_id).await?;

        if usage.has_history() {
            sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(product_id)
                .execute(&self.db)
                .await?;
            tracing::info!(product_id = %product_id, "Product deactivated");
            return Ok(DeleteProductOutcome {
                message: "Product deactivated (has transaction history)".to_string(),
                deactivated: true,
            });
        }

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.db)
            .await?;
        tracing::info!(product_id = %product_id, "Product deleted");
        Ok(DeleteProductOutcome {
            message: "Product deleted completely".to_string(),
            deactivated: false,
        })
    }

    pub async fn reactivate(&self, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET is_active = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, sku, cost, price, stock, is_active,
                      category_id, created_at, updated_at
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Register search over active products by name, SKU or description
    pub async fn search_for_pos(
        &self,
        search: Option<&str>,
        limit: i64,
        low_stock_threshold: i32,
    ) -> AppResult<Vec<PosProduct>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let rows = sqlx::query_as::<_, ProductListing>(&format!(
            r#"{LISTING_SELECT}
            WHERE p.is_active
              AND ($1::TEXT IS NULL OR p.name ILIKE $1 OR p.sku ILIKE $1 OR p.description ILIKE $1)
            ORDER BY p.name ASC
            LIMIT $2"#
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PosProduct {
                can_sell: row.product.can_sell(),
                stock_status: row.product.stock_status(low_stock_threshold),
                id: row.product.id,
                name: row.product.name,
                sku: row.product.sku,
                description: row.product.description,
                price: row.product.price,
                stock: row.product.stock,
                category_name: row.category_name,
            })
            .collect())
    }
}
