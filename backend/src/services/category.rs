//! Category service

use serde::{Deserialize, Serialize};
use shared::Category;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct CategoryService {
    db: PgPool,
}

/// Category with the number of products filed under it
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub product_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100, message = "Category name is required"))]
    pub name: String,
    pub description: Option<String>,
}

impl CategoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<CategoryWithCount>> {
        let categories = sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.id, c.name, c.description, c.created_at, c.updated_at,
                   COUNT(p.id) AS product_count
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(categories)
    }

    pub async fn get(&self, category_id: Uuid) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = $1",
        )
        .bind(category_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))
    }

    pub async fn create(&self, input: CategoryInput) -> AppResult<Category> {
        input.validate()?;
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.description.as_deref().map(str::trim).filter(|d| !d.is_empty()))
        .fetch_one(&self.db)
        .await?;
        Ok(category)
    }

    pub async fn update(&self, category_id: Uuid, input: CategoryInput) -> AppResult<Category> {
        input.validate()?;
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(category_id)
        .bind(input.name.trim())
        .bind(input.description.as_deref().map(str::trim).filter(|d| !d.is_empty()))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))
    }

    /// Delete a category that no product references
    pub async fn delete(&self, category_id: Uuid) -> AppResult<()> {
        self.get(category_id).await?;

        let products = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE category_id = $1",
        )
        .bind(category_id)
        .fetch_one(&self.db)
        .await?;

        if products > 0 {
            return Err(AppError::BusinessRule {
                code: "CATEGORY_IN_USE",
                message: format!("Category has {} products assigned", products),
                message_es: format!(
                    "No se puede eliminar la categoría porque tiene {} productos asociados",
                    products
                ),
            });
        }

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
