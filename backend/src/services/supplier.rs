//! Supplier service

use serde::{Deserialize, Serialize};
use shared::{validate_email, Supplier};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SupplierWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub supplier: Supplier,
    pub purchase_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SupplierInput {
    #[validate(length(min = 1, max = 200, message = "Supplier name is required"))]
    pub name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl SupplierInput {
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        if self.name.trim().is_empty() {
            return Err(AppError::validation(
                "name",
                "Supplier name is required",
                "El nombre del proveedor es requerido",
            ));
        }
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            validate_email(email.trim())
                .map_err(|msg| AppError::validation("email", msg, "Correo electrónico inválido"))?;
        }
        Ok(())
    }
}

fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

const SUPPLIER_COLUMNS: &str = "id, name, contact_name, email, phone, address, created_at, updated_at";

impl SupplierService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<SupplierWithCount>> {
        let suppliers = sqlx::query_as::<_, SupplierWithCount>(
            r#"
            SELECT s.id, s.name, s.contact_name, s.email, s.phone, s.address,
                   s.created_at, s.updated_at,
                   COUNT(p.id) AS purchase_count
            FROM suppliers s
            LEFT JOIN purchases p ON p.supplier_id = s.id
            GROUP BY s.id
            ORDER BY s.name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(suppliers)
    }

    pub async fn get(&self, supplier_id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1"
        ))
        .bind(supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    pub async fn create(&self, input: SupplierInput) -> AppResult<Supplier> {
        input.check()?;
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO suppliers (name, contact_name, email, phone, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(input.name.trim())
        .bind(optional(&input.contact_name))
        .bind(optional(&input.email))
        .bind(optional(&input.phone))
        .bind(optional(&input.address))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(supplier_id = %supplier.id, "Supplier created");
        Ok(supplier)
    }

    pub async fn update(&self, supplier_id: Uuid, input: SupplierInput) -> AppResult<Supplier> {
        input.check()?;
        sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers
            SET name = $2, contact_name = $3, email = $4, phone = $5, address = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SUPPLIER_COLUMNS}
            "#
        ))
        .bind(supplier_id)
        .bind(input.name.trim())
        .bind(optional(&input.contact_name))
        .bind(optional(&input.email))
        .bind(optional(&input.phone))
        .bind(optional(&input.address))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    /// Delete a supplier with no purchases on record
    pub async fn delete(&self, supplier_id: Uuid) -> AppResult<()> {
        self.get(supplier_id).await?;

        let purchases = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM purchases WHERE supplier_id = $1",
        )
        .bind(supplier_id)
        .fetch_one(&self.db)
        .await?;

        if purchases > 0 {
            return Err(AppError::Conflict {
                resource: "supplier".to_string(),
                message: format!("Supplier has {} purchases on record", purchases),
                message_es: "No se puede eliminar el proveedor porque tiene compras asociadas"
                    .to_string(),
            });
        }

        sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(supplier_id)
            .execute(&self.db)
            .await?;
        tracing::info!(supplier_id = %supplier_id, "Supplier deleted");
        Ok(())
    }
}
