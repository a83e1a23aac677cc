//! Customer service

use serde::{Deserialize, Serialize};
use shared::{validate_email, validate_mx_phone, validate_rfc, Customer};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Upper bound on search results
pub const MAX_SEARCH_RESULTS: i64 = 50;

#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomerWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub customer: Customer,
    pub sales_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerInput {
    #[validate(length(min = 1, max = 200, message = "Customer name is required"))]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub rfc: Option<String>,
}

/// Customer fields after trimming and format checks
struct NormalizedCustomer {
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    rfc: Option<String>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CustomerInput {
    fn normalize(self) -> AppResult<NormalizedCustomer> {
        self.validate()?;
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation(
                "name",
                "Customer name is required",
                "El nombre del cliente es requerido",
            ));
        }

        let email = blank_to_none(self.email).map(|e| e.to_lowercase());
        if let Some(email) = &email {
            validate_email(email)
                .map_err(|msg| AppError::validation("email", msg, "Correo electrónico inválido"))?;
        }

        let phone = blank_to_none(self.phone);
        if let Some(phone) = &phone {
            validate_mx_phone(phone).map_err(|msg| {
                AppError::validation("phone", msg, "El teléfono debe tener 10 dígitos")
            })?;
        }

        let rfc = blank_to_none(self.rfc).map(|r| r.to_uppercase());
        if let Some(rfc) = &rfc {
            validate_rfc(rfc).map_err(|msg| AppError::validation("rfc", msg, "RFC inválido"))?;
        }

        Ok(NormalizedCustomer {
            name,
            email,
            phone,
            address: blank_to_none(self.address),
            rfc,
        })
    }
}

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, address, rfc, created_at, updated_at";

impl CustomerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Search customers by name, email, phone or RFC
    pub async fn search(
        &self,
        search: Option<&str>,
        limit: Option<i64>,
    ) -> AppResult<Vec<CustomerWithCount>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));
        let limit = limit.unwrap_or(MAX_SEARCH_RESULTS).clamp(1, MAX_SEARCH_RESULTS);

        let customers = sqlx::query_as::<_, CustomerWithCount>(
            r#"
            SELECT c.id, c.name, c.email, c.phone, c.address, c.rfc, c.created_at, c.updated_at,
                   COUNT(s.id) AS sales_count
            FROM customers c
            LEFT JOIN sales s ON s.customer_id = c.id
            WHERE $1::TEXT IS NULL
               OR c.name ILIKE $1 OR c.email ILIKE $1 OR c.phone ILIKE $1 OR c.rfc ILIKE $1
            GROUP BY c.id
            ORDER BY c.name ASC
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(customers)
    }

    pub async fn get(&self, customer_id: Uuid) -> AppResult<Customer> {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))
    }

    pub async fn create(&self, input: CustomerInput) -> AppResult<Customer> {
        let customer = input.normalize()?;
        let created = sqlx::query_as::<_, Customer>(&format!(
            r#"
            INSERT INTO customers (name, email, phone, address, rfc)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.rfc)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(customer_id = %created.id, "Customer created");
        Ok(created)
    }

    pub async fn update(&self, customer_id: Uuid, input: CustomerInput) -> AppResult<Customer> {
        let customer = input.normalize()?;
        sqlx::query_as::<_, Customer>(&format!(
            r#"
            UPDATE customers
            SET name = $2, email = $3, phone = $4, address = $5, rfc = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {CUSTOMER_COLUMNS}
            "#
        ))
        .bind(customer_id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.rfc)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))
    }

    /// Delete a customer with no sales on record
    pub async fn delete(&self, customer_id: Uuid) -> AppResult<()> {
        self.get(customer_id).await?;

        let sales =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sales WHERE customer_id = $1")
                .bind(customer_id)
                .fetch_one(&self.db)
                .await?;

        if sales > 0 {
            return Err(AppError::BusinessRule {
                code: "CUSTOMER_HAS_SALES",
                message: format!("Customer has {} sales on record", sales),
                message_es: "No se puede eliminar el cliente porque tiene ventas asociadas"
                    .to_string(),
            });
        }

        sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(customer_id)
            .execute(&self.db)
            .await?;
        tracing::info!(customer_id = %customer_id, "Customer deleted");
        Ok(())
    }
}
