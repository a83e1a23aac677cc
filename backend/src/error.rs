//! Error handling for the point-of-sale backend
//!
//! Provides consistent error responses in English and Spanish

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::stock::{LedgerError, StockError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String, message_es: String },

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_es: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_es: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Insufficient stock: {message}")]
    InsufficientStock { message: String, message_es: String },

    #[error("Business rule violated ({code}): {message}")]
    BusinessRule {
        code: &'static str,
        message: String,
        message_es: String,
    },

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &str, message: &str, message_es: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_es: message_es.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Validation { .. }
            | AppError::ValidationError(_)
            | AppError::InsufficientStock { .. }
            | AppError::BusinessRule { .. } => StatusCode::BAD_REQUEST,
            AppError::DuplicateEntry(_) | AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_detail = match &self {
            AppError::InvalidCredentials => ErrorDetail {
                code: "INVALID_CREDENTIALS".to_string(),
                message_en: "Invalid username or password".to_string(),
                message_es: "Usuario o contraseña incorrectos".to_string(),
                field: None,
            },
            AppError::Unauthorized {
                message,
                message_es,
            } => ErrorDetail {
                code: "UNAUTHORIZED".to_string(),
                message_en: message.clone(),
                message_es: message_es.clone(),
                field: None,
            },
            AppError::Validation {
                field,
                message,
                message_es,
            } => ErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message_en: message.clone(),
                message_es: message_es.clone(),
                field: Some(field.clone()),
            },
            AppError::ValidationError(msg) => ErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message_en: msg.clone(),
                message_es: format!("Datos inválidos: {}", msg),
                field: None,
            },
            AppError::DuplicateEntry(field) => ErrorDetail {
                code: "DUPLICATE_ENTRY".to_string(),
                message_en: format!("A record with this {} already exists", field),
                message_es: format!("Ya existe un registro con este valor de {}", field),
                field: Some(field.clone()),
            },
            AppError::Conflict {
                resource,
                message,
                message_es,
            } => ErrorDetail {
                code: "CONFLICT".to_string(),
                message_en: message.clone(),
                message_es: message_es.clone(),
                field: Some(resource.clone()),
            },
            AppError::NotFound(resource) => ErrorDetail {
                code: "NOT_FOUND".to_string(),
                message_en: format!("{} not found", resource),
                message_es: format!("No se encontró el recurso: {}", resource),
                field: None,
            },
            AppError::InsufficientStock {
                message,
                message_es,
            } => ErrorDetail {
                code: "INSUFFICIENT_STOCK".to_string(),
                message_en: message.clone(),
                message_es: message_es.clone(),
                field: None,
            },
            AppError::BusinessRule {
                code,
                message,
                message_es,
            } => ErrorDetail {
                code: code.to_string(),
                message_en: message.clone(),
                message_es: message_es.clone(),
                field: None,
            },
            AppError::DatabaseError(_) | AppError::Internal(_) => ErrorDetail {
                code: "INTERNAL_ERROR".to_string(),
                message_en: "An internal server error occurred".to_string(),
                message_es: "Error interno del servidor".to_string(),
                field: None,
            },
        };

        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Column name of a Postgres default unique constraint (`<table>_<column>_key`)
fn constraint_field(constraint: &str) -> String {
    constraint
        .strip_suffix("_key")
        .and_then(|c| c.split_once('_'))
        .map(|(_, column)| column.to_string())
        .unwrap_or_else(|| constraint.to_string())
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record".to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => {
                    AppError::DuplicateEntry(constraint_field(db_err.constraint().unwrap_or("")))
                }
                Some("23503") => AppError::Conflict {
                    resource: db_err.constraint().unwrap_or("reference").to_string(),
                    message: "The record is referenced by other data or references missing data"
                        .to_string(),
                    message_es: "El registro está relacionado con otros datos".to_string(),
                },
                _ => AppError::DatabaseError(err),
            },
            _ => AppError::DatabaseError(err),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.iter().collect();
        fields.sort_by_key(|(field, _)| **field);

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("Invalid value for {}", field));
                AppError::Validation {
                    field: field.to_string(),
                    message_es: format!("Valor inválido para {}", field),
                    message,
                }
            }
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

/// Field named by serde's "missing field `x`" message
fn missing_field(message: &str) -> Option<String> {
    let (_, rest) = message.split_once("missing field `")?;
    rest.split_once('`').map(|(field, _)| field.to_string())
}

/// Malformed request input: a 400 naming the field when serde reports one
fn rejected_input(message: String) -> AppError {
    match missing_field(&message) {
        Some(field) => AppError::Validation {
            message_es: format!("Falta el campo requerido: {}", field),
            field,
            message,
        },
        None => AppError::ValidationError(message),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        rejected_input(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        rejected_input(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        rejected_input(rejection.body_text())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NegativeStock { product_id } => AppError::InsufficientStock {
                message: format!("Not enough stock for product {}", product_id),
                message_es: format!("No hay suficiente stock para el producto {}", product_id),
            },
            LedgerError::Duplicate(constraint) => AppError::DuplicateEntry(constraint_field(&constraint)),
            LedgerError::MissingReference(reference) => AppError::Conflict {
                message: format!("Referenced record does not exist: {}", reference),
                message_es: format!("El registro relacionado no existe: {}", reference),
                resource: reference,
            },
            LedgerError::Storage(source) => AppError::Internal(source.to_string()),
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Validation { field, message } => AppError::Validation {
                field: field.to_string(),
                message_es: format!("Datos inválidos: {}", message),
                message,
            },
            StockError::ProductNotFound(id) => AppError::NotFound(format!("Product {}", id)),
            StockError::ProductInactive { name, .. } => AppError::BusinessRule {
                code: "PRODUCT_INACTIVE",
                message: format!("Product '{}' is inactive", name),
                message_es: format!("El producto '{}' no está activo", name),
            },
            StockError::InsufficientStock {
                name,
                available,
                requested,
                ..
            } => AppError::InsufficientStock {
                message: format!(
                    "Insufficient stock for {}. Available: {}, requested: {}",
                    name, available, requested
                ),
                message_es: format!(
                    "No hay suficiente stock para {}. Disponible: {}, Solicitado: {}",
                    name, available, requested
                ),
            },
            StockError::SupplierNotFound(id) => AppError::NotFound(format!("Supplier {}", id)),
            StockError::CustomerNotFound(id) => AppError::NotFound(format!("Customer {}", id)),
            StockError::SaleNotFound(id) => AppError::NotFound(format!("Sale {}", id)),
            StockError::PurchaseNotFound(id) => AppError::NotFound(format!("Purchase {}", id)),
            StockError::SaleHasReturns(_) => AppError::BusinessRule {
                code: "SALE_HAS_RETURNS",
                message: "A sale with returns cannot be voided".to_string(),
                message_es: "No se puede anular una venta que tiene devoluciones".to_string(),
            },
            StockError::VoidWindowClosed { .. } => AppError::BusinessRule {
                code: "VOID_WINDOW_CLOSED",
                message: "Only sales from the current day can be voided".to_string(),
                message_es: "Solo se pueden anular ventas del día actual".to_string(),
            },
            StockError::Ledger(err) => err.into(),
        }
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_names_map_to_columns() {
        assert_eq!(constraint_field("purchases_invoice_number_key"), "invoice_number");
        assert_eq!(constraint_field("customers_rfc_key"), "rfc");
        assert_eq!(constraint_field("custom_constraint"), "custom_constraint");
    }

    #[test]
    fn missing_fields_are_named() {
        let message = "Failed to deserialize the JSON body into the target type: \
                       missing field `product_id` at line 1 column 42";
        assert_eq!(missing_field(message).as_deref(), Some("product_id"));
        assert_eq!(missing_field("expected value at line 1 column 1"), None);
    }
}
