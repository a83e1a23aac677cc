//! Errors raised by the stock engine and its ledgers

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

pub type StockResult<T> = Result<T, StockError>;
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Rule violations detected by the engine before anything is written
#[derive(Debug, Error)]
pub enum StockError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("product {0} not found")]
    ProductNotFound(Uuid),

    #[error("product '{name}' is inactive")]
    ProductInactive { product_id: Uuid, name: String },

    #[error("insufficient stock for '{name}': available {available}, requested {requested}")]
    InsufficientStock {
        product_id: Uuid,
        name: String,
        available: i32,
        requested: i64,
    },

    #[error("supplier {0} not found")]
    SupplierNotFound(Uuid),

    #[error("customer {0} not found")]
    CustomerNotFound(Uuid),

    #[error("sale {0} not found")]
    SaleNotFound(Uuid),

    #[error("purchase {0} not found")]
    PurchaseNotFound(Uuid),

    #[error("sale {0} has returns and cannot be voided")]
    SaleHasReturns(Uuid),

    #[error("sale {sale_id} from {sale_day} can only be voided on the same day")]
    VoidWindowClosed { sale_id: Uuid, sale_day: NaiveDate },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl StockError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        StockError::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Failures reported by a ledger implementation
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The guarded stock update found fewer units than it needed to remove
    #[error("stock for product {product_id} would become negative")]
    NegativeStock { product_id: Uuid },

    /// A unique constraint rejected the write (e.g. invoice number)
    #[error("duplicate value violates {0}")]
    Duplicate(String),

    /// A foreign key pointed at a missing row
    #[error("missing referenced record: {0}")]
    MissingReference(String),

    #[error("storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            match db_err.code().as_deref() {
                Some("23505") => return LedgerError::Duplicate(constraint),
                Some("23503") => return LedgerError::MissingReference(constraint),
                _ => {}
            }
        }
        LedgerError::Storage(Box::new(err))
    }
}
