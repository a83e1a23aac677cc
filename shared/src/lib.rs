//! Shared types and models for the Papelería point-of-sale backend
//!
//! This crate holds the domain model, input validation and the stock-mutation
//! engine. It performs no I/O of its own: persistence is reached through the
//! [`stock::StockLedger`] trait, which the backend implements over Postgres.

pub mod models;
pub mod stock;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
