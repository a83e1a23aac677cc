//! HTTP handlers

pub mod auth;
pub mod categories;
pub mod customers;
pub mod health;
pub mod inventory;
pub mod products;
pub mod purchases;
pub mod sales;
pub mod suppliers;

pub use auth::*;
pub use categories::*;
pub use customers::*;
pub use health::*;
pub use inventory::*;
pub use products::*;
pub use purchases::*;
pub use sales::*;
pub use suppliers::*;
