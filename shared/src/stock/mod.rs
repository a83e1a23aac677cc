//! Stock-mutation engine
//!
//! Every change to a product's stock goes through [`StockEngine`], which runs
//! its checks and writes against a [`StockLedger`] unit of work. A ledger is
//! opened by the caller, handed to exactly one engine operation and then
//! committed. Dropping it (or calling [`StockLedger::rollback`]) discards all
//! writes, so a failed operation never leaves partial effects.
//!
//! Two ledgers exist: the backend's Postgres transaction and
//! [`memory::MemoryStore`], used by tests.

mod engine;
mod error;
mod ledger;
pub mod memory;

pub use engine::*;
pub use error::*;
pub use ledger::*;
