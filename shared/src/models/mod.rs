//! Domain models for the point-of-sale backend

mod catalog;
mod inventory;
mod party;
mod purchase;
mod sale;
mod user;

pub use catalog::*;
pub use inventory::*;
pub use party::*;
pub use purchase::*;
pub use sale::*;
pub use user::*;
