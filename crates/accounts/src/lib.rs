//! Account-twin domain: shadow accounts and the ledger entries applied to them.

pub mod account;
pub mod events;
pub mod transaction;

pub use account::Account;
pub use events::AccountEvent;
pub use transaction::{Transaction, TransactionType};
