//! Backend traits for the settlement engine.
//!
//! A database backend implements [`LedgerManagement`] (read paths) and [`PaymentLedgerDatabase`] (mutations).
//! The public APIs in [`crate::ledger_api`] are generic over these traits, so the flow logic is testable against
//! any backend and the HTTP server never talks to the database directly.
mod ledger_management;
mod payment_ledger_database;

pub use ledger_management::LedgerManagement;
pub use payment_ledger_database::PaymentLedgerDatabase;
