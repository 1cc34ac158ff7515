//! Marketplace Payment Engine
//!
//! The settlement core of the marketplace payment server. It keeps the escrow ledger: one payment record per
//! seller sub-order, created when the customer's money is captured, held until delivery is confirmed, and then
//! released to the seller net of the platform commission.
//!
//! The library is divided into three main sections:
//! 1. Database types and backend traits ([`mod@db_types`], [`mod@traits`]). A backend implements
//!    [`traits::LedgerManagement`] and [`traits::PaymentLedgerDatabase`]; SQLite is the bundled implementation.
//!    You should never need to access the database directly. Instead, use the public API.
//! 2. The public API ([`mod@ledger_api`]): [`EscrowFlowApi`] for the escrow lifecycle and [`PaymentsApi`] for the
//!    dashboard listings.
//! 3. Courier integration ([`mod@courier`]): webhook payload classification and status vocabulary mapping for the
//!    Hexalog shipping partner.
pub mod courier;
pub mod db_types;
pub mod ledger_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "sqlite")]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use ledger_api::{EscrowFlowApi, PaymentLedgerError, PaymentsApi};
pub use traits::{LedgerManagement, PaymentLedgerDatabase};
