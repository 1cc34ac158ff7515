//! Public APIs of the settlement engine.
//!
//! [`EscrowFlowApi`] drives the escrow lifecycle (creation, release, delivery confirmation, courier webhooks) and
//! [`PaymentsApi`] serves the read-only listings. Both are generic over the backend traits.
mod errors;
mod escrow_flow_api;
mod ledger_objects;
mod payments_api;

pub use errors::PaymentLedgerError;
pub use escrow_flow_api::EscrowFlowApi;
pub use ledger_objects::{
    DeliveryOutcome, Pagination, PaymentListing, PaymentQueryFilter, PaymentSummary, WebhookOutcome,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use payments_api::PaymentsApi;
