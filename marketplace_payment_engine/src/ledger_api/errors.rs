use thiserror::Error;

use crate::db_types::PaymentStatus;

/// The typed error surface of the settlement engine.
///
/// Callers (the HTTP server in particular) map variants onto response codes; nothing anywhere inspects message
/// strings to decide behaviour.
#[derive(Debug, Clone, Error)]
pub enum PaymentLedgerError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Sub-order {0} does not exist")]
    SubOrderNotFound(i64),
    #[error("Seller {0} does not exist")]
    SellerNotFound(i64),
    #[error("No payment record exists for sub-order {0}")]
    PaymentNotFound(i64),
    #[error("No shipment matches waybill {0}")]
    WaybillNotFound(String),
    #[error("Payment for sub-order {sub_order_id} cannot move from {from} to {to}")]
    IllegalTransition { sub_order_id: i64, from: PaymentStatus, to: PaymentStatus },
    #[error("A payment record for this sub-order already exists")]
    DuplicatePayment,
    #[error("Sub-order {0} does not belong to seller {1}")]
    NotSubOrderOwner(i64, i64),
    #[error("Manual payout error: {0}")]
    ManualPayout(String),
    #[error("Invalid webhook payload: {0}")]
    InvalidWebhookPayload(String),
}

impl From<sqlx::Error> for PaymentLedgerError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation => {
                PaymentLedgerError::DuplicatePayment
            },
            _ => PaymentLedgerError::DatabaseError(e.to_string()),
        }
    }
}
