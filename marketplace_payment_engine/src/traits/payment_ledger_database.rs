use chrono::{DateTime, Utc};

use crate::{
    courier::ShipmentCreation,
    db_types::{ActorRef, NewOrder, NewSeller, NewSubOrder, Order, Payment, PaymentStatus, Seller, ShipmentStatus, SubOrder},
    ledger_api::PaymentLedgerError,
    traits::LedgerManagement,
};

/// The mutation surface a backend must provide for the escrow settlement flows.
///
/// All operations are request-scoped: implementations may use internal transactions per call, but no cross-call
/// locking is assumed. The UNIQUE index on `payments.sub_order_id` is the only duplicate-creation guard.
#[allow(async_fn_in_trait)]
pub trait PaymentLedgerDatabase: Clone + LedgerManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    async fn insert_seller(&self, seller: NewSeller) -> Result<Seller, PaymentLedgerError>;

    /// Inserts an order, idempotent by order number. Returns `false` in the second element if the order already
    /// existed.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), PaymentLedgerError>;

    async fn insert_sub_order(&self, sub_order: NewSubOrder) -> Result<SubOrder, PaymentLedgerError>;

    /// Creates or refreshes the escrow ledger entry for one sub-order.
    ///
    /// If no payment exists, a new one is inserted with `Escrow` status, `escrow_activated_at = now` and a seeded
    /// history entry. If one exists already, only the amounts, the seller snapshot and the denormalised order
    /// number are updated; status, timestamps and history are left untouched.
    ///
    /// Returns `true` in the second element if a new record was inserted.
    async fn upsert_escrow_payment(
        &self,
        order: &Order,
        sub_order: &SubOrder,
        seller: &Seller,
        commission_rate: f64,
    ) -> Result<(Payment, bool), PaymentLedgerError>;

    /// Moves a payment to a new status, appending a history entry.
    ///
    /// Permitted transitions: from `Escrow` or `AdminApproval` to any of `AdminApproval`, `Released`, `Refunded`,
    /// `Cancelled` or `Disputed`. Re-releasing an already `Released` payment is benign: the record is returned
    /// unchanged. Every other combination is an [`PaymentLedgerError::IllegalTransition`].
    ///
    /// Moving to `Released` stamps `released_at`.
    async fn transition_payment(
        &self,
        sub_order_id: i64,
        new_status: PaymentStatus,
        actor: &ActorRef,
        note: Option<String>,
    ) -> Result<Payment, PaymentLedgerError>;

    /// Advances the manual payout status one step (`Pending → Processing → Paid`), appending to the manual
    /// history. Fails if the payment is not in `Manual` payout mode, or is already `Paid`.
    async fn advance_manual_payout(
        &self,
        sub_order_id: i64,
        actor: &ActorRef,
        note: Option<String>,
    ) -> Result<Payment, PaymentLedgerError>;

    /// Marks a sub-order as delivered.
    ///
    /// The first confirmation stamps `actual_delivery`; re-confirming an already delivered sub-order leaves the
    /// timestamp alone. Returns `true` in the second element if this call was the first confirmation.
    async fn confirm_sub_order_delivery(&self, sub_order_id: i64) -> Result<(SubOrder, bool), PaymentLedgerError>;

    /// Recomputes the parent order's aggregate status from its sub-orders: all delivered → `Delivered`; any
    /// delivered or shipped → `PartiallyDelivered`; otherwise the status is left as is.
    async fn refresh_order_delivery_status(&self, order_id: i64) -> Result<Order, PaymentLedgerError>;

    /// Applies a courier tracking update to a sub-order's embedded shipment.
    ///
    /// Always updates the shipment status, location, attempt count and timestamps. A `Delivered` shipment status
    /// also sets the sub-order status to `Delivered` with `actual_delivery`/`delivered_at` taken from the courier
    /// event time. No sequencing check is performed; a late-arriving earlier status overwrites a newer one.
    async fn apply_tracking_update(
        &self,
        sub_order_id: i64,
        status: ShipmentStatus,
        event_time: DateTime<Utc>,
        location: Option<String>,
    ) -> Result<SubOrder, PaymentLedgerError>;

    /// Records a newly created shipment against a sub-order: waybill, courier and expected delivery date, and
    /// moves the sub-order to `Confirmed`.
    async fn record_shipment_creation(&self, creation: &ShipmentCreation) -> Result<SubOrder, PaymentLedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentLedgerError> {
        Ok(())
    }
}
