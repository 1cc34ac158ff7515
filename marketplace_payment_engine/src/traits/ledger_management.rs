use crate::{
    db_types::{Order, OrderId, Payment, Seller, SubOrder},
    ledger_api::{Pagination, PaymentLedgerError, PaymentQueryFilter, PaymentSummary},
};

/// Read-only access to the settlement ledger.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement: Clone {
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, PaymentLedgerError>;

    async fn fetch_order_by_number(&self, number: &OrderId) -> Result<Option<Order>, PaymentLedgerError>;

    async fn fetch_sub_order(&self, id: i64) -> Result<Option<SubOrder>, PaymentLedgerError>;

    /// All sub-orders belonging to the given order, in insertion order.
    async fn fetch_sub_orders_for_order(&self, order_id: i64) -> Result<Vec<SubOrder>, PaymentLedgerError>;

    /// Locates the sub-order whose shipment carries the given waybill number.
    async fn fetch_sub_order_by_waybill(&self, wbn: &str) -> Result<Option<SubOrder>, PaymentLedgerError>;

    async fn fetch_seller(&self, id: i64) -> Result<Option<Seller>, PaymentLedgerError>;

    async fn fetch_payment_for_sub_order(&self, sub_order_id: i64) -> Result<Option<Payment>, PaymentLedgerError>;

    /// Fetches payments matching the filter, paginated.
    ///
    /// Ordering: entries in `AdminApproval` status first, then most recent `escrow_activated_at` (falling back to
    /// `created_at`) first.
    async fn search_payments(
        &self,
        filter: &PaymentQueryFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Payment>, PaymentLedgerError>;

    /// Aggregate counts and totals over every payment matching the filter.
    async fn payment_summary(&self, filter: &PaymentQueryFilter) -> Result<PaymentSummary, PaymentLedgerError>;
}
