use log::debug;

use crate::{
    ledger_api::{Pagination, PaymentLedgerError, PaymentListing, PaymentQueryFilter},
    traits::LedgerManagement,
};

/// Read-only payment listings for the dashboards.
#[derive(Debug, Clone)]
pub struct PaymentsApi<B> {
    db: B,
}

impl<B: LedgerManagement> PaymentsApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// The admin view: every payment matching the filter, paginated, with aggregate figures.
    ///
    /// The summary is computed over the filter *minus* its status predicate, so the dashboard totals cover all
    /// statuses while the listing itself stays filtered.
    pub async fn admin_payments(
        &self,
        filter: &PaymentQueryFilter,
        pagination: &Pagination,
    ) -> Result<PaymentListing, PaymentLedgerError> {
        debug!("💻️ Admin payment listing requested. Filter: {filter}");
        let payments = self.db.search_payments(filter, pagination).await?;
        let summary = self.db.payment_summary(&filter.without_status()).await?;
        Ok(PaymentListing { payments, summary, offset: pagination.sql_offset(), count: pagination.sql_limit() })
    }

    /// The seller view: as [`Self::admin_payments`], but pinned to the given seller's records.
    pub async fn seller_payments(
        &self,
        seller_id: i64,
        filter: &PaymentQueryFilter,
        pagination: &Pagination,
    ) -> Result<PaymentListing, PaymentLedgerError> {
        let filter = filter.clone().with_seller_id(seller_id);
        debug!("💻️ Seller {seller_id} payment listing requested. Filter: {filter}");
        let payments = self.db.search_payments(&filter, pagination).await?;
        let summary = self.db.payment_summary(&filter.without_status()).await?;
        Ok(PaymentListing { payments, summary, offset: pagination.sql_offset(), count: pagination.sql_limit() })
    }
}
