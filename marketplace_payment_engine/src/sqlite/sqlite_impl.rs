use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqlitePool;

use crate::{
    courier::{parse_courier_time, ShipmentCreation},
    db_types::{
        ActorRef, NewOrder, NewSeller, NewSubOrder, Order, OrderId, Payment, PaymentStatus, Seller, ShipmentStatus,
        SubOrder,
    },
    ledger_api::{Pagination, PaymentLedgerError, PaymentQueryFilter, PaymentSummary},
    sqlite::db::{self, orders, payments, sellers, sub_orders},
    traits::{LedgerManagement, PaymentLedgerDatabase},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool to the url given (or the value of the `MPS_DATABASE_URL` environment
    /// variable if `None`) and runs any pending migrations.
    pub async fn new(max_connections: u32, url: Option<&str>) -> Result<Self, sqlx::Error> {
        let url = url.map(String::from).unwrap_or_else(db::db_url);
        let pool = db::new_pool(&url, max_connections).await?;
        sqlx::migrate!("./src/sqlite/migrations").run(&pool).await?;
        debug!("🗃️ Database connection pool established.");
        Ok(Self { url, pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl LedgerManagement for SqliteDatabase {
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(id, &mut conn).await?)
    }

    async fn fetch_order_by_number(&self, number: &OrderId) -> Result<Option<Order>, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(number, &mut conn).await?)
    }

    async fn fetch_sub_order(&self, id: i64) -> Result<Option<SubOrder>, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(sub_orders::fetch_sub_order(id, &mut conn).await?)
    }

    async fn fetch_sub_orders_for_order(&self, order_id: i64) -> Result<Vec<SubOrder>, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(sub_orders::fetch_for_order(order_id, &mut conn).await?)
    }

    async fn fetch_sub_order_by_waybill(&self, wbn: &str) -> Result<Option<SubOrder>, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(sub_orders::fetch_by_waybill(wbn, &mut conn).await?)
    }

    async fn fetch_seller(&self, id: i64) -> Result<Option<Seller>, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(sellers::fetch_seller(id, &mut conn).await?)
    }

    async fn fetch_payment_for_sub_order(&self, sub_order_id: i64) -> Result<Option<Payment>, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(payments::fetch_for_sub_order(sub_order_id, &mut conn).await?)
    }

    async fn search_payments(
        &self,
        filter: &PaymentQueryFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Payment>, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        payments::search(filter, pagination, &mut conn).await
    }

    async fn payment_summary(&self, filter: &PaymentQueryFilter) -> Result<PaymentSummary, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        payments::summary(filter, &mut conn).await
    }
}

impl PaymentLedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_seller(&self, seller: NewSeller) -> Result<Seller, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        sellers::insert_seller(seller, &mut conn).await
    }

    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), PaymentLedgerError> {
        let mut tx = self.pool.begin().await?;
        let result = orders::idempotent_insert(order, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn insert_sub_order(&self, sub_order: NewSubOrder) -> Result<SubOrder, PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        sub_orders::insert_sub_order(sub_order, &mut conn).await
    }

    async fn upsert_escrow_payment(
        &self,
        order: &Order,
        sub_order: &SubOrder,
        seller: &Seller,
        commission_rate: f64,
    ) -> Result<(Payment, bool), PaymentLedgerError> {
        let mut conn = self.pool.acquire().await?;
        payments::upsert_escrow(order, sub_order, seller, commission_rate, &mut conn).await
    }

    async fn transition_payment(
        &self,
        sub_order_id: i64,
        new_status: PaymentStatus,
        actor: &ActorRef,
        note: Option<String>,
    ) -> Result<Payment, PaymentLedgerError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::transition(sub_order_id, new_status, actor, note, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn advance_manual_payout(
        &self,
        sub_order_id: i64,
        actor: &ActorRef,
        note: Option<String>,
    ) -> Result<Payment, PaymentLedgerError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::advance_manual(sub_order_id, actor, note, &mut tx).await?;
        tx.commit().await?;
        Ok(payment)
    }

    async fn confirm_sub_order_delivery(&self, sub_order_id: i64) -> Result<(SubOrder, bool), PaymentLedgerError> {
        let mut tx = self.pool.begin().await?;
        let result = sub_orders::confirm_delivery(sub_order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn refresh_order_delivery_status(&self, order_id: i64) -> Result<Order, PaymentLedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::refresh_delivery_status(order_id, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn apply_tracking_update(
        &self,
        sub_order_id: i64,
        status: ShipmentStatus,
        event_time: DateTime<Utc>,
        location: Option<String>,
    ) -> Result<SubOrder, PaymentLedgerError> {
        let mut tx = self.pool.begin().await?;
        let sub_order = sub_orders::apply_tracking_update(sub_order_id, status, event_time, location, &mut tx).await?;
        tx.commit().await?;
        Ok(sub_order)
    }

    async fn record_shipment_creation(&self, creation: &ShipmentCreation) -> Result<SubOrder, PaymentLedgerError> {
        let expected = expected_delivery_time(creation);
        let mut tx = self.pool.begin().await?;
        let sub_order =
            sub_orders::record_shipment(creation.order_id, &creation.wbn, &creation.vendor, expected, &mut tx).await?;
        tx.commit().await?;
        Ok(sub_order)
    }

    async fn close(&mut self) -> Result<(), PaymentLedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

fn expected_delivery_time(creation: &ShipmentCreation) -> Option<DateTime<Utc>> {
    // An unparseable expected-delivery date is not worth failing the shipment record over.
    creation.expected_delivery.as_deref().and_then(|s| parse_courier_time(s).ok())
}
