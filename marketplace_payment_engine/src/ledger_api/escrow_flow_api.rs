use log::{debug, info, warn};
use serde_json::Value;

use crate::{
    courier::{classify_webhook, map_courier_status, parse_courier_time, WebhookEvent},
    db_types::{ActorRef, Payment, PaymentStatus, ShipmentStatus},
    ledger_api::{DeliveryOutcome, PaymentLedgerError, WebhookOutcome},
    traits::PaymentLedgerDatabase,
};

/// Drives the escrow lifecycle against a ledger backend.
#[derive(Debug, Clone)]
pub struct EscrowFlowApi<B> {
    db: B,
}

impl<B: PaymentLedgerDatabase> EscrowFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Ensures every sub-order of the given order has an escrow ledger entry.
    ///
    /// Existing entries have their amounts and seller snapshot refreshed; missing ones are created in `Escrow`
    /// status. Idempotent: N sub-orders always yield exactly N payments. Not atomic across sub-orders; the first
    /// failing sub-order aborts the loop.
    pub async fn ensure_escrow_payments(
        &self,
        order_id: i64,
        commission_rate: f64,
    ) -> Result<Vec<Payment>, PaymentLedgerError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(PaymentLedgerError::OrderNotFound(order_id))?;
        let sub_orders = self.db.fetch_sub_orders_for_order(order_id).await?;
        let mut payments = Vec::with_capacity(sub_orders.len());
        for sub_order in &sub_orders {
            let seller = self
                .db
                .fetch_seller(sub_order.seller_id)
                .await?
                .ok_or(PaymentLedgerError::SellerNotFound(sub_order.seller_id))?;
            let (payment, inserted) =
                self.db.upsert_escrow_payment(&order, sub_order, &seller, commission_rate).await?;
            let verb = if inserted { "created" } else { "refreshed" };
            debug!("🛍️ Escrow payment {verb} for sub-order {} of order {}", sub_order.id, order.order_number);
            payments.push(payment);
        }
        info!("🛍️ Order {} has {} escrow payment(s) in place.", order.order_number, payments.len());
        Ok(payments)
    }

    /// Releases the escrowed funds for a sub-order to the seller. Benign when already released.
    pub async fn release_escrow_payment(
        &self,
        sub_order_id: i64,
        actor: &ActorRef,
        note: Option<String>,
    ) -> Result<Payment, PaymentLedgerError> {
        let payment = self.db.transition_payment(sub_order_id, PaymentStatus::Released, actor, note).await?;
        info!("🛍️ Escrow payment for sub-order {sub_order_id} released by {actor}. {} to seller.", payment.seller_amount);
        Ok(payment)
    }

    /// Returns the escrowed funds to the buyer.
    pub async fn refund_escrow_payment(
        &self,
        sub_order_id: i64,
        actor: &ActorRef,
        note: Option<String>,
    ) -> Result<Payment, PaymentLedgerError> {
        self.db.transition_payment(sub_order_id, PaymentStatus::Refunded, actor, note).await
    }

    /// Freezes the payment pending dispute resolution.
    pub async fn dispute_escrow_payment(
        &self,
        sub_order_id: i64,
        actor: &ActorRef,
        note: Option<String>,
    ) -> Result<Payment, PaymentLedgerError> {
        self.db.transition_payment(sub_order_id, PaymentStatus::Disputed, actor, note).await
    }

    /// Advances a manual-mode payout one step along `Pending → Processing → Paid`.
    pub async fn advance_manual_payout(
        &self,
        sub_order_id: i64,
        actor: &ActorRef,
        note: Option<String>,
    ) -> Result<Payment, PaymentLedgerError> {
        self.db.advance_manual_payout(sub_order_id, actor, note).await
    }

    /// Confirms delivery of a sub-order and releases the escrowed funds.
    ///
    /// Two-phase: the delivery confirmation is committed first, then the release is attempted. A release failure
    /// does not roll back the delivery; it is reported in the returned [`DeliveryOutcome`] so that the
    /// reconciliation gap is visible to the caller. The parent order's aggregate status is recomputed either way.
    ///
    /// When `seller_scope` is given, the sub-order must belong to that seller.
    pub async fn confirm_delivery(
        &self,
        sub_order_id: i64,
        actor: &ActorRef,
        seller_scope: Option<i64>,
    ) -> Result<DeliveryOutcome, PaymentLedgerError> {
        let sub_order = self
            .db
            .fetch_sub_order(sub_order_id)
            .await?
            .ok_or(PaymentLedgerError::SubOrderNotFound(sub_order_id))?;
        if let Some(seller_id) = seller_scope {
            if sub_order.seller_id != seller_id {
                return Err(PaymentLedgerError::NotSubOrderOwner(sub_order_id, seller_id));
            }
        }
        let (sub_order, first_time) = self.db.confirm_sub_order_delivery(sub_order_id).await?;
        if first_time {
            info!("🛍️ Sub-order {sub_order_id} confirmed delivered by {actor}.");
        } else {
            debug!("🛍️ Sub-order {sub_order_id} was already delivered. Confirmation is a no-op.");
        }
        let order_id = sub_order.order_id;
        let note = Some("Released on delivery confirmation".to_string());
        let outcome = match self.db.transition_payment(sub_order_id, PaymentStatus::Released, actor, note).await {
            Ok(payment) => DeliveryOutcome::Delivered { sub_order, payment },
            Err(e) => {
                warn!("🛍️ Sub-order {sub_order_id} is delivered but the escrow release failed: {e}");
                DeliveryOutcome::DeliveredReleasePending { sub_order, release_error: e.to_string() }
            },
        };
        if let Err(e) = self.db.refresh_order_delivery_status(order_id).await {
            warn!("🛍️ Could not refresh order {order_id} status: {e}");
        }
        Ok(outcome)
    }

    /// Applies a courier webhook payload to the ledger.
    ///
    /// Tracking updates move the shipment (a `Delivered` status also delivers the sub-order and refreshes the
    /// parent order, but never releases escrow; release stays a seller/admin action). Shipment creations record
    /// the waybill and courier against the sub-order.
    pub async fn handle_webhook(&self, payload: &Value) -> Result<WebhookOutcome, PaymentLedgerError> {
        match classify_webhook(payload)? {
            WebhookEvent::TrackingUpdate(update) => {
                let sub_order = self
                    .db
                    .fetch_sub_order_by_waybill(&update.wbn)
                    .await?
                    .ok_or_else(|| PaymentLedgerError::WaybillNotFound(update.wbn.clone()))?;
                let status = map_courier_status(&update.status);
                let event_time = parse_courier_time(&update.ctime)?;
                let sub_order =
                    self.db.apply_tracking_update(sub_order.id, status, event_time, update.location.clone()).await?;
                info!("🛍️ Waybill {}: shipment for sub-order {} is now {status}", update.wbn, sub_order.id);
                if status == ShipmentStatus::Delivered {
                    if let Err(e) = self.db.refresh_order_delivery_status(sub_order.order_id).await {
                        warn!("🛍️ Could not refresh order {} status: {e}", sub_order.order_id);
                    }
                }
                Ok(WebhookOutcome::TrackingApplied { sub_order, shipment_status: status })
            },
            WebhookEvent::ShipmentCreation(creation) => {
                let sub_order = self.db.record_shipment_creation(&creation).await?;
                info!("🛍️ Shipment {} created by {} for sub-order {}", creation.wbn, creation.vendor, sub_order.id);
                Ok(WebhookOutcome::ShipmentRecorded { sub_order })
            },
        }
    }
}
