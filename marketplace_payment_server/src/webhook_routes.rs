//----------------------------------------------   Hexalog webhook  ---------------------------------------------------
//! The courier webhook endpoint.
//!
//! The HMAC signature has already been verified by the middleware wrapping this scope by the time a request gets
//! here; this handler only classifies the payload and applies it to the ledger.
use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, trace, warn};
use marketplace_payment_engine::{ledger_api::WebhookOutcome, traits::PaymentLedgerDatabase, EscrowFlowApi};
use serde_json::{json, Value};

use crate::{errors::ServerError, route};

route!(hexalog_webhook => Post "/webhook" impl PaymentLedgerDatabase);
pub async fn hexalog_webhook<A: PaymentLedgerDatabase>(
    req: HttpRequest,
    body: web::Json<Value>,
    api: web::Data<EscrowFlowApi<A>>,
) -> Result<HttpResponse, ServerError> {
    trace!("🚚️ Received courier webhook request: {}", req.uri());
    let payload = body.into_inner();
    match api.handle_webhook(&payload).await {
        Ok(WebhookOutcome::TrackingApplied { sub_order, shipment_status }) => {
            info!("🚚️ Tracking update applied. Sub-order {} is now {shipment_status}.", sub_order.id);
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "message": "Tracking update applied.",
                "sub_order_id": sub_order.id,
                "shipment_status": shipment_status,
            })))
        },
        Ok(WebhookOutcome::ShipmentRecorded { sub_order }) => {
            info!("🚚️ Shipment recorded for sub-order {}.", sub_order.id);
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "message": "Shipment recorded.",
                "sub_order_id": sub_order.id,
            })))
        },
        // Stale references (unknown waybill or sub-order) come back as 404 and ride the courier's retry cycle.
        Err(e) => {
            warn!("🚚️ Could not process webhook payload. {e}");
            Err(e.into())
        },
    }
}
