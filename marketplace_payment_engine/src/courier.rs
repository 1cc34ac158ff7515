//! Courier (Hexalog) webhook payload handling.
//!
//! The courier does not send an explicit event-type field, so the event kind is inferred from which keys are present
//! in the payload. That heuristic lives in exactly one place, [`classify_webhook`], so it can be tested in isolation
//! and swapped out if the upstream API ever grows a real event type.
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{db_types::ShipmentStatus, ledger_api::PaymentLedgerError};

/// A webhook payload, classified by shape.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// `status` + `ctime` present: a tracking status update for an existing shipment.
    TrackingUpdate(TrackingUpdate),
    /// `vendor` + `wbn` + `channelId` present: a new shipment was created for a sub-order.
    ShipmentCreation(ShipmentCreation),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingUpdate {
    /// The waybill number identifying the shipment.
    pub wbn: String,
    /// The courier's status string, in the courier's own vocabulary.
    pub status: String,
    /// The courier-side timestamp of the status change.
    pub ctime: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentCreation {
    pub vendor: String,
    pub wbn: String,
    pub channel_id: String,
    /// The sub-order this shipment fulfils.
    pub order_id: i64,
    pub expected_delivery: Option<String>,
}

/// Decides what kind of event a webhook payload represents, by key presence alone.
///
/// Tracking updates are identified by `status` + `ctime`; shipment creations by `vendor` + `wbn` + `channelId`.
/// Anything else is rejected as an invalid payload.
pub fn classify_webhook(payload: &Value) -> Result<WebhookEvent, PaymentLedgerError> {
    let has = |key: &str| payload.get(key).is_some();
    if has("status") && has("ctime") {
        let update = serde_json::from_value(payload.clone())
            .map_err(|e| PaymentLedgerError::InvalidWebhookPayload(format!("malformed tracking update: {e}")))?;
        return Ok(WebhookEvent::TrackingUpdate(update));
    }
    if has("vendor") && has("wbn") && has("channelId") {
        let creation = serde_json::from_value(payload.clone())
            .map_err(|e| PaymentLedgerError::InvalidWebhookPayload(format!("malformed shipment creation: {e}")))?;
        return Ok(WebhookEvent::ShipmentCreation(creation));
    }
    Err(PaymentLedgerError::InvalidWebhookPayload("payload matches no known event shape".to_string()))
}

/// Maps the courier's status vocabulary onto the internal [`ShipmentStatus`] enumeration.
/// Unrecognised values default to `InTransit`.
pub fn map_courier_status(status: &str) -> ShipmentStatus {
    match status {
        "Manifested" | "Not Picked" => ShipmentStatus::PendingPickup,
        "Picked Up" | "Pickup Done" => ShipmentStatus::PickedUp,
        "In Transit" | "Reached Hub" => ShipmentStatus::InTransit,
        "Out For Delivery" | "Dispatched" => ShipmentStatus::OutForDelivery,
        "Delivered" => ShipmentStatus::Delivered,
        "Undelivered" | "Failed Delivery" => ShipmentStatus::FailedDelivery,
        "RTO" | "RTO Delivered" => ShipmentStatus::Returned,
        _ => ShipmentStatus::InTransit,
    }
}

/// Parses a courier timestamp. The courier sends either RFC 3339 or a naive `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_courier_time(value: &str) -> Result<DateTime<Utc>, PaymentLedgerError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| PaymentLedgerError::InvalidWebhookPayload(format!("unparseable timestamp {value:?}: {e}")))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn classifies_tracking_updates_by_key_presence() {
        let payload = json!({"wbn": "WBN123", "status": "In Transit", "ctime": "2024-06-01 10:00:00"});
        match classify_webhook(&payload).unwrap() {
            WebhookEvent::TrackingUpdate(u) => {
                assert_eq!(u.wbn, "WBN123");
                assert_eq!(u.status, "In Transit");
            },
            other => panic!("expected tracking update, got {other:?}"),
        }
    }

    #[test]
    fn classifies_shipment_creations_by_key_presence() {
        let payload = json!({"vendor": "hexalog", "wbn": "WBN999", "channelId": "ch-1", "orderId": 42});
        match classify_webhook(&payload).unwrap() {
            WebhookEvent::ShipmentCreation(c) => {
                assert_eq!(c.wbn, "WBN999");
                assert_eq!(c.order_id, 42);
            },
            other => panic!("expected shipment creation, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unrecognised_shapes() {
        let payload = json!({"hello": "world"});
        assert!(classify_webhook(&payload).is_err());
    }

    #[test]
    fn unknown_courier_status_defaults_to_in_transit() {
        assert_eq!(map_courier_status("Delivered"), ShipmentStatus::Delivered);
        assert_eq!(map_courier_status("Dispatched"), ShipmentStatus::OutForDelivery);
        assert_eq!(map_courier_status("Quantum Tunnelling"), ShipmentStatus::InTransit);
    }

    #[test]
    fn parses_both_timestamp_formats() {
        assert!(parse_courier_time("2024-06-01T10:00:00Z").is_ok());
        assert!(parse_courier_time("2024-06-01 10:00:00").is_ok());
        assert!(parse_courier_time("yesterdayish").is_err());
    }
}
