use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewSubOrder, ShipmentStatus, SubOrder, SubOrderStatus},
    ledger_api::PaymentLedgerError,
};

pub async fn fetch_sub_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<SubOrder>, sqlx::Error> {
    let sub_order = sqlx::query_as("SELECT * FROM sub_orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(sub_order)
}

pub async fn fetch_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<SubOrder>, sqlx::Error> {
    let sub_orders = sqlx::query_as("SELECT * FROM sub_orders WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(sub_orders)
}

pub async fn fetch_by_waybill(wbn: &str, conn: &mut SqliteConnection) -> Result<Option<SubOrder>, sqlx::Error> {
    let sub_order =
        sqlx::query_as("SELECT * FROM sub_orders WHERE tracking_number = $1").bind(wbn).fetch_optional(conn).await?;
    Ok(sub_order)
}

pub async fn insert_sub_order(sub_order: NewSubOrder, conn: &mut SqliteConnection) -> Result<SubOrder, PaymentLedgerError> {
    let sub_order = sqlx::query_as(
        "INSERT INTO sub_orders (order_id, seller_id, amount) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(sub_order.order_id)
    .bind(sub_order.seller_id)
    .bind(sub_order.amount)
    .fetch_one(conn)
    .await?;
    Ok(sub_order)
}

/// Marks the sub-order delivered. The first confirmation stamps `actual_delivery`; confirming an already
/// delivered sub-order is a no-op and the second element of the tuple is `false`.
pub async fn confirm_delivery(id: i64, conn: &mut SqliteConnection) -> Result<(SubOrder, bool), PaymentLedgerError> {
    let sub_order = fetch_sub_order(id, &mut *conn).await?.ok_or(PaymentLedgerError::SubOrderNotFound(id))?;
    if sub_order.status == SubOrderStatus::Delivered {
        debug!("🗃️ Sub-order {id} is already delivered. Nothing to do.");
        return Ok((sub_order, false));
    }
    let now = Utc::now();
    let sub_order = sqlx::query_as(
        r#"
            UPDATE sub_orders
            SET status = 'Delivered',
                actual_delivery = COALESCE(actual_delivery, $1),
                delivered_at = COALESCE(delivered_at, $1),
                shipment_status = 'Delivered',
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(now)
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok((sub_order, true))
}

/// Applies a courier tracking event to the embedded shipment.
///
/// The shipment status and location always take the incoming values; there is no sequencing check, so a
/// late-arriving earlier status overwrites a newer one. `shipped_at` is stamped once the parcel starts moving,
/// `OutForDelivery` bumps the attempt counter, and `Delivered` also flips the sub-order itself to delivered with
/// the courier's event time.
pub async fn apply_tracking_update(
    id: i64,
    status: ShipmentStatus,
    event_time: DateTime<Utc>,
    location: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<SubOrder, PaymentLedgerError> {
    let sub_order = fetch_sub_order(id, &mut *conn).await?.ok_or(PaymentLedgerError::SubOrderNotFound(id))?;
    let moving = !matches!(status, ShipmentStatus::PendingPickup);
    let shipped_at = if moving { sub_order.shipped_at.or(Some(event_time)) } else { sub_order.shipped_at };
    let attempts = sub_order.delivery_attempts + i64::from(status == ShipmentStatus::OutForDelivery);
    let delivered = status == ShipmentStatus::Delivered;
    let new_status = match (delivered, sub_order.status) {
        (true, _) => SubOrderStatus::Delivered,
        (false, SubOrderStatus::Pending | SubOrderStatus::Confirmed) if moving => SubOrderStatus::Shipped,
        (false, current) => current,
    };
    let delivered_at = if delivered { sub_order.delivered_at.or(Some(event_time)) } else { sub_order.delivered_at };
    let actual_delivery =
        if delivered { sub_order.actual_delivery.or(Some(event_time)) } else { sub_order.actual_delivery };
    debug!("🗃️ Sub-order {id} shipment moves to {status} at {event_time}");
    let sub_order = sqlx::query_as(
        r#"
            UPDATE sub_orders
            SET shipment_status = $1,
                current_location = COALESCE($2, current_location),
                delivery_attempts = $3,
                shipped_at = $4,
                delivered_at = $5,
                actual_delivery = $6,
                status = $7,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $8
            RETURNING *;
        "#,
    )
    .bind(status.to_string())
    .bind(location)
    .bind(attempts)
    .bind(shipped_at)
    .bind(delivered_at)
    .bind(actual_delivery)
    .bind(new_status.to_string())
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(sub_order)
}

/// Records a newly manifested shipment: waybill, courier and expected delivery date. The sub-order moves to
/// `Confirmed` unless it has already progressed past that point.
pub async fn record_shipment(
    id: i64,
    wbn: &str,
    courier: &str,
    expected_delivery: Option<DateTime<Utc>>,
    conn: &mut SqliteConnection,
) -> Result<SubOrder, PaymentLedgerError> {
    let sub_order = fetch_sub_order(id, &mut *conn).await?.ok_or(PaymentLedgerError::SubOrderNotFound(id))?;
    let new_status =
        if sub_order.status == SubOrderStatus::Pending { SubOrderStatus::Confirmed } else { sub_order.status };
    let sub_order = sqlx::query_as(
        r#"
            UPDATE sub_orders
            SET tracking_number = $1,
                courier = $2,
                shipment_status = 'PendingPickup',
                expected_delivery = $3,
                status = $4,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $5
            RETURNING *;
        "#,
    )
    .bind(wbn)
    .bind(courier)
    .bind(expected_delivery)
    .bind(new_status.to_string())
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(sub_order)
}
