use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, SubOrderStatus},
    ledger_api::PaymentLedgerError,
    sqlite::db::sub_orders,
};

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_number(number: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_number = $1").bind(&number.0).fetch_optional(conn).await?;
    Ok(order)
}

/// Inserts the order, unless one with the same order number already exists, in which case the existing record is
/// returned and the second element of the tuple is `false`.
pub async fn idempotent_insert(order: NewOrder, conn: &mut SqliteConnection) -> Result<(Order, bool), PaymentLedgerError> {
    match fetch_order_by_number(&order.order_number, conn).await? {
        Some(existing) => {
            debug!("🗃️ Order {} already exists. Returning the existing record.", existing.order_number);
            Ok((existing, false))
        },
        None => {
            let inserted = insert_order(order, conn).await?;
            Ok((inserted, true))
        },
    }
}

async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PaymentLedgerError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (order_number, customer_name, customer_email, payment_status, total_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order.order_number.0)
    .bind(order.customer_name)
    .bind(order.customer_email)
    .bind(order.payment_status.to_string())
    .bind(order.total_amount)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

/// Recomputes the aggregate delivery status of an order from the statuses of its sub-orders.
///
/// All sub-orders delivered → `Delivered`. Any delivered or shipped → `PartiallyDelivered`. Otherwise the order
/// status is left untouched.
pub async fn refresh_delivery_status(order_id: i64, conn: &mut SqliteConnection) -> Result<Order, PaymentLedgerError> {
    let order = fetch_order(order_id, conn).await?.ok_or(PaymentLedgerError::OrderNotFound(order_id))?;
    let sub_orders = sub_orders::fetch_for_order(order_id, conn).await?;
    if sub_orders.is_empty() {
        return Ok(order);
    }
    let all_delivered = sub_orders.iter().all(|so| so.status == SubOrderStatus::Delivered);
    let any_moving = sub_orders
        .iter()
        .any(|so| matches!(so.status, SubOrderStatus::Delivered | SubOrderStatus::Shipped));
    let new_status = if all_delivered {
        OrderStatusType::Delivered
    } else if any_moving {
        OrderStatusType::PartiallyDelivered
    } else {
        return Ok(order);
    };
    if order.status == new_status {
        return Ok(order);
    }
    debug!("🗃️ Order {} moves from {} to {new_status}", order.order_number, order.status);
    let order = sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(new_status.to_string())
    .bind(order_id)
    .fetch_one(conn)
    .await?;
    Ok(order)
}
