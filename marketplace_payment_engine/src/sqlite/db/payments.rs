use chrono::Utc;
use log::debug;
use sqlx::{types::Json, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        ActorRef, ManualPayoutStatus, Order, Payment, PaymentHistoryEntry, PaymentStatus, PayoutMode, Seller,
        SellerSnapshot, SubOrder,
    },
    ledger_api::{Pagination, PaymentLedgerError, PaymentQueryFilter, PaymentSummary},
};

pub async fn fetch_for_sub_order(sub_order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE sub_order_id = $1")
        .bind(sub_order_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

/// Creates or refreshes the escrow ledger entry for one sub-order.
///
/// On first creation the entry starts in `Escrow` with `escrow_activated_at` stamped and a seeded history entry.
/// On subsequent calls only the amounts, the seller snapshot and the denormalised order number are written;
/// status, timestamps and history stay as they are. Concurrent first-time creation is resolved by the UNIQUE
/// index on `sub_order_id`: the loser retries as an update.
pub async fn upsert_escrow(
    order: &Order,
    sub_order: &SubOrder,
    seller: &Seller,
    commission_rate: f64,
    conn: &mut SqliteConnection,
) -> Result<(Payment, bool), PaymentLedgerError> {
    let snapshot = seller.snapshot();
    let (commission, seller_amount) = sub_order.amount.commission_split(commission_rate);
    if fetch_for_sub_order(sub_order.id, &mut *conn).await?.is_some() {
        let payment = refresh_amounts(order, sub_order, &snapshot, commission_rate, conn).await?;
        return Ok((payment, false));
    }
    let actor = ActorRef::system();
    let seeded = PaymentHistoryEntry::new(PaymentStatus::Escrow, &actor, Some("Escrow payment created".to_string()));
    let inserted = sqlx::query_as(
        r#"
            INSERT INTO payments (
                sub_order_id, order_number, seller_id, seller_name, seller_email,
                total_amount, commission_rate, commission_amount, seller_amount,
                status, payout_mode, escrow_activated_at, history
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'Escrow', 'Escrow', $10, $11)
            RETURNING *;
        "#,
    )
    .bind(sub_order.id)
    .bind(&order.order_number.0)
    .bind(seller.id)
    .bind(&snapshot.name)
    .bind(&snapshot.email)
    .bind(sub_order.amount)
    .bind(commission_rate)
    .bind(commission)
    .bind(seller_amount)
    .bind(Utc::now())
    .bind(Json(vec![seeded]))
    .fetch_one(&mut *conn)
    .await;
    match inserted {
        Ok(payment) => {
            debug!("🗃️ Escrow payment created for sub-order {}", sub_order.id);
            Ok((payment, true))
        },
        Err(e) => match PaymentLedgerError::from(e) {
            // Lost a creation race. The record exists now, so refresh it instead.
            PaymentLedgerError::DuplicatePayment => {
                let payment = refresh_amounts(order, sub_order, &snapshot, commission_rate, conn).await?;
                Ok((payment, false))
            },
            other => Err(other),
        },
    }
}

async fn refresh_amounts(
    order: &Order,
    sub_order: &SubOrder,
    snapshot: &SellerSnapshot,
    commission_rate: f64,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentLedgerError> {
    let (commission, seller_amount) = sub_order.amount.commission_split(commission_rate);
    let payment = sqlx::query_as(
        r#"
            UPDATE payments
            SET order_number = $1,
                seller_name = $2,
                seller_email = $3,
                total_amount = $4,
                commission_rate = $5,
                commission_amount = $6,
                seller_amount = $7,
                updated_at = CURRENT_TIMESTAMP
            WHERE sub_order_id = $8
            RETURNING *;
        "#,
    )
    .bind(&order.order_number.0)
    .bind(&snapshot.name)
    .bind(&snapshot.email)
    .bind(sub_order.amount)
    .bind(commission_rate)
    .bind(commission)
    .bind(seller_amount)
    .bind(sub_order.id)
    .fetch_one(conn)
    .await?;
    Ok(payment)
}

/// Moves a payment to a new status, appending a history entry.
///
/// The only legal sources are the held states (`Escrow` and `AdminApproval`). Re-releasing a `Released` payment
/// returns the record unchanged; anything else from a non-held state is an illegal transition.
pub async fn transition(
    sub_order_id: i64,
    new_status: PaymentStatus,
    actor: &ActorRef,
    note: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentLedgerError> {
    let payment = fetch_for_sub_order(sub_order_id, &mut *conn)
        .await?
        .ok_or(PaymentLedgerError::PaymentNotFound(sub_order_id))?;
    if payment.status == PaymentStatus::Released && new_status == PaymentStatus::Released {
        debug!("🗃️ Payment for sub-order {sub_order_id} is already released. Nothing to do.");
        return Ok(payment);
    }
    let legal = payment.status.is_held()
        && matches!(
            new_status,
            PaymentStatus::AdminApproval
                | PaymentStatus::Released
                | PaymentStatus::Refunded
                | PaymentStatus::Cancelled
                | PaymentStatus::Disputed
        );
    if !legal {
        return Err(PaymentLedgerError::IllegalTransition { sub_order_id, from: payment.status, to: new_status });
    }
    let mut history = payment.history.0.clone();
    history.push(PaymentHistoryEntry::new(new_status, actor, note));
    let released_at = (new_status == PaymentStatus::Released).then(Utc::now);
    debug!("🗃️ Payment for sub-order {sub_order_id} moves from {} to {new_status} by {actor}", payment.status);
    let payment = sqlx::query_as(
        r#"
            UPDATE payments
            SET status = $1,
                released_at = COALESCE($2, released_at),
                history = $3,
                updated_at = CURRENT_TIMESTAMP
            WHERE sub_order_id = $4
            RETURNING *;
        "#,
    )
    .bind(new_status.to_string())
    .bind(released_at)
    .bind(Json(history))
    .bind(sub_order_id)
    .fetch_one(conn)
    .await?;
    Ok(payment)
}

/// Advances the manual payout one step along `Pending → Processing → Paid`, appending to the manual history.
pub async fn advance_manual(
    sub_order_id: i64,
    actor: &ActorRef,
    note: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Payment, PaymentLedgerError> {
    let payment = fetch_for_sub_order(sub_order_id, &mut *conn)
        .await?
        .ok_or(PaymentLedgerError::PaymentNotFound(sub_order_id))?;
    if payment.payout_mode != PayoutMode::Manual {
        return Err(PaymentLedgerError::ManualPayout(format!(
            "Payment for sub-order {sub_order_id} is not in manual payout mode"
        )));
    }
    let current = payment.manual_status.unwrap_or(ManualPayoutStatus::Pending);
    let next = current
        .next()
        .ok_or_else(|| PaymentLedgerError::ManualPayout(format!("Sub-order {sub_order_id} is already paid out")))?;
    let mut manual_history = payment.manual_history.0.clone();
    manual_history.push(PaymentHistoryEntry::new(next, actor, note));
    let payment = sqlx::query_as(
        r#"
            UPDATE payments
            SET manual_status = $1,
                manual_history = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE sub_order_id = $3
            RETURNING *;
        "#,
    )
    .bind(next.to_string())
    .bind(Json(manual_history))
    .bind(sub_order_id)
    .fetch_one(conn)
    .await?;
    Ok(payment)
}

fn append_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &PaymentQueryFilter) {
    if filter.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(status) = filter.status {
        where_clause.push("status = ").push_bind_unseparated(status.to_string());
    }
    if let Some(seller_id) = filter.seller_id {
        where_clause.push("seller_id = ").push_bind_unseparated(seller_id);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        where_clause
            .push("(order_number LIKE ")
            .push_bind_unseparated(pattern.clone())
            .push_unseparated(" OR seller_name LIKE ")
            .push_bind_unseparated(pattern.clone())
            .push_unseparated(" OR seller_email LIKE ")
            .push_bind_unseparated(pattern)
            .push_unseparated(")");
    }
    if let Some(since) = filter.since {
        where_clause.push("COALESCE(escrow_activated_at, created_at) >= ").push_bind_unseparated(since);
    }
    if let Some(until) = filter.until {
        where_clause.push("COALESCE(escrow_activated_at, created_at) <= ").push_bind_unseparated(until);
    }
}

/// Fetches payments matching the filter, most urgent first: entries waiting on admin approval lead, then newest
/// escrow activations.
pub async fn search(
    filter: &PaymentQueryFilter,
    pagination: &Pagination,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, PaymentLedgerError> {
    let mut builder = QueryBuilder::new("SELECT * FROM payments");
    append_filter(&mut builder, filter);
    builder.push(
        " ORDER BY CASE WHEN status = 'AdminApproval' THEN 0 ELSE 1 END, \
         COALESCE(escrow_activated_at, created_at) DESC",
    );
    builder.push(" LIMIT ").push_bind(pagination.sql_limit());
    builder.push(" OFFSET ").push_bind(pagination.sql_offset());
    debug!("🗃️ Searching payments. Filter: {filter}");
    let payments = builder.build_query_as().fetch_all(conn).await?;
    Ok(payments)
}

/// One-pass aggregate over every payment matching the filter.
pub async fn summary(filter: &PaymentQueryFilter, conn: &mut SqliteConnection) -> Result<PaymentSummary, PaymentLedgerError> {
    let mut builder = QueryBuilder::new(
        r#"
        SELECT
            COUNT(*) AS total_count,
            COALESCE(SUM(CASE WHEN status IN ('Escrow', 'AdminApproval') THEN 1 ELSE 0 END), 0) AS escrow_count,
            COALESCE(SUM(CASE WHEN status = 'Released' THEN 1 ELSE 0 END), 0) AS released_count,
            COALESCE(SUM(CASE WHEN status IN ('Escrow', 'AdminApproval') THEN total_amount ELSE 0 END), 0) AS escrow_total,
            COALESCE(SUM(CASE WHEN status = 'Released' THEN seller_amount ELSE 0 END), 0) AS released_total,
            COALESCE(SUM(commission_amount), 0) AS commission_total,
            COALESCE(SUM(CASE WHEN status = 'Released' THEN commission_amount ELSE 0 END), 0) AS released_commission_total
        FROM payments
        "#,
    );
    append_filter(&mut builder, filter);
    let summary = builder.build_query_as().fetch_one(conn).await?;
    Ok(summary)
}
