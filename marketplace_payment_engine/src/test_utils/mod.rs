//! Test fixtures: throwaway SQLite databases and seed data for integration tests.
use mpg_common::Rupees;
use rand::Rng;

use crate::{
    db_types::{NewOrder, NewSeller, NewSubOrder, Order, OrderId, Seller, SubOrder},
    ledger_api::PaymentLedgerError,
    sqlite::SqliteDatabase,
    traits::PaymentLedgerDatabase,
};

/// Loads `.env` and wires up logging. Safe to call from every test.
pub fn prepare_test_env() {
    let _ = dotenvy::dotenv();
    let _ = env_logger::try_init();
}

/// A unique database URL under the system temp directory, created on first connection.
pub fn random_db_path() -> String {
    let id: u64 = rand::thread_rng().gen();
    let path = std::env::temp_dir().join(format!("mps_test_{id:016x}.sqlite"));
    format!("sqlite://{}?mode=rwc", path.display())
}

/// A fresh, fully migrated single-connection database.
pub async fn new_test_database() -> SqliteDatabase {
    let url = random_db_path();
    SqliteDatabase::new(1, Some(&url)).await.expect("Failed to create test database")
}

/// Moves an existing payment onto the manual payout track, the way back-office provisioning would.
pub async fn set_manual_payout_mode(db: &SqliteDatabase, sub_order_id: i64) -> Result<(), PaymentLedgerError> {
    sqlx::query("UPDATE payments SET payout_mode = 'Manual', manual_status = 'Pending' WHERE sub_order_id = $1")
        .bind(sub_order_id)
        .execute(db.pool())
        .await?;
    Ok(())
}

/// One order with `amounts.len()` sub-orders, each for its own freshly created seller.
pub async fn seed_order(
    db: &SqliteDatabase,
    order_number: &str,
    amounts: &[i64],
) -> Result<(Order, Vec<SubOrder>, Vec<Seller>), PaymentLedgerError> {
    let total = Rupees::from(amounts.iter().sum::<i64>());
    let order = NewOrder::new(
        OrderId(order_number.to_string()),
        "Test Customer".to_string(),
        "customer@example.com".to_string(),
        total,
    );
    let (order, _) = db.insert_order(order).await?;
    let mut sub_orders = Vec::with_capacity(amounts.len());
    let mut sellers = Vec::with_capacity(amounts.len());
    for (i, &amount) in amounts.iter().enumerate() {
        let seller = db
            .insert_seller(NewSeller {
                business_name: Some(format!("Seller {i} Trading Co")),
                email: format!("seller{i}@example.com"),
                ..NewSeller::default()
            })
            .await?;
        let sub_order = db
            .insert_sub_order(NewSubOrder { order_id: order.id, seller_id: seller.id, amount: Rupees::from(amount) })
            .await?;
        sub_orders.push(sub_order);
        sellers.push(seller);
    }
    Ok((order, sub_orders, sellers))
}
