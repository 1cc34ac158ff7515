use sqlx::SqliteConnection;

use crate::{
    db_types::{NewSeller, Seller},
    ledger_api::PaymentLedgerError,
};

pub async fn insert_seller(seller: NewSeller, conn: &mut SqliteConnection) -> Result<Seller, PaymentLedgerError> {
    let seller = sqlx::query_as(
        r#"
            INSERT INTO sellers (business_name, name, first_name, last_name, email)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(seller.business_name)
    .bind(seller.name)
    .bind(seller.first_name)
    .bind(seller.last_name)
    .bind(seller.email)
    .fetch_one(conn)
    .await?;
    Ok(seller)
}

pub async fn fetch_seller(id: i64, conn: &mut SqliteConnection) -> Result<Option<Seller>, sqlx::Error> {
    let seller = sqlx::query_as("SELECT * FROM sellers WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(seller)
}
