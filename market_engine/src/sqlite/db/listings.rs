use mkt_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{MarketListing, Service},
    traits::StoreError,
};

pub async fn fetch_listing(listing_id: i64, conn: &mut SqliteConnection) -> Result<Option<MarketListing>, StoreError> {
    let listing =
        sqlx::query_as("SELECT * FROM market_listings WHERE id = $1").bind(listing_id).fetch_optional(conn).await?;
    Ok(listing)
}

pub async fn fetch_service(service_id: i64, conn: &mut SqliteConnection) -> Result<Option<Service>, StoreError> {
    let service = sqlx::query_as("SELECT * FROM services WHERE id = $1").bind(service_id).fetch_optional(conn).await?;
    Ok(service)
}

/// Reserves stock by decrementing `quantity_available`. The guard in the WHERE clause makes the decrement
/// conditional on sufficient stock, so concurrent reservations against the same listing cannot drive the quantity
/// negative.
pub async fn reserve_stock(listing_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let result = sqlx::query(
        "UPDATE market_listings SET quantity_available = quantity_available - $1 WHERE id = $2 AND \
         quantity_available >= $1",
    )
    .bind(quantity)
    .bind(listing_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() > 0 {
        return Ok(());
    }
    match fetch_listing(listing_id, conn).await? {
        Some(listing) => Err(StoreError::InsufficientStock {
            listing_id,
            requested: quantity,
            available: listing.quantity_available,
        }),
        None => Err(StoreError::ListingNotFound(listing_id)),
    }
}

/// Releases previously reserved stock. The inverse of [`reserve_stock`], applied when an order is cancelled.
pub async fn release_stock(listing_id: i64, quantity: i64, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE market_listings SET quantity_available = quantity_available + $1 WHERE id = $2")
        .bind(quantity)
        .bind(listing_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::ListingNotFound(listing_id));
    }
    Ok(())
}

pub async fn insert_listing(
    title: &str,
    price: Money,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<MarketListing, StoreError> {
    let listing = sqlx::query_as(
        "INSERT INTO market_listings (title, price, quantity_available) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(title)
    .bind(price)
    .bind(quantity)
    .fetch_one(conn)
    .await?;
    Ok(listing)
}

pub async fn insert_service(
    title: &str,
    contractor_id: Option<i64>,
    assigned_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Service, StoreError> {
    let service =
        sqlx::query_as("INSERT INTO services (title, contractor_id, assigned_id) VALUES ($1, $2, $3) RETURNING *")
            .bind(title)
            .bind(contractor_id)
            .bind(assigned_id)
            .fetch_one(conn)
            .await?;
    Ok(service)
}
