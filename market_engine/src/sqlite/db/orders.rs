use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    traits::{OrderItem, StoreError},
};

/// Inserts a new order row. The UNIQUE constraint on `offer_session_id` enforces at most one order per session at
/// the schema level; a second insert for the same session fails here.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, StoreError> {
    let row: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                offer_session_id,
                customer_id,
                contractor_id,
                assigned_id,
                title,
                description,
                cost,
                collateral,
                payment_type,
                service_id,
                thread_id,
                status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'NotStarted')
            RETURNING *;
        "#,
    )
    .bind(&order.order_id)
    .bind(order.offer_session_id)
    .bind(order.customer_id)
    .bind(order.contractor_id)
    .bind(order.assigned_id)
    .bind(&order.title)
    .bind(&order.description)
    .bind(order.cost)
    .bind(order.collateral)
    .bind(order.payment_type)
    .bind(order.service_id)
    .bind(&order.thread_id)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order {} inserted for session {}", row.order_id, row.offer_session_id);
    Ok(row)
}

pub async fn link_listing(
    order_id: &OrderId,
    listing_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO market_listing_orders (order_id, listing_id, quantity) VALUES ($1, $2, $3)")
        .bind(order_id)
        .bind(listing_id)
        .bind(quantity)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, StoreError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_for_session(
    session_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE offer_session_id = $1")
        .bind(session_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, StoreError> {
    let items =
        sqlx::query_as("SELECT listing_id, quantity FROM market_listing_orders WHERE order_id = $1 ORDER BY id ASC")
            .bind(order_id)
            .fetch_all(conn)
            .await?;
    Ok(items)
}

/// Updates the order status, guarded by the expected prior status. The guard means two concurrent transitions
/// cannot both land; the loser observes an [`StoreError::IllegalStatusChange`].
pub async fn update_order_status(
    order_id: &OrderId,
    expected: OrderStatusType,
    new_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, StoreError> {
    let updated: Option<Order> = sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 AND status = $3 \
         RETURNING *",
    )
    .bind(new_status)
    .bind(order_id)
    .bind(expected)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(order) => Ok(order),
        None => match fetch_order(order_id, conn).await? {
            Some(order) => Err(StoreError::IllegalStatusChange(format!(
                "Order {order_id} is {}, expected {expected}",
                order.status
            ))),
            None => Err(StoreError::OrderNotFound(order_id.clone())),
        },
    }
}

pub async fn assign_order(
    order_id: &OrderId,
    assigned_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Order, StoreError> {
    let updated: Option<Order> = sqlx::query_as(
        "UPDATE orders SET assigned_id = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 RETURNING *",
    )
    .bind(assigned_id)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    updated.ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))
}
