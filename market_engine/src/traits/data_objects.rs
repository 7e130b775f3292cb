use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One order↔listing link, i.e. the reserved quantity of a listing committed to an order.
#[derive(Debug, Clone, Copy, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub listing_id: i64,
    pub quantity: i64,
}
