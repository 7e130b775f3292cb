use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    traits::{OrderItem, StoreError},
};

/// Persistence for orders and the inventory reservations they carry.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Inserts the order, records an order↔listing link for every line item of the accepted offer, and decrements
    /// each listing's available quantity by the reserved amount. All in one transaction: an order never exists with
    /// half its inventory reserved.
    async fn insert_order(&self, order: NewOrder, items: &[OrderItem]) -> Result<Order, StoreError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// The order created from the given session, if any. At most one exists per session.
    async fn fetch_order_for_session(&self, session_id: i64) -> Result<Option<Order>, StoreError>;

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, StoreError>;

    /// Updates the order status, guarded by the expected prior status so that concurrent transitions cannot both
    /// land. Returns the updated order.
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatusType,
        new_status: OrderStatusType,
    ) -> Result<Order, StoreError>;

    /// Cancels the order and releases its reserved inventory (the inverse of the insert-time decrement), in one
    /// transaction.
    async fn cancel_order(&self, order_id: &OrderId, expected: OrderStatusType) -> Result<Order, StoreError>;

    /// Sets the assigned individual on the order. Used when a seller-side user picks up an unassigned
    /// organization order.
    async fn assign_order(&self, order_id: &OrderId, assigned_id: i64) -> Result<Order, StoreError>;
}
