use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Capability, NewOrder, Offer, OfferSession, Order, OrderId, OrderStatusType, SellerTarget},
    events::{EventProducers, OrderCreatedEvent, OrderStatusChangedEvent},
    mkt_api::{errors::OrderApiError, ActingUser},
    traits::{OrderItem, OrderManagement, PermissionManagement, StoreError},
};

/// Creates the order for a freshly accepted offer: economic fields copied from the offer, parties and thread
/// reference carried over from the session, and every market-listing line item linked and reserved inside the
/// insert transaction. Emits [`OrderCreatedEvent`] on success.
pub(crate) async fn initiate_order<B: OrderManagement>(
    db: &B,
    producers: &EventProducers,
    session: &OfferSession,
    offer: &Offer,
    items: &[OrderItem],
) -> Result<Order, StoreError> {
    let new_order = NewOrder::from_accepted_offer(session, offer);
    let order = db.insert_order(new_order, items).await?;
    info!("🔄️📦️ Order {} initiated from session {}", order.order_id, session.id);
    for emitter in &producers.order_created_producer {
        trace!("🔄️📦️ Notifying order created hook subscribers");
        let event = OrderCreatedEvent::new(order.clone());
        emitter.publish_event(event).await;
    }
    Ok(order)
}

/// `OrderApi` manages the post-acceptance lifecycle of orders.
pub struct OrderApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi")
    }
}

impl<B> OrderApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderApi<B>
where B: OrderManagement + PermissionManagement
{
    pub async fn fetch_order(&self, order_id: &OrderId, actor: &ActingUser) -> Result<Order, OrderApiError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| OrderApiError::OrderNotFound(order_id.clone()))?;
        if !self.may_view(&order, actor).await? {
            return Err(OrderApiError::Forbidden { order_id: order_id.clone(), actor_id: actor.id });
        }
        Ok(order)
    }

    pub async fn order_items(&self, order_id: &OrderId, actor: &ActingUser) -> Result<Vec<OrderItem>, OrderApiError> {
        // Reuses the access check on the order itself.
        let order = self.fetch_order(order_id, actor).await?;
        Ok(self.db.fetch_order_items(&order.order_id).await?)
    }

    /// Changes the status of an order on behalf of `actor`.
    ///
    /// Actors must be seller-side: the assigned individual, a holder of `ManageOrders` for the order's contractor,
    /// or an admin. Terminal statuses (`Fulfilled`, `Cancelled`) are immutable for non-admins. Moving to
    /// `Cancelled` releases the order's reserved inventory in the same transaction as the status write. Moving an
    /// unassigned organization order to `InProgress` assigns it to the actor. Every transition emits an
    /// [`OrderStatusChangedEvent`]; consumers (notifications, thread renames, system messages) are best-effort and
    /// cannot undo the transition.
    pub async fn update_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
        actor: &ActingUser,
    ) -> Result<Order, OrderApiError> {
        let order =
            self.db.fetch_order(order_id).await?.ok_or_else(|| OrderApiError::OrderNotFound(order_id.clone()))?;
        let old_status = order.status;
        if old_status == new_status {
            return Err(OrderApiError::StatusNoOp(new_status));
        }
        if !actor.is_admin && !self.may_manage(&order, actor).await? {
            debug!("🔄️📦️ User {} may not modify order {order_id}", actor.id);
            return Err(OrderApiError::Forbidden { order_id: order_id.clone(), actor_id: actor.id });
        }
        if old_status.is_terminal() && !actor.is_admin {
            return Err(OrderApiError::TerminalStatus { order_id: order_id.clone(), status: old_status });
        }
        let mut updated = match new_status {
            OrderStatusType::Cancelled => self.db.cancel_order(order_id, old_status).await?,
            _ => self.db.update_order_status(order_id, old_status, new_status).await?,
        };
        if new_status == OrderStatusType::InProgress && updated.assigned_id.is_none() {
            updated = self.db.assign_order(order_id, actor.id).await?;
            info!("🔄️📦️ Order {order_id} picked up by user {}", actor.id);
        }
        info!("🔄️📦️ Order {order_id} moved from {old_status} to {new_status} by user {}", actor.id);
        for emitter in &self.producers.order_status_producer {
            trace!("🔄️📦️ Notifying order status hook subscribers");
            let event = OrderStatusChangedEvent::new(updated.clone(), old_status, actor.id);
            emitter.publish_event(event).await;
        }
        Ok(updated)
    }

    /// Seller-side management rights over the order.
    async fn may_manage(&self, order: &Order, actor: &ActingUser) -> Result<bool, OrderApiError> {
        if order.assigned_id == Some(actor.id) {
            return Ok(true);
        }
        match order.seller_target() {
            SellerTarget::Organization(org_id) => {
                Ok(self.db.has_permission(org_id, actor.id, Capability::ManageOrders).await?)
            },
            SellerTarget::Individual(user_id) => Ok(actor.id == user_id),
            SellerTarget::Unassigned => Ok(false),
        }
    }

    /// Viewing rights: the customer plus everyone with management rights.
    async fn may_view(&self, order: &Order, actor: &ActingUser) -> Result<bool, OrderApiError> {
        if actor.is_admin || actor.id == order.customer_id || order.assigned_id == Some(actor.id) {
            return Ok(true);
        }
        self.may_manage(order, actor).await
    }
}
