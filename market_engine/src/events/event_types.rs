use serde::{Deserialize, Serialize};

use crate::db_types::{Offer, OfferSession, Order, OrderStatusType};

/// A new offer version was appended to an active session. The previous latest offer is now `Counteroffered`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterofferEvent {
    pub session: OfferSession,
    pub offer: Offer,
}

impl CounterofferEvent {
    pub fn new(session: OfferSession, offer: Offer) -> Self {
        Self { session, offer }
    }
}

/// A negotiation reached a terminal status. `order` is populated iff the decision was an acceptance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferDecidedEvent {
    pub session: OfferSession,
    pub offer: Offer,
    pub order: Option<Order>,
}

impl OfferDecidedEvent {
    pub fn new(session: OfferSession, offer: Offer, order: Option<Order>) -> Self {
        Self { session, offer, order }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An order moved through its lifecycle. `actor_id` is the user who drove the transition, so consumers can act on
/// the person as well as the order (a user picking up an order joins its thread, for instance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatusType,
    pub new_status: OrderStatusType,
    pub actor_id: i64,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatusType, actor_id: i64) -> Self {
        let new_status = order.status;
        Self { order, old_status, new_status, actor_id }
    }
}
