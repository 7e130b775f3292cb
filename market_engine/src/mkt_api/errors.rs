use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType, SellerTarget},
    traits::StoreError,
};

/// Machine-readable reasons a merge request is refused before any mutation happens. The `Display` form is the wire
/// code that clients switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeRejectReason {
    #[error("DIFFERENT_CUSTOMER")]
    DifferentCustomer,
    #[error("DIFFERENT_CONTRACTOR")]
    DifferentContractor,
    #[error("DIFFERENT_ASSIGNED")]
    DifferentAssigned,
    #[error("DIFFERENT_PAYMENT_TYPE")]
    DifferentPaymentType,
    #[error("HAS_SERVICES")]
    HasServices,
}

#[derive(Debug, Clone, Error)]
pub enum NegotiationApiError {
    #[error("Database error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Offer session {0} does not exist")]
    SessionNotFound(i64),
    #[error("User {actor_id} may not act on offer session {session_id}")]
    Forbidden { session_id: i64, actor_id: i64 },
    #[error("Sessions cannot be merged: {0}")]
    MergeRejected(MergeRejectReason),
    #[error("A merge requires at least two distinct source sessions")]
    NotEnoughSessions,
    #[error("Service {service_id} belongs to {owner}, but the session is addressed to {expected}")]
    ServiceOwnerMismatch { service_id: i64, owner: SellerTarget, expected: SellerTarget },
}

#[derive(Debug, Clone, Error)]
pub enum OrderApiError {
    #[error("Database error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("User {actor_id} may not modify order {order_id}")]
    Forbidden { order_id: OrderId, actor_id: i64 },
    #[error("Order {order_id} is {status}, which is terminal")]
    TerminalStatus { order_id: OrderId, status: OrderStatusType },
    #[error("The order is already {0}")]
    StatusNoOp(OrderStatusType),
}
