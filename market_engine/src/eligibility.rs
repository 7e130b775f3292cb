//! Turn-taking and read-access rules for negotiations.
//!
//! The decision logic here is pure: organization capability lookups happen in the API layer, which passes the
//! resolved `manage_orders` bit in. This keeps the asymmetric turn-taking protocol unit-testable without storage.

use crate::db_types::{Offer, OfferSession, SellerTarget};

/// Whether `actor_id` may respond to the latest offer of this session.
///
/// Rules, in order:
/// 1. Closed sessions accept no responses from anyone.
/// 2. If the customer spoke last, the seller side must respond: for an organization target the actor needs the
///    `ManageOrders` capability (`manage_orders`); for an individual target the actor must be that individual.
/// 3. Otherwise the seller side spoke last, and only the customer may respond.
pub fn can_respond(session: &OfferSession, latest: &Offer, actor_id: i64, manage_orders: bool) -> bool {
    if !session.is_active() {
        return false;
    }
    if latest.actor_id == session.customer_id {
        match session.seller_target() {
            SellerTarget::Organization(_) => manage_orders,
            SellerTarget::Individual(user) => actor_id == user,
            SellerTarget::Unassigned => false,
        }
    } else {
        actor_id == session.customer_id
    }
}

/// Whether `actor_id` may view this session at all. A superset of [`can_respond`]: the customer, the assigned
/// individual, and any holder of `ManageOrders` for the session's contractor are all related.
pub fn is_related(session: &OfferSession, actor_id: i64, manage_orders: bool) -> bool {
    if actor_id == session.customer_id {
        return true;
    }
    match session.seller_target() {
        SellerTarget::Organization(_) => manage_orders,
        SellerTarget::Individual(user) => actor_id == user,
        SellerTarget::Unassigned => false,
    }
}
