//! Backend trait definitions for the marketplace engine.
//!
//! Specific storage backends (SQLite today) implement these traits; the API layer in [`crate::mkt_api`] is written
//! against them and never touches a connection directly.

mod data_objects;
mod negotiation;
mod orders;
mod permissions;

use thiserror::Error;

pub use data_objects::OrderItem;
pub use negotiation::NegotiationManagement;
pub use orders::OrderManagement;
pub use permissions::PermissionManagement;

use crate::db_types::OrderId;

/// Blanket alias for backends implementing the full set of storage traits. Route handlers are generic over this
/// rather than spelling out the three bounds everywhere.
pub trait MarketBackend: NegotiationManagement + OrderManagement + PermissionManagement {}

impl<T> MarketBackend for T where T: NegotiationManagement + OrderManagement + PermissionManagement {}

/// Storage-level failures. API layers translate these into their own error vocabulary before they reach a caller.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("The requested offer session {0} does not exist")]
    SessionNotFound(i64),
    #[error("Offer session {0} is not active")]
    SessionNotActive(i64),
    #[error("Offer session {0} has no offers. The chain is created with the session, so this is a data bug")]
    EmptyOfferChain(i64),
    #[error("The requested offer (internal id {0}) does not exist")]
    OfferNotFound(i64),
    #[error("The requested market listing {0} does not exist")]
    ListingNotFound(i64),
    #[error("Market listing {listing_id} has {available} available, but {requested} were requested")]
    InsufficientStock { listing_id: i64, requested: i64, available: i64 },
    #[error("The requested service {0} does not exist")]
    ServiceNotFound(i64),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("A thread already exists for session {0}")]
    ThreadAlreadyExists(i64),
    #[error("Illegal status change: {0}")]
    IllegalStatusChange(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}
