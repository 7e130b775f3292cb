//! Marketplace Offer Negotiation and Order Fulfillment Engine
//!
//! This library contains the core logic for multi-party offer negotiation and the order lifecycle that follows an
//! accepted offer. It is transport-agnostic; the HTTP surface lives in the `market_server` crate.
//!
//! The library is divided into two main sections:
//! 1. Storage ([`mod@sqlite`] and the trait definitions in [`mod@traits`]). SQLite is the supported backend today.
//!    Callers should never need to touch a connection directly; the data types in [`mod@db_types`] are the public
//!    vocabulary.
//! 2. The engine public API ([`mod@mkt_api`]): responding to offers, merging sessions, initiating orders, and
//!    driving the order lifecycle. Any backend implementing the traits in [`mod@traits`] can sit underneath it.
//!
//! The engine also emits events ([`mod@events`]) when negotiations and orders change. Consumers such as
//! notifications and communication-thread maintenance subscribe to these hooks; they are best-effort by design and
//! can never roll back a state change.

pub mod db_types;
pub mod eligibility;
pub mod events;
pub mod mkt_api;
pub mod status;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use mkt_api::{
    errors::{MergeRejectReason, NegotiationApiError, OrderApiError},
    offer_objects,
    ActingUser,
    NegotiationApi,
    OfferResponse,
    OrderApi,
    ResponseOutcome,
};
pub use traits::{MarketBackend, NegotiationManagement, OrderItem, OrderManagement, PermissionManagement, StoreError};
