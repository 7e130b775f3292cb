//! The public API of the marketplace engine.
//!
//! The API structs here are generic over the storage traits in [`crate::traits`]; the HTTP server and the tests
//! both drive the engine exclusively through this module.

pub mod errors;
mod merge_api;
mod negotiation_api;
pub mod offer_objects;
mod order_api;

use serde::{Deserialize, Serialize};

pub use errors::{MergeRejectReason, NegotiationApiError, OrderApiError};
pub use negotiation_api::{NegotiationApi, OfferResponse, ResponseOutcome};
pub use order_api::OrderApi;

/// The caller identity, as resolved by the authentication layer upstream of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingUser {
    pub id: i64,
    pub is_admin: bool,
}

impl ActingUser {
    pub fn user(id: i64) -> Self {
        Self { id, is_admin: false }
    }

    pub fn admin(id: i64) -> Self {
        Self { id, is_admin: true }
    }
}
