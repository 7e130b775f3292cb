//! Derivation of the human-facing negotiation status.
//!
//! The effective status is a pure function of the session status and the single latest offer. It deliberately does
//! not need the rest of the chain, so callers can compute it from a summary row without loading history.

use crate::db_types::{EffectiveStatus, Offer, OfferSession, OfferStatus, SessionStatus};

/// Derives the effective status of a negotiation from its session and latest offer.
///
/// A closed session resolves to `Accepted` when the terminal offer was accepted, and `Rejected` otherwise
/// (including cancelled offers, which close the session as rejections). An active session resolves to `ToSeller`
/// when the customer proposed the latest version, since the seller side owes the next response, and `ToCustomer`
/// otherwise.
pub fn effective_status(session: &OfferSession, latest: &Offer) -> EffectiveStatus {
    effective_status_raw(session.status, latest.status, latest.actor_id == session.customer_id)
}

/// The column-level form of [`effective_status`], usable on summary rows that have not been hydrated into full
/// domain structs.
pub fn effective_status_raw(
    session: SessionStatus,
    latest_offer: OfferStatus,
    customer_spoke_last: bool,
) -> EffectiveStatus {
    match session {
        SessionStatus::Closed => {
            if latest_offer == OfferStatus::Accepted {
                EffectiveStatus::Accepted
            } else {
                EffectiveStatus::Rejected
            }
        },
        SessionStatus::Active => {
            if customer_spoke_last {
                EffectiveStatus::ToSeller
            } else {
                EffectiveStatus::ToCustomer
            }
        },
    }
}
