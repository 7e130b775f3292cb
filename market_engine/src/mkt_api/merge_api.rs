//! Consolidation of parallel negotiations.
//!
//! A customer haggling with the same seller over several listings at once can merge those sessions into a single
//! negotiation. All preconditions are validated before anything is written; the merged session is created through
//! the ordinary session-creation path and the sources are closed in one transaction afterwards.

use std::collections::BTreeMap;

use log::*;
use mkt_common::Money;

use crate::{
    db_types::{NewLineItem, NewOffer, NewSession, Offer, OfferSession},
    mkt_api::{
        errors::{MergeRejectReason, NegotiationApiError},
        offer_objects::MergedSessions,
        NegotiationApi,
    },
    traits::{NegotiationManagement, OrderManagement, PermissionManagement, StoreError},
};

struct MergeSource {
    session: OfferSession,
    latest: Offer,
    line_items: Vec<NewLineItem>,
}

impl<B> NegotiationApi<B>
where B: NegotiationManagement + OrderManagement + PermissionManagement
{
    /// Merges two or more active sessions of one customer with one seller into a single consolidated session.
    ///
    /// The merged offer sums costs and collateral exactly, carries the oldest source session timestamp so the
    /// consolidated negotiation does not jump the queue, unions the market-listing line items, and concatenates the
    /// descriptions with a back-link per source. Sessions that differ in customer, seller side, or payment type, and sessions
    /// whose latest offer references a service, are refused with a [`MergeRejectReason`] before any mutation.
    ///
    /// On success the source sessions are closed and their latest offers rejected, all in one transaction.
    pub async fn merge_sessions(&self, session_ids: &[i64]) -> Result<MergedSessions, NegotiationApiError> {
        let mut ids = session_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        if ids.len() < 2 {
            return Err(NegotiationApiError::NotEnoughSessions);
        }
        let mut sources = Vec::with_capacity(ids.len());
        for &id in &ids {
            let session = self.db().fetch_session(id).await?.ok_or(NegotiationApiError::SessionNotFound(id))?;
            if !session.is_active() {
                return Err(StoreError::SessionNotActive(id).into());
            }
            let latest = self.db().fetch_latest_offer(id).await?.ok_or(StoreError::EmptyOfferChain(id))?;
            let line_items = self
                .db()
                .fetch_line_items(latest.id)
                .await?
                .into_iter()
                .map(|li| NewLineItem { listing_id: li.listing_id, quantity: li.quantity })
                .collect();
            sources.push(MergeSource { session, latest, line_items });
        }
        validate_sources(&sources)?;
        // Oldest session first, so the merged description and title follow the original chronology.
        sources.sort_by_key(|s| s.session.created_at);

        let first = &sources[0].session;
        let new_session = NewSession::new(first.customer_id, first.customer_name.clone(), first.seller_target());
        let new_offer = merged_offer(&sources);
        let (merged_session, merged_offer) = self.create_session(new_session, new_offer).await?;
        self.db().close_merged_sources(&ids).await?;
        info!(
            "🔄️🧩️ Sessions {ids:?} merged into session {} for customer {} and {}",
            merged_session.id,
            merged_session.customer_id,
            merged_session.seller_target()
        );
        Ok(MergedSessions { merged_session, merged_offer, source_session_ids: ids })
    }
}

/// All sources must share one customer, one seller side, and one payment type, and none may reference a service.
/// Services are owned work agreements and are not additive across negotiations.
fn validate_sources(sources: &[MergeSource]) -> Result<(), NegotiationApiError> {
    let first = &sources[0];
    for src in &sources[1..] {
        if src.session.customer_id != first.session.customer_id {
            return Err(NegotiationApiError::MergeRejected(MergeRejectReason::DifferentCustomer));
        }
        if src.session.contractor_id != first.session.contractor_id {
            return Err(NegotiationApiError::MergeRejected(MergeRejectReason::DifferentContractor));
        }
        if src.session.assigned_id != first.session.assigned_id {
            return Err(NegotiationApiError::MergeRejected(MergeRejectReason::DifferentAssigned));
        }
        if src.latest.payment_type != first.latest.payment_type {
            return Err(NegotiationApiError::MergeRejected(MergeRejectReason::DifferentPaymentType));
        }
    }
    if sources.iter().any(|s| s.latest.service_id.is_some()) {
        return Err(NegotiationApiError::MergeRejected(MergeRejectReason::HasServices));
    }
    Ok(())
}

/// Builds the consolidated offer from validated, chronologically sorted sources.
fn merged_offer(sources: &[MergeSource]) -> NewOffer {
    let first = &sources[0];
    let cost: Money = sources.iter().map(|s| s.latest.cost).sum();
    let collateral = sum_collateral(sources);
    // The session timestamps, not the latest offers': a counteroffer must not push a negotiation down the queue.
    let oldest = sources.iter().map(|s| s.session.created_at).min().unwrap_or(first.session.created_at);

    // The merged offer is attributed to the customer, so the seller side owes the next response.
    let mut offer = NewOffer::new(first.session.customer_id, first.latest.title.clone(), cost, first.latest.payment_type)
        .with_description(merged_description(sources))
        .with_timestamp(oldest);
    if let Some(collateral) = collateral {
        offer = offer.with_collateral(collateral);
    }
    for (listing_id, quantity) in union_line_items(sources) {
        offer = offer.with_line_item(listing_id, quantity);
    }
    offer
}

/// Collateral sums over the sources that carry one; `None` only when no source does.
fn sum_collateral(sources: &[MergeSource]) -> Option<Money> {
    let amounts: Vec<Money> = sources.iter().filter_map(|s| s.latest.collateral).collect();
    if amounts.is_empty() {
        None
    } else {
        Some(amounts.into_iter().sum())
    }
}

/// Unions the line items of all sources, summing quantities per listing. Deterministic order by listing id.
fn union_line_items(sources: &[MergeSource]) -> BTreeMap<i64, i64> {
    let mut union = BTreeMap::new();
    for src in sources {
        for item in &src.line_items {
            *union.entry(item.listing_id).or_insert(0) += item.quantity;
        }
    }
    union
}

/// Concatenates the source descriptions with a visible divider, each block carrying a back-link to the session it
/// came from.
fn merged_description(sources: &[MergeSource]) -> String {
    let blocks: Vec<String> = sources
        .iter()
        .map(|s| format!("[From offer session #{}: {}]\n{}", s.session.id, s.latest.title, s.latest.description))
        .collect();
    blocks.join("\n\n----------\n\n")
}
