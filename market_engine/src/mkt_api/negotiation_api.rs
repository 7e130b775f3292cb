use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        Capability,
        NewOffer,
        NewSession,
        Offer,
        OfferSession,
        OfferStatus,
        Order,
        SellerTarget,
    },
    eligibility::{can_respond, is_related},
    events::{CounterofferEvent, EventProducers, OfferDecidedEvent},
    mkt_api::{
        errors::NegotiationApiError,
        offer_objects::{OfferQueryFilter, OfferSearchResult, SessionHistory, SessionSummary},
        order_api,
        ActingUser,
    },
    traits::{NegotiationManagement, OrderItem, OrderManagement, PermissionManagement, StoreError},
};

/// The caller's answer to the latest offer of a session. A client-side "cancel" is normalised to `Reject` before it
/// reaches the engine; both close the session without an order.
#[derive(Debug, Clone)]
pub enum OfferResponse {
    Accept,
    Reject,
    Counter(NewOffer),
}

/// What a successful [`NegotiationApi::respond`] call did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResponseOutcome {
    /// The offer was accepted and an order was created from it.
    OrderCreated { offer: Offer, order: Order },
    /// The session closed without an order.
    Rejected { offer: Offer },
    /// A new offer version was appended; the ball is in the other party's court.
    Countered { offer: Offer },
}

/// `NegotiationApi` is the primary API for driving offer negotiations: reading sessions, responding to offers, and
/// initiating orders from accepted offers.
pub struct NegotiationApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for NegotiationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NegotiationApi")
    }
}

impl<B> NegotiationApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub(crate) fn db(&self) -> &B {
        &self.db
    }

    pub(crate) fn producers(&self) -> &EventProducers {
        &self.producers
    }
}

impl<B> NegotiationApi<B>
where B: NegotiationManagement + OrderManagement + PermissionManagement
{
    /// Resolves the `ManageOrders` bit for the actor against the session's seller side. Only organization targets
    /// ever consult the permission table.
    async fn manage_orders_bit(
        &self,
        session: &OfferSession,
        actor: &ActingUser,
    ) -> Result<bool, NegotiationApiError> {
        match session.seller_target() {
            SellerTarget::Organization(org_id) => {
                Ok(self.db.has_permission(org_id, actor.id, Capability::ManageOrders).await?)
            },
            _ => Ok(false),
        }
    }

    /// The session with its full offer chain. Admins and related parties only.
    pub async fn session_history(
        &self,
        session_id: i64,
        actor: &ActingUser,
    ) -> Result<SessionHistory, NegotiationApiError> {
        let history = self
            .db
            .fetch_session_history(session_id)
            .await?
            .ok_or(NegotiationApiError::SessionNotFound(session_id))?;
        let manage_orders = self.manage_orders_bit(&history.session, actor).await?;
        if !actor.is_admin && !is_related(&history.session, actor.id, manage_orders) {
            return Err(NegotiationApiError::Forbidden { session_id, actor_id: actor.id });
        }
        Ok(history)
    }

    /// Opens a new negotiation with its initial offer. Line items and service references are validated before
    /// anything is written. This is also the path the session merger takes, so merged sessions satisfy the same
    /// invariants as fresh ones.
    pub async fn create_session(
        &self,
        session: NewSession,
        offer: NewOffer,
    ) -> Result<(OfferSession, Offer), NegotiationApiError> {
        self.validate_offer(&offer, session.seller).await?;
        let (session, offer) = self.db.create_session(session, offer).await?;
        debug!("🔄️🤝️ Session {} opened by customer {} ({})", session.id, session.customer_id, session.customer_name);
        Ok((session, offer))
    }

    /// Responds to the latest offer of a session on behalf of `actor`.
    ///
    /// Eligibility follows the turn-taking protocol in [`crate::eligibility`]. Accepting closes the session with a
    /// compare-and-swap (a concurrent responder loses with [`StoreError::SessionNotActive`]) and creates the order;
    /// rejecting closes it without one; countering appends a new version and supersedes the previous latest offer.
    /// Event emission is best-effort and never rolls the state change back.
    pub async fn respond(
        &self,
        session_id: i64,
        response: OfferResponse,
        actor: &ActingUser,
    ) -> Result<ResponseOutcome, NegotiationApiError> {
        let session =
            self.db.fetch_session(session_id).await?.ok_or(NegotiationApiError::SessionNotFound(session_id))?;
        let latest = self
            .db
            .fetch_latest_offer(session_id)
            .await?
            .ok_or(StoreError::EmptyOfferChain(session_id))?;
        let manage_orders = self.manage_orders_bit(&session, actor).await?;
        if !can_respond(&session, &latest, actor.id, manage_orders) {
            debug!("🔄️🤝️ User {} is not eligible to respond to session {session_id}", actor.id);
            return Err(NegotiationApiError::Forbidden { session_id, actor_id: actor.id });
        }
        match response {
            OfferResponse::Accept => self.accept(session, latest).await,
            OfferResponse::Reject => self.reject(session, latest.id).await,
            OfferResponse::Counter(offer) => self.counter(session, actor, offer).await,
        }
    }

    async fn accept(&self, session: OfferSession, latest: Offer) -> Result<ResponseOutcome, NegotiationApiError> {
        // Availability is checked up front so that an obviously doomed acceptance does not close the session first.
        // The authoritative check is still the guarded decrement inside the order transaction.
        let items = self.order_items_for(&latest).await?;
        for item in &items {
            let listing = self
                .db
                .fetch_listing(item.listing_id)
                .await?
                .ok_or(StoreError::ListingNotFound(item.listing_id))?;
            if listing.quantity_available < item.quantity {
                return Err(StoreError::InsufficientStock {
                    listing_id: item.listing_id,
                    requested: item.quantity,
                    available: listing.quantity_available,
                }
                .into());
            }
        }
        let offer = self.db.close_session(session.id, OfferStatus::Accepted).await?;
        let order = order_api::initiate_order(&self.db, &self.producers, &session, &offer, &items).await?;
        info!("🔄️🤝️ Offer {} in session {} accepted. Order {} created", offer.id, session.id, order.order_id);
        self.call_offer_decided_hook(&session, &offer, Some(&order)).await;
        Ok(ResponseOutcome::OrderCreated { offer, order })
    }

    async fn reject(&self, session: OfferSession, latest_id: i64) -> Result<ResponseOutcome, NegotiationApiError> {
        let offer = self.db.close_session(session.id, OfferStatus::Rejected).await?;
        info!("🔄️🤝️ Offer {latest_id} in session {} rejected. Session closed", session.id);
        self.call_offer_decided_hook(&session, &offer, None).await;
        Ok(ResponseOutcome::Rejected { offer })
    }

    async fn counter(
        &self,
        session: OfferSession,
        actor: &ActingUser,
        mut offer: NewOffer,
    ) -> Result<ResponseOutcome, NegotiationApiError> {
        offer.actor_id = actor.id;
        self.validate_offer(&offer, session.seller_target()).await?;
        let offer = self.db.append_counteroffer(session.id, offer).await?;
        info!("🔄️🤝️ User {} countered in session {} with offer {}", actor.id, session.id, offer.id);
        for emitter in &self.producers.counteroffer_producer {
            let event = CounterofferEvent::new(session.clone(), offer.clone());
            emitter.publish_event(event).await;
        }
        Ok(ResponseOutcome::Countered { offer })
    }

    async fn call_offer_decided_hook(&self, session: &OfferSession, offer: &Offer, order: Option<&Order>) {
        for emitter in &self.producers.offer_decided_producer {
            trace!("🔄️🤝️ Notifying offer decided hook subscribers");
            let event = OfferDecidedEvent::new(session.clone(), offer.clone(), order.cloned());
            emitter.publish_event(event).await;
        }
    }

    /// Checks that every referenced listing exists with enough stock, and that a referenced service is owned by the
    /// session's seller side.
    async fn validate_offer(&self, offer: &NewOffer, seller: SellerTarget) -> Result<(), NegotiationApiError> {
        for item in &offer.line_items {
            let listing = self
                .db
                .fetch_listing(item.listing_id)
                .await?
                .ok_or(StoreError::ListingNotFound(item.listing_id))?;
            if listing.quantity_available < item.quantity {
                return Err(StoreError::InsufficientStock {
                    listing_id: item.listing_id,
                    requested: item.quantity,
                    available: listing.quantity_available,
                }
                .into());
            }
        }
        if let Some(service_id) = offer.service_id {
            let service =
                self.db.fetch_service(service_id).await?.ok_or(StoreError::ServiceNotFound(service_id))?;
            if service.owner() != seller {
                return Err(NegotiationApiError::ServiceOwnerMismatch {
                    service_id,
                    owner: service.owner(),
                    expected: seller,
                });
            }
        }
        Ok(())
    }

    /// The latest offer's line items, in the shape the order layer reserves inventory with.
    pub(crate) async fn order_items_for(&self, offer: &Offer) -> Result<Vec<OrderItem>, NegotiationApiError> {
        let line_items = self.db.fetch_line_items(offer.id).await?;
        Ok(line_items.into_iter().map(|li| OrderItem { listing_id: li.listing_id, quantity: li.quantity }).collect())
    }

    /// Sessions where the actor is the customer, newest first.
    pub async fn sessions_sent(&self, actor: &ActingUser) -> Result<Vec<SessionSummary>, NegotiationApiError> {
        Ok(self.db.sessions_for_customer(actor.id).await?)
    }

    /// Sessions addressed to the actor as an individual seller, newest first.
    pub async fn sessions_received(&self, actor: &ActingUser) -> Result<Vec<SessionSummary>, NegotiationApiError> {
        Ok(self.db.sessions_for_assigned(actor.id).await?)
    }

    /// Sessions addressed to the given organization. The actor needs `ManageOrders` for that organization.
    pub async fn sessions_for_contractor(
        &self,
        contractor_id: i64,
        actor: &ActingUser,
    ) -> Result<Vec<SessionSummary>, NegotiationApiError> {
        let allowed =
            actor.is_admin || self.db.has_permission(contractor_id, actor.id, Capability::ManageOrders).await?;
        if !allowed {
            return Err(NegotiationApiError::Forbidden { session_id: contractor_id, actor_id: actor.id });
        }
        Ok(self.db.sessions_for_contractor(contractor_id).await?)
    }

    pub async fn search(&self, query: OfferQueryFilter) -> Result<OfferSearchResult, NegotiationApiError> {
        debug!("🔍️ Searching sessions: {query}");
        Ok(self.db.search_sessions(query).await?)
    }

    /// Records the external thread reference once a thread has been created for the session.
    pub async fn attach_thread(
        &self,
        session_id: i64,
        thread_id: &str,
        actor: &ActingUser,
    ) -> Result<OfferSession, NegotiationApiError> {
        let session =
            self.db.fetch_session(session_id).await?.ok_or(NegotiationApiError::SessionNotFound(session_id))?;
        let manage_orders = self.manage_orders_bit(&session, actor).await?;
        if !actor.is_admin && !is_related(&session, actor.id, manage_orders) {
            return Err(NegotiationApiError::Forbidden { session_id, actor_id: actor.id });
        }
        Ok(self.db.set_session_thread(session_id, thread_id).await?)
    }
}
