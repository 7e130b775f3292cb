use crate::{
    db_types::{MarketListing, NewOffer, NewSession, Offer, OfferLineItem, OfferSession, OfferStatus, Service},
    mkt_api::offer_objects::{OfferQueryFilter, OfferSearchResult, SessionHistory, SessionSummary},
    traits::StoreError,
};

/// Persistence for negotiation sessions and their append-only offer chains.
///
/// Implementations must guarantee:
/// * Session creation and the initial offer are one atomic write (a session never exists without a chain).
/// * [`Self::close_session`] and [`Self::append_counteroffer`] only act on sessions that are still `Active`,
///   enforced with a conditional update so that two concurrent responders cannot both win.
/// * [`Self::close_merged_sources`] is all-or-nothing.
#[allow(async_fn_in_trait)]
pub trait NegotiationManagement: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    async fn fetch_session(&self, session_id: i64) -> Result<Option<OfferSession>, StoreError>;

    /// The most recent offer in the session's chain.
    async fn fetch_latest_offer(&self, session_id: i64) -> Result<Option<Offer>, StoreError>;

    /// The session with its full chain, oldest first, including line items per offer version.
    async fn fetch_session_history(&self, session_id: i64) -> Result<Option<SessionHistory>, StoreError>;

    async fn fetch_line_items(&self, offer_id: i64) -> Result<Vec<OfferLineItem>, StoreError>;

    /// Creates a session with its initial offer and line items in one transaction. This is the single creation path:
    /// the session merger goes through here as well, so invariants (chain never empty, items snapshot per version)
    /// hold for merged sessions too.
    async fn create_session(&self, session: NewSession, offer: NewOffer) -> Result<(OfferSession, Offer), StoreError>;

    /// Appends a new offer version to an active session, marking the previous latest offer `Counteroffered`.
    /// Fails with [`StoreError::SessionNotActive`] if the session is closed.
    async fn append_counteroffer(&self, session_id: i64, offer: NewOffer) -> Result<Offer, StoreError>;

    /// Closes an active session, marking its latest offer with the given terminal status. The session status write
    /// is a compare-and-swap on `Active`; a concurrent responder that loses the race gets
    /// [`StoreError::SessionNotActive`]. Returns the updated latest offer.
    async fn close_session(&self, session_id: i64, final_status: OfferStatus) -> Result<Offer, StoreError>;

    /// Closes all source sessions of a merge and marks their latest offers `Rejected`, in a single transaction.
    /// On any failure the whole batch rolls back and the error is surfaced; no session is left half-merged.
    async fn close_merged_sources(&self, session_ids: &[i64]) -> Result<(), StoreError>;

    async fn fetch_listing(&self, listing_id: i64) -> Result<Option<MarketListing>, StoreError>;

    async fn fetch_service(&self, service_id: i64) -> Result<Option<Service>, StoreError>;

    /// Sessions where the given user is the customer (their sent offers), newest first.
    async fn sessions_for_customer(&self, customer_id: i64) -> Result<Vec<SessionSummary>, StoreError>;

    /// Sessions addressed to the given individual seller, newest first.
    async fn sessions_for_assigned(&self, assigned_id: i64) -> Result<Vec<SessionSummary>, StoreError>;

    /// Sessions addressed to the given organization, newest first.
    async fn sessions_for_contractor(&self, contractor_id: i64) -> Result<Vec<SessionSummary>, StoreError>;

    /// Filtered, sorted, paginated search. The per-status counts in the result cover the whole match set, not only
    /// the returned page.
    async fn search_sessions(&self, query: OfferQueryFilter) -> Result<OfferSearchResult, StoreError>;

    /// Records the external thread reference for a session. Fails with [`StoreError::ThreadAlreadyExists`] if one
    /// is already recorded.
    async fn set_session_thread(&self, session_id: i64, thread_id: &str) -> Result<OfferSession, StoreError>;
}
