use market_engine::{
    db_types::{
        Capability,
        MarketListing,
        NewOffer,
        NewOrder,
        NewSession,
        Offer,
        OfferLineItem,
        OfferSession,
        OfferStatus,
        Order,
        OrderId,
        OrderStatusType,
        Service,
    },
    offer_objects::{OfferQueryFilter, OfferSearchResult, SessionHistory, SessionSummary},
    traits::{NegotiationManagement, OrderItem, OrderManagement, PermissionManagement, StoreError},
};
use mockall::mock;

mock! {
    pub Backend {}
    impl NegotiationManagement for Backend {
        fn url(&self) -> &str;
        async fn fetch_session(&self, session_id: i64) -> Result<Option<OfferSession>, StoreError>;
        async fn fetch_latest_offer(&self, session_id: i64) -> Result<Option<Offer>, StoreError>;
        async fn fetch_session_history(&self, session_id: i64) -> Result<Option<SessionHistory>, StoreError>;
        async fn fetch_line_items(&self, offer_id: i64) -> Result<Vec<OfferLineItem>, StoreError>;
        async fn create_session(&self, session: NewSession, offer: NewOffer) -> Result<(OfferSession, Offer), StoreError>;
        async fn append_counteroffer(&self, session_id: i64, offer: NewOffer) -> Result<Offer, StoreError>;
        async fn close_session(&self, session_id: i64, final_status: OfferStatus) -> Result<Offer, StoreError>;
        async fn close_merged_sources(&self, session_ids: &[i64]) -> Result<(), StoreError>;
        async fn fetch_listing(&self, listing_id: i64) -> Result<Option<MarketListing>, StoreError>;
        async fn fetch_service(&self, service_id: i64) -> Result<Option<Service>, StoreError>;
        async fn sessions_for_customer(&self, customer_id: i64) -> Result<Vec<SessionSummary>, StoreError>;
        async fn sessions_for_assigned(&self, assigned_id: i64) -> Result<Vec<SessionSummary>, StoreError>;
        async fn sessions_for_contractor(&self, contractor_id: i64) -> Result<Vec<SessionSummary>, StoreError>;
        async fn search_sessions(&self, query: OfferQueryFilter) -> Result<OfferSearchResult, StoreError>;
        async fn set_session_thread(&self, session_id: i64, thread_id: &str) -> Result<OfferSession, StoreError>;
    }
    impl OrderManagement for Backend {
        async fn insert_order(&self, order: NewOrder, items: &[OrderItem]) -> Result<Order, StoreError>;
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError>;
        async fn fetch_order_for_session(&self, session_id: i64) -> Result<Option<Order>, StoreError>;
        async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, StoreError>;
        async fn update_order_status(
            &self,
            order_id: &OrderId,
            expected: OrderStatusType,
            new_status: OrderStatusType,
        ) -> Result<Order, StoreError>;
        async fn cancel_order(&self, order_id: &OrderId, expected: OrderStatusType) -> Result<Order, StoreError>;
        async fn assign_order(&self, order_id: &OrderId, assigned_id: i64) -> Result<Order, StoreError>;
    }
    impl PermissionManagement for Backend {
        async fn has_permission(&self, org_id: i64, user_id: i64, capability: Capability) -> Result<bool, StoreError>;
        async fn grant_permission(&self, org_id: i64, user_id: i64, capability: Capability) -> Result<(), StoreError>;
        async fn revoke_permission(&self, org_id: i64, user_id: i64, capability: Capability) -> Result<u64, StoreError>;
    }
    impl Clone for Backend {
        fn clone(&self) -> Self;
    }
}
