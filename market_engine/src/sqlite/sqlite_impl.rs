//! `SqliteDatabase` is a concrete implementation of a marketplace engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::SqlitePool;

use super::db::{listings, new_pool, orders, permissions, sessions};
use crate::{
    db_types::{
        Capability,
        MarketListing,
        NewOffer,
        NewOrder,
        NewSession,
        Offer,
        OfferSession,
        OfferStatus,
        Order,
        OrderId,
        OrderStatusType,
        Service,
    },
    mkt_api::offer_objects::{OfferQueryFilter, OfferSearchResult, OfferWithItems, SessionHistory, SessionSummary},
    traits::{NegotiationManagement, OrderItem, OrderManagement, PermissionManagement, StoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl NegotiationManagement for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_session(&self, session_id: i64) -> Result<Option<OfferSession>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sessions::fetch_session(session_id, &mut conn).await
    }

    async fn fetch_latest_offer(&self, session_id: i64) -> Result<Option<Offer>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sessions::fetch_latest_offer(session_id, &mut conn).await
    }

    async fn fetch_session_history(&self, session_id: i64) -> Result<Option<SessionHistory>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let Some(session) = sessions::fetch_session(session_id, &mut conn).await? else {
            return Ok(None);
        };
        let chain = sessions::fetch_offers(session_id, &mut conn).await?;
        let mut offers = Vec::with_capacity(chain.len());
        for offer in chain {
            let line_items = sessions::fetch_line_items(offer.id, &mut conn).await?;
            offers.push(OfferWithItems { offer, line_items });
        }
        Ok(Some(SessionHistory { session, offers }))
    }

    async fn fetch_line_items(&self, offer_id: i64) -> Result<Vec<crate::db_types::OfferLineItem>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sessions::fetch_line_items(offer_id, &mut conn).await
    }

    async fn create_session(
        &self,
        session: NewSession,
        offer: NewOffer,
    ) -> Result<(OfferSession, Offer), StoreError> {
        let mut tx = self.pool.begin().await?;
        // Session and initial offer share one timestamp, so the head of the chain matches its session.
        let created_at = offer.created_at.unwrap_or_else(Utc::now);
        let session = sessions::insert_session(&session, created_at, &mut tx).await?;
        let offer = offer.with_timestamp(created_at);
        let offer = sessions::insert_offer(session.id, &offer, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Session {} created with initial offer {} by user {}", session.id, offer.id, offer.actor_id);
        Ok((session, offer))
    }

    async fn append_counteroffer(&self, session_id: i64, offer: NewOffer) -> Result<Offer, StoreError> {
        let mut tx = self.pool.begin().await?;
        let session = sessions::fetch_session(session_id, &mut tx)
            .await?
            .ok_or(StoreError::SessionNotFound(session_id))?;
        if !session.is_active() {
            return Err(StoreError::SessionNotActive(session_id));
        }
        let previous = sessions::fetch_latest_offer(session_id, &mut tx)
            .await?
            .ok_or(StoreError::EmptyOfferChain(session_id))?;
        sessions::update_offer_status(previous.id, OfferStatus::Counteroffered, &mut tx).await?;
        let offer = sessions::insert_offer(session_id, &offer, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Offer {} countered by offer {} in session {session_id}", previous.id, offer.id);
        Ok(offer)
    }

    async fn close_session(&self, session_id: i64, final_status: OfferStatus) -> Result<Offer, StoreError> {
        let mut tx = self.pool.begin().await?;
        if !sessions::close_session_cas(session_id, &mut tx).await? {
            return match sessions::fetch_session(session_id, &mut tx).await? {
                Some(_) => Err(StoreError::SessionNotActive(session_id)),
                None => Err(StoreError::SessionNotFound(session_id)),
            };
        }
        let latest = sessions::fetch_latest_offer(session_id, &mut tx)
            .await?
            .ok_or(StoreError::EmptyOfferChain(session_id))?;
        let offer = sessions::update_offer_status(latest.id, final_status, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Session {session_id} closed with latest offer {} marked {final_status}", offer.id);
        Ok(offer)
    }

    async fn close_merged_sources(&self, session_ids: &[i64]) -> Result<(), StoreError> {
        // The one place atomicity is enforced end to end: either every source session closes, or none do.
        let mut tx = self.pool.begin().await?;
        for &session_id in session_ids {
            if !sessions::close_session_cas(session_id, &mut tx).await? {
                return Err(StoreError::SessionNotActive(session_id));
            }
            let latest = sessions::fetch_latest_offer(session_id, &mut tx)
                .await?
                .ok_or(StoreError::EmptyOfferChain(session_id))?;
            sessions::update_offer_status(latest.id, OfferStatus::Rejected, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ {} merge sources closed and their offers rejected", session_ids.len());
        Ok(())
    }

    async fn fetch_listing(&self, listing_id: i64) -> Result<Option<MarketListing>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        listings::fetch_listing(listing_id, &mut conn).await
    }

    async fn fetch_service(&self, service_id: i64) -> Result<Option<Service>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        listings::fetch_service(service_id, &mut conn).await
    }

    async fn sessions_for_customer(&self, customer_id: i64) -> Result<Vec<SessionSummary>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sessions::sessions_for_customer(customer_id, &mut conn).await
    }

    async fn sessions_for_assigned(&self, assigned_id: i64) -> Result<Vec<SessionSummary>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sessions::sessions_for_assigned(assigned_id, &mut conn).await
    }

    async fn sessions_for_contractor(&self, contractor_id: i64) -> Result<Vec<SessionSummary>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sessions::sessions_for_contractor(contractor_id, &mut conn).await
    }

    async fn search_sessions(&self, query: OfferQueryFilter) -> Result<OfferSearchResult, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sessions::search_sessions(&query, &mut conn).await
    }

    async fn set_session_thread(&self, session_id: i64, thread_id: &str) -> Result<OfferSession, StoreError> {
        let mut conn = self.pool.acquire().await?;
        sessions::set_session_thread(session_id, thread_id, &mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder, items: &[OrderItem]) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(&order, &mut tx).await?;
        for item in items {
            orders::link_listing(&order.order_id, item.listing_id, item.quantity, &mut tx).await?;
            listings::reserve_stock(item.listing_id, item.quantity, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {} created with {} listing reservations", order.order_id, items.len());
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order(order_id, &mut conn).await
    }

    async fn fetch_order_for_session(&self, session_id: i64) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_for_session(session_id, &mut conn).await
    }

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_items(order_id, &mut conn).await
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatusType,
        new_status: OrderStatusType,
    ) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order_status(order_id, expected, new_status, &mut conn).await
    }

    async fn cancel_order(&self, order_id: &OrderId, expected: OrderStatusType) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::update_order_status(order_id, expected, OrderStatusType::Cancelled, &mut tx).await?;
        let items = orders::fetch_order_items(order_id, &mut tx).await?;
        for item in &items {
            listings::release_stock(item.listing_id, item.quantity, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {order_id} cancelled. {} listing reservations released", items.len());
        Ok(order)
    }

    async fn assign_order(&self, order_id: &OrderId, assigned_id: i64) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::assign_order(order_id, assigned_id, &mut conn).await
    }
}

impl PermissionManagement for SqliteDatabase {
    async fn has_permission(&self, org_id: i64, user_id: i64, capability: Capability) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        permissions::has_permission(org_id, user_id, capability, &mut conn).await
    }

    async fn grant_permission(&self, org_id: i64, user_id: i64, capability: Capability) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        permissions::grant_permission(org_id, user_id, capability, &mut conn).await
    }

    async fn revoke_permission(&self, org_id: i64, user_id: i64, capability: Capability) -> Result<u64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        permissions::revoke_permission(org_id, user_id, capability, &mut conn).await
    }
}
