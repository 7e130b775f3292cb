use chrono::{DateTime, Utc};
use market_engine::{
    db_types::{NewOffer, OrderStatusType, PaymentType},
    offer_objects::{OfferQueryFilter, Pagination, SortKey, SortOrder},
};
use mkt_common::Money;
use serde::{Deserialize, Serialize};

/// The body of `PUT /offer/{id}`: either a bare status decision, or a full counteroffer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OfferUpdate {
    Status { status: ResponseStatus },
    Counter(CounterofferPayload),
}

/// Client-facing decision vocabulary. `cancelled` is accepted for symmetry with the offer statuses, but a
/// cancellation closes the session exactly like a rejection, so it is folded into `Rejected` at this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Accepted,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterofferPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub cost: Money,
    pub collateral: Option<Money>,
    pub payment_type: PaymentType,
    pub service_id: Option<i64>,
    #[serde(default)]
    pub line_items: Vec<LineItemPayload>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LineItemPayload {
    pub listing_id: i64,
    pub quantity: i64,
}

impl CounterofferPayload {
    /// The actor id is overwritten by the engine with the authenticated caller; 0 is a placeholder.
    pub fn into_new_offer(self) -> NewOffer {
        let mut offer = NewOffer::new(0, self.title, self.cost, self.payment_type).with_description(self.description);
        if let Some(collateral) = self.collateral {
            offer = offer.with_collateral(collateral);
        }
        if let Some(service_id) = self.service_id {
            offer = offer.with_service(service_id);
        }
        for item in self.line_items {
            offer = offer.with_line_item(item.listing_id, item.quantity);
        }
        offer
    }
}

/// Flat query-string form of [`OfferQueryFilter`]. Query strings cannot carry the nested pagination struct, so the
/// fields are inlined here and folded back in [`Self::into_filter`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub contractor_id: Option<i64>,
    pub assigned_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub customer_name: Option<String>,
    pub min_cost: Option<Money>,
    pub max_cost: Option<Money>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub has_service: Option<bool>,
    pub has_market_listings: Option<bool>,
    #[serde(default)]
    pub sort_by: SortKey,
    #[serde(default)]
    pub sort_order: SortOrder,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl SearchParams {
    pub fn into_filter(self) -> OfferQueryFilter {
        let default_page = Pagination::default();
        OfferQueryFilter {
            contractor_id: self.contractor_id,
            assigned_id: self.assigned_id,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            min_cost: self.min_cost,
            max_cost: self.max_cost,
            since: self.since,
            until: self.until,
            has_service: self.has_service,
            has_market_listings: self.has_market_listings,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
            pagination: Pagination {
                offset: self.offset.unwrap_or(default_page.offset),
                limit: self.limit.unwrap_or(default_page.limit),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    pub session_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatusType,
}
