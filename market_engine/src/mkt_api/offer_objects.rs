use std::{collections::HashMap, fmt::Display};

use chrono::{DateTime, Utc};
use mkt_common::Money;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{EffectiveStatus, Offer, OfferLineItem, OfferSession},
    status::effective_status,
};

//--------------------------------------   SessionHistory    ---------------------------------------------------------
/// A session together with its full, chronologically ordered offer chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHistory {
    pub session: OfferSession,
    pub offers: Vec<OfferWithItems>,
}

impl SessionHistory {
    pub fn latest(&self) -> Option<&Offer> {
        self.offers.last().map(|o| &o.offer)
    }

    pub fn effective_status(&self) -> Option<EffectiveStatus> {
        self.latest().map(|latest| effective_status(&self.session, latest))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferWithItems {
    #[serde(flatten)]
    pub offer: Offer,
    pub line_items: Vec<OfferLineItem>,
}

//--------------------------------------   SessionSummary    ---------------------------------------------------------
/// A session and its latest offer, as returned by listings and search. Enough to compute the effective status
/// without loading the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session: OfferSession,
    pub latest_offer: Offer,
    pub status: EffectiveStatus,
}

impl SessionSummary {
    pub fn new(session: OfferSession, latest_offer: Offer) -> Self {
        let status = effective_status(&session, &latest_offer);
        Self { session, latest_offer, status }
    }
}

//--------------------------------------     SortKey etc     ---------------------------------------------------------
/// The closed set of sort keys accepted by the search endpoint. Each maps to a fixed query fragment; there is no
/// runtime string dispatch into SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Status,
    Title,
    Cost,
    CustomerName,
    Contractor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { offset: 0, limit: 50 }
    }
}

//--------------------------------------  OfferQueryFilter   ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OfferQueryFilter {
    pub contractor_id: Option<i64>,
    pub assigned_id: Option<i64>,
    pub customer_id: Option<i64>,
    /// Substring match on the denormalised customer display name.
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
    #[serde(default)]
    pub pagination: Pagination,
}

impl OfferQueryFilter {
    pub fn with_contractor(mut self, contractor_id: i64) -> Self {
        self.contractor_id = Some(contractor_id);
        self
    }

    pub fn with_assigned(mut self, assigned_id: i64) -> Self {
        self.assigned_id = Some(assigned_id);
        self
    }

    pub fn with_customer(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_customer_name<S: Into<String>>(mut self, name: S) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn with_cost_range(mut self, min: Money, max: Money) -> Self {
        self.min_cost = Some(min);
        self.max_cost = Some(max);
        self
    }

    pub fn sorted_by(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort_by = key;
        self.sort_order = order;
        self
    }

    pub fn paged(mut self, offset: i64, limit: i64) -> Self {
        self.pagination = Pagination { offset, limit };
        self
    }

    pub fn is_empty(&self) -> bool {
        self.contractor_id.is_none() &&
            self.assigned_id.is_none() &&
            self.customer_id.is_none() &&
            self.customer_name.is_none() &&
            self.min_cost.is_none() &&
            self.max_cost.is_none() &&
            self.since.is_none() &&
            self.until.is_none() &&
            self.has_service.is_none() &&
            self.has_market_listings.is_none()
    }
}

impl Display for OfferQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters.")?;
            return Ok(());
        }
        if let Some(id) = self.contractor_id {
            write!(f, "contractor: {id}. ")?;
        }
        if let Some(id) = self.assigned_id {
            write!(f, "assigned: {id}. ")?;
        }
        if let Some(id) = self.customer_id {
            write!(f, "customer: {id}. ")?;
        }
        if let Some(name) = &self.customer_name {
            write!(f, "customer_name: {name}. ")?;
        }
        if let Some(min) = self.min_cost {
            write!(f, "cost >= {min}. ")?;
        }
        if let Some(max) = self.max_cost {
            write!(f, "cost <= {max}. ")?;
        }
        if let Some(since) = self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(b) = self.has_service {
            write!(f, "has_service: {b}. ")?;
        }
        if let Some(b) = self.has_market_listings {
            write!(f, "has_market_listings: {b}. ")?;
        }
        Ok(())
    }
}

//--------------------------------------  OfferSearchResult  ---------------------------------------------------------
/// One page of search results, plus the count of matching sessions per effective status across the whole match set
/// (not just the page).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferSearchResult {
    pub items: Vec<SessionSummary>,
    pub status_counts: HashMap<EffectiveStatus, i64>,
    pub total: i64,
}

//--------------------------------------   MergedSessions    ---------------------------------------------------------
/// The outcome of a successful merge: the consolidated session and offer, plus the source session ids that were
/// closed, for caller-side auditing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedSessions {
    pub merged_session: OfferSession,
    pub merged_offer: Offer,
    pub source_session_ids: Vec<i64>,
}
