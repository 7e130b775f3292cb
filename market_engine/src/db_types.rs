use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use mkt_common::Money;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct ConversionError(String);

//--------------------------------------    SellerTarget     ---------------------------------------------------------
/// The seller side of a negotiation.
///
/// A session is addressed either to an organization (any member with the `ManageOrders` capability may act), to a
/// fixed individual, or to nobody yet. Stored as the nullable `contractor_id`/`assigned_id` column pair; this enum
/// makes the three legal combinations explicit so that "both set" never needs to be reasoned about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SellerTarget {
    Organization(i64),
    Individual(i64),
    Unassigned,
}

impl SellerTarget {
    pub fn from_columns(contractor_id: Option<i64>, assigned_id: Option<i64>) -> Self {
        match (contractor_id, assigned_id) {
            (Some(org), _) => Self::Organization(org),
            (None, Some(user)) => Self::Individual(user),
            (None, None) => Self::Unassigned,
        }
    }

    pub fn contractor_id(&self) -> Option<i64> {
        match self {
            Self::Organization(id) => Some(*id),
            _ => None,
        }
    }

    pub fn assigned_id(&self) -> Option<i64> {
        match self {
            Self::Individual(id) => Some(*id),
            _ => None,
        }
    }
}

impl Display for SellerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Organization(id) => write!(f, "organization #{id}"),
            Self::Individual(id) => write!(f, "user #{id}"),
            Self::Unassigned => write!(f, "unassigned"),
        }
    }
}

//--------------------------------------    SessionStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SessionStatus {
    /// The negotiation is open and the latest offer awaits a response.
    Active,
    /// The latest offer reached a terminal status. Closed sessions are retained for history and merge audit.
    Closed,
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "Active"),
            SessionStatus::Closed => write!(f, "Closed"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Closed" => Ok(Self::Closed),
            s => Err(ConversionError(format!("Invalid session status: {s}"))),
        }
    }
}

//--------------------------------------     OfferStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OfferStatus {
    /// The most recent version in the chain. Exactly one offer per active session holds this status.
    Active,
    /// Terminal. The session closed and an order was created from this offer.
    Accepted,
    /// Terminal. The session closed without an order.
    Rejected,
    /// Superseded by a newer version in the same session.
    Counteroffered,
    /// Withdrawn by the proposing party. Treated as a rejection for session closure.
    Cancelled,
}

impl OfferStatus {
    /// Terminal statuses close the owning session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OfferStatus::Accepted | OfferStatus::Rejected | OfferStatus::Cancelled)
    }
}

impl Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OfferStatus::Active => write!(f, "Active"),
            OfferStatus::Accepted => write!(f, "Accepted"),
            OfferStatus::Rejected => write!(f, "Rejected"),
            OfferStatus::Counteroffered => write!(f, "Counteroffered"),
            OfferStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OfferStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Accepted" => Ok(Self::Accepted),
            "Rejected" => Ok(Self::Rejected),
            "Counteroffered" => Ok(Self::Counteroffered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid offer status: {s}"))),
        }
    }
}

impl From<String> for OfferStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid offer status: {value}. But this conversion cannot fail. Defaulting to Active");
            OfferStatus::Active
        })
    }
}

//--------------------------------------   EffectiveStatus   ---------------------------------------------------------
/// The derived, human-facing status of a negotiation. See [`crate::status::effective_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveStatus {
    /// The customer spoke last; the seller side owes a response.
    ToSeller,
    /// The seller side spoke last; the customer owes a response.
    ToCustomer,
    Accepted,
    Rejected,
}

impl Display for EffectiveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EffectiveStatus::ToSeller => write!(f, "ToSeller"),
            EffectiveStatus::ToCustomer => write!(f, "ToCustomer"),
            EffectiveStatus::Accepted => write!(f, "Accepted"),
            EffectiveStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

//--------------------------------------     PaymentType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Cash,
    Escrow,
    Trade,
}

impl Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentType::Cash => write!(f, "Cash"),
            PaymentType::Escrow => write!(f, "Escrow"),
            PaymentType::Trade => write!(f, "Trade"),
        }
    }
}

impl FromStr for PaymentType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cash" | "cash" => Ok(Self::Cash),
            "Escrow" | "escrow" => Ok(Self::Escrow),
            "Trade" | "trade" => Ok(Self::Trade),
            s => Err(ConversionError(format!("Invalid payment type: {s}"))),
        }
    }
}

//--------------------------------------     Capability      ---------------------------------------------------------
/// Organization-level capabilities. The negotiation engine only consumes `ManageOrders`; the rest exist so that the
/// permission table has a closed, typed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageOrders,
    ManageListings,
    ManageMembers,
}

impl Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::ManageOrders => write!(f, "ManageOrders"),
            Capability::ManageListings => write!(f, "ManageListings"),
            Capability::ManageMembers => write!(f, "ManageMembers"),
        }
    }
}

impl FromStr for Capability {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ManageOrders" | "manage_orders" => Ok(Self::ManageOrders),
            "ManageListings" | "manage_listings" => Ok(Self::ManageListings),
            "ManageMembers" | "manage_members" => Ok(Self::ManageMembers),
            s => Err(ConversionError(format!("Invalid capability: {s}"))),
        }
    }
}

//--------------------------------------     OfferSession    ---------------------------------------------------------
/// One negotiation thread between a customer and a seller target.
///
/// Sessions are never deleted by business logic. They close when their latest offer reaches a terminal status and
/// are retained afterwards as history.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OfferSession {
    pub id: i64,
    pub customer_id: i64,
    /// Display name of the customer, denormalised for listings and merge back-links.
    pub customer_name: String,
    pub contractor_id: Option<i64>,
    pub assigned_id: Option<i64>,
    /// Reference to the external communication thread, if one has been created.
    pub thread_id: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

impl OfferSession {
    pub fn seller_target(&self) -> SellerTarget {
        SellerTarget::from_columns(self.contractor_id, self.assigned_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub customer_id: i64,
    pub customer_name: String,
    pub seller: SellerTarget,
}

impl NewSession {
    pub fn new<S: Into<String>>(customer_id: i64, customer_name: S, seller: SellerTarget) -> Self {
        Self { customer_id, customer_name: customer_name.into(), seller }
    }
}

//--------------------------------------        Offer        ---------------------------------------------------------
/// One immutable version of terms within a session's negotiation chain.
///
/// Offers are totally ordered by timestamp within a session. Only the most recent offer is actionable; all earlier
/// versions are history and are never mutated again once superseded.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Offer {
    pub id: i64,
    pub session_id: i64,
    /// The user who proposed this version of the terms.
    pub actor_id: i64,
    pub title: String,
    pub description: String,
    pub cost: Money,
    pub collateral: Option<Money>,
    pub payment_type: PaymentType,
    pub service_id: Option<i64>,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       NewOffer      ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOffer {
    pub actor_id: i64,
    pub title: String,
    pub description: String,
    pub cost: Money,
    pub collateral: Option<Money>,
    pub payment_type: PaymentType,
    pub service_id: Option<i64>,
    /// Market-listing line items for this version. Quantities are not carried forward between versions; each offer
    /// owns its own snapshot.
    pub line_items: Vec<NewLineItem>,
    /// Explicit timestamp for the offer. `None` means "now". The session merger passes the oldest source timestamp
    /// here to preserve temporal ordering.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewOffer {
    pub fn new<S: Into<String>>(actor_id: i64, title: S, cost: Money, payment_type: PaymentType) -> Self {
        Self {
            actor_id,
            title: title.into(),
            description: String::new(),
            cost,
            collateral: None,
            payment_type,
            service_id: None,
            line_items: Vec::new(),
            created_at: None,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_collateral(mut self, collateral: Money) -> Self {
        self.collateral = Some(collateral);
        self
    }

    pub fn with_service(mut self, service_id: i64) -> Self {
        self.service_id = Some(service_id);
        self
    }

    pub fn with_line_item(mut self, listing_id: i64, quantity: i64) -> Self {
        self.line_items.push(NewLineItem { listing_id, quantity });
        self
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

//--------------------------------------    OfferLineItem    ---------------------------------------------------------
/// A quantity of a specific market listing attached to one offer version.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OfferLineItem {
    pub id: i64,
    pub offer_id: i64,
    pub listing_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub listing_id: i64,
    pub quantity: i64,
}

//--------------------------------------    MarketListing    ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MarketListing {
    pub id: i64,
    pub title: String,
    pub price: Money,
    /// Stock that has not been committed to an order yet. Decremented on order initiation, restored on cancellation.
    pub quantity_available: i64,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Service       ---------------------------------------------------------
/// A seller-owned service that an offer may reference. Services are owned by exactly one seller side and are not
/// mergeable across sessions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub title: String,
    pub contractor_id: Option<i64>,
    pub assigned_id: Option<i64>,
}

impl Service {
    pub fn owner(&self) -> SellerTarget {
        SellerTarget::from_columns(self.contractor_id, self.assigned_id)
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatusType {
    /// The order has been created but work has not begun.
    NotStarted,
    /// A seller-side user has picked the order up.
    InProgress,
    /// Terminal for non-admin actors. The order was completed.
    Fulfilled,
    /// Terminal for non-admin actors. Reserved inventory has been released.
    Cancelled,
}

impl OrderStatusType {
    /// Terminal statuses may not be left again by non-admin actors.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Fulfilled | OrderStatusType::Cancelled)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::NotStarted => write!(f, "NotStarted"),
            OrderStatusType::InProgress => write!(f, "InProgress"),
            OrderStatusType::Fulfilled => write!(f, "Fulfilled"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NotStarted" | "not-started" => Ok(Self::NotStarted),
            "InProgress" | "in-progress" => Ok(Self::InProgress),
            "Fulfilled" | "fulfilled" => Ok(Self::Fulfilled),
            "Cancelled" | "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to NotStarted");
            OrderStatusType::NotStarted
        })
    }
}

//--------------------------------------       OrderId       ---------------------------------------------------------
/// A lightweight wrapper around the public order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh order id. Uniqueness is enforced by the database; the random suffix makes collisions
    /// vanishingly unlikely in the first place.
    pub fn random() -> Self {
        let suffix: u64 = rand::thread_rng().gen();
        Self(format!("MKT-{suffix:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
/// The binding, priced artifact created exactly once per accepted session.
///
/// Orders are never deleted; cancellation is a terminal status, not a deletion.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    /// Back-reference to the session whose acceptance produced this order.
    pub offer_session_id: i64,
    pub customer_id: i64,
    pub contractor_id: Option<i64>,
    pub assigned_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub cost: Money,
    pub collateral: Option<Money>,
    pub payment_type: PaymentType,
    pub service_id: Option<i64>,
    pub thread_id: Option<String>,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn seller_target(&self) -> SellerTarget {
        SellerTarget::from_columns(self.contractor_id, self.assigned_id)
    }
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub offer_session_id: i64,
    pub customer_id: i64,
    pub contractor_id: Option<i64>,
    pub assigned_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub cost: Money,
    pub collateral: Option<Money>,
    pub payment_type: PaymentType,
    pub service_id: Option<i64>,
    pub thread_id: Option<String>,
}

impl NewOrder {
    /// Copies the economic fields of an accepted offer, and the parties and thread of its session, into a new order
    /// with a fresh identifier.
    pub fn from_accepted_offer(session: &OfferSession, offer: &Offer) -> Self {
        Self {
            order_id: OrderId::random(),
            offer_session_id: session.id,
            customer_id: session.customer_id,
            contractor_id: session.contractor_id,
            assigned_id: session.assigned_id,
            title: offer.title.clone(),
            description: offer.description.clone(),
            cost: offer.cost,
            collateral: offer.collateral,
            payment_type: offer.payment_type,
            service_id: offer.service_id,
            thread_id: session.thread_id.clone(),
        }
    }
}
