use chrono::{DateTime, Utc};
use log::trace;
use mkt_common::Money;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{
        NewOffer,
        NewSession,
        Offer,
        OfferLineItem,
        OfferSession,
        OfferStatus,
        PaymentType,
        SessionStatus,
    },
    mkt_api::offer_objects::{OfferQueryFilter, OfferSearchResult, SessionSummary, SortKey, SortOrder},
    status::effective_status_raw,
    traits::StoreError,
};

pub async fn insert_session(
    session: &NewSession,
    created_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<OfferSession, StoreError> {
    let session = sqlx::query_as(
        r#"
            INSERT INTO offer_sessions (customer_id, customer_name, contractor_id, assigned_id, status, created_at)
            VALUES ($1, $2, $3, $4, 'Active', $5)
            RETURNING *;
        "#,
    )
    .bind(session.customer_id)
    .bind(&session.customer_name)
    .bind(session.seller.contractor_id())
    .bind(session.seller.assigned_id())
    .bind(created_at)
    .fetch_one(conn)
    .await?;
    Ok(session)
}

/// Inserts a new offer version and its line-item snapshot. This is not atomic on its own; callers wrap it in a
/// transaction together with whatever chain bookkeeping the operation requires.
pub async fn insert_offer(
    session_id: i64,
    offer: &NewOffer,
    conn: &mut SqliteConnection,
) -> Result<Offer, StoreError> {
    let created_at = offer.created_at.unwrap_or_else(Utc::now);
    let row: Offer = sqlx::query_as(
        r#"
            INSERT INTO order_offers (
                session_id,
                actor_id,
                title,
                description,
                cost,
                collateral,
                payment_type,
                service_id,
                status,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'Active', $9)
            RETURNING *;
        "#,
    )
    .bind(session_id)
    .bind(offer.actor_id)
    .bind(&offer.title)
    .bind(&offer.description)
    .bind(offer.cost)
    .bind(offer.collateral)
    .bind(offer.payment_type)
    .bind(offer.service_id)
    .bind(created_at)
    .fetch_one(&mut *conn)
    .await?;
    for item in &offer.line_items {
        sqlx::query("INSERT INTO offer_market_items (offer_id, listing_id, quantity) VALUES ($1, $2, $3)")
            .bind(row.id)
            .bind(item.listing_id)
            .bind(item.quantity)
            .execute(&mut *conn)
            .await?;
    }
    Ok(row)
}

pub async fn fetch_session(session_id: i64, conn: &mut SqliteConnection) -> Result<Option<OfferSession>, StoreError> {
    let session =
        sqlx::query_as("SELECT * FROM offer_sessions WHERE id = $1").bind(session_id).fetch_optional(conn).await?;
    Ok(session)
}

/// The full chain for a session, oldest first.
pub async fn fetch_offers(session_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Offer>, StoreError> {
    let offers = sqlx::query_as("SELECT * FROM order_offers WHERE session_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(session_id)
        .fetch_all(conn)
        .await?;
    Ok(offers)
}

pub async fn fetch_latest_offer(session_id: i64, conn: &mut SqliteConnection) -> Result<Option<Offer>, StoreError> {
    let offer = sqlx::query_as(
        "SELECT * FROM order_offers WHERE session_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(session_id)
    .fetch_optional(conn)
    .await?;
    Ok(offer)
}

pub async fn fetch_line_items(offer_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OfferLineItem>, StoreError> {
    let items = sqlx::query_as("SELECT * FROM offer_market_items WHERE offer_id = $1 ORDER BY id ASC")
        .bind(offer_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn update_offer_status(
    offer_id: i64,
    status: OfferStatus,
    conn: &mut SqliteConnection,
) -> Result<Offer, StoreError> {
    let result: Option<Offer> = sqlx::query_as("UPDATE order_offers SET status = $1 WHERE id = $2 RETURNING *")
        .bind(status)
        .bind(offer_id)
        .fetch_optional(conn)
        .await?;
    result.ok_or(StoreError::OfferNotFound(offer_id))
}

/// Compare-and-swap close of a session. Returns `false` if the session was not `Active` any more, so that of two
/// concurrent responders only one can win.
pub async fn close_session_cas(session_id: i64, conn: &mut SqliteConnection) -> Result<bool, StoreError> {
    let result = sqlx::query("UPDATE offer_sessions SET status = 'Closed' WHERE id = $1 AND status = 'Active'")
        .bind(session_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_session_thread(
    session_id: i64,
    thread_id: &str,
    conn: &mut SqliteConnection,
) -> Result<OfferSession, StoreError> {
    let updated: Option<OfferSession> = sqlx::query_as(
        "UPDATE offer_sessions SET thread_id = $1 WHERE id = $2 AND thread_id IS NULL RETURNING *",
    )
    .bind(thread_id)
    .bind(session_id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(session) => Ok(session),
        None => match fetch_session(session_id, conn).await? {
            Some(_) => Err(StoreError::ThreadAlreadyExists(session_id)),
            None => Err(StoreError::SessionNotFound(session_id)),
        },
    }
}

//--------------------------------------  Summaries & search  --------------------------------------------------------

/// Joins every session onto its single latest offer. All summary and search queries build on this fragment, so the
/// "only the most recent offer is actionable" invariant has exactly one SQL encoding.
const SUMMARY_SELECT: &str = r#"
    SELECT
        s.id AS session_id,
        s.customer_id AS customer_id,
        s.customer_name AS customer_name,
        s.contractor_id AS contractor_id,
        s.assigned_id AS assigned_id,
        s.thread_id AS thread_id,
        s.status AS session_status,
        s.created_at AS session_created_at,
        o.id AS offer_id,
        o.actor_id AS actor_id,
        o.title AS title,
        o.description AS description,
        o.cost AS cost,
        o.collateral AS collateral,
        o.payment_type AS payment_type,
        o.service_id AS service_id,
        o.status AS offer_status,
        o.created_at AS offer_created_at
    FROM offer_sessions s
    JOIN order_offers o ON o.id = (
        SELECT id FROM order_offers WHERE session_id = s.id ORDER BY created_at DESC, id DESC LIMIT 1
    )
"#;

const COUNT_SELECT: &str = r#"
    SELECT
        s.status AS session_status,
        o.status AS offer_status,
        (o.actor_id = s.customer_id) AS customer_spoke_last
    FROM offer_sessions s
    JOIN order_offers o ON o.id = (
        SELECT id FROM order_offers WHERE session_id = s.id ORDER BY created_at DESC, id DESC LIMIT 1
    )
"#;

/// The SQL twin of [`effective_status_raw`], used only as a sort key.
const EFFECTIVE_STATUS_CASE: &str = "CASE WHEN s.status = 'Closed' THEN (CASE WHEN o.status = 'Accepted' THEN \
                                     'Accepted' ELSE 'Rejected' END) WHEN o.actor_id = s.customer_id THEN 'ToSeller' \
                                     ELSE 'ToCustomer' END";

#[derive(Debug, Clone, FromRow)]
struct SummaryRow {
    session_id: i64,
    customer_id: i64,
    customer_name: String,
    contractor_id: Option<i64>,
    assigned_id: Option<i64>,
    thread_id: Option<String>,
    session_status: SessionStatus,
    session_created_at: DateTime<Utc>,
    offer_id: i64,
    actor_id: i64,
    title: String,
    description: String,
    cost: Money,
    collateral: Option<Money>,
    payment_type: PaymentType,
    service_id: Option<i64>,
    offer_status: OfferStatus,
    offer_created_at: DateTime<Utc>,
}

impl From<SummaryRow> for SessionSummary {
    fn from(row: SummaryRow) -> Self {
        let session = OfferSession {
            id: row.session_id,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            contractor_id: row.contractor_id,
            assigned_id: row.assigned_id,
            thread_id: row.thread_id,
            status: row.session_status,
            created_at: row.session_created_at,
        };
        let latest_offer = Offer {
            id: row.offer_id,
            session_id: row.session_id,
            actor_id: row.actor_id,
            title: row.title,
            description: row.description,
            cost: row.cost,
            collateral: row.collateral,
            payment_type: row.payment_type,
            service_id: row.service_id,
            status: row.offer_status,
            created_at: row.offer_created_at,
        };
        SessionSummary::new(session, latest_offer)
    }
}

async fn summaries_where(
    column: &str,
    value: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<SessionSummary>, StoreError> {
    let sql = format!("{SUMMARY_SELECT} WHERE s.{column} = $1 ORDER BY s.created_at DESC");
    let rows: Vec<SummaryRow> = sqlx::query_as(&sql).bind(value).fetch_all(conn).await?;
    Ok(rows.into_iter().map(SessionSummary::from).collect())
}

pub async fn sessions_for_customer(
    customer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<SessionSummary>, StoreError> {
    summaries_where("customer_id", customer_id, conn).await
}

pub async fn sessions_for_assigned(
    assigned_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<SessionSummary>, StoreError> {
    summaries_where("assigned_id", assigned_id, conn).await
}

pub async fn sessions_for_contractor(
    contractor_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<SessionSummary>, StoreError> {
    summaries_where("contractor_id", contractor_id, conn).await
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, query: &'a OfferQueryFilter) {
    if query.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(id) = query.contractor_id {
        where_clause.push("s.contractor_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if let Some(id) = query.assigned_id {
        where_clause.push("s.assigned_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if let Some(id) = query.customer_id {
        where_clause.push("s.customer_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if let Some(name) = &query.customer_name {
        where_clause.push("s.customer_name LIKE ");
        where_clause.push_bind_unseparated(format!("%{name}%"));
    }
    if let Some(min) = query.min_cost {
        where_clause.push("o.cost >= ");
        where_clause.push_bind_unseparated(min.value());
    }
    if let Some(max) = query.max_cost {
        where_clause.push("o.cost <= ");
        where_clause.push_bind_unseparated(max.value());
    }
    if let Some(since) = query.since {
        where_clause.push("s.created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("s.created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    if let Some(has_service) = query.has_service {
        if has_service {
            where_clause.push("o.service_id IS NOT NULL");
        } else {
            where_clause.push("o.service_id IS NULL");
        }
    }
    if let Some(has_items) = query.has_market_listings {
        if has_items {
            where_clause.push("EXISTS (SELECT 1 FROM offer_market_items WHERE offer_id = o.id)");
        } else {
            where_clause.push("NOT EXISTS (SELECT 1 FROM offer_market_items WHERE offer_id = o.id)");
        }
    }
}

fn order_clause(key: SortKey, order: SortOrder) -> String {
    let dir = match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let col = match key {
        SortKey::CreatedAt => "s.created_at",
        SortKey::Status => EFFECTIVE_STATUS_CASE,
        SortKey::Title => "o.title",
        SortKey::Cost => "o.cost",
        SortKey::CustomerName => "s.customer_name",
        SortKey::Contractor => "s.contractor_id",
    };
    format!(" ORDER BY {col} {dir}")
}

#[derive(Debug, Clone, FromRow)]
struct CountRow {
    session_status: SessionStatus,
    offer_status: OfferStatus,
    customer_spoke_last: bool,
}

/// Fetches one page of matching sessions, plus per-effective-status counts over the whole match set.
pub async fn search_sessions(
    query: &OfferQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<OfferSearchResult, StoreError> {
    let mut builder = QueryBuilder::new(SUMMARY_SELECT);
    push_filters(&mut builder, query);
    builder.push(order_clause(query.sort_by, query.sort_order));
    builder.push(" LIMIT ");
    builder.push_bind(query.pagination.limit);
    builder.push(" OFFSET ");
    builder.push_bind(query.pagination.offset);
    trace!("🔍️ Executing search query: {}", builder.sql());
    let rows: Vec<SummaryRow> = builder.build_query_as().fetch_all(&mut *conn).await?;
    let items = rows.into_iter().map(SessionSummary::from).collect::<Vec<_>>();

    let mut counter = QueryBuilder::new(COUNT_SELECT);
    push_filters(&mut counter, query);
    let count_rows: Vec<CountRow> = counter.build_query_as().fetch_all(&mut *conn).await?;
    let total = count_rows.len() as i64;
    let mut status_counts = std::collections::HashMap::new();
    for row in count_rows {
        let status = effective_status_raw(row.session_status, row.offer_status, row.customer_spoke_last);
        *status_counts.entry(status).or_insert(0) += 1;
    }
    Ok(OfferSearchResult { items, status_counts, total })
}
