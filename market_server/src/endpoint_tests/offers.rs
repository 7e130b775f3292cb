use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use market_engine::{
    db_types::{Offer, OfferSession, OfferStatus, Order, OrderId, OrderStatusType, PaymentType, SessionStatus},
    events::EventProducers,
    offer_objects::{OfferSearchResult, OfferWithItems, SessionHistory},
    NegotiationApi,
};
use mkt_common::Money;
use mockall::predicate::eq;
use serde_json::json;

use super::{
    helpers::{get_request, put_request, Caller},
    mocks::MockBackend,
};
use crate::routes::{SearchOffersRoute, SessionRoute, UpdateOfferRoute};

const CUSTOMER: i64 = 11;
const SELLER: i64 = 55;

fn session_to_individual() -> OfferSession {
    OfferSession {
        id: 1,
        customer_id: CUSTOMER,
        customer_name: format!("user-{CUSTOMER}"),
        contractor_id: None,
        assigned_id: Some(SELLER),
        thread_id: None,
        status: SessionStatus::Active,
        created_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap(),
    }
}

fn offer_from(actor_id: i64, status: OfferStatus) -> Offer {
    Offer {
        id: 10,
        session_id: 1,
        actor_id,
        title: "Garden shed".to_string(),
        description: "8x6 timber shed, assembled on site".to_string(),
        cost: Money::from(45_000),
        collateral: None,
        payment_type: PaymentType::Cash,
        service_id: None,
        status,
        created_at: Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap(),
    }
}

fn order_from_acceptance() -> Order {
    Order {
        id: 1,
        order_id: OrderId("MKT-00000000000000a1".to_string()),
        offer_session_id: 1,
        customer_id: CUSTOMER,
        contractor_id: None,
        assigned_id: Some(SELLER),
        title: "Garden shed".to_string(),
        description: "8x6 timber shed, assembled on site".to_string(),
        cost: Money::from(45_000),
        collateral: None,
        payment_type: PaymentType::Cash,
        service_id: None,
        thread_id: None,
        status: OrderStatusType::NotStarted,
        created_at: Utc.with_ymd_and_hms(2024, 5, 3, 8, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 3, 8, 0, 0).unwrap(),
    }
}

#[actix_web::test]
async fn fetch_session_history_as_customer() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Caller::User(CUSTOMER), "/offer/1", configure_history).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""effective_status":"to_seller""#), "body was {body}");
    assert!(body.contains(r#""title":"Garden shed""#));
}

#[actix_web::test]
async fn unrelated_user_may_not_view_a_session() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(Caller::User(999), "/offer/1", configure_history).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_may_view_any_session() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(Caller::Admin(999), "/offer/1", configure_history).await.unwrap();
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn anonymous_requests_are_unauthorized() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(Caller::Anonymous, "/offer/1", configure_history).await.unwrap();
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn accepting_an_offer_creates_an_order() {
    let _ = env_logger::try_init().ok();
    let body = json!({"status": "accepted"});
    let (status, body) = put_request(Caller::User(SELLER), "/offer/1", body, configure_accept).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""result":"accepted""#), "body was {body}");
    assert!(body.contains("MKT-00000000000000a1"));
}

#[actix_web::test]
async fn cancelling_closes_the_session_like_a_rejection() {
    let _ = env_logger::try_init().ok();
    let body = json!({"status": "cancelled"});
    let (status, body) = put_request(Caller::User(SELLER), "/offer/1", body, configure_reject).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""result":"rejected""#), "body was {body}");
}

#[actix_web::test]
async fn countering_appends_a_new_version() {
    let _ = env_logger::try_init().ok();
    let body = json!({"title": "Garden shed", "cost": 40_000, "payment_type": "cash"});
    let (status, body) = put_request(Caller::User(CUSTOMER), "/offer/1", body, configure_counter).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""result":"countered""#), "body was {body}");
}

#[actix_web::test]
async fn responding_out_of_turn_is_forbidden() {
    let _ = env_logger::try_init().ok();
    // The customer made the latest offer, so the customer cannot also accept it.
    let body = json!({"status": "accepted"});
    let (status, _) = put_request(Caller::User(CUSTOMER), "/offer/1", body, configure_reject).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn search_requires_admin() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(Caller::User(5), "/offers/search", configure_search).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_search_returns_counts() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Caller::Admin(1), "/offers/search?customer_id=11", configure_search).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""total":0"#), "body was {body}");
}

fn register(cfg: &mut ServiceConfig, backend: MockBackend) {
    let api = NegotiationApi::new(backend, EventProducers::default());
    cfg.service(SessionRoute::<MockBackend>::new())
        .service(UpdateOfferRoute::<MockBackend>::new())
        .service(SearchOffersRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}

fn configure_history(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_session_history().with(eq(1)).returning(|_| {
        let history = SessionHistory {
            session: session_to_individual(),
            offers: vec![OfferWithItems { offer: offer_from(CUSTOMER, OfferStatus::Active), line_items: vec![] }],
        };
        Ok(Some(history))
    });
    register(cfg, backend);
}

fn configure_accept(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_session().with(eq(1)).returning(|_| Ok(Some(session_to_individual())));
    backend.expect_fetch_latest_offer().with(eq(1)).returning(|_| Ok(Some(offer_from(CUSTOMER, OfferStatus::Active))));
    backend.expect_fetch_line_items().returning(|_| Ok(vec![]));
    backend
        .expect_close_session()
        .withf(|&sid, &status| sid == 1 && status == OfferStatus::Accepted)
        .returning(|_, _| Ok(offer_from(CUSTOMER, OfferStatus::Accepted)));
    backend.expect_insert_order().returning(|_, _| Ok(order_from_acceptance()));
    register(cfg, backend);
}

fn configure_reject(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_session().with(eq(1)).returning(|_| Ok(Some(session_to_individual())));
    backend.expect_fetch_latest_offer().with(eq(1)).returning(|_| Ok(Some(offer_from(CUSTOMER, OfferStatus::Active))));
    backend
        .expect_close_session()
        .withf(|&sid, &status| sid == 1 && status == OfferStatus::Rejected)
        .returning(|_, _| Ok(offer_from(CUSTOMER, OfferStatus::Rejected)));
    register(cfg, backend);
}

fn configure_counter(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_session().with(eq(1)).returning(|_| Ok(Some(session_to_individual())));
    backend.expect_fetch_latest_offer().with(eq(1)).returning(|_| Ok(Some(offer_from(SELLER, OfferStatus::Active))));
    backend
        .expect_append_counteroffer()
        .withf(|&sid, offer| sid == 1 && offer.actor_id == CUSTOMER)
        .returning(|_, _| Ok(offer_from(CUSTOMER, OfferStatus::Active)));
    register(cfg, backend);
}

fn configure_search(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_search_sessions().returning(|_| {
        Ok(OfferSearchResult { items: vec![], status_counts: Default::default(), total: 0 })
    });
    register(cfg, backend);
}
