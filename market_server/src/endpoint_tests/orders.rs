use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use market_engine::{
    db_types::{Capability, Order, OrderId, OrderStatusType, PaymentType},
    events::EventProducers,
    OrderApi,
};
use mkt_common::Money;
use mockall::predicate::eq;
use serde_json::json;

use super::{
    helpers::{get_request, put_request, Caller},
    mocks::MockBackend,
};
use crate::routes::{OrderByIdRoute, UpdateOrderRoute};

const CUSTOMER: i64 = 11;
const SELLER: i64 = 55;
const ORG: i64 = 200;
const ORDER_ID: &str = "MKT-00000000000000a1";

fn order(status: OrderStatusType) -> Order {
    Order {
        id: 1,
        order_id: OrderId(ORDER_ID.to_string()),
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
        status,
        created_at: Utc.with_ymd_and_hms(2024, 5, 3, 8, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 3, 8, 0, 0).unwrap(),
    }
}

fn org_order(status: OrderStatusType, assigned_id: Option<i64>) -> Order {
    Order { contractor_id: Some(ORG), assigned_id, ..order(status) }
}

#[actix_web::test]
async fn customer_can_fetch_their_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(Caller::User(CUSTOMER), "/order/MKT-00000000000000a1", configure_fetch).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""order_id":"MKT-00000000000000a1""#), "body was {body}");
    assert!(body.contains(r#""status":"not-started""#), "body was {body}");
}

#[actix_web::test]
async fn unrelated_user_may_not_view_an_order() {
    let _ = env_logger::try_init().ok();
    let (status, _) = get_request(Caller::User(999), "/order/MKT-00000000000000a1", configure_fetch).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn assigned_seller_can_start_work() {
    let _ = env_logger::try_init().ok();
    let body = json!({"status": "in-progress"});
    let (status, body) =
        put_request(Caller::User(SELLER), "/order/MKT-00000000000000a1", body, configure_start).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""status":"in-progress""#), "body was {body}");
}

#[actix_web::test]
async fn customer_may_not_drive_the_order_lifecycle() {
    let _ = env_logger::try_init().ok();
    let body = json!({"status": "in-progress"});
    let (status, _) =
        put_request(Caller::User(CUSTOMER), "/order/MKT-00000000000000a1", body, configure_start).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn repeating_the_current_status_is_a_bad_request() {
    let _ = env_logger::try_init().ok();
    let body = json!({"status": "not-started"});
    let (status, _) =
        put_request(Caller::User(SELLER), "/order/MKT-00000000000000a1", body, configure_start).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn terminal_orders_are_immutable_for_non_admins() {
    let _ = env_logger::try_init().ok();
    let body = json!({"status": "in-progress"});
    let (status, _) =
        put_request(Caller::User(SELLER), "/order/MKT-00000000000000a1", body, configure_fulfilled).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn cancelling_releases_inventory() {
    let _ = env_logger::try_init().ok();
    let body = json!({"status": "cancelled"});
    let (status, body) =
        put_request(Caller::User(SELLER), "/order/MKT-00000000000000a1", body, configure_cancel).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""status":"cancelled""#), "body was {body}");
}

#[actix_web::test]
async fn picking_up_an_unassigned_org_order_assigns_it() {
    let _ = env_logger::try_init().ok();
    let body = json!({"status": "in-progress"});
    let (status, body) =
        put_request(Caller::User(77), "/order/MKT-00000000000000a1", body, configure_pickup).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""assigned_id":77"#), "body was {body}");
}

fn register(cfg: &mut ServiceConfig, backend: MockBackend) {
    let api = OrderApi::new(backend, EventProducers::default());
    cfg.service(OrderByIdRoute::<MockBackend>::new())
        .service(UpdateOrderRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}

fn configure_fetch(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(Some(order(OrderStatusType::NotStarted))));
    backend.expect_fetch_order_items().returning(|_| Ok(vec![]));
    register(cfg, backend);
}

fn configure_start(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(Some(order(OrderStatusType::NotStarted))));
    backend
        .expect_update_order_status()
        .withf(|_, &expected, &new| expected == OrderStatusType::NotStarted && new == OrderStatusType::InProgress)
        .returning(|_, _, _| Ok(order(OrderStatusType::InProgress)));
    register(cfg, backend);
}

fn configure_fulfilled(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(Some(order(OrderStatusType::Fulfilled))));
    register(cfg, backend);
}

fn configure_cancel(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(Some(order(OrderStatusType::InProgress))));
    backend
        .expect_cancel_order()
        .withf(|_, &expected| expected == OrderStatusType::InProgress)
        .returning(|_, _| Ok(order(OrderStatusType::Cancelled)));
    register(cfg, backend);
}

fn configure_pickup(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|_| Ok(Some(org_order(OrderStatusType::NotStarted, None))));
    backend
        .expect_has_permission()
        .with(eq(ORG), eq(77), eq(Capability::ManageOrders))
        .returning(|_, _, _| Ok(true));
    backend
        .expect_update_order_status()
        .returning(|_, _, _| Ok(org_order(OrderStatusType::InProgress, None)));
    backend.expect_assign_order().with(eq(OrderId(ORDER_ID.to_string())), eq(77)).returning(|_, assigned| {
        Ok(org_order(OrderStatusType::InProgress, Some(assigned)))
    });
    register(cfg, backend);
}
