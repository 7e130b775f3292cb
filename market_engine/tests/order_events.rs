use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
};

use market_engine::{
    db_types::{OrderStatusType, SellerTarget},
    events::{EventHandlers, EventHooks},
    ActingUser,
    OfferResponse,
    OrderApi,
    ResponseOutcome,
};

mod support;

const CUSTOMER: i64 = 1;
const SELLER: i64 = 2;

#[tokio::test]
async fn status_change_events_carry_the_acting_user() {
    let ctx = support::new_context().await;
    let (session, _) = ctx.open_session(CUSTOMER, SellerTarget::Individual(SELLER), "Logo design", 300).await.unwrap();
    let outcome = ctx.negotiation.respond(session.id, OfferResponse::Accept, &ActingUser::user(SELLER)).await.unwrap();
    let ResponseOutcome::OrderCreated { order, .. } = outcome else {
        panic!("Acceptance should create an order");
    };

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut hooks = EventHooks::default();
    hooks.on_order_status_changed(move |ev| {
        let sink = sink.clone();
        Box::pin(async move {
            sink.lock().unwrap().push((ev.actor_id, ev.old_status, ev.new_status));
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(10, hooks);
    let orders = OrderApi::new(ctx.db.clone(), handlers.producers());

    orders.update_status(&order.order_id, OrderStatusType::InProgress, &ActingUser::user(SELLER)).await.unwrap();
    orders.update_status(&order.order_id, OrderStatusType::Fulfilled, &ActingUser::user(SELLER)).await.unwrap();
    drop(orders);

    // With the producers gone the handler drains what was published and terminates.
    if let Some(handler) = handlers.on_order_status_changed {
        handler.start_handler().await;
    }
    let seen = seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[
        (SELLER, OrderStatusType::NotStarted, OrderStatusType::InProgress),
        (SELLER, OrderStatusType::InProgress, OrderStatusType::Fulfilled),
    ]);
}
