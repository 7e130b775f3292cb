//! Event hook wiring for thread maintenance and notifications.
use std::{future::Future, pin::Pin};

use log::*;
use market_engine::{
    db_types::OrderStatusType,
    events::{EventHandlers, EventHooks, OrderStatusChangedEvent},
};

use crate::integrations::threads::ThreadApi;

pub const EVENT_BUFFER_SIZE: usize = 25;

fn no_op() -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async {})
}

/// Assigns event handlers for the engine's negotiation and order events.
///
/// Every handler is best-effort: a failed thread rename or system message is logged and forgotten, and the state
/// change that triggered it stands.
///
/// 1. CounterofferEvent - a system message announces the new offer version in the session's thread.
/// 2. OfferDecidedEvent - rejections get a closing system message. Acceptances are announced by the
///    OrderCreatedEvent that follows them.
/// 3. OrderCreatedEvent - the session's thread is renamed after the order and a system message marks the handover
///    from negotiation to fulfillment.
/// 4. OrderStatusChangedEvent - a system message records each transition, prior and new status. A user moving an
///    order to in-progress is added to the order's thread first.
pub fn create_event_handlers(thread_api: Option<ThreadApi>) -> EventHandlers {
    let mut hooks = EventHooks::default();

    let api = thread_api.clone();
    hooks.on_counteroffer(move |ev| {
        let Some(thread_id) = ev.session.thread_id else {
            return no_op();
        };
        let Some(api) = api.clone() else {
            return no_op();
        };
        let message = format!("New counteroffer from user {}: {} for {}", ev.offer.actor_id, ev.offer.title, ev.offer.cost);
        Box::pin(async move {
            if let Err(e) = api.post_system_message(&thread_id, &message).await {
                error!("🧵️ Could not announce counteroffer in thread {thread_id}. {e}");
            }
        })
    });

    let api = thread_api.clone();
    hooks.on_offer_decided(move |ev| {
        if ev.order.is_some() {
            return no_op();
        }
        let Some(thread_id) = ev.session.thread_id else {
            return no_op();
        };
        let Some(api) = api.clone() else {
            return no_op();
        };
        Box::pin(async move {
            if let Err(e) = api.post_system_message(&thread_id, "The offer was declined. Negotiation closed.").await {
                error!("🧵️ Could not announce rejection in thread {thread_id}. {e}");
            }
        })
    });

    let api = thread_api.clone();
    hooks.on_order_created(move |ev| {
        let order = ev.order;
        let Some(thread_id) = order.thread_id.clone() else {
            debug!("🧵️ Order {} has no thread attached. Nothing to rename", order.order_id);
            return no_op();
        };
        let Some(api) = api.clone() else {
            return no_op();
        };
        Box::pin(async move {
            let title = format!("Order {}", order.order_id);
            if let Err(e) = api.rename_thread(&thread_id, &title).await {
                error!("🧵️ Could not rename thread {thread_id} for order {}. {e}", order.order_id);
            }
            let message = format!("Offer accepted. Order {} has been created.", order.order_id);
            if let Err(e) = api.post_system_message(&thread_id, &message).await {
                error!("🧵️ Could not announce order {} in thread {thread_id}. {e}", order.order_id);
            }
        })
    });

    let api = thread_api;
    hooks.on_order_status_changed(move |ev| {
        info!("🧵️ Order {} moved from {} to {}", ev.order.order_id, ev.old_status, ev.new_status);
        let Some(thread_id) = ev.order.thread_id.clone() else {
            return no_op();
        };
        let Some(api) = api.clone() else {
            return no_op();
        };
        let message = status_change_message(&ev);
        let joiner = thread_joiner(&ev);
        Box::pin(async move {
            if let Some(user_id) = joiner {
                if let Err(e) = api.assign_to_thread(&thread_id, user_id).await {
                    error!("🧵️ Could not add user {user_id} to thread {thread_id}. {e}");
                }
            }
            if let Err(e) = api.post_system_message(&thread_id, &message).await {
                error!("🧵️ Could not announce order status change in thread {thread_id}. {e}");
            }
        })
    });

    EventHandlers::new(EVENT_BUFFER_SIZE, hooks)
}

/// The system message posted for a lifecycle transition records both the prior and the new status.
fn status_change_message(ev: &OrderStatusChangedEvent) -> String {
    format!("Order {} moved from {} to {}.", ev.order.order_id, ev.old_status, ev.new_status)
}

/// A user who moves an order to in-progress has taken the work on and is added to the order's thread.
fn thread_joiner(ev: &OrderStatusChangedEvent) -> Option<i64> {
    (ev.new_status == OrderStatusType::InProgress).then_some(ev.actor_id)
}
