use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    CounterofferEvent,
    EventHandler,
    EventProducer,
    Handler,
    OfferDecidedEvent,
    OrderCreatedEvent,
    OrderStatusChangedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub counteroffer_producer: Vec<EventProducer<CounterofferEvent>>,
    pub offer_decided_producer: Vec<EventProducer<OfferDecidedEvent>>,
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_status_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
}

pub struct EventHandlers {
    pub on_counteroffer: Option<EventHandler<CounterofferEvent>>,
    pub on_offer_decided: Option<EventHandler<OfferDecidedEvent>>,
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_counteroffer = hooks.on_counteroffer.map(|f| EventHandler::new(buffer_size, f));
        let on_offer_decided = hooks.on_offer_decided.map(|f| EventHandler::new(buffer_size, f));
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f));
        let on_order_status_changed = hooks.on_order_status_changed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_counteroffer, on_offer_decided, on_order_created, on_order_status_changed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_counteroffer {
            result.counteroffer_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_offer_decided {
            result.offer_decided_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_status_changed {
            result.order_status_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_counteroffer {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_offer_decided {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_created {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_status_changed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_counteroffer: Option<Handler<CounterofferEvent>>,
    pub on_offer_decided: Option<Handler<OfferDecidedEvent>>,
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_status_changed: Option<Handler<OrderStatusChangedEvent>>,
}

impl EventHooks {
    pub fn on_counteroffer<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CounterofferEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_counteroffer = Some(Arc::new(f));
        self
    }

    pub fn on_offer_decided<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OfferDecidedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_offer_decided = Some(Arc::new(f));
        self
    }

    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderStatusChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_status_changed = Some(Arc::new(f));
        self
    }
}
