//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause
//! the current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database calls, the
//! thread service) must therefore be awaited, never blocked on.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use market_engine::{
    db_types::OrderId,
    traits::MarketBackend,
    NegotiationApi,
    OfferResponse,
    OrderApi,
    ResponseOutcome,
};
use serde_json::json;

use crate::{
    auth::AuthenticatedUser,
    data_objects::{MergeRequest, OfferUpdate, OrderStatusUpdate, ResponseStatus, SearchParams},
    errors::ServerError,
    integrations::threads::ThreadApi,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Offers  ----------------------------------------------------

route!(session => Get "/offer/{session_id}" impl MarketBackend);
/// The session with its full offer chain and derived status. Callers must be related to the negotiation: the
/// customer, the assigned individual, a `ManageOrders` holder for the contractor, or an admin.
pub async fn session<B: MarketBackend>(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    api: web::Data<NegotiationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let session_id = path.into_inner();
    debug!("💻️ GET offer session {session_id} for user {}", user.id);
    let history = api.session_history(session_id, &user.acting()).await?;
    let status = history.effective_status();
    Ok(HttpResponse::Ok().json(json!({ "history": history, "effective_status": status })))
}

route!(update_offer => Put "/offer/{session_id}" impl MarketBackend);
/// Responds to the latest offer of a session. The body is either `{"status": ...}` for a decision, or a full
/// counteroffer payload. Accepting returns the new order id; a client-side "cancelled" closes the session like a
/// rejection.
pub async fn update_offer<B: MarketBackend>(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    body: web::Json<OfferUpdate>,
    api: web::Data<NegotiationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let session_id = path.into_inner();
    debug!("💻️ PUT offer response on session {session_id} from user {}", user.id);
    let response = match body.into_inner() {
        OfferUpdate::Status { status: ResponseStatus::Accepted } => OfferResponse::Accept,
        OfferUpdate::Status { status: ResponseStatus::Rejected | ResponseStatus::Cancelled } => OfferResponse::Reject,
        OfferUpdate::Counter(payload) => OfferResponse::Counter(payload.into_new_offer()),
    };
    let outcome = api.respond(session_id, response, &user.acting()).await?;
    let body = match outcome {
        ResponseOutcome::OrderCreated { order, .. } => json!({ "result": "accepted", "order_id": order.order_id }),
        ResponseOutcome::Rejected { .. } => json!({ "result": "rejected" }),
        ResponseOutcome::Countered { offer } => json!({ "result": "countered", "offer": offer }),
    };
    Ok(HttpResponse::Ok().json(body))
}

route!(offers_sent => Get "/offers/sent" impl MarketBackend);
pub async fn offers_sent<B: MarketBackend>(
    user: AuthenticatedUser,
    api: web::Data<NegotiationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET sent offers for user {}", user.id);
    let sessions = api.sessions_sent(&user.acting()).await?;
    Ok(HttpResponse::Ok().json(sessions))
}

route!(offers_received => Get "/offers/received" impl MarketBackend);
pub async fn offers_received<B: MarketBackend>(
    user: AuthenticatedUser,
    api: web::Data<NegotiationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET received offers for user {}", user.id);
    let sessions = api.sessions_received(&user.acting()).await?;
    Ok(HttpResponse::Ok().json(sessions))
}

route!(contractor_offers => Get "/offers/contractor/{contractor_id}/received" impl MarketBackend);
pub async fn contractor_offers<B: MarketBackend>(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    api: web::Data<NegotiationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let contractor_id = path.into_inner();
    debug!("💻️ GET received offers for contractor {contractor_id}, requested by user {}", user.id);
    let sessions = api.sessions_for_contractor(contractor_id, &user.acting()).await?;
    Ok(HttpResponse::Ok().json(sessions))
}

route!(search_offers => Get "/offers/search" impl MarketBackend);
/// Admin-only search across all sessions, with filtering, sorting and pagination. The response carries the matching
/// page plus per-effective-status counts over the whole match set.
pub async fn search_offers<B: MarketBackend>(
    user: AuthenticatedUser,
    query: web::Query<SearchParams>,
    api: web::Data<NegotiationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    if !user.is_admin {
        return Err(ServerError::InsufficientPermissions("Only admins may search all offers".to_string()));
    }
    let result = api.search(query.into_inner().into_filter()).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(merge_offers => Post "/offers/merge" impl MarketBackend);
/// Merges the given active sessions into one consolidated negotiation. Only the customer who owns the sessions (or
/// an admin) may merge them.
pub async fn merge_offers<B: MarketBackend>(
    user: AuthenticatedUser,
    body: web::Json<MergeRequest>,
    api: web::Data<NegotiationApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let MergeRequest { session_ids } = body.into_inner();
    debug!("💻️ POST merge of sessions {session_ids:?} by user {}", user.id);
    if let Some(&first) = session_ids.first() {
        let history = api.session_history(first, &user.acting()).await?;
        if !user.is_admin && history.session.customer_id != user.id {
            return Err(ServerError::InsufficientPermissions(
                "Only the customer may merge their own offer sessions".to_string(),
            ));
        }
    }
    let merged = api.merge_sessions(&session_ids).await?;
    Ok(HttpResponse::Ok().json(merged))
}

route!(create_thread => Post "/offers/{session_id}/thread" impl MarketBackend);
/// Creates a communication thread for the session via the external thread service and records its reference.
/// Returns 409 if the session already has one.
pub async fn create_thread<B: MarketBackend>(
    path: web::Path<i64>,
    user: AuthenticatedUser,
    api: web::Data<NegotiationApi<B>>,
    threads: Option<web::Data<ThreadApi>>,
) -> Result<HttpResponse, ServerError> {
    let session_id = path.into_inner();
    debug!("💻️ POST thread creation for session {session_id} by user {}", user.id);
    let threads = threads.ok_or_else(|| ServerError::Unspecified("Thread service is not configured".to_string()))?;
    let history = api.session_history(session_id, &user.acting()).await?;
    if history.session.thread_id.is_some() {
        return Err(ServerError::Conflict(format!("A thread already exists for session {session_id}")));
    }
    let thread_id = threads
        .create_thread(&history.session)
        .await
        .map_err(|e| ServerError::BackendError(format!("Thread service error: {e}")))?;
    let session = api.attach_thread(session_id, &thread_id, &user.acting()).await?;
    Ok(HttpResponse::Ok().json(json!({ "thread_id": session.thread_id })))
}

//----------------------------------------------   Orders  ----------------------------------------------------

route!(order_by_id => Get "/order/{order_id}" impl MarketBackend);
pub async fn order_by_id<B: MarketBackend>(
    path: web::Path<String>,
    user: AuthenticatedUser,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ GET order {order_id} for user {}", user.id);
    let order = api.fetch_order(&order_id, &user.acting()).await?;
    let items = api.order_items(&order_id, &user.acting()).await?;
    Ok(HttpResponse::Ok().json(json!({ "order": order, "items": items })))
}

route!(update_order => Put "/order/{order_id}" impl MarketBackend);
/// Moves an order through its lifecycle. Seller-side users only; terminal statuses are immutable for non-admins.
pub async fn update_order<B: MarketBackend>(
    path: web::Path<String>,
    user: AuthenticatedUser,
    body: web::Json<OrderStatusUpdate>,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let new_status = body.into_inner().status;
    debug!("💻️ PUT order {order_id} to {new_status} by user {}", user.id);
    let order = api.update_status(&order_id, new_status, &user.acting()).await?;
    Ok(HttpResponse::Ok().json(order))
}
