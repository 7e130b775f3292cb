use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use market_engine::{events::EventProducers, NegotiationApi, OrderApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{create_event_handlers, threads::ThreadApi},
    routes::{
        health,
        ContractorOffersRoute,
        CreateThreadRoute,
        MergeOffersRoute,
        OffersReceivedRoute,
        OffersSentRoute,
        OrderByIdRoute,
        SearchOffersRoute,
        SessionRoute,
        UpdateOfferRoute,
        UpdateOrderRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let thread_api = match &config.thread_service {
        Some(cfg) => {
            Some(ThreadApi::new(cfg.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?)
        },
        None => None,
    };
    let handlers = create_event_handlers(thread_api.clone());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers, thread_api)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    thread_api: Option<ThreadApi>,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let negotiation_api = NegotiationApi::new(db.clone(), producers.clone());
        let order_api = OrderApi::new(db.clone(), producers.clone());
        let mut app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mkt::access_log"))
            .app_data(web::Data::new(negotiation_api))
            .app_data(web::Data::new(order_api));
        if let Some(threads) = &thread_api {
            app = app.app_data(web::Data::new(threads.clone()));
        }
        app.service(health)
            .service(OffersSentRoute::<SqliteDatabase>::new())
            .service(OffersReceivedRoute::<SqliteDatabase>::new())
            .service(SearchOffersRoute::<SqliteDatabase>::new())
            .service(MergeOffersRoute::<SqliteDatabase>::new())
            .service(ContractorOffersRoute::<SqliteDatabase>::new())
            .service(CreateThreadRoute::<SqliteDatabase>::new())
            .service(SessionRoute::<SqliteDatabase>::new())
            .service(UpdateOfferRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
