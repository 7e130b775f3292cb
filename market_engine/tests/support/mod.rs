use log::*;
use market_engine::{
    db_types::{Capability, MarketListing, NewOffer, NewSession, Offer, OfferSession, PaymentType, SellerTarget, Service},
    events::EventProducers,
    sqlite::db::{listings, permissions},
    test_utils::{prepare_test_env, random_db_path},
    NegotiationApi,
    NegotiationApiError,
    OrderApi,
    SqliteDatabase,
};
use mkt_common::Money;

/// A fresh database with both engine APIs wired over it, one per test.
pub struct TestContext {
    pub db: SqliteDatabase,
    pub negotiation: NegotiationApi<SqliteDatabase>,
    pub orders: OrderApi<SqliteDatabase>,
}

pub async fn new_context() -> TestContext {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let negotiation = NegotiationApi::new(db.clone(), EventProducers::default());
    let orders = OrderApi::new(db.clone(), EventProducers::default());
    info!("🚀️ Test database ready at {url}");
    TestContext { db, negotiation, orders }
}

impl TestContext {
    pub async fn seed_listing(&self, title: &str, price_units: i64, quantity: i64) -> MarketListing {
        let mut conn = self.db.pool().acquire().await.unwrap();
        listings::insert_listing(title, Money::from_units(price_units), quantity, &mut conn)
            .await
            .expect("Error seeding listing")
    }

    pub async fn seed_service(&self, title: &str, contractor_id: Option<i64>, assigned_id: Option<i64>) -> Service {
        let mut conn = self.db.pool().acquire().await.unwrap();
        listings::insert_service(title, contractor_id, assigned_id, &mut conn).await.expect("Error seeding service")
    }

    pub async fn grant_manage_orders(&self, org_id: i64, user_id: i64) {
        let mut conn = self.db.pool().acquire().await.unwrap();
        permissions::grant_permission(org_id, user_id, Capability::ManageOrders, &mut conn)
            .await
            .expect("Error granting permission");
    }

    /// Opens a session from `customer_id` to `seller` with a single plain offer.
    pub async fn open_session(
        &self,
        customer_id: i64,
        seller: SellerTarget,
        title: &str,
        cost_units: i64,
    ) -> Result<(OfferSession, Offer), NegotiationApiError> {
        let session = NewSession::new(customer_id, format!("user-{customer_id}"), seller);
        let offer = NewOffer::new(customer_id, title, Money::from_units(cost_units), PaymentType::Cash);
        self.negotiation.create_session(session, offer).await
    }
}
