use market_engine::{
    db_types::{NewOffer, NewSession, OfferStatus, PaymentType, SellerTarget, SessionStatus},
    ActingUser,
    MergeRejectReason,
    NegotiationApiError,
    NegotiationManagement,
    OfferResponse,
};
use mkt_common::Money;

mod support;

const CUSTOMER: i64 = 1;
const ORG: i64 = 77;
const ORG_MEMBER: i64 = 8;

#[tokio::test]
async fn merging_unions_line_items_and_sums_costs() {
    let ctx = support::new_context().await;
    let planks = ctx.seed_listing("Cedar planks", 120, 50).await;
    let screws = ctx.seed_listing("Brass screws", 2, 500).await;

    let offer_a = NewOffer::new(CUSTOMER, "Fence repair", Money::from_units(500), PaymentType::Cash)
        .with_collateral(Money::from_units(100))
        .with_line_item(planks.id, 2);
    let (session_a, first_a) = ctx
        .negotiation
        .create_session(NewSession::new(CUSTOMER, "alice", SellerTarget::Organization(ORG)), offer_a)
        .await
        .unwrap();

    let offer_b = NewOffer::new(CUSTOMER, "Gate hinges", Money::from_units(250), PaymentType::Cash)
        .with_line_item(planks.id, 1)
        .with_line_item(screws.id, 40);
    let (session_b, _) = ctx
        .negotiation
        .create_session(NewSession::new(CUSTOMER, "alice", SellerTarget::Organization(ORG)), offer_b)
        .await
        .unwrap();

    let merged = ctx.negotiation.merge_sessions(&[session_a.id, session_b.id]).await.unwrap();
    assert_eq!(merged.source_session_ids, vec![session_a.id, session_b.id]);
    assert_eq!(merged.merged_session.customer_id, CUSTOMER);
    assert_eq!(merged.merged_session.contractor_id, Some(ORG));
    assert_eq!(merged.merged_session.status, SessionStatus::Active);

    let offer = &merged.merged_offer;
    assert_eq!(offer.cost, Money::from_units(750));
    assert_eq!(offer.collateral, Some(Money::from_units(100)));
    // The merged offer inherits the oldest source timestamp so the chain ordering stays truthful.
    assert_eq!(offer.created_at, first_a.created_at);
    assert!(offer.description.contains("From offer session"), "description was {}", offer.description);

    let items = ctx.db.fetch_line_items(offer.id).await.unwrap();
    let mut quantities: Vec<(i64, i64)> = items.iter().map(|i| (i.listing_id, i.quantity)).collect();
    quantities.sort_unstable();
    assert_eq!(quantities, vec![(planks.id, 3), (screws.id, 40)]);

    // Both sources are closed with their latest offers rejected.
    for id in [session_a.id, session_b.id] {
        let session = ctx.db.fetch_session(id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Closed);
        let latest = ctx.db.fetch_latest_offer(id).await.unwrap().unwrap();
        assert_eq!(latest.status, OfferStatus::Rejected);
    }

    // The merged session is a normal negotiation; the seller side can respond to it.
    let history = ctx.negotiation.session_history(merged.merged_session.id, &ActingUser::user(CUSTOMER)).await.unwrap();
    assert_eq!(history.offers.len(), 1);
}

#[tokio::test]
async fn merging_counteroffered_sources_keeps_the_oldest_session_timestamp() {
    let ctx = support::new_context().await;
    ctx.grant_manage_orders(ORG, ORG_MEMBER).await;
    let (session_a, _) = ctx.open_session(CUSTOMER, SellerTarget::Organization(ORG), "Fence repair", 500).await.unwrap();

    // A counteroffer gives session A a latest offer that is newer than the session itself.
    let counter = NewOffer::new(ORG_MEMBER, "Fence repair", Money::from_units(600), PaymentType::Cash);
    ctx.negotiation
        .respond(session_a.id, OfferResponse::Counter(counter), &ActingUser::user(ORG_MEMBER))
        .await
        .unwrap();
    let (session_b, _) = ctx.open_session(CUSTOMER, SellerTarget::Organization(ORG), "Gate hinges", 250).await.unwrap();

    let merged = ctx.negotiation.merge_sessions(&[session_a.id, session_b.id]).await.unwrap();
    // The merged negotiation keeps session A's place in the queue, counteroffer or not.
    assert_eq!(merged.merged_session.created_at, session_a.created_at);
    assert_eq!(merged.merged_offer.created_at, session_a.created_at);
    assert!(merged.merged_offer.created_at < session_b.created_at);
    // The economics still come from the latest offers.
    assert_eq!(merged.merged_offer.cost, Money::from_units(850));
}

#[tokio::test]
async fn merging_mixed_payment_types_is_refused_without_mutation() {
    let ctx = support::new_context().await;
    let offer_a = NewOffer::new(CUSTOMER, "Fence repair", Money::from_units(500), PaymentType::Cash);
    let (session_a, _) = ctx
        .negotiation
        .create_session(NewSession::new(CUSTOMER, "alice", SellerTarget::Organization(ORG)), offer_a)
        .await
        .unwrap();
    let offer_b = NewOffer::new(CUSTOMER, "Gate hinges", Money::from_units(250), PaymentType::Escrow);
    let (session_b, _) = ctx
        .negotiation
        .create_session(NewSession::new(CUSTOMER, "alice", SellerTarget::Organization(ORG)), offer_b)
        .await
        .unwrap();

    let err = ctx.negotiation.merge_sessions(&[session_a.id, session_b.id]).await.expect_err("Mixed payment types");
    assert!(matches!(err, NegotiationApiError::MergeRejected(MergeRejectReason::DifferentPaymentType)));
    assert_eq!(err.to_string(), "Sessions cannot be merged: DIFFERENT_PAYMENT_TYPE");

    // A refused merge leaves the sources untouched.
    for id in [session_a.id, session_b.id] {
        let session = ctx.db.fetch_session(id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Active);
    }
}

#[tokio::test]
async fn sessions_of_different_customers_never_merge() {
    let ctx = support::new_context().await;
    let (session_a, _) = ctx.open_session(CUSTOMER, SellerTarget::Organization(ORG), "Fence repair", 500).await.unwrap();
    let (session_b, _) = ctx.open_session(2, SellerTarget::Organization(ORG), "Gate hinges", 250).await.unwrap();

    let err = ctx.negotiation.merge_sessions(&[session_a.id, session_b.id]).await.expect_err("Different customers");
    assert!(matches!(err, NegotiationApiError::MergeRejected(MergeRejectReason::DifferentCustomer)));
}

#[tokio::test]
async fn offers_carrying_services_are_not_mergeable() {
    let ctx = support::new_context().await;
    let service = ctx.seed_service("Site survey", Some(ORG), None).await;

    let offer_a = NewOffer::new(CUSTOMER, "Fence repair", Money::from_units(500), PaymentType::Cash)
        .with_service(service.id);
    let (session_a, _) = ctx
        .negotiation
        .create_session(NewSession::new(CUSTOMER, "alice", SellerTarget::Organization(ORG)), offer_a)
        .await
        .unwrap();
    let (session_b, _) = ctx.open_session(CUSTOMER, SellerTarget::Organization(ORG), "Gate hinges", 250).await.unwrap();

    let err = ctx.negotiation.merge_sessions(&[session_a.id, session_b.id]).await.expect_err("Services present");
    assert!(matches!(err, NegotiationApiError::MergeRejected(MergeRejectReason::HasServices)));
}

#[tokio::test]
async fn a_merge_needs_at_least_two_distinct_sessions() {
    let ctx = support::new_context().await;
    let (session, _) = ctx.open_session(CUSTOMER, SellerTarget::Organization(ORG), "Fence repair", 500).await.unwrap();

    let err = ctx.negotiation.merge_sessions(&[session.id, session.id]).await.expect_err("Duplicates collapse");
    assert!(matches!(err, NegotiationApiError::NotEnoughSessions));
    let err = ctx.negotiation.merge_sessions(&[]).await.expect_err("Empty request");
    assert!(matches!(err, NegotiationApiError::NotEnoughSessions));
}

#[tokio::test]
async fn closed_sessions_cannot_be_merge_sources() {
    let ctx = support::new_context().await;
    let (session_a, _) = ctx.open_session(CUSTOMER, SellerTarget::Organization(ORG), "Fence repair", 500).await.unwrap();
    let (session_b, _) = ctx.open_session(CUSTOMER, SellerTarget::Organization(ORG), "Gate hinges", 250).await.unwrap();
    ctx.db.close_session(session_b.id, OfferStatus::Rejected).await.unwrap();

    let err = ctx.negotiation.merge_sessions(&[session_a.id, session_b.id]).await.expect_err("Source is closed");
    assert!(matches!(err, NegotiationApiError::StoreError(_)));
}
