//! Integration tests for `AuthenticatedCartService`.
//!
//! The service never patches its mirror locally, so every test checks the
//! mirror against what the mock server returned.

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rust_decimal::Decimal;
use storefront_cart::{CartError, CartItemInput};
use storefront_cart_core::{CartItemId, ProductId};
use storefront_cart_integration_tests::{cart_json, customer_service, item_json};

async fn mount_cart(server: &MockServer, items: &[serde_json::Value]) {
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(items)))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Mirror updates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_replaces_mirror_with_server_response() {
    let server = MockServer::start().await;

    // Server clamps the requested 5 to the 3 in stock.
    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cart_json(&[item_json(7, 2, 3, "4.50", 3)])),
        )
        .mount(&server)
        .await;

    let service = customer_service(&server);
    let snapshot = service
        .add_cart_item(CartItemInput {
            product_id: ProductId::new(2),
            variant_id: None,
            quantity: 5,
        })
        .await
        .unwrap();

    assert_eq!(snapshot.items[0].quantity, 3);
    assert_eq!(service.items(), snapshot.items);
    assert_eq!(service.item_count(), 3);
    assert_eq!(service.subtotal(), Decimal::new(1350, 2));
    assert!(service.error().is_none());
    assert!(!service.is_loading());
}

#[tokio::test]
async fn refetch_matches_a_fresh_get() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cart_json(&[item_json(7, 1, 2, "10.00", 9)])),
        )
        .mount(&server)
        .await;
    mount_cart(
        &server,
        &[item_json(7, 1, 2, "10.00", 9), item_json(8, 3, 1, "2.00", 4)],
    )
    .await;

    let service = customer_service(&server);
    service
        .add_cart_item(CartItemInput {
            product_id: ProductId::new(1),
            variant_id: None,
            quantity: 2,
        })
        .await
        .unwrap();

    let refetched = service.refetch_cart().await.unwrap();
    let fresh = storefront_cart_integration_tests::customer_client(&server)
        .get_cart()
        .await
        .unwrap();

    assert_eq!(refetched, fresh);
    assert_eq!(service.snapshot(), fresh);
    assert_eq!(service.items().len(), 2);
}

#[tokio::test]
async fn empty_success_body_triggers_refetch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cart_json(&[item_json(7, 1, 1, "10.00", 9)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = customer_service(&server);
    let snapshot = service
        .add_cart_item(CartItemInput {
            product_id: ProductId::new(1),
            variant_id: None,
            quantity: 1,
        })
        .await
        .unwrap();

    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(service.items(), snapshot.items);
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_failure_is_returned_and_recorded() {
    let server = MockServer::start().await;

    mount_cart(&server, &[item_json(7, 1, 1, "10.00", 9)]).await;
    Mock::given(method("POST"))
        .and(path("/cart/items"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "errors": ["Only 3 left"] })),
        )
        .mount(&server)
        .await;

    let service = customer_service(&server);
    service.refetch_cart().await.unwrap();

    let err = service
        .add_cart_item(CartItemInput {
            product_id: ProductId::new(2),
            variant_id: None,
            quantity: 5,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::Validation(_)), "got: {err:?}");
    assert_eq!(service.error().as_deref(), Some("Only 3 left"));
    // Mirror is untouched by the failure.
    assert_eq!(service.items().len(), 1);

    // The next success clears the error.
    service.refetch_cart().await.unwrap();
    assert!(service.error().is_none());
}

#[tokio::test]
async fn failed_refetch_leaves_mirror_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cart_json(&[item_json(7, 1, 1, "10.00", 9)])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let service = customer_service(&server);
    let first = service.refetch_cart().await.unwrap();

    let err = service.refetch_cart().await.unwrap_err();
    assert!(matches!(err, CartError::Status { status: 500, .. }));
    assert_eq!(service.snapshot(), first);
    assert!(service.error().is_some());
}

// ---------------------------------------------------------------------------
// Quantity changes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn decrement_at_quantity_one_sends_nothing() {
    let server = MockServer::start().await;

    mount_cart(&server, &[item_json(7, 1, 1, "10.00", 9)]).await;
    Mock::given(method("PATCH"))
        .and(path("/cart/items/7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let service = customer_service(&server);
    service.refetch_cart().await.unwrap();

    let snapshot = service
        .decrement_item_quantity(CartItemId::new(7))
        .await
        .unwrap();
    assert_eq!(snapshot.items[0].quantity, 1);
}

#[tokio::test]
async fn decrement_at_quantity_one_clears_previous_error() {
    let server = MockServer::start().await;

    mount_cart(&server, &[item_json(7, 1, 1, "10.00", 9)]).await;

    let service = customer_service(&server);
    service.refetch_cart().await.unwrap();

    let err = service
        .increment_item_quantity(CartItemId::new(99))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::NotFound(_)));
    assert!(service.error().is_some());

    service
        .decrement_item_quantity(CartItemId::new(7))
        .await
        .unwrap();
    assert!(service.error().is_none());
}

#[tokio::test]
async fn decrement_sends_action_and_applies_response() {
    let server = MockServer::start().await;

    mount_cart(&server, &[item_json(7, 1, 3, "10.00", 9)]).await;
    Mock::given(method("PATCH"))
        .and(path("/cart/items/7"))
        .and(body_json(json!({ "action": "decrement" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cart_json(&[item_json(7, 1, 2, "10.00", 9)])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let service = customer_service(&server);
    service.refetch_cart().await.unwrap();

    service
        .decrement_item_quantity(CartItemId::new(7))
        .await
        .unwrap();
    assert_eq!(service.items()[0].quantity, 2);
}

#[tokio::test]
async fn concurrent_increments_converge_to_server_quantity() {
    let server = MockServer::start().await;

    mount_cart(&server, &[item_json(7, 1, 1, "10.00", 9)]).await;
    Mock::given(method("PATCH"))
        .and(path("/cart/items/7"))
        .and(body_json(json!({ "action": "increment" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(cart_json(&[item_json(7, 1, 3, "10.00", 9)])),
        )
        .expect(2)
        .mount(&server)
        .await;

    let service = customer_service(&server);
    service.refetch_cart().await.unwrap();

    let (a, b) = tokio::join!(
        service.increment_item_quantity(CartItemId::new(7)),
        service.increment_item_quantity(CartItemId::new(7)),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(service.items()[0].quantity, 3);
    assert!(!service.is_loading());
}

// ---------------------------------------------------------------------------
// Removal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn removing_already_removed_item_refetches() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/cart/items/7"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cart_json(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let service = customer_service(&server);
    let snapshot = service.remove_cart_item(CartItemId::new(7)).await.unwrap();

    assert!(snapshot.is_empty());
    assert!(service.error().is_none());
}

#[tokio::test]
async fn clear_cart_empties_mirror() {
    let server = MockServer::start().await;

    mount_cart(&server, &[item_json(7, 1, 2, "10.00", 9)]).await;
    Mock::given(method("DELETE"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": null })))
        .expect(1)
        .mount(&server)
        .await;

    let service = customer_service(&server);
    service.refetch_cart().await.unwrap();
    assert_eq!(service.item_count(), 2);

    service.clear_cart().await.unwrap();
    assert!(service.items().is_empty());
    assert_eq!(service.subtotal(), Decimal::ZERO);
}
