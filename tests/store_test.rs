use opdrape_storefront::prelude::*;
use serde_json::json;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn wishlist_body(ids: &[&str]) -> serde_json::Value {
    let items: Vec<_> = ids
        .iter()
        .map(|id| json!({ "_id": id, "name": format!("Product {}", id) }))
        .collect();
    json!({ "success": true, "data": { "count": items.len(), "wishlist": items } })
}

async fn mount_empty_cart(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/users/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [],
            "totalItems": 0,
            "totalPrice": 0
        })))
        .mount(mock_server)
        .await;
}

async fn logged_in_store(storefront: &Storefront) -> std::sync::Arc<AppStore> {
    storefront.api().session().set_token("token-123").await.unwrap();
    let store = storefront.store();
    store
        .login(serde_json::from_value(json!({ "_id": "u1", "email": "rina@example.com" })).unwrap())
        .await;
    store
}

#[tokio::test]
async fn toggle_flips_wishlist_membership() {
    let mock_server = MockServer::start().await;
    mount_empty_cart(&mock_server).await;

    // Successive wishlist reads: after login, after the add, after the removal
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wishlist_body(&[])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wishlist_body(&["p1"])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wishlist_body(&[])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/users/wishlist/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/users/wishlist/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let storefront = Storefront::new(&mock_server.uri()).unwrap();
    let store = logged_in_store(&storefront).await;
    assert!(!store.is_in_wishlist("p1"));

    let result = store.toggle_wishlist("p1").await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "Added to wishlist");
    assert!(store.is_in_wishlist("p1"));

    let result = store.toggle_wishlist("p1").await;
    assert!(result.success, "{}", result.message);
    assert_eq!(result.message, "Removed from wishlist");
    assert!(!store.is_in_wishlist("p1"));
}

#[tokio::test]
async fn logged_out_wishlist_actions_make_no_requests() {
    let mock_server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let storefront = Storefront::new(&mock_server.uri()).unwrap();
    let store = storefront.store();
    store.bootstrap().await;

    let add = store.add_to_wishlist("p1").await;
    assert!(!add.success);
    assert_eq!(add.message, "Please log in to add items to wishlist");

    let remove = store.remove_from_wishlist("p1").await;
    assert!(!remove.success);

    let toggle = store.toggle_wishlist("p1").await;
    assert!(!toggle.success);
    assert_eq!(toggle.message, "Please log in");

    store.refresh_wishlist().await;
    assert!(store.state().wishlist.is_empty());
}

#[tokio::test]
async fn wishlist_failure_is_reported_not_raised() {
    let mock_server = MockServer::start().await;
    mount_empty_cart(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wishlist_body(&[])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/wishlist/p404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Product not found" })))
        .mount(&mock_server)
        .await;

    let storefront = Storefront::new(&mock_server.uri()).unwrap();
    let store = logged_in_store(&storefront).await;

    let result = store.add_to_wishlist("p404").await;
    assert!(!result.success);
    assert_eq!(result.message, "Product not found");
    assert!(store.state().is_authenticated);
}

#[tokio::test]
async fn blank_product_id_is_rejected_locally() {
    let mock_server = MockServer::start().await;
    mount_empty_cart(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wishlist_body(&[])))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let storefront = Storefront::new(&mock_server.uri()).unwrap();
    let store = logged_in_store(&storefront).await;

    let result = store.add_to_wishlist("  ").await;
    assert!(!result.success);
    assert_eq!(result.message, "Product ID is required");
}

#[tokio::test]
async fn logout_twice_leaves_identical_state() {
    let mock_server = MockServer::start().await;
    mount_empty_cart(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wishlist_body(&["p1"])))
        .mount(&mock_server)
        .await;

    let storefront = Storefront::new(&mock_server.uri()).unwrap();
    let store = logged_in_store(&storefront).await;
    assert!(store.is_in_wishlist("p1"));

    let first = store.logout().await;
    let second = store.logout().await;

    assert_eq!(first, second);
    assert!(!first.is_authenticated);
    assert_eq!(first.user, None);
    assert!(first.wishlist.is_empty());
    assert!(first.cart.is_empty());
    assert_eq!(storefront.api().session().token().await.unwrap(), None);
}

#[tokio::test]
async fn bootstrap_without_token_skips_profile_fetch() {
    let mock_server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_id": "u1" })))
        .expect(0)
        .mount(&mock_server)
        .await;

    let storefront = Storefront::new(&mock_server.uri()).unwrap();
    let state = storefront.store().bootstrap().await;

    assert!(!state.is_authenticated);
    assert!(!state.loading);
    assert_eq!(state.error, None);
}

#[tokio::test]
async fn bootstrap_validates_token_with_profile() {
    let mock_server = MockServer::start().await;
    mount_empty_cart(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/users/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "u1",
            "firstname": "Rina",
            "role": "admin"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wishlist_body(&["p2"])))
        .mount(&mock_server)
        .await;

    let storefront = Storefront::new(&mock_server.uri()).unwrap();
    storefront.api().session().set_token("token-123").await.unwrap();
    let store = storefront.store();

    let state = store.bootstrap().await;

    assert!(state.is_authenticated);
    assert!(state.is_admin());
    assert!(state.is_in_wishlist("p2"));
    assert!(store.is_admin().await);
}

#[tokio::test]
async fn bootstrap_falls_back_to_cached_user() {
    let mock_server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let storefront = Storefront::new(&mock_server.uri()).unwrap();
    let session = storefront.api().session();
    session.set_token("token-123").await.unwrap();
    session
        .set_user(&serde_json::from_value(json!({ "_id": "u1", "name": "Rina" })).unwrap())
        .await
        .unwrap();

    let state = storefront.store().bootstrap().await;

    assert!(state.is_authenticated);
    assert_eq!(state.user.unwrap().display_name(), "Rina");
    assert!(state.cart.is_empty());
    assert!(state.wishlist.is_empty());
}

#[tokio::test]
async fn bootstrap_with_rejected_token_logs_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Token is not valid" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let storefront = Storefront::new(&mock_server.uri()).unwrap();
    let session = storefront.api().session();
    session.set_token("stale").await.unwrap();
    session
        .set_user(&serde_json::from_value(json!({ "_id": "u1" })).unwrap())
        .await
        .unwrap();
    let mut events = storefront.events();

    let state = storefront.store().bootstrap().await;

    assert!(!state.is_authenticated);
    assert_eq!(state.error.as_deref(), Some("Token is not valid"));
    assert_eq!(session.token().await.unwrap(), None);
    assert!(matches!(
        events.try_recv().unwrap(),
        ClientEvent::SessionExpired { .. }
    ));
}

#[tokio::test]
async fn refresh_falls_back_to_fresh_mirror() {
    let mock_server = MockServer::start().await;
    mount_empty_cart(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wishlist_body(&["p3"])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let options = ClientOptions::default().with_offline_mirror(chrono::Duration::hours(1));
    let storefront = Storefront::new_with_options(&mock_server.uri(), options).unwrap();
    let store = logged_in_store(&storefront).await;
    assert!(store.is_in_wishlist("p3"));

    store.refresh_wishlist().await;
    assert!(store.is_in_wishlist("p3"));
}

#[tokio::test]
async fn logout_drops_mirrors_before_next_login() {
    let mock_server = MockServer::start().await;
    mount_empty_cart(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wishlist_body(&["rina-private"])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let options = ClientOptions::default().with_offline_mirror(chrono::Duration::hours(1));
    let storefront = Storefront::new_with_options(&mock_server.uri(), options).unwrap();
    let store = logged_in_store(&storefront).await;
    assert!(store.is_in_wishlist("rina-private"));

    store.logout().await;

    storefront.api().session().set_token("token-456").await.unwrap();
    store
        .login(serde_json::from_value(json!({ "_id": "u2", "email": "omar@example.com" })).unwrap())
        .await;

    let state = store.state();
    assert!(state.is_authenticated);
    assert!(state.wishlist.is_empty());
    assert!(!store.is_in_wishlist("rina-private"));
}

#[tokio::test]
async fn refresh_degrades_to_empty_without_mirror() {
    let mock_server = MockServer::start().await;
    mount_empty_cart(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wishlist_body(&["p3"])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let storefront = Storefront::new(&mock_server.uri()).unwrap();
    let store = logged_in_store(&storefront).await;
    assert!(store.is_in_wishlist("p3"));

    store.refresh_wishlist().await;
    assert!(!store.is_in_wishlist("p3"));
    assert!(store.state().is_authenticated);
}

#[tokio::test]
async fn session_survives_restart_with_file_storage() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "token-xyz",
            "user": { "_id": "u1", "email": "rina@example.com" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "u1",
            "email": "rina@example.com"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_empty_cart(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/users/wishlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wishlist_body(&[])))
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let state_file = temp_dir.path().join("session.json");

    {
        let storage = FileStore::open(&state_file).await.unwrap();
        let storefront = Storefront::with_storage(
            &mock_server.uri(),
            ClientOptions::default(),
            std::sync::Arc::new(storage),
        )
        .unwrap();
        storefront
            .store()
            .sign_in(&Credentials::new("rina@example.com", "secret"))
            .await
            .unwrap();
    }

    let storage = FileStore::open(&state_file).await.unwrap();
    let storefront = Storefront::with_storage(
        &mock_server.uri(),
        ClientOptions::default(),
        std::sync::Arc::new(storage),
    )
    .unwrap();
    let state = storefront.store().bootstrap().await;

    assert!(state.is_authenticated);
    assert_eq!(
        state.user.and_then(|u| u.email),
        Some("rina@example.com".to_string())
    );
}
