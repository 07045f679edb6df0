use async_trait::async_trait;
use opdrape_api::upload::{ImageFile, MAX_UPLOAD_BYTES};
use opdrape_api::{
    ApiClient, ApiError, ApiOptions, ClearSource, ClientEvent, LocalStore, MemoryStore,
    ProfileUpdate, Result,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Store whose writes always fail
struct ReadOnlyStore;

#[async_trait]
impl LocalStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String) -> Result<()> {
        Err(ApiError::storage("quota exceeded"))
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

async fn logged_in_client(mock_server: &MockServer) -> ApiClient {
    let api = ApiClient::new(&mock_server.uri()).unwrap();
    api.session().set_token("token-123").await.unwrap();
    api
}

#[tokio::test]
async fn update_profile_walks_candidates_in_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/users/profile"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/profile"))
        .respond_with(ResponseTemplate::new(405))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/users/profile"))
        .and(body_json(json!({ "firstname": "Tania" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "_id": "u1", "firstname": "Tania" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let api = logged_in_client(&mock_server).await;
    let update = ProfileUpdate {
        firstname: Some("Tania".into()),
        ..Default::default()
    };
    let user = api.auth().update_profile(&update).await.unwrap();

    assert_eq!(user.first_name.as_deref(), Some("Tania"));
    assert_eq!(api.session().user().await.unwrap(), Some(user));
}

#[tokio::test]
async fn update_profile_exhaustion_is_terminal() {
    let mock_server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(404))
        .expect(7)
        .mount(&mock_server)
        .await;

    let api = logged_in_client(&mock_server).await;
    let result = api.auth().update_profile(&ProfileUpdate::default()).await;

    match result {
        Err(ApiError::Exhausted { attempts, .. }) => assert_eq!(attempts, 7),
        other => panic!("Expected Exhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn update_profile_stops_on_server_error() {
    let mock_server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = logged_in_client(&mock_server).await;
    let result = api.auth().update_profile(&ProfileUpdate::default()).await;
    assert!(matches!(result, Err(ApiError::Server { status: 500, .. })));
}

#[tokio::test]
async fn clear_cart_uses_first_working_endpoint() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/users/cart"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = logged_in_client(&mock_server).await;
    let outcome = api.cart().clear().await;
    assert_eq!(outcome.source, ClearSource::Remote);
}

#[tokio::test]
async fn clear_cart_server_error_stops_at_first_endpoint() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/users/cart"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let api = logged_in_client(&mock_server).await;
    let outcome = api.cart().clear().await;
    assert_eq!(outcome.source, ClearSource::StorageFallback);
}

#[tokio::test]
async fn clear_cart_exhaustion_falls_back_to_storage() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(405))
        .expect(3)
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/users/cart"))
        .and(body_json(json!({ "items": [] })))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = logged_in_client(&mock_server).await;
    let mut events = api.subscribe();

    let outcome = api.cart().clear().await;

    assert_eq!(outcome.source, ClearSource::StorageFallback);
    assert_eq!(outcome.message, "Cart cleared (storage fallback)");
    match events.try_recv().unwrap() {
        ClientEvent::CartCleared { source, .. } => assert_eq!(source, ClearSource::StorageFallback),
        other => panic!("Expected CartCleared, got {:?}", other),
    }
    let mirror = api
        .session()
        .cart_mirror(chrono::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(mirror.map(|cart| cart.items.len()), Some(0));
}

#[tokio::test]
async fn clear_cart_best_effort_when_storage_fails() {
    let mock_server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = ApiClient::with_options(
        &mock_server.uri(),
        ApiOptions::default(),
        Arc::new(ReadOnlyStore),
    )
    .unwrap();
    let mut events = api.subscribe();

    let outcome = api.cart().clear().await;

    assert_eq!(outcome.source, ClearSource::BestEffort);
    assert_eq!(outcome.message, "Cart clearing attempted (best effort)");
    assert!(matches!(
        events.try_recv().unwrap(),
        ClientEvent::CartCleared {
            source: ClearSource::BestEffort,
            ..
        }
    ));
}

#[tokio::test]
async fn unauthorized_response_expires_session() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/cart"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })))
        .mount(&mock_server)
        .await;

    let api = logged_in_client(&mock_server).await;
    api.session()
        .set_user(&serde_json::from_value(json!({ "id": "u1" })).unwrap())
        .await
        .unwrap();
    let mut events = api.subscribe();

    let result = api.cart().get().await;

    assert!(matches!(result, Err(ApiError::Unauthorized(ref m)) if m == "jwt expired"));
    assert_eq!(api.session().token().await.unwrap(), None);
    assert_eq!(api.session().user().await.unwrap(), None);
    assert_eq!(
        events.try_recv().unwrap(),
        ClientEvent::SessionExpired {
            redirect_to: "/login?reason=session_expired".to_string()
        }
    );
}

#[tokio::test]
async fn invalid_uploads_never_reach_the_network() {
    let mock_server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let api = logged_in_client(&mock_server).await;

    let too_big = ImageFile::new("big.jpg", "image/jpeg", vec![0u8; 11 * 1024 * 1024]);
    assert!(too_big.size() > MAX_UPLOAD_BYTES);
    assert!(matches!(
        api.uploads().upload_image(&too_big, "products").await,
        Err(ApiError::InvalidInput(_))
    ));

    let text = ImageFile::new("notes.txt", "text/plain", b"hello".to_vec());
    assert!(matches!(
        api.uploads().upload_image(&text, "products").await,
        Err(ApiError::InvalidInput(_))
    ));

    let ok = ImageFile::new("ok.png", "image/png", vec![1u8; 8]);
    assert!(matches!(
        api.uploads().upload_images(&[ok, text], "products").await,
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        api.uploads().upload_images(&[], "products").await,
        Err(ApiError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn upload_tries_alternate_routes() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/uploads/products"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/upload/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "File uploaded successfully",
            "file": {
                "url": "https://res.cloudinary.com/opdrape/image/upload/v1/opdrape/products/a.png",
                "publicId": "opdrape/products/a"
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = logged_in_client(&mock_server).await;
    let file = ImageFile::new("a.png", "image/png", vec![1u8; 8]);
    let uploaded = api.uploads().upload_image(&file, "products").await.unwrap();

    assert_eq!(uploaded.public_id.as_deref(), Some("opdrape/products/a"));
    assert!(!uploaded.client_side_fallback);
}

#[tokio::test]
async fn upload_exhaustion_embeds_data_url() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .expect(4)
        .mount(&mock_server)
        .await;

    let api = logged_in_client(&mock_server).await;
    let file = ImageFile::new("dot.gif", "image/gif", b"GIF89a".to_vec());
    let uploaded = api.uploads().upload_image(&file, "reviews").await.unwrap();

    assert!(uploaded.client_side_fallback);
    assert_eq!(uploaded.url, "data:image/gif;base64,R0lGODlh");
    assert_eq!(uploaded.public_id, None);
}

#[tokio::test]
async fn upload_server_error_is_not_embedded() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/uploads/reviews"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/upload/reviews"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let api = logged_in_client(&mock_server).await;
    let file = ImageFile::new("dot.gif", "image/gif", b"GIF89a".to_vec());
    let result = api.uploads().upload_image(&file, "reviews").await;
    assert!(matches!(result, Err(ApiError::Server { status: 500, .. })));
}

#[tokio::test]
async fn upload_exhaustion_is_an_error_without_fallback() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .expect(4)
        .mount(&mock_server)
        .await;

    let options = ApiOptions {
        allow_upload_fallback: false,
        ..Default::default()
    };
    let api =
        ApiClient::with_options(&mock_server.uri(), options, Arc::new(MemoryStore::new())).unwrap();
    let files = vec![ImageFile::new("a.webp", "image/webp", vec![1u8; 8])];

    let result = api.uploads().upload_images(&files, "products").await;
    assert!(matches!(result, Err(ApiError::Exhausted { attempts: 4, .. })));
}

#[tokio::test]
async fn delete_image_sends_public_id_from_url() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/uploads"))
        .and(body_json(json!({ "publicId": "opdrape/products/shirt-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "File deleted successfully" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let api = logged_in_client(&mock_server).await;
    api.uploads()
        .delete_image("https://res.cloudinary.com/opdrape/image/upload/v1712345678/opdrape/products/shirt-1.jpg")
        .await
        .unwrap();
}
