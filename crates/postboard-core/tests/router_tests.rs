//! Route gate driven by real session events

use postboard_core::api::{ApiClient, ApiRequest, LOGIN_PATH};
use postboard_core::auth::{Credential, SessionContext};
use postboard_core::routes::{Element, Router, View};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_login_flips_route_table() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/{}", LOGIN_PATH)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "a-1", "refresh": "r-1"})),
        )
        .mount(&server)
        .await;

    let session = SessionContext::in_memory();
    let api = ApiClient::new(&server.uri(), session.clone()).expect("client");
    let mut router = Router::new(&session);

    assert_eq!(router.navigate("/login").expect("navigate").view, Some(View::Login));

    api.authenticate("alice", "secret", false).await.expect("login");

    let nav = router.navigate("/login").expect("navigate");
    assert_eq!(nav.location, "/home");
    assert_eq!(nav.view, Some(View::Feed));
}

#[tokio::test]
async fn test_unrecoverable_unauthorized_logs_router_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/posts/8/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let session = SessionContext::in_memory();
    session.tokens().store(Credential::Access, "expired");
    let api = ApiClient::new(&server.uri(), session.clone()).expect("client");
    let mut router = Router::new(&session);
    assert!(router.table().logged_in());

    let edit = router.table().resolve("/posts/8/edit").route.element;
    assert_eq!(edit, Some(Element::View(View::PostForm)));

    assert!(api
        .send(&ApiRequest::get("api/posts/8/").retry(true))
        .await
        .is_err());

    assert!(router.sync());
    let nav = router.navigate("/posts/8/edit").expect("navigate");
    assert_eq!(nav.location, "/home");
    assert_eq!(nav.view, Some(View::Home));
}
