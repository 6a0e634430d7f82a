//! E2E tests for the GitHub OAuth connect flow

mod common;

use std::collections::HashMap;

use common::{TestServer, location};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

/// Start the flow and return the `state` GitHub would echo back
async fn start_connect(server: &TestServer) -> String {
    let response = server.get("/github/login").await;
    let target = url::Url::parse(&location(&response)).unwrap();
    let params: HashMap<_, _> = target.query_pairs().into_owned().collect();
    params["state"].clone()
}

async fn stored_token(server: &TestServer, username: &str) -> Option<String> {
    server
        .state
        .db
        .get_user_by_username(username)
        .await
        .unwrap()
        .unwrap()
        .github_token
}

#[tokio::test]
async fn test_github_login_redirects_to_authorize_url() {
    let server = TestServer::new().await;
    server.register("alice").await;

    let response = server.get("/github/login").await;

    let set_cookie: Vec<_> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect();
    assert!(set_cookie.iter().any(|c| c.starts_with("oauth_state=")));

    let target = url::Url::parse(&location(&response)).unwrap();
    assert_eq!(target.path(), "/login/oauth/authorize");
    let params: HashMap<_, _> = target.query_pairs().into_owned().collect();
    assert_eq!(params["client_id"], "test-client-id");
    assert_eq!(params["redirect_uri"], "http://localhost/github/callback");
    assert_eq!(params["scope"], "repo");
    assert!(params["state"].len() >= 32);
}

#[tokio::test]
async fn test_callback_stores_token_and_redirects_to_dashboard() {
    let server = TestServer::new().await;
    server.register("alice").await;

    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .and(header("Accept", "application/json"))
        .and(body_string_contains("code=abc123"))
        .and(body_string_contains("client_secret=test-client-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "gho_fresh",
            "token_type": "bearer",
            "scope": "repo"
        })))
        .expect(1)
        .mount(&server.github)
        .await;

    let state = start_connect(&server).await;
    let response = server
        .get(&format!("/github/callback?code=abc123&state={state}"))
        .await;

    assert_eq!(location(&response), "/dashboard");
    assert_eq!(
        stored_token(&server, "alice").await.as_deref(),
        Some("gho_fresh")
    );

    // Token survives into later requests
    let body = server.page("/").await;
    assert!(body.contains("GitHub account connected successfully!"));
    assert!(body.contains("Your GitHub account is connected."));
}

#[tokio::test]
async fn test_state_mismatch_never_stores_token() {
    let server = TestServer::new().await;
    server.register("alice").await;

    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "gho_should_not_be_used"
        })))
        .expect(0)
        .mount(&server.github)
        .await;

    start_connect(&server).await;
    let response = server
        .get("/github/callback?code=abc123&state=forged-state")
        .await;

    assert_eq!(location(&response), "/");
    assert_eq!(stored_token(&server, "alice").await, None);
    assert!(
        server
            .page("/")
            .await
            .contains("GitHub authentication failed")
    );
}

#[tokio::test]
async fn test_callback_without_state_cookie_fails() {
    let server = TestServer::new().await;
    server.register("alice").await;

    let response = server
        .get("/github/callback?code=abc123&state=anything")
        .await;

    assert_eq!(location(&response), "/");
    assert_eq!(stored_token(&server, "alice").await, None);
}

#[tokio::test]
async fn test_token_endpoint_error_is_flashed() {
    let server = TestServer::new().await;
    server.register("alice").await;

    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        })))
        .mount(&server.github)
        .await;

    let state = start_connect(&server).await;
    let response = server
        .get(&format!("/github/callback?code=stale&state={state}"))
        .await;

    assert_eq!(location(&response), "/");
    assert_eq!(stored_token(&server, "alice").await, None);
    let body = server.page("/").await;
    assert!(body.contains("GitHub authentication failed"));
    assert!(body.contains("The code passed is incorrect or expired."));
}

#[tokio::test]
async fn test_denied_authorization_is_flashed() {
    let server = TestServer::new().await;
    server.register("alice").await;

    let state = start_connect(&server).await;
    let response = server
        .get(&format!(
            "/github/callback?error=access_denied&error_description=The+user+has+denied+your+application+access.&state={state}"
        ))
        .await;

    assert_eq!(location(&response), "/");
    assert!(server.page("/").await.contains("denied your application"));
}

#[tokio::test]
async fn test_state_cookie_is_single_use() {
    let server = TestServer::new().await;
    server.register("alice").await;

    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "gho_once"
        })))
        .expect(1)
        .mount(&server.github)
        .await;

    let state = start_connect(&server).await;
    let callback = format!("/github/callback?code=abc&state={state}");

    assert_eq!(location(&server.get(&callback).await), "/dashboard");
    assert_eq!(location(&server.get(&callback).await), "/");
}
