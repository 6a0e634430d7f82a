//! E2E tests for the repository dashboard, creation and search

mod common;

use std::time::Duration;

use common::{TEST_TOKEN, TestServer, location, repo_json};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn repos(count: u64) -> Vec<Value> {
    (0..count)
        .map(|i| repo_json(i, &format!("repo-{i:03}")))
        .collect()
}

async fn mock_repo_list(server: &TestServer, body: Vec<Value>, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(header("Authorization", format!("Bearer {TEST_TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_calls)
        .mount(&server.github)
        .await;
}

#[tokio::test]
async fn test_dashboard_without_token_redirects_to_github_login() {
    let server = TestServer::new().await;
    server.register("alice").await;
    server.page("/").await;

    let response = server.get("/dashboard").await;
    assert_eq!(location(&response), "/github/login");

    // The warning waits for the next rendered page
    let body = server.page("/").await;
    assert!(body.contains("Please connect your GitHub account first"));
}

#[tokio::test]
async fn test_dashboard_paginates_thirty_per_page() {
    let server = TestServer::new().await;
    server.register_connected("alice").await;
    mock_repo_list(&server, repos(65), 1).await;

    let first = server.page("/dashboard").await;
    assert!(first.contains("octocat/repo-000"));
    assert!(first.contains("octocat/repo-029"));
    assert!(!first.contains("octocat/repo-030"));
    assert!(first.contains("Page 1 of 3 (65 repositories)"));
    assert!(first.contains("/dashboard?page=2"));

    let last = server.page("/dashboard?page=3").await;
    assert!(last.contains("octocat/repo-060"));
    assert!(last.contains("octocat/repo-064"));
    assert!(!last.contains("octocat/repo-059"));
    assert!(last.contains("Page 3 of 3"));

    let clamped = server.page("/dashboard?page=0").await;
    assert!(clamped.contains("Page 1 of 3"));

    let beyond = server.page("/dashboard?page=9").await;
    assert!(beyond.contains("No repositories on this page."));
    assert!(beyond.contains("/dashboard?page=3"));
}

#[tokio::test]
async fn test_listing_is_served_from_cache_within_ttl() {
    let server = TestServer::new().await;
    server.register_connected("alice").await;
    mock_repo_list(&server, repos(3), 1).await;

    for path in ["/dashboard", "/dashboard?page=2", "/dashboard"] {
        server.page(path).await;
    }
    let response = server.get("/search_repos").await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_listing_is_refetched_after_ttl() {
    let server = TestServer::with_cache_ttl(1).await;
    server.register_connected("alice").await;
    mock_repo_list(&server, repos(3), 2).await;

    server.page("/dashboard").await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    server.page("/dashboard").await;
}

#[tokio::test]
async fn test_name_filter_is_case_insensitive() {
    let server = TestServer::new().await;
    server.register_connected("alice").await;
    mock_repo_list(&server, repos(65), 1).await;

    let body = server.page("/dashboard?q=REPO-06").await;

    assert!(body.contains("octocat/repo-060"));
    assert!(body.contains("octocat/repo-064"));
    assert!(!body.contains("octocat/repo-059"));
    assert!(body.contains("(5 repositories)"));
    assert!(body.contains(r#"value="REPO-06""#));
}

#[tokio::test]
async fn test_search_repos_returns_json() {
    let server = TestServer::new().await;
    server.register_connected("alice").await;
    mock_repo_list(
        &server,
        vec![
            repo_json(1, "hello-world"),
            repo_json(2, "Shell-tools"),
            repo_json(3, "dotfiles"),
        ],
        1,
    )
    .await;

    let response = server.get("/search_repos?q=ell").await;
    assert_eq!(response.status(), 200);

    let hits: Vec<Value> = response.json().await.unwrap();
    let names: Vec<_> = hits.iter().map(|h| h["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["hello-world", "Shell-tools"]);
    assert_eq!(hits[0]["url"], "/repo/octocat/hello-world");
    assert_eq!(hits[0]["full_name"], "octocat/hello-world");
}

#[tokio::test]
async fn test_create_repository_does_not_invalidate_cache() {
    let server = TestServer::new().await;
    server.register_connected("alice").await;
    // One call for the dashboard, one for the collision check
    mock_repo_list(&server, vec![repo_json(1, "hello")], 2).await;

    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .and(body_partial_json(json!({
            "name": "fresh",
            "description": "New things",
            "private": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(repo_json(2, "fresh")))
        .expect(1)
        .mount(&server.github)
        .await;

    server.page("/dashboard").await;

    let response = server
        .post_form(
            "/dashboard",
            &[
                ("repo_name", "fresh"),
                ("description", "New things"),
                ("private", "on"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/dashboard");

    let body = server.page("/dashboard").await;
    assert!(body.contains("Repository \"octocat/fresh\" created."));
    // Served from the cached listing
    assert!(!body.contains(r#"href="/repo/octocat/fresh""#));
}

#[tokio::test]
async fn test_create_repository_rejects_case_insensitive_collision() {
    let server = TestServer::new().await;
    server.register_connected("alice").await;
    mock_repo_list(&server, vec![repo_json(1, "Hello")], 2).await;

    Mock::given(method("POST"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(201).set_body_json(repo_json(2, "hello")))
        .expect(0)
        .mount(&server.github)
        .await;

    let response = server
        .post_form("/dashboard", &[("repo_name", "hello")])
        .await;
    assert_eq!(location(&response), "/dashboard");

    let body = server.page("/dashboard").await;
    assert!(body.contains("already exists"));
}

#[tokio::test]
async fn test_create_repository_requires_name() {
    let server = TestServer::new().await;
    server.register_connected("alice").await;
    mock_repo_list(&server, vec![], 1).await;

    let response = server
        .post_form("/dashboard", &[("repo_name", "  ")])
        .await;
    assert_eq!(location(&response), "/dashboard");

    let body = server.page("/dashboard").await;
    assert!(body.contains("Repository name is required."));
}

#[tokio::test]
async fn test_github_failure_is_flashed() {
    let server = TestServer::new().await;
    server.register_connected("alice").await;

    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "Server Error"})),
        )
        .mount(&server.github)
        .await;

    let response = server.get("/dashboard").await;
    assert_eq!(location(&response), "/");

    let body = server.page("/").await;
    assert!(body.contains("Could not load repositories"));
    assert!(body.contains("Server Error"));
}

#[tokio::test]
async fn test_html_error_page_still_reaches_the_user() {
    let server = TestServer::new().await;
    server.register_connected("alice").await;

    let html = format!(
        "<html><body><h1>502 Bad Gateway</h1>{}</body></html>",
        "<p>upstream unavailable</p>".repeat(200)
    );
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(502).set_body_string(html))
        .mount(&server.github)
        .await;

    let response = server.get("/dashboard").await;
    assert_eq!(location(&response), "/");
    let cookie_lengths: Vec<_> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.len())
        .collect();
    assert!(cookie_lengths.iter().all(|len| *len <= 4096), "{cookie_lengths:?}");

    let body = server.page("/").await;
    assert!(body.contains("Could not load repositories"));
    assert!(body.contains("502 Bad Gateway"));
}
