//! View registration over HTTP

mod common;

use axum::{body::Body, http::{header, Request, StatusCode}};
use chrono::Duration;
use common::{authed_request, spawn_app, view_request};
use std::sync::Arc;
use tower::ServiceExt;

const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0";

#[tokio::test]
async fn test_first_view_counts_and_repeat_does_not() {
    let app = spawn_app().await;
    let (owner, _) = app.seed_user("alice").await;

    let (status, body) = app.send(view_request("alice", "203.0.113.7", FIREFOX)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["counted"], true);
    assert!(body.get("reason").is_none());

    let (status, body) = app.send(view_request("alice", "203.0.113.7", FIREFOX)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["counted"], false);
    assert_eq!(body["reason"], "already_counted");

    assert_eq!(app.state.storage.count_views(owner.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_view_counts_again_the_next_day() {
    let app = spawn_app().await;
    let (owner, _) = app.seed_user("alice").await;

    let (_, body) = app.send(view_request("alice", "203.0.113.7", FIREFOX)).await;
    assert_eq!(body["counted"], true);

    app.clock.advance(Duration::days(1));
    let (_, body) = app.send(view_request("alice", "203.0.113.7", FIREFOX)).await;
    assert_eq!(body["counted"], true);

    assert_eq!(app.state.storage.count_views(owner.id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_different_visitors_are_counted_separately() {
    let app = spawn_app().await;
    let (owner, _) = app.seed_user("alice").await;

    let visits = [
        ("203.0.113.7", FIREFOX),
        ("203.0.113.8", FIREFOX),
        ("203.0.113.7", "curl/8.5.0"),
    ];
    for (ip, ua) in visits {
        let (status, body) = app.send(view_request("alice", ip, ua)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["counted"], true, "visit from {ip} / {ua}");
    }

    assert_eq!(app.state.storage.count_views(owner.id).await.unwrap(), 3);
}

#[tokio::test]
async fn test_unknown_handle_is_not_found() {
    let app = spawn_app().await;

    let (status, body) = app.send(view_request("nobody", "203.0.113.7", FIREFOX)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User does not exist");
}

#[tokio::test]
async fn test_owner_viewing_own_profile_is_not_counted() {
    let app = spawn_app().await;
    let (owner, token) = app.seed_user("alice").await;

    let mut request = view_request("alice", "203.0.113.7", FIREFOX);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["counted"], false);
    assert_eq!(body["reason"], "self_visit");

    assert_eq!(app.state.storage.count_views(owner.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_other_signed_in_user_is_counted() {
    let app = spawn_app().await;
    let (owner, _) = app.seed_user("alice").await;
    let (_, bob_token) = app.seed_user("bob").await;

    let mut request = view_request("alice", "203.0.113.7", FIREFOX);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {bob_token}").parse().unwrap(),
    );
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["counted"], true);
    assert_eq!(app.state.storage.count_views(owner.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_invalid_token_is_treated_as_anonymous() {
    let app = spawn_app().await;
    app.seed_user("alice").await;

    let mut request = view_request("alice", "203.0.113.7", FIREFOX);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer not-a-token".parse().unwrap());
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["counted"], true);
}

#[tokio::test]
async fn test_view_without_network_metadata_is_still_counted_once() {
    let app = spawn_app().await;
    let (owner, _) = app.seed_user("alice").await;

    for expected in [true, false] {
        let request = Request::builder()
            .method("POST")
            .uri("/alice/view")
            .body(Body::empty())
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["counted"], expected);
    }
    assert_eq!(app.state.storage.count_views(owner.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_my_views_requires_authentication() {
    let app = spawn_app().await;

    let request = Request::builder()
        .uri("/user/views")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app.send(authed_request("GET", "/user/views", "garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_my_views_reports_own_count() {
    let app = spawn_app().await;
    let (_, token) = app.seed_user("alice").await;

    let (status, body) = app.send(authed_request("GET", "/user/views", &token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["views"], 0);

    for ip in ["198.51.100.1", "198.51.100.2"] {
        app.send(view_request("alice", ip, FIREFOX)).await;
    }
    // Repeat visit, same day
    app.send(view_request("alice", "198.51.100.1", FIREFOX)).await;

    let (_, body) = app.send(authed_request("GET", "/user/views", &token)).await;
    assert_eq!(body["views"], 2);
}

#[tokio::test]
async fn test_concurrent_identical_views_count_once() {
    let app = Arc::new(spawn_app().await);
    let (owner, _) = app.seed_user("alice").await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let app = Arc::clone(&app);
        handles.push(tokio::spawn(async move {
            let response = app
                .router
                .clone()
                .oneshot(view_request("alice", "203.0.113.7", FIREFOX))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            json["counted"].as_bool().unwrap()
        }));
    }

    let mut counted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            counted += 1;
        }
    }

    assert_eq!(counted, 1);
    assert_eq!(app.state.storage.count_views(owner.id).await.unwrap(), 1);
}
