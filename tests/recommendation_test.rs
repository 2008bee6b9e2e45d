mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::{json, Value};

fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_i64().unwrap())
        .collect()
}

async fn sign_up(app: &TestApp, token: &str, event: &Value) {
    let (status, body) = app
        .call(
            "POST",
            "/api/registrations",
            Some(token),
            Some(json!({ "event_id": event["id"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
}

#[tokio::test]
async fn newcomer_gets_popular_events() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let fan1 = app.register("f1@campus.edu", "Fan One").await;
    let fan2 = app.register("f2@campus.edu", "Fan Two").await;
    let newcomer = app.register("new@campus.edu", "New").await;

    let empty = app.create_event(&admin, "talks", 10, json!({})).await;
    let busy = app.create_event(&admin, "music", 50, json!({})).await;
    let tied_late = app.create_event(&admin, "art", 40, json!({})).await;
    let tied_early = app.create_event(&admin, "games", 30, json!({})).await;
    sign_up(&app, &fan1, &busy).await;
    sign_up(&app, &fan2, &busy).await;
    sign_up(&app, &fan1, &tied_late).await;
    sign_up(&app, &fan2, &tied_early).await;

    let (status, list) = app
        .call("GET", "/api/recommendations/events?limit=10", Some(&newcomer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ids(&list),
        vec![
            busy["id"].as_i64().unwrap(),
            tied_early["id"].as_i64().unwrap(),
            tied_late["id"].as_i64().unwrap(),
            empty["id"].as_i64().unwrap(),
        ]
    );
}

#[tokio::test]
async fn history_drives_recommendations_then_backfills() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let athlete = app.register("run@campus.edu", "Runner").await;
    let other = app.register("other@campus.edu", "Other").await;

    let last_week = app.create_event(&admin, "sports", -24 * 7, json!({})).await;
    sign_up(&app, &athlete, &last_week).await;

    let sports_a = app.create_event(&admin, "sports", 5, json!({})).await;
    let sports_b = app.create_event(&admin, "sports", 20, json!({})).await;
    let music = app.create_event(&admin, "music", 8, json!({})).await;
    let art = app.create_event(&admin, "art", 9, json!({})).await;
    sign_up(&app, &other, &art).await;

    let (status, list) = app
        .call("GET", "/api/recommendations/events?limit=3", Some(&athlete), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let got = ids(&list);
    assert_eq!(
        got,
        vec![
            sports_a["id"].as_i64().unwrap(),
            sports_b["id"].as_i64().unwrap(),
            art["id"].as_i64().unwrap(),
        ]
    );
    assert!(!got.contains(&music["id"].as_i64().unwrap()));
    assert!(!got.contains(&last_week["id"].as_i64().unwrap()));
}

#[tokio::test]
async fn zero_limit_returns_nothing() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let user = app.register("z@campus.edu", "Zed").await;
    app.create_event(&admin, "talks", 10, json!({})).await;

    let (status, list) = app
        .call("GET", "/api/recommendations/events?limit=0", Some(&user), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn recommendations_require_login_but_similar_is_public() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let base = app.create_event(&admin, "music", 10, json!({})).await;
    let next = app.create_event(&admin, "music", 20, json!({})).await;
    app.create_event(&admin, "art", 15, json!({})).await;

    let (status, _) = app.call("GET", "/api/recommendations/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, list) = app
        .call(
            "GET",
            &format!("/api/recommendations/similar-events/{}", base["id"]),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&list), vec![next["id"].as_i64().unwrap()]);

    let (status, _) = app
        .call("GET", "/api/recommendations/similar-events/9999", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
