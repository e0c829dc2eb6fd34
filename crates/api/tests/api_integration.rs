//! API integration tests.
//!
//! These tests drive the API router against a migrated in-memory SQLite
//! database.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    middleware,
};
use postboard_api::{AppState, auth_middleware, router as api_router};
use postboard_common::{LocalStorage, config::SiteConfig};
use postboard_db::{
    entities::user,
    test_utils::{insert_group, insert_post, insert_user, at, sqlite_memory},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    db: Arc<DatabaseConnection>,
}

async fn create_test_app() -> TestApp {
    let db = Arc::new(sqlite_memory().await.unwrap());
    let storage = Arc::new(LocalStorage::new(
        std::env::temp_dir().join("postboard-api-tests"),
        "/media/".to_string(),
    ));
    let state = AppState::new(db.clone(), SiteConfig::default(), storage);

    let router = api_router()
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state);

    TestApp { router, db }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method(method)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_follow_self_is_400() {
    let app = create_test_app().await;
    insert_user(app.db.as_ref(), "leo").await.unwrap();

    let (status, body) = send(
        &app,
        send_json("POST", "/follow/", Some("token-leo"), &json!({"following": "leo"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("cannot follow yourself"));
}

#[tokio::test]
async fn test_follow_duplicate_is_400() {
    let app = create_test_app().await;
    insert_user(app.db.as_ref(), "leo").await.unwrap();
    insert_user(app.db.as_ref(), "anna").await.unwrap();
    let request = || send_json("POST", "/follow/", Some("token-leo"), &json!({"following": "anna"}));

    let (status, body) = send(&app, request()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"], "leo");
    assert_eq!(body["data"]["following"], "anna");

    let (status, body) = send(&app, request()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("already following"));
}

#[tokio::test]
async fn test_follow_list_requires_auth_and_searches() {
    let app = create_test_app().await;
    insert_user(app.db.as_ref(), "leo").await.unwrap();
    insert_user(app.db.as_ref(), "anna").await.unwrap();
    insert_user(app.db.as_ref(), "ivan").await.unwrap();

    let (status, _) = send(&app, get("/follow/", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for name in ["anna", "ivan"] {
        send(
            &app,
            send_json("POST", "/follow/", Some("token-leo"), &json!({"following": name})),
        )
        .await;
    }

    let (status, body) = send(&app, get("/follow/?search=AN", Some("token-leo"))).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["following"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["anna", "ivan"]);

    let (_, body) = send(&app, get("/follow/?search=iv", Some("token-leo"))).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_post_crud_and_author_only_edits() {
    let app = create_test_app().await;
    insert_user(app.db.as_ref(), "leo").await.unwrap();
    insert_user(app.db.as_ref(), "anna").await.unwrap();
    let group = insert_group(app.db.as_ref(), "novels").await.unwrap();

    let (status, _) = send(
        &app,
        send_json("POST", "/posts/", None, &json!({"text": "anonymous"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        send_json(
            "POST",
            "/posts/",
            Some("token-leo"),
            &json!({"text": "Anna Karenina", "group": group.id, "author": "anna"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["author"], "leo");
    assert_eq!(body["data"]["group"], group.id);
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        send_json("PUT", &format!("/posts/{id}/"), Some("token-anna"), &json!({"text": "mine now"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        send_json("PUT", &format!("/posts/{id}/"), Some("token-leo"), &json!({"text": "Resurrection"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["text"], "Resurrection");
    assert_eq!(body["data"]["group"], Value::Null);

    let request = Request::builder()
        .uri(format!("/posts/{id}/"))
        .method("DELETE")
        .header(header::AUTHORIZATION, "Bearer token-leo")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, get(&format!("/posts/{id}/"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "POST_NOT_FOUND");
}

#[tokio::test]
async fn test_post_list_is_paginated() {
    let app = create_test_app().await;
    let leo = insert_user(app.db.as_ref(), "leo").await.unwrap();
    for i in 0..15 {
        insert_post(app.db.as_ref(), leo.id, None, &format!("post {i}"), at(i))
            .await
            .unwrap();
    }

    let (_, body) = send(&app, get("/posts/", None)).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 10);
    assert_eq!(body["data"]["items"][0]["text"], "post 14");
    assert_eq!(body["data"]["num_pages"], 2);

    let (_, body) = send(&app, get("/posts/?page=2", None)).await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 5);
    assert_eq!(body["data"]["number"], 2);
}

#[tokio::test]
async fn test_comments_are_server_assigned() {
    let app = create_test_app().await;
    let leo = insert_user(app.db.as_ref(), "leo").await.unwrap();
    insert_user(app.db.as_ref(), "anna").await.unwrap();
    let post = insert_post(app.db.as_ref(), leo.id, None, "hello", at(0)).await.unwrap();

    let (status, body) = send(
        &app,
        send_json(
            "POST",
            &format!("/posts/{}/comments/", post.id),
            Some("token-anna"),
            &json!({"text": "nice", "post": 999, "author": "leo"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["post"], post.id);
    assert_eq!(body["data"]["author"], "anna");
    let comment_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        send_json(
            "PUT",
            &format!("/posts/{}/comments/{comment_id}/", post.id),
            Some("token-leo"),
            &json!({"text": "edited"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, get(&format!("/posts/{}/comments/", post.id), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, get("/posts/999/comments/", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_group_writes_are_staff_only() {
    let app = create_test_app().await;
    let admin = insert_user(app.db.as_ref(), "admin").await.unwrap();
    insert_user(app.db.as_ref(), "leo").await.unwrap();
    let mut active: user::ActiveModel = admin.into();
    active.is_staff = Set(true);
    active.update(app.db.as_ref()).await.unwrap();

    let body = json!({"title": "Novels", "slug": "novels", "description": "Long books"});

    let (status, _) = send(&app, send_json("POST", "/groups/", Some("token-leo"), &body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(&app, send_json("POST", "/groups/", Some("token-admin"), &body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["slug"], "novels");

    let (status, _) = send(&app, send_json("POST", "/groups/", Some("token-admin"), &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_slug = json!({"title": "Bad", "slug": "not a slug", "description": ""});
    let (status, _) = send(&app, send_json("POST", "/groups/", Some("token-admin"), &bad_slug)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = send(&app, get("/groups/", None)).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_signup_then_token() {
    let app = create_test_app().await;

    let (status, body) = send(
        &app,
        send_json(
            "POST",
            "/auth/signup/",
            None,
            &json!({"username": "leo", "password": "yasnaya polyana"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["username"], "leo");
    assert!(body["data"].get("password_hash").is_none());

    let (status, _) = send(
        &app,
        send_json("POST", "/auth/token/", None, &json!({"username": "leo", "password": "wrong password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        send_json("POST", "/auth/token/", None, &json!({"username": "leo", "password": "yasnaya polyana"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get("/users/me/", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "leo");
}

#[tokio::test]
async fn test_unknown_user_is_404() {
    let app = create_test_app().await;

    let (status, body) = send(&app, get("/users/ghost/", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let app = create_test_app().await;
    insert_user(app.db.as_ref(), "leo").await.unwrap();

    let request = Request::builder()
        .uri("/users/me/")
        .header(header::COOKIE, "sessionid=token-leo")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "leo");
}
