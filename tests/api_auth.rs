mod common;

use common::{get, post, register_and_login, spawn_app};
use serde_json::json;

#[tokio::test]
async fn health_check_answers_ok() {
    let addr = spawn_app().await;
    let res = get(addr, "/health", None).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body, "OK");
}

#[tokio::test]
async fn register_login_and_fetch_profile() {
    let addr = spawn_app().await;
    let (id, token) = register_and_login(addr, "ada", "buyer", Some((6.5244, 3.3792))).await;

    let res = get(addr, "/api/auth/user", Some(&token)).await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert_eq!(body["id"].as_i64(), Some(id));
    assert_eq!(body["username"], "ada");
    assert_eq!(body["role"], "buyer");
    assert_eq!(body["lat"].as_f64(), Some(6.5244));
    assert!(body.get("passwordHash").is_none());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn login_response_carries_bearer_token_type_and_ttl() {
    let addr = spawn_app().await;
    register_and_login(addr, "tolu", "seller", None).await;

    let res = post(addr, "/api/auth/login", None, json!({ "username": "tolu", "password": "secret123" })).await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert_eq!(body["tokenType"], "Bearer");
    assert_eq!(body["expiresInSeconds"].as_u64(), Some(3600));
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let addr = spawn_app().await;
    register_and_login(addr, "dup", "buyer", None).await;

    let res = post(
        addr,
        "/api/auth/register",
        None,
        json!({ "username": "dup", "password": "another1" }),
    )
    .await;
    assert_eq!(res.status, 409, "{}", res.body);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_unauthorized() {
    let addr = spawn_app().await;
    register_and_login(addr, "kemi", "buyer", None).await;

    let res = post(addr, "/api/auth/login", None, json!({ "username": "kemi", "password": "wrongpass" })).await;
    assert_eq!(res.status, 401);

    let res = post(addr, "/api/auth/login", None, json!({ "username": "ghost", "password": "secret123" })).await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn register_rejects_short_password_and_half_coordinates() {
    let addr = spawn_app().await;

    let res = post(addr, "/api/auth/register", None, json!({ "username": "x", "password": "123" })).await;
    assert_eq!(res.status, 400);
    assert_eq!(res.json()["fields"][0]["field"], "password");

    let res = post(
        addr,
        "/api/auth/register",
        None,
        json!({ "username": "y", "password": "secret123", "lat": 6.5 }),
    )
    .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn register_rejects_unknown_role() {
    let addr = spawn_app().await;
    let res = post(
        addr,
        "/api/auth/register",
        None,
        json!({ "username": "z", "password": "secret123", "role": "admin" }),
    )
    .await;
    assert_eq!(res.status, 400);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let addr = spawn_app().await;

    let res = get(addr, "/api/auth/user", None).await;
    assert_eq!(res.status, 401);

    let res = get(addr, "/api/auth/user", Some("not-a-jwt")).await;
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn role_update_changes_role_and_location() {
    let addr = spawn_app().await;
    let (_, token) = register_and_login(addr, "femi", "buyer", None).await;

    let res = post(
        addr,
        "/api/auth/role",
        Some(&token),
        json!({ "role": "wholesaler", "city": "Ibadan", "lat": 7.3775, "lng": 3.947 }),
    )
    .await;
    assert_eq!(res.status, 200, "{}", res.body);
    let body = res.json();
    assert_eq!(body["role"], "wholesaler");
    assert_eq!(body["city"], "Ibadan");
    assert_eq!(body["lng"].as_f64(), Some(3.947));

    let res = post(addr, "/api/auth/role", Some(&token), json!({ "role": "overlord" })).await;
    assert_eq!(res.status, 400);
}
