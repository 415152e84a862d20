#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use marketplace_backend::{config::Config, routes::build_app, state::AppState, store::MemoryStore};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        host: "127.0.0.1".parse().expect("host"),
        port: 0,
        jwt_secret: "test-secret".to_string(),
        token_ttl_hours: 1,
        bcrypt_cost: 4,
        db_max_connections: 1,
        run_migrations: false,
    }
}

/// Serves the full router over an in-memory store on an ephemeral port.
pub async fn spawn_app() -> SocketAddr {
    let state = AppState::new(Arc::new(MemoryStore::new()), test_config());
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

pub struct TestResponse {
    pub status: u16,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("json body")
    }
}

pub async fn send_raw(
    addr: SocketAddr,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<&Value>,
) -> TestResponse {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");

    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    if let Some(token) = token {
        req.push_str(&format!("Authorization: Bearer {token}\r\n"));
    }
    let payload = body.map(Value::to_string).unwrap_or_default();
    if body.is_some() {
        req.push_str("Content-Type: application/json\r\n");
    }
    req.push_str(&format!("Content-Length: {}\r\n\r\n{payload}", payload.len()));

    stream.write_all(req.as_bytes()).await.expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");

    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("status");
    TestResponse { status, body: body.to_string() }
}

pub async fn get(addr: SocketAddr, path: &str, token: Option<&str>) -> TestResponse {
    send_raw(addr, "GET", path, token, None).await
}

pub async fn post(addr: SocketAddr, path: &str, token: Option<&str>, body: Value) -> TestResponse {
    send_raw(addr, "POST", path, token, Some(&body)).await
}

/// Registers `username` with the given role and location, then logs in.
/// Returns the user id and bearer token.
pub async fn register_and_login(
    addr: SocketAddr,
    username: &str,
    role: &str,
    location: Option<(f64, f64)>,
) -> (i64, String) {
    let mut body = json!({ "username": username, "password": "secret123", "role": role });
    if let Some((lat, lng)) = location {
        body["lat"] = json!(lat);
        body["lng"] = json!(lng);
    }
    let res = post(addr, "/api/auth/register", None, body).await;
    assert_eq!(res.status, 201, "register {username}: {}", res.body);
    let id = res.json()["id"].as_i64().expect("user id");

    let res = post(
        addr,
        "/api/auth/login",
        None,
        json!({ "username": username, "password": "secret123" }),
    )
    .await;
    assert_eq!(res.status, 200, "login {username}: {}", res.body);
    let token = res.json()["accessToken"].as_str().expect("token").to_string();
    (id, token)
}

/// Creates a product as the holder of `token` and returns its id.
pub async fn create_product(addr: SocketAddr, token: &str, body: Value) -> i64 {
    let res = post(addr, "/api/products", Some(token), body).await;
    assert_eq!(res.status, 201, "create product: {}", res.body);
    res.json()["id"].as_i64().expect("product id")
}
