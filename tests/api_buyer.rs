mod common;

use common::{create_product, get, post, register_and_login, send_raw, spawn_app};
use serde_json::json;

#[tokio::test]
async fn save_list_and_unsave() {
    let addr = spawn_app().await;
    let (_, seller) = register_and_login(addr, "seller", "seller", None).await;
    let (buyer_id, buyer) = register_and_login(addr, "buyer", "buyer", None).await;
    let rice = create_product(addr, &seller, json!({ "name": "Rice", "retailPrice": 1.0 })).await;
    let oil = create_product(addr, &seller, json!({ "name": "Oil", "retailPrice": 2.0 })).await;

    let res = post(addr, &format!("/api/buyer/save/{rice}"), Some(&buyer), json!({})).await;
    assert_eq!(res.status, 200, "{}", res.body);
    let action = res.json();
    assert_eq!(action["buyerId"].as_i64(), Some(buyer_id));
    assert_eq!(action["saved"], true);
    assert_eq!(action["viewed"], true);

    post(addr, &format!("/api/buyer/save/{oil}"), Some(&buyer), json!({})).await;

    let saved = get(addr, "/api/buyer/saved", Some(&buyer)).await.json();
    let ids: Vec<i64> = saved.as_array().expect("array").iter().map(|p| p["id"].as_i64().expect("id")).collect();
    assert_eq!(ids, vec![oil, rice]);

    let res = send_raw(addr, "DELETE", &format!("/api/buyer/save/{rice}"), Some(&buyer), None).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.json()["success"], true);

    let saved = get(addr, "/api/buyer/saved", Some(&buyer)).await.json();
    assert_eq!(saved.as_array().expect("array").len(), 1);
    assert_eq!(saved[0]["id"].as_i64(), Some(oil));
}

#[tokio::test]
async fn viewing_keeps_saved_flag_and_counts_for_the_seller() {
    let addr = spawn_app().await;
    let (_, seller) = register_and_login(addr, "seller", "seller", None).await;
    let (_, first) = register_and_login(addr, "first", "buyer", None).await;
    let (_, second) = register_and_login(addr, "second", "buyer", None).await;
    let id = create_product(addr, &seller, json!({ "name": "Rice", "retailPrice": 1.0 })).await;

    post(addr, &format!("/api/buyer/save/{id}"), Some(&first), json!({})).await;
    let res = post(addr, &format!("/api/buyer/view/{id}"), Some(&first), json!({})).await;
    assert_eq!(res.status, 200);
    let res = post(addr, &format!("/api/buyer/view/{id}"), Some(&second), json!({})).await;
    assert_eq!(res.status, 200);

    let saved = get(addr, "/api/buyer/saved", Some(&first)).await.json();
    assert_eq!(saved.as_array().expect("array").len(), 1);
    let saved = get(addr, "/api/buyer/saved", Some(&second)).await.json();
    assert!(saved.as_array().expect("array").is_empty());

    let mine = get(addr, "/api/products/seller", Some(&seller)).await.json();
    assert_eq!(mine[0]["views"].as_i64(), Some(2));
}

#[tokio::test]
async fn actions_on_missing_products_are_not_found() {
    let addr = spawn_app().await;
    let (_, buyer) = register_and_login(addr, "buyer", "buyer", None).await;

    let res = post(addr, "/api/buyer/save/424242", Some(&buyer), json!({})).await;
    assert_eq!(res.status, 404);
    let res = post(addr, "/api/buyer/view/424242", Some(&buyer), json!({})).await;
    assert_eq!(res.status, 404);
}

#[tokio::test]
async fn buyer_routes_require_authentication() {
    let addr = spawn_app().await;
    assert_eq!(get(addr, "/api/buyer/saved", None).await.status, 401);
}

#[tokio::test]
async fn deleting_a_product_drops_it_from_saved_lists() {
    let addr = spawn_app().await;
    let (_, seller) = register_and_login(addr, "seller", "seller", None).await;
    let (_, buyer) = register_and_login(addr, "buyer", "buyer", None).await;
    let id = create_product(addr, &seller, json!({ "name": "Rice", "retailPrice": 1.0 })).await;

    post(addr, &format!("/api/buyer/save/{id}"), Some(&buyer), json!({})).await;
    send_raw(addr, "DELETE", &format!("/api/products/{id}"), Some(&seller), None).await;

    let saved = get(addr, "/api/buyer/saved", Some(&buyer)).await.json();
    assert!(saved.as_array().expect("array").is_empty());
}
