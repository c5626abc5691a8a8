use std::sync::{Arc, Mutex};
use std::time::Duration;

use kitchenflow_api::app::services::AppServices;
use kitchenflow_core::OrderId;
use kitchenflow_inventory::InventoryItem;
use kitchenflow_kitchen::{Order, OrderStatus};
use kitchenflow_sync::{ApiClient, HttpOrderSource, OrderTracker, SyncConfig};
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory services, ephemeral port.
        let app = kitchenflow_api::app::build_app(AppServices::in_memory());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn place(client: &reqwest::Client, srv: &TestServer, body: Value) -> Value {
    let res = client
        .post(srv.url("/orders"))
        .json(&body)
        .send()
        .await
        .unwrap();
    if res.status() != StatusCode::CREATED {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        panic!("expected 201 Created from place, got {status} body={body}");
    }
    res.json().await.unwrap()
}

async fn transition(
    client: &reqwest::Client,
    srv: &TestServer,
    order_id: &str,
    item_id: &str,
    status: &str,
) -> reqwest::Response {
    client
        .post(srv.url(&format!("/orders/{order_id}/items/{item_id}/transition")))
        .json(&json!({ "status": status }))
        .send()
        .await
        .unwrap()
}

async fn wait_for(seen: &Mutex<Vec<OrderStatus>>, status: OrderStatus) {
    for _ in 0..200 {
        if seen.lock().unwrap().last() == Some(&status) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("tracker never reported {status}");
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn order_lifecycle_place_prepare_complete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let placed = place(
        &client,
        &srv,
        json!({ "items": [
            { "name": "Burger", "quantity": 1 },
            { "name": "Fries", "quantity": 2 }
        ]}),
    )
    .await;
    let order = &placed["order"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["order_number"], "ORD-0001");
    assert_eq!(placed["availability"]["available"], true);
    assert_eq!(placed["delay"]["minutes"], 0);

    let order_id = order["id"].as_str().unwrap().to_string();
    let burger = order["items"][0]["id"].as_str().unwrap().to_string();
    let fries = order["items"][1]["id"].as_str().unwrap().to_string();

    let res = transition(&client, &srv, &order_id, &burger, "preparing").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "preparing");

    for item in [&burger, &fries] {
        if item == &fries {
            let res = transition(&client, &srv, &order_id, item, "preparing").await;
            assert_eq!(res.status(), StatusCode::OK);
        }
        let res = transition(&client, &srv, &order_id, item, "ready").await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client
        .get(srv.url(&format!("/orders/{order_id}/tracking")))
        .send()
        .await
        .unwrap();
    let tracking: Value = res.json().await.unwrap();
    assert_eq!(tracking["status"], "ready");
    assert_eq!(tracking["progress"], 90);
    assert_eq!(tracking["estimated_wait"], "Ready now!");

    let res = client
        .post(srv.url(&format!("/orders/{order_id}/complete")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "completed");
    assert!(body["completed_at"].is_string());

    // Completed orders leave the active queue.
    let res = client.get(srv.url("/orders")).send().await.unwrap();
    let queue: Vec<Value> = res.json().await.unwrap();
    assert!(queue.is_empty());
}

#[tokio::test]
async fn rule_violations_map_to_distinct_statuses() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Empty order: validation.
    let res = client
        .post(srv.url("/orders"))
        .json(&json!({ "items": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let placed = place(
        &client,
        &srv,
        json!({ "items": [{ "name": "Soup", "quantity": 1 }] }),
    )
    .await;
    let order_id = placed["order"]["id"].as_str().unwrap().to_string();
    let item_id = placed["order"]["items"][0]["id"].as_str().unwrap().to_string();

    // Skipping a stage: illegal transition.
    let res = transition(&client, &srv, &order_id, &item_id, "ready").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "illegal_transition");

    // Completing with an unfinished item: precondition.
    let res = client
        .post(srv.url(&format!("/orders/{order_id}/complete")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "precondition_failed");
    assert!(body["message"].as_str().unwrap().contains("Soup"));

    // The failed calls changed nothing.
    let res = client
        .get(srv.url(&format!("/orders/{order_id}")))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "pending");
    assert_eq!(body["items"][0]["status"], "pending");

    // Unknown and malformed ids.
    let res = client
        .get(srv.url(&format!("/orders/{}", OrderId::new())))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(srv.url("/orders/not-a-uuid")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_is_only_allowed_before_preparation() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let placed = place(
        &client,
        &srv,
        json!({ "items": [{ "name": "Salad", "quantity": 1 }] }),
    )
    .await;
    let order_id = placed["order"]["id"].as_str().unwrap().to_string();
    let item_id = placed["order"]["items"][0]["id"].as_str().unwrap().to_string();

    let res = transition(&client, &srv, &order_id, &item_id, "preparing").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url(&format!("/orders/{order_id}/cancel")))
        .json(&json!({ "reason": "customer left" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let second = place(
        &client,
        &srv,
        json!({ "items": [{ "name": "Salad", "quantity": 1 }] }),
    )
    .await;
    let second_id = second["order"]["id"].as_str().unwrap().to_string();
    assert_eq!(second["order"]["order_number"], "ORD-0002");

    // No body at all is fine.
    let res = client
        .post(srv.url(&format!("/orders/{second_id}/cancel")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "cancelled");
}

#[tokio::test]
async fn inventory_alerts_drive_availability_and_acknowledgement() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let rice = InventoryItem::new("Rice", 0.0, 20.0).with_unit("kg");
    let fries = InventoryItem::new("Fries", 5.0, 20.0);
    let res = client
        .put(srv.url("/inventory/items"))
        .json(&vec![rice, fries])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/alerts")).send().await.unwrap();
    let alerts: Vec<Value> = res.json().await.unwrap();
    assert_eq!(alerts.len(), 2);
    // Most severe first.
    assert_eq!(alerts[0]["type"], "out_of_stock");
    assert_eq!(alerts[0]["item_name"], "Rice");

    let res = client
        .post(srv.url("/availability/check"))
        .json(&json!({ "items": [{ "name": "Rice", "quantity": 1 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["availability"]["available"], false);
    assert_eq!(body["availability"]["unavailable_items"], json!(["Rice"]));
    assert_eq!(body["delay"]["has_delay"], true);
    assert_eq!(body["delay"]["minutes"], 15);

    // Placement still goes through; the report travels with it.
    let placed = place(
        &client,
        &srv,
        json!({ "items": [{ "name": "Rice", "quantity": 1 }] }),
    )
    .await;
    assert_eq!(placed["availability"]["available"], false);
    assert_eq!(placed["delay"]["minutes"], 15);

    let alert_id = alerts[0]["id"].as_str().unwrap().to_string();
    let res = client
        .post(srv.url(&format!("/alerts/{alert_id}/acknowledge")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client.get(srv.url("/alerts")).send().await.unwrap();
    let alerts: Vec<Value> = res.json().await.unwrap();
    let rice_alert = alerts.iter().find(|a| a["id"] == alert_id.as_str()).unwrap();
    assert_eq!(rice_alert["acknowledged"], true);

    let res = client
        .post(srv.url("/alerts/low_stock-nothing/acknowledge"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn remote_tracker_follows_order_over_http() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let placed = place(
        &client,
        &srv,
        json!({ "items": [{ "name": "Ramen", "quantity": 1 }] }),
    )
    .await;
    let order_id: OrderId = placed["order"]["id"].as_str().unwrap().parse().unwrap();
    let item_id = placed["order"]["items"][0]["id"].as_str().unwrap().to_string();

    let api = ApiClient::new(srv.base_url.clone());
    assert!(api.check_connectivity().await);

    let config = SyncConfig::orders().with_poll_interval(Duration::from_millis(50));
    let tracker = OrderTracker::with_config(HttpOrderSource::new(api), config);

    let seen: Arc<Mutex<Vec<OrderStatus>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = tracker.subscribe_to_order(order_id, move |o: &Order| {
        sink.lock().unwrap().push(o.status());
    });

    wait_for(&seen, OrderStatus::Pending).await;
    let res = transition(&client, &srv, &order_id.to_string(), &item_id, "preparing").await;
    assert_eq!(res.status(), StatusCode::OK);

    wait_for(&seen, OrderStatus::Preparing).await;

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, vec![OrderStatus::Pending, OrderStatus::Preparing]);
}

#[tokio::test]
async fn activity_log_records_board_events() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let placed = place(
        &client,
        &srv,
        json!({ "items": [{ "name": "Curry", "quantity": 1 }] }),
    )
    .await;
    let order_id = placed["order"]["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url(&format!("/orders/{order_id}/confirm")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/orders/activity?limit=1"))
        .send()
        .await
        .unwrap();
    let recent: Vec<Value> = res.json().await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0]["event_type"], "kitchen.order.confirmed");

    let res = client
        .get(srv.url(&format!("/orders/{order_id}/activity")))
        .send()
        .await
        .unwrap();
    let log: Vec<Value> = res.json().await.unwrap();
    let types: Vec<&str> = log.iter().map(|e| e["event_type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["kitchen.order.placed", "kitchen.order.confirmed"]);

    let res = client
        .get(srv.url(&format!("/orders/{}/activity", OrderId::new())))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
