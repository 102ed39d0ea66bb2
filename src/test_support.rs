//! Local HTTP stand-ins for the marketplace API and the webhook.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

/// Binds `app` to an ephemeral loopback port and returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// What the fake marketplace saw on each request.
#[derive(Clone, Default)]
pub struct SeenRequests {
    pub queries: Arc<Mutex<Vec<Vec<(String, String)>>>>,
    pub api_keys: Arc<Mutex<Vec<Option<String>>>>,
}

#[derive(Clone)]
struct MarketState {
    events: Value,
    status: StatusCode,
    seen: SeenRequests,
}

/// Serves `GET /events` returning `{"asset_events": events}` with `status`.
pub async fn marketplace(events: Value, status: StatusCode) -> (String, SeenRequests) {
    let seen = SeenRequests::default();
    let state = MarketState {
        events,
        status,
        seen: seen.clone(),
    };
    let app = Router::new()
        .route("/events", get(events_handler))
        .with_state(state);
    (serve(app).await, seen)
}

async fn events_handler(
    State(state): State<MarketState>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> (StatusCode, Json<Value>) {
    state.seen.queries.lock().unwrap().push(query);
    state.seen.api_keys.lock().unwrap().push(
        headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    (state.status, Json(json!({ "asset_events": state.events })))
}

#[derive(Clone)]
struct HookState {
    bodies: Arc<Mutex<Vec<Value>>>,
    status: StatusCode,
}

/// Serves `POST /hook`, recording each JSON body. Returns the full hook URL.
pub async fn webhook(status: StatusCode) -> (String, Arc<Mutex<Vec<Value>>>) {
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let state = HookState {
        bodies: Arc::clone(&bodies),
        status,
    };
    let app = Router::new().route("/hook", post(hook_handler)).with_state(state);
    (format!("{}/hook", serve(app).await), bodies)
}

async fn hook_handler(State(state): State<HookState>, Json(body): Json<Value>) -> StatusCode {
    state.bodies.lock().unwrap().push(body);
    state.status
}

/// A sale event in the shape `/events` returns it.
pub fn raw_event(id: i64) -> Value {
    json!({
        "id": id,
        "quantity": "1",
        "seller": {"user": {"username": "alice"}, "address": "0x1111111111111111111111111111111111111111"},
        "winner_account": {"user": null, "address": "0x1234567890abcdef1234567890abcdef12345678"},
        "asset": {
            "id": 1000 + id,
            "token_id": id.to_string(),
            "name": format!("Cat #{id}"),
            "image_url": "https://img/cat.png",
            "permalink": format!("https://opensea.io/assets/0xabc/{id}"),
            "collection": {"name": "Cats", "image_url": "https://img/cats.png"}
        },
        "total_price": "1500000000000000000",
        "payment_token": {"symbol": "ETH", "decimals": 18, "usd_price": "2000.0"}
    })
}
