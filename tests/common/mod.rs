//! Shared fixtures: upstream payloads and a local upstream server.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router};
use serde_json::{json, Value};

use market_sync::domain::series::{decode, MarketSeriesResponse};
use market_sync::shared::SeriesKind;

pub fn ok_status() -> Value {
    json!({
        "timestamp": "2023-11-14T22:13:20.000Z",
        "error_code": "0",
        "error_message": "SUCCESS",
        "elapsed": "7",
        "credit_count": 0
    })
}

/// Upstream altcoin season body with a single point at `index`.
pub fn altcoin_season_body(index: &str) -> Value {
    json!({
        "data": {
            "points": [{
                "name": "p1",
                "altcoinIndex": index,
                "altcoinMarketcap": "1000",
                "timestamp": "1700000000"
            }],
            "historicalValues": {
                "now": {
                    "name": "now",
                    "altcoinIndex": index,
                    "altcoinMarketcap": "1000",
                    "timestamp": "1700000000"
                }
            },
            "dialConfigs": [
                {"start": 0, "end": 25, "name": "btc"},
                {"start": 25, "end": 75, "name": "neutral"},
                {"start": 75, "end": 100, "name": "alt"}
            ]
        },
        "status": ok_status()
    })
}

pub fn dominance_body() -> Value {
    json!({
        "data": {
            "points": [
                {"dominance": [52.1, 17.3, 30.6], "timestamp": "1700000000"},
                {"dominance": [52.4, 17.0, 30.6], "timestamp": "1700086400"}
            ]
        },
        "status": {"error_code": "0", "error_message": "SUCCESS"}
    })
}

pub fn altcoin_season_response(index: &str) -> Arc<MarketSeriesResponse> {
    Arc::new(decode(SeriesKind::AltcoinSeason, altcoin_season_body(index)).unwrap())
}

// ─── Local upstream ──────────────────────────────────────────────────────────

#[derive(Clone)]
struct MockState {
    hits: Arc<AtomicUsize>,
    reply: Arc<Mutex<(StatusCode, Value)>>,
}

/// A local stand-in for the upstream API. Every path answers with the
/// configured reply and counts the hit.
pub struct MockUpstream {
    pub url: String,
    hits: Arc<AtomicUsize>,
    reply: Arc<Mutex<(StatusCode, Value)>>,
}

impl MockUpstream {
    pub async fn start(status: StatusCode, body: Value) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let reply = Arc::new(Mutex::new((status, body)));
        let state = MockState {
            hits: hits.clone(),
            reply: reply.clone(),
        };
        let app = Router::new().fallback(respond).with_state(state);
        let url = serve(app).await;
        Self { url, hits, reply }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn set_reply(&self, status: StatusCode, body: Value) {
        *self.reply.lock().unwrap() = (status, body);
    }
}

async fn respond(State(state): State<MockState>) -> (StatusCode, Json<Value>) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let (status, body) = state.reply.lock().unwrap().clone();
    (status, Json(body))
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
