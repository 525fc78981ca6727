//! Purpose: In-process fake of a JSONPlaceholder-style `/posts` service for tests.
//! Exports: `FakeService`.
//! Role: Lets gateway and CLI tests exercise real HTTP without leaving loopback.
//! Invariants: Ids 1..=100 exist; anything else answers like the public service does.
//! Invariants: Every request is recorded as "METHOD /path" in arrival order.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

/// Serving this id returns a 200 with a body that is not JSON.
pub const GARBLED_ID: u64 = 42;

type RequestLog = Arc<Mutex<Vec<String>>>;

pub struct FakeService {
    base_url: String,
    requests: RequestLog,
    _runtime: tokio::runtime::Runtime,
}

impl FakeService {
    pub fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("runtime");
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.set_nonblocking(true).expect("nonblocking");
        let addr = listener.local_addr().expect("addr");

        let requests: RequestLog = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/posts", post(create_post))
            .route(
                "/posts/:id",
                get(read_post).put(update_post).delete(delete_post),
            )
            .with_state(requests.clone());
        runtime.spawn(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("listener");
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
            _runtime: runtime,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

fn record(log: &RequestLog, entry: String) {
    log.lock()
        .unwrap_or_else(|poison| poison.into_inner())
        .push(entry);
}

fn exists(id: u64) -> bool {
    (1..=100).contains(&id)
}

async fn create_post(State(log): State<RequestLog>, Json(req): Json<Value>) -> Response {
    record(&log, "POST /posts".to_string());
    let body = json!({
        "title": req["title"],
        "body": req["body"],
        "id": 101,
    });
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn read_post(State(log): State<RequestLog>, Path(id): Path<u64>) -> Response {
    record(&log, format!("GET /posts/{id}"));
    if id == GARBLED_ID {
        return (StatusCode::OK, "<html>not json</html>").into_response();
    }
    if !exists(id) {
        return (StatusCode::NOT_FOUND, Json(json!({}))).into_response();
    }
    Json(json!({
        "userId": 1,
        "id": id,
        "title": format!("remote title {id}"),
        "body": format!("remote body {id}"),
    }))
    .into_response()
}

async fn update_post(
    State(log): State<RequestLog>,
    Path(id): Path<u64>,
    Json(req): Json<Value>,
) -> Response {
    record(&log, format!("PUT /posts/{id}"));
    if !exists(id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "TypeError").into_response();
    }
    Json(json!({
        "id": id,
        "title": req["title"],
        "body": req["body"],
        "userId": 1,
    }))
    .into_response()
}

async fn delete_post(State(log): State<RequestLog>, Path(id): Path<u64>) -> Response {
    record(&log, format!("DELETE /posts/{id}"));
    if !exists(id) {
        return (StatusCode::NOT_FOUND, Json(json!({}))).into_response();
    }
    Json(json!({})).into_response()
}
