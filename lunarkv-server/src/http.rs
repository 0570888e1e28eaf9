//! # JSON HTTP surface
//!
//! An `axum` router mirroring `original_source/src/handlers/api/
//! api_handler.cpp`'s route table (`/get/:key`, `/set`, `/delete/:key`,
//! `/mget`, `/mset`, `/keys`, `/lpush`, `/rpush`, `/lpop/:key`,
//! `/rpop/:key`, `/lrange`, `/llen/:key`) and its
//! `{status, message, data}` envelope (`createJsonResponse`).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lunarkv_common::HkvError;

use crate::server::ServerState;

#[derive(Serialize)]
struct Envelope {
    status: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

fn envelope(status: StatusCode, message: &str, data: Option<Value>) -> Response {
    let body = Envelope {
        status: status.as_u16(),
        message: message.to_string(),
        data,
    };
    (status, Json(body)).into_response()
}

fn ok(data: Option<Value>) -> Response {
    envelope(StatusCode::OK, "Success", data)
}

fn bad_request(message: &str) -> Response {
    envelope(StatusCode::BAD_REQUEST, message, None)
}

fn not_found(message: &str) -> Response {
    envelope(StatusCode::NOT_FOUND, message, None)
}

fn engine_error(err: HkvError) -> Response {
    match err {
        HkvError::WrongType => bad_request("WRONGTYPE operation against the wrong kind of entry"),
        other => envelope(StatusCode::INTERNAL_SERVER_ERROR, &other.to_string(), None),
    }
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/get/:key", get(handle_get))
        .route("/set", post(handle_set))
        .route("/delete/:key", axum::routing::delete(handle_delete))
        .route("/mget", post(handle_mget))
        .route("/mset", post(handle_mset))
        .route("/keys", get(handle_keys))
        .route("/lpush", post(handle_lpush))
        .route("/rpush", post(handle_rpush))
        .route("/lpop/:key", post(handle_lpop))
        .route("/rpop/:key", post(handle_rpop))
        .route("/lrange", get(handle_lrange))
        .route("/llen/:key", get(handle_llen))
        .with_state(state)
}

fn validate_key(key: &str) -> Option<Response> {
    if key.is_empty() {
        Some(bad_request("Key cannot be empty"))
    } else {
        None
    }
}

async fn handle_get(State(state): State<Arc<ServerState>>, Path(key): Path<String>) -> Response {
    if let Some(err) = validate_key(&key) {
        return err;
    }
    match state.shards.get(key.as_bytes()) {
        Ok(Some(value)) => ok(Some(serde_json::json!({
            "key": key,
            "value": String::from_utf8_lossy(&value),
        }))),
        Ok(None) => not_found("Key not found"),
        Err(err) => engine_error(err),
    }
}

#[derive(Deserialize)]
struct SetBody {
    key: String,
    value: String,
    #[serde(default)]
    ttl: u64,
}

async fn handle_set(State(state): State<Arc<ServerState>>, Json(body): Json<SetBody>) -> Response {
    if let Some(err) = validate_key(&body.key) {
        return err;
    }
    match state.shards.set(body.key.into_bytes(), body.value.into_bytes(), body.ttl) {
        Ok(()) => ok(None),
        Err(err) => engine_error(err),
    }
}

async fn handle_delete(State(state): State<Arc<ServerState>>, Path(key): Path<String>) -> Response {
    if let Some(err) = validate_key(&key) {
        return err;
    }
    match state.shards.del(key.as_bytes()) {
        Ok(true) => ok(None),
        Ok(false) => not_found("Key not found"),
        Err(err) => engine_error(err),
    }
}

#[derive(Deserialize)]
struct MgetBody {
    keys: Vec<String>,
}

async fn handle_mget(State(state): State<Arc<ServerState>>, Json(body): Json<MgetBody>) -> Response {
    let keys: Vec<Vec<u8>> = body.keys.iter().map(|k| k.as_bytes().to_vec()).collect();
    match state.shards.mget(&keys) {
        Ok(values) => {
            let results: Vec<Value> = body
                .keys
                .iter()
                .zip(values)
                .map(|(key, value)| {
                    serde_json::json!({
                        "key": key,
                        "value": value.map(|v| String::from_utf8_lossy(&v).to_string()),
                    })
                })
                .collect();
            ok(Some(serde_json::json!({ "results": results })))
        }
        Err(err) => engine_error(err),
    }
}

#[derive(Deserialize)]
struct KeyValue {
    key: String,
    value: String,
}

#[derive(Deserialize)]
struct MsetBody {
    pairs: Vec<KeyValue>,
}

async fn handle_mset(State(state): State<Arc<ServerState>>, Json(body): Json<MsetBody>) -> Response {
    let pairs = body
        .pairs
        .into_iter()
        .map(|kv| (kv.key.into_bytes(), kv.value.into_bytes()))
        .collect();
    match state.shards.mset(pairs) {
        Ok(()) => ok(None),
        Err(err) => engine_error(err),
    }
}

async fn handle_keys(State(state): State<Arc<ServerState>>) -> Response {
    let keys: Vec<String> = state
        .shards
        .keys()
        .into_iter()
        .map(|k| String::from_utf8_lossy(&k).to_string())
        .collect();
    ok(Some(serde_json::json!({ "keys": keys })))
}

#[derive(Deserialize)]
struct PushBody {
    key: String,
    value: String,
}

async fn handle_lpush(State(state): State<Arc<ServerState>>, Json(body): Json<PushBody>) -> Response {
    if let Some(err) = validate_key(&body.key) {
        return err;
    }
    match state.shards.lpush(body.key.into_bytes(), body.value.into_bytes()) {
        Ok(()) => ok(None),
        Err(err) => engine_error(err),
    }
}

async fn handle_rpush(State(state): State<Arc<ServerState>>, Json(body): Json<PushBody>) -> Response {
    if let Some(err) = validate_key(&body.key) {
        return err;
    }
    match state.shards.rpush(body.key.into_bytes(), body.value.into_bytes()) {
        Ok(()) => ok(None),
        Err(err) => engine_error(err),
    }
}

async fn handle_lpop(State(state): State<Arc<ServerState>>, Path(key): Path<String>) -> Response {
    if let Some(err) = validate_key(&key) {
        return err;
    }
    match state.shards.lpop(key.as_bytes()) {
        Ok(Some(value)) => ok(Some(serde_json::json!({ "value": String::from_utf8_lossy(&value) }))),
        Ok(None) => not_found("List empty or key not found"),
        Err(err) => engine_error(err),
    }
}

async fn handle_rpop(State(state): State<Arc<ServerState>>, Path(key): Path<String>) -> Response {
    if let Some(err) = validate_key(&key) {
        return err;
    }
    match state.shards.rpop(key.as_bytes()) {
        Ok(Some(value)) => ok(Some(serde_json::json!({ "value": String::from_utf8_lossy(&value) }))),
        Ok(None) => not_found("List empty or key not found"),
        Err(err) => engine_error(err),
    }
}

#[derive(Deserialize)]
struct LrangeQuery {
    key: String,
    start: i64,
    stop: i64,
}

async fn handle_lrange(
    State(state): State<Arc<ServerState>>,
    axum::extract::Query(query): axum::extract::Query<LrangeQuery>,
) -> Response {
    if let Some(err) = validate_key(&query.key) {
        return err;
    }
    match state.shards.lrange(query.key.as_bytes(), query.start, query.stop) {
        Ok(values) => {
            let values: Vec<String> = values.iter().map(|v| String::from_utf8_lossy(v).to_string()).collect();
            ok(Some(serde_json::json!({ "values": values })))
        }
        Err(err) => engine_error(err),
    }
}

async fn handle_llen(State(state): State<Arc<ServerState>>, Path(key): Path<String>) -> Response {
    if let Some(err) = validate_key(&key) {
        return err;
    }
    match state.shards.llen(key.as_bytes()) {
        Ok(length) => ok(Some(serde_json::json!({ "length": length }))),
        Err(err) => engine_error(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use lunarkv_engine::ShardManager;
    use tower::ServiceExt;

    fn state() -> Arc<ServerState> {
        ServerState::new(ShardManager::new(2, 100).unwrap(), crate::taskqueue::TaskQueue::new(1), 16)
    }

    #[tokio::test]
    async fn get_missing_key_is_404() {
        let app = router(state());
        let resp = app
            .oneshot(Request::builder().uri("/get/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let app = router(state());
        let body = serde_json::json!({"key": "foo", "value": "bar"}).to_string();
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/set")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(Request::builder().uri("/get/foo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
