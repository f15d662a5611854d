//! API Routes

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::models::{CreatedResponse, HistoryResponse, LatestCountResponse};
use crate::state::AppState;
use crate::vehicle_log_service::DEFAULT_HISTORY_LIMIT;

const INVALID_BODY: &str = "Invalid body. Expecting numeric camera_id and count.";

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(super::health_check))
        .route("/vehicle-count", get(get_vehicle_count).post(create_vehicle_count))
        .route("/history", get(get_history).delete(clear_history))
        .with_state(state)
}

/// POST /vehicle-count
async fn create_vehicle_count(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Rejected vehicle count body");
        Error::Validation(INVALID_BODY.to_string())
    })?;

    let (camera_id, count) = match (
        body.get("camera_id").and_then(Value::as_i64),
        body.get("count").and_then(Value::as_i64),
    ) {
        (Some(camera_id), Some(count)) => (camera_id, count),
        _ => return Err(Error::Validation(INVALID_BODY.to_string())),
    };

    let entry = state.vehicle_logs.insert(camera_id, count).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            success: true,
            id: entry.id,
        }),
    ))
}

/// GET /vehicle-count
async fn get_vehicle_count(State(state): State<AppState>) -> Result<Json<LatestCountResponse>> {
    let latest = state.vehicle_logs.latest().await?;
    Ok(Json(latest.into()))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<String>,
}

/// Positive integer limit, or the default
fn history_limit(raw: Option<&str>) -> u32 {
    raw.and_then(leading_integer)
        .filter(|&n| n > 0)
        .map(|n| n.min(u32::MAX as i64) as u32)
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
}

/// Integer prefix of `raw` ("10abc" -> 10, "5.9" -> 5); None without leading digits
fn leading_integer(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }

    let value = rest[..digits]
        .bytes()
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add((d - b'0') as i64));
    Some(if negative { -value } else { value })
}

/// GET /history?limit=N
async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    let limit = history_limit(query.limit.as_deref());
    let history = state.vehicle_logs.history(limit).await?;
    Ok(Json(HistoryResponse { history }))
}

/// DELETE /history
async fn clear_history(State(state): State<AppState>) -> Result<Json<Value>> {
    let deleted = state.vehicle_logs.clear_all().await?;
    Ok(Json(json!({
        "success": true,
        "deleted": deleted,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppConfig;
    use crate::vehicle_log_service::VehicleLogService;
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::net::TcpListener;

    async fn spawn_app() -> (String, Arc<VehicleLogService>) {
        let store = Arc::new(VehicleLogService::in_memory().await);
        let state = AppState {
            config: AppConfig::default(),
            vehicle_logs: store.clone(),
            polling: None,
            started_at: Instant::now(),
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, create_router(state)).await.unwrap();
        });

        (format!("http://{}", addr), store)
    }

    #[test]
    fn test_history_limit_parsing() {
        assert_eq!(history_limit(None), 50);
        assert_eq!(history_limit(Some("10")), 10);
        assert_eq!(history_limit(Some("0")), 50);
        assert_eq!(history_limit(Some("-3")), 50);
        assert_eq!(history_limit(Some("abc")), 50);
    }

    #[test]
    fn test_history_limit_uses_leading_digits() {
        assert_eq!(history_limit(Some("10abc")), 10);
        assert_eq!(history_limit(Some("5.9")), 5);
        assert_eq!(history_limit(Some("  7")), 7);
        assert_eq!(history_limit(Some("+3")), 3);
        assert_eq!(history_limit(Some("-4x")), 50);
        assert_eq!(history_limit(Some("0.5")), 50);
        assert_eq!(history_limit(Some("")), 50);
        assert_eq!(history_limit(Some("99999999999999999999999")), u32::MAX);
    }

    #[tokio::test]
    async fn test_health() {
        let (base, _store) = spawn_app().await;
        let body: Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["status"], "ok");
        assert_eq!(body["db_connected"], true);
        assert!(body["poller"].is_null());
    }

    #[tokio::test]
    async fn test_post_then_get_latest() {
        let (base, _store) = spawn_app().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/vehicle-count", base))
            .json(&json!({ "camera_id": 2, "count": 12 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        let created: CreatedResponse = resp.json().await.unwrap();
        assert!(created.success);
        assert_eq!(created.id, 1);

        let latest: LatestCountResponse = client
            .get(format!("{}/vehicle-count", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(latest.count, 12);
        assert_eq!(latest.camera_id, Some(2));
        assert!(latest.timestamp.is_some());
    }

    #[tokio::test]
    async fn test_post_validation_errors() {
        let (base, store) = spawn_app().await;
        let client = reqwest::Client::new();

        for body in [
            json!({ "camera_id": 1 }),
            json!({ "camera_id": "1", "count": 3 }),
            json!({ "camera_id": 1, "count": null }),
            json!([1, 2]),
        ] {
            let resp = client
                .post(format!("{}/vehicle-count", base))
                .json(&body)
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST, "body {}", body);
            let err: Value = resp.json().await.unwrap();
            assert_eq!(err["success"], false);
            assert_eq!(err["error"], INVALID_BODY);
        }

        let resp = client
            .post(format!("{}/vehicle-count", base))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

        assert!(store.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_post_store_failure_is_500() {
        let (base, store) = spawn_app().await;
        store.pool().close().await;

        let resp = reqwest::Client::new()
            .post(format!("{}/vehicle-count", base))
            .json(&json!({ "camera_id": 1, "count": 1 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_history_newest_first_with_limit() {
        let (base, store) = spawn_app().await;
        for count in [3, 4, 5] {
            store.insert(1, count).await.unwrap();
        }

        let resp: HistoryResponse = reqwest::get(format!("{}/history?limit=2", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let counts: Vec<i64> = resp.history.iter().map(|e| e.count).collect();
        assert_eq!(counts, vec![5, 4]);

        let resp: HistoryResponse = reqwest::get(format!("{}/history?limit=nope", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(resp.history.len(), 3);

        let resp: HistoryResponse = reqwest::get(format!("{}/history?limit=2abc", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(resp.history.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_history_then_defaults() {
        let (base, store) = spawn_app().await;
        store.insert(1, 8).await.unwrap();
        store.insert(1, 9).await.unwrap();
        let client = reqwest::Client::new();

        let cleared: Value = client
            .delete(format!("{}/history", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(cleared["success"], true);
        assert_eq!(cleared["deleted"], 2);

        let history: HistoryResponse = client
            .get(format!("{}/history", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(history.history.is_empty());

        let latest: LatestCountResponse = client
            .get(format!("{}/vehicle-count", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            latest,
            LatestCountResponse {
                count: 0,
                camera_id: None,
                timestamp: None,
            }
        );
    }
}
