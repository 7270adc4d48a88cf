use axum::http::StatusCode;
use axum::{Json, Router, routing::post};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::ServerConfig;
use crate::data::{Assignment, GenerationInput, GenerationReport, ScheduledEntry, Session};
use crate::error::GenerationError;
use crate::generation;
use crate::generation::validate;

/// A stored schedule sent back for re-checking.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub sessions: Vec<Session>,
    pub placed: Vec<ScheduledEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub conflicts: Vec<String>,
}

fn status_for(err: &GenerationError) -> StatusCode {
    match err {
        GenerationError::InputInvalid(_) => StatusCode::BAD_REQUEST,
        GenerationError::InvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn generate_handler(
    Json(input): Json<GenerationInput>,
) -> Result<Json<GenerationReport>, (StatusCode, String)> {
    // the search is CPU-bound; keep it off the async workers
    let outcome = tokio::task::spawn_blocking(move || generation::generate(&input))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    match outcome {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            error!("Generation failed: {}", e);
            Err((status_for(&e), e.to_string()))
        }
    }
}

async fn verify_handler(Json(request): Json<VerifyRequest>) -> Json<VerifyResponse> {
    let sessions: HashMap<_, _> = request.sessions.iter().map(|s| (s.id, s)).collect();
    let mut conflicts = Vec::new();
    let mut assignments = Vec::new();
    for entry in &request.placed {
        match sessions.get(&entry.session_id) {
            Some(session) => assignments.push(Assignment::new(session, entry.cell(), entry.room_id)),
            None => conflicts.push(format!("session {} is unknown", entry.session_id)),
        }
    }
    conflicts.extend(validate::conflicts(&assignments));
    Json(VerifyResponse {
        valid: conflicts.is_empty(),
        conflicts,
    })
}

pub fn router() -> Router {
    Router::new()
        .route("/v1/schedule/generate", post(generate_handler))
        .route("/v1/schedule/verify", post(verify_handler))
}

pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, router()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn generate_returns_a_report() {
        let body = json!({
            "sessions": [
                {"id": 1, "durationMinutes": 90, "kind": "lecture", "groupId": 1, "groupCount": 2},
                {"id": 2, "durationMinutes": 90, "kind": "practical", "groupId": 1, "teacherId": 4}
            ],
            "rooms": [
                {"id": 10, "name": "Amphi A", "capacity": 200},
                {"id": 11, "name": "Room 3"}
            ],
            "budget": {"seed": 3}
        });

        let (status, report) = post_json("/v1/schedule/generate", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["placed"].as_array().map(Vec::len), Some(2));
        assert_eq!(report["unplaced"], json!([]));
        assert_eq!(report["diagnostics"]["gridCells"], json!(25));
        assert_eq!(report["diagnostics"]["lectureRooms"], json!(1));
        assert!(report["qualityScore"].as_i64().unwrap() >= 200);
        assert_eq!(report["placed"][0]["start"].as_str().map(|s| s.len()), Some(8));
    }

    #[tokio::test]
    async fn empty_sessions_are_a_bad_request() {
        let body = json!({
            "sessions": [],
            "rooms": [{"id": 1, "name": "A"}]
        });

        let (status, _) = post_json("/v1/schedule/generate", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn verify_flags_double_bookings() {
        let entry = |session: u32, room: u32| {
            json!({
                "sessionId": session, "day": "Monday", "dayIndex": 0, "slotIndex": 0,
                "start": "08:00:00", "end": "09:30:00", "roomId": room
            })
        };
        let body = json!({
            "sessions": [
                {"id": 1, "durationMinutes": 90, "kind": "practical", "teacherId": 7},
                {"id": 2, "durationMinutes": 90, "kind": "practical", "teacherId": 7},
                {"id": 3, "durationMinutes": 90, "kind": "practical"}
            ],
            "placed": [entry(1, 1), entry(2, 2), entry(3, 3), entry(4, 4)]
        });

        let (status, response) = post_json("/v1/schedule/verify", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response["valid"], json!(false));
        let conflicts = response["conflicts"].as_array().unwrap();
        assert_eq!(conflicts.len(), 2);
    }
}
