//! HTTP surface of the intake daemon.
//!
//! A student following the dispute link lands here. The endpoint only
//! queues the roll number for review; it does not check the roll number
//! against the roster or tie the dispute to a session. The reviewer
//! applies the queue to whichever session is currently open, which
//! assumes a single open session at a time.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::Mutex;

use rollcall_store::Store;

pub struct AppState {
    pub store: Mutex<Store>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/raise_query", get(raise_query))
        .route("/queries", get(list_queries))
        .with_state(state)
}

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

#[derive(Deserialize)]
pub struct RaiseParams {
    pub roll_no: Option<String>,
    pub course: Option<String>,
    pub date: Option<String>,
}

/// `GET /raise_query?roll_no=R1&course=CS101&date=2024-01-01`
///
/// All three parameters are required; the values are taken as given.
pub async fn raise_query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RaiseParams>,
) -> (StatusCode, Json<serde_json::Value>) {
    let (Some(roll_no), Some(course), Some(date)) =
        (params.roll_no, params.course, params.date)
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "status": "error",
                "message": "missing parameters: roll_no, course and date are required",
            })),
        );
    };

    let store = state.store.lock().await;
    match store.raise_dispute(&roll_no, &course, &date) {
        Ok(true) => {
            tracing::info!(roll_no = %roll_no, course = %course, date = %date, "dispute queued");
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "queued",
                    "roll_no": roll_no,
                    "course": course,
                    "date": date,
                })),
            )
        }
        Ok(false) => {
            tracing::info!(roll_no = %roll_no, "dispute already pending");
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "duplicate",
                    "roll_no": roll_no,
                })),
            )
        }
        Err(err) => {
            tracing::error!(error = %err, "dispute insert failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": "storage failure",
                })),
            )
        }
    }
}

pub async fn list_queries(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let store = state.store.lock().await;
    match store.disputes() {
        Ok(disputes) => {
            let items: Vec<_> = disputes
                .into_iter()
                .map(|d| {
                    serde_json::json!({
                        "roll_no": d.person_id,
                        "course": d.course,
                        "date": d.date,
                        "raised_at": d.raised_at,
                    })
                })
                .collect();
            (StatusCode::OK, Json(serde_json::json!({ "queries": items })))
        }
        Err(err) => {
            tracing::error!(error = %err, "dispute list failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": "storage failure",
                })),
            )
        }
    }
}
