//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks both backing stores

use crate::services::coordinator::SubmissionCoordinator;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;

/// `GET /healthz`
///
/// Very small liveness check. Always returns 200 OK with a plain JSON body
/// and never performs I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness check that:
/// 1. Pings the document store.
/// 2. Confirms the attachment bucket still exists.
///
/// Returns JSON describing each check. HTTP 200 when all checks pass,
/// HTTP 503 when any check fails.
pub async fn readyz(State(coordinator): State<SubmissionCoordinator>) -> impl IntoResponse {
    let mongo_check = match coordinator.notes().ping().await {
        Ok(()) => CheckStatus::ok(),
        Err(e) => CheckStatus::failed(format!("error: {}", e)),
    };

    let bucket = coordinator.bucket();
    let bucket_check = match coordinator.objects().bucket_exists(bucket).await {
        Ok(true) => CheckStatus::ok(),
        Ok(false) => CheckStatus::failed(format!("bucket `{}` is missing", bucket)),
        Err(e) => CheckStatus::failed(format!("error: {}", e)),
    };

    let overall_ok = mongo_check.ok && bucket_check.ok;

    let mut checks = HashMap::new();
    checks.insert("mongodb", mongo_check);
    checks.insert("object_store", bucket_check);

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            ok: false,
            error: Some(error),
        }
    }
}
