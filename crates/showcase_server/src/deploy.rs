use crate::api::ApiError;
use crate::state::AppState;

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
};
use bytes::Bytes;
use showcase_core::prelude::*;

/// POST /deploy/push
pub async fn manual_push<C: CatalogStore, A: AssetStore, D: Deployer>(
    State(state): State<AppState<C, A, D>>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.trigger.manual_push().await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Changes pushed to remote",
        "commitMessage": report.commit_message,
        "committed": report.committed,
        "output": report.output,
    })))
}

fn signature(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SIGNATURE_HEADER)
        .or_else(|| headers.get(LEGACY_SIGNATURE_HEADER))
        .and_then(|value| value.to_str().ok())
}

/// POST /deploy/webhook
/// The raw body is what gets signed, so it is taken as bytes and parsed later.
pub async fn webhook<C: CatalogStore, A: AssetStore, D: Deployer>(
    State(state): State<AppState<C, A, D>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .trigger
        .handle_webhook(&body, signature(&headers))
        .await?;

    let response = match outcome {
        WebhookOutcome::Triggered { branch, commit, .. } => serde_json::json!({
            "success": true,
            "message": "Deployment triggered",
            "branch": branch,
            "commit": commit,
        }),
        WebhookOutcome::Ignored { branch } => serde_json::json!({
            "success": true,
            "message": "Event received, not the target branch",
            "branch": branch,
        }),
    };
    Ok(Json(response))
}

/// GET /deploy/webhook
pub async fn webhook_status() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "message": "Webhook endpoint is ready",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[derive(serde::Deserialize)]
pub struct LogsParams {
    file: Option<String>,
}

/// GET /deploy/logs
/// Lists deploy logs, or returns the content of `?file=<name>`.
pub async fn logs<C: CatalogStore, A: AssetStore, D: Deployer>(
    State(state): State<AppState<C, A, D>>,
    Query(params): Query<LogsParams>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(file) = params.file {
        let content = state.logs.read(&file).await?;
        return Ok(Json(serde_json::json!({
            "success": true,
            "file": file,
            "content": content,
        })));
    }

    let logs = state.logs.list().await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "latest": logs.first(),
        "logs": logs,
    })))
}
