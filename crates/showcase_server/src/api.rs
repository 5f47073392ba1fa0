use crate::state::AppState;

use axum::extract::rejection::JsonRejection;
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use showcase_core::prelude::*;
use tracing::error;

pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        let err = &self.0;

        if let Some(e) = err.downcast_ref::<CatalogError>() {
            return match e {
                CatalogError::NotFound(_) => (StatusCode::NOT_FOUND, "Product not found".into()),
                CatalogError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            };
        }
        if let Some(e) = err.downcast_ref::<TriggerError>() {
            return match e {
                TriggerError::Auth(auth) => auth_status(auth),
                TriggerError::Payload(_) => (StatusCode::BAD_REQUEST, "Invalid payload".into()),
            };
        }
        if let Some(e) = err.downcast_ref::<AuthError>() {
            return auth_status(e);
        }
        if let Some(e) = err.downcast_ref::<DeployError>() {
            return match e {
                DeployError::Forbidden(_) => (StatusCode::FORBIDDEN, e.to_string()),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            };
        }
        if let Some(e) = err.downcast_ref::<LogError>() {
            return match e {
                LogError::NotFound(_) => (StatusCode::NOT_FOUND, "Log file not found".into()),
                LogError::InvalidName(_) => (StatusCode::BAD_REQUEST, e.to_string()),
                LogError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            };
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal Server Error: {err}"),
        )
    }
}

/// Webhook senders learn the status and nothing else.
fn auth_status(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::SecretNotConfigured => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Webhook secret not configured".into(),
        ),
        _ => (StatusCode::UNAUTHORIZED, "Unauthorized".into()),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!("{:#}", self.0);
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| CatalogError::Validation(rejection.body_text()).into())
}

/// GET /products
pub async fn list_products<C: CatalogStore, A: AssetStore, D: Deployer>(
    State(state): State<AppState<C, A, D>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.catalog.list().await?))
}

/// GET /products/{id}
pub async fn get_product<C: CatalogStore, A: AssetStore, D: Deployer>(
    State(state): State<AppState<C, A, D>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .catalog
        .get(&id)
        .await?
        .ok_or(CatalogError::NotFound(id))?;
    Ok(Json(product))
}

/// POST /products
pub async fn create_product<C: CatalogStore, A: AssetStore, D: Deployer>(
    State(state): State<AppState<C, A, D>>,
    payload: Result<Json<ProductDraft>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = json_body(payload)?;
    draft.validate()?;

    let product = state.catalog.create(draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/{id}
pub async fn update_product<C: CatalogStore, A: AssetStore, D: Deployer>(
    State(state): State<AppState<C, A, D>>,
    Path(id): Path<String>,
    payload: Result<Json<ProductPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = json_body(payload)?;
    patch.validate()?;

    let product = state
        .catalog
        .update(&id, patch)
        .await?
        .ok_or(CatalogError::NotFound(id))?;
    Ok(Json(product))
}

/// DELETE /products/{id}
pub async fn delete_product<C: CatalogStore, A: AssetStore, D: Deployer>(
    State(state): State<AppState<C, A, D>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.catalog.delete(&id).await? {
        return Err(CatalogError::NotFound(id).into());
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /upload
/// Expects a multipart form with a `file` field. Returns `{url, fileName}`.
pub async fn upload_asset<C: CatalogStore, A: AssetStore, D: Deployer>(
    State(state): State<AppState<C, A, D>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        CatalogError::Validation(format!("Invalid upload: {}", e.body_text()))
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await.map_err(invalid)?;

        let stored = state.catalog.upload(data, &file_name).await?;
        return Ok(Json(stored));
    }

    Err(CatalogError::Validation("No file provided".into()).into())
}
