//! Route handlers.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::debug;
use uuid::Uuid;

use ifrof_core::defaults::MAX_IMAGE_BYTES;
use ifrof_search::{SearchDetails, SearchOutcome, SearchRequestBody, ValidationError};

use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::messages::Locale;
use crate::AppState;

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Run a factory search for the authenticated caller.
pub async fn factory_search(
    State(state): State<AppState>,
    locale: Locale,
    auth: RequireAuth,
    body: Result<Json<SearchRequestBody>, JsonRejection>,
) -> Result<Json<SearchOutcome>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        debug!(
            subsystem = "api",
            status = rejection.status().as_u16(),
            error = %rejection.body_text(),
            "Rejected request body"
        );
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::Validation(
                ValidationError::ImageTooLarge {
                    max_bytes: MAX_IMAGE_BYTES,
                },
                locale,
            )
        } else {
            ApiError::MalformedBody(locale)
        }
    })?;

    state
        .service
        .run(auth.principal.user_id, &body)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_pipeline(e, locale))
}

/// Fetch one of the caller's searches with its accepted factories.
pub async fn get_search(
    State(state): State<AppState>,
    locale: Locale,
    auth: RequireAuth,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SearchDetails>, ApiError> {
    let Ok(Path(id)) = id else {
        return Err(ApiError::NotFound(locale));
    };

    match state.service.find_for_user(auth.principal.user_id, id).await {
        Ok(Some(details)) => Ok(Json(details)),
        Ok(None) => Err(ApiError::NotFound(locale)),
        Err(e) => Err(ApiError::from_core(e, locale)),
    }
}
