//! HTTP error responses.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use ifrof_search::{PipelineError, ValidationError};

use crate::messages::{message, Locale, MessageKey};

/// An error returned to the client as `{"error": ...}` with a localized message.
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError, Locale),
    MalformedBody(Locale),
    Unauthorized(Locale),
    NotFound(Locale),
    /// Daily quota exhausted.
    DailyLimit {
        retry_after_secs: u64,
        locale: Locale,
    },
    /// Global burst limiter.
    TooManyRequests {
        retry_after_secs: u64,
        locale: Locale,
    },
    Internal {
        search_id: Option<Uuid>,
        locale: Locale,
    },
}

impl ApiError {
    pub fn internal(locale: Locale) -> Self {
        Self::Internal {
            search_id: None,
            locale,
        }
    }

    /// Map a pipeline failure to a response. Internal detail is logged by the
    /// pipeline and dropped here.
    pub fn from_pipeline(err: PipelineError, locale: Locale) -> Self {
        match err {
            PipelineError::Validation(e) => Self::Validation(e, locale),
            PipelineError::RateLimited {
                retry_after_secs, ..
            } => Self::DailyLimit {
                retry_after_secs,
                locale,
            },
            PipelineError::Failed { search_id, .. } => Self::Internal {
                search_id: Some(search_id),
                locale,
            },
            PipelineError::RateLimitUnavailable(_) | PipelineError::Persistence(_) => {
                Self::internal(locale)
            }
        }
    }

    pub fn from_core(err: ifrof_core::Error, locale: Locale) -> Self {
        error!(subsystem = "api", error = %err, "Request failed");
        Self::internal(locale)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(..) | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DailyLimit { .. } | Self::TooManyRequests { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::Validation(e, locale) => message(MessageKey::from(e), *locale),
            Self::MalformedBody(locale) => message(MessageKey::MalformedBody, *locale),
            Self::Unauthorized(locale) => message(MessageKey::Unauthorized, *locale),
            Self::NotFound(locale) => message(MessageKey::NotFound, *locale),
            Self::DailyLimit { locale, .. } => message(MessageKey::DailyLimit, *locale),
            Self::TooManyRequests { locale, .. } => message(MessageKey::TooManyRequests, *locale),
            Self::Internal { locale, .. } => message(MessageKey::Internal, *locale),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.message();

        match self {
            Self::DailyLimit {
                retry_after_secs, ..
            }
            | Self::TooManyRequests {
                retry_after_secs, ..
            } => {
                let body = Json(json!({
                    "error": error,
                    "retryAfter": retry_after_secs,
                }));
                let mut response = (status, body).into_response();
                response.headers_mut().insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(retry_after_secs),
                );
                response
            }
            Self::Internal {
                search_id: Some(search_id),
                ..
            } => (
                status,
                Json(json!({
                    "error": error,
                    "searchId": search_id,
                })),
            )
                .into_response(),
            _ => (status, Json(json!({ "error": error }))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_pipeline_error_statuses() {
        let cases = [
            (
                PipelineError::Validation(ValidationError::InvalidUrl),
                StatusCode::BAD_REQUEST,
            ),
            (
                PipelineError::RateLimited {
                    retry_after_secs: 5,
                    reset_at: Utc::now(),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                PipelineError::RateLimitUnavailable("db down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PipelineError::Persistence("db down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PipelineError::Failed {
                    search_id: Uuid::nil(),
                    message: "boom".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from_pipeline(err, Locale::En).status(), status);
        }
    }

    #[test]
    fn test_rate_limit_response_sets_retry_after_header() {
        let response = ApiError::DailyLimit {
            retry_after_secs: 91,
            locale: Locale::En,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "91");
    }
}
