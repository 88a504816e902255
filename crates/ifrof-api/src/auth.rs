//! Bearer token authentication.

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use tracing::{debug, error};

use ifrof_core::AuthPrincipal;

use crate::error::ApiError;
use crate::messages::Locale;
use crate::AppState;

/// Extractor for authenticated requests.
///
/// Rejects with 401 when the `Authorization: Bearer` header is missing or the
/// token is unknown, expired, or revoked. A failing token lookup is a 500.
#[derive(Debug, Clone, Copy)]
pub struct RequireAuth {
    pub principal: AuthPrincipal,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let locale = Locale::from_headers(&parts.headers);

        let Some(token) = bearer_token(parts) else {
            debug!(subsystem = "api", component = "auth", "Missing bearer token");
            return Err(ApiError::Unauthorized(locale));
        };

        match state.tokens.verify(token).await {
            Ok(Some(principal)) => Ok(RequireAuth { principal }),
            Ok(None) => {
                debug!(subsystem = "api", component = "auth", "Unknown or expired token");
                Err(ApiError::Unauthorized(locale))
            }
            Err(e) => {
                error!(
                    subsystem = "api",
                    component = "auth",
                    error = %e,
                    "Token lookup failed"
                );
                Err(ApiError::internal(locale))
            }
        }
    }
}
