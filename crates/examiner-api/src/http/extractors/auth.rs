//! Access token authentication extractor.
//!
//! Extracts the token from:
//! - `?token=<token>` query parameter (browsers cannot set headers on a
//!   WebSocket handshake)
//! - `Authorization: Bearer <token>` header
//!
//! and resolves it to a user through the access-token repository.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use examiner_core::repository::token::AccessTokenRepository;
use examiner_types::identity::UserIdentity;

use crate::http::error::AppError;
use crate::state::AppState;

/// The user behind a valid access token.
pub struct AuthenticatedUser(pub UserIdentity);

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;

        match state.tokens.resolve(&token).await? {
            Some(identity) => Ok(AuthenticatedUser(identity)),
            None => Err(AppError::Unauthorized(
                "Invalid or revoked access token.".to_string(),
            )),
        }
    }
}

/// Extract the access token from the query string or headers.
fn extract_token(parts: &Parts) -> Result<String, AppError> {
    if let Ok(Query(TokenQuery { token: Some(token) })) = Query::<TokenQuery>::try_from_uri(&parts.uri) {
        let token = token.trim();
        if !token.is_empty() {
            return Ok(token.to_string());
        }
    }

    if let Some(auth) = parts.headers.get("authorization") {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Ok(token.to_string());
            }
        }
    }

    Err(AppError::Unauthorized(
        "Missing access token. Provide it via '?token=<token>' or 'Authorization: Bearer <token>'."
            .to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, bearer: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_token_from_query() {
        let parts = parts("/api/v1/ws/ai-interview?token=exm_abc&point_title=DNS", None);
        assert_eq!(extract_token(&parts).unwrap(), "exm_abc");
    }

    #[test]
    fn test_token_from_bearer_header() {
        let parts = parts("/api/v1/ws/ai-interview", Some("exm_header"));
        assert_eq!(extract_token(&parts).unwrap(), "exm_header");
    }

    #[test]
    fn test_query_wins_over_header() {
        let parts = parts("/api/v1/ws/ai-interview?token=exm_query", Some("exm_header"));
        assert_eq!(extract_token(&parts).unwrap(), "exm_query");
    }

    #[test]
    fn test_missing_or_blank_token() {
        assert!(matches!(
            extract_token(&parts("/api/v1/ws/ai-interview", None)),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            extract_token(&parts("/api/v1/ws/ai-interview?token=", None)),
            Err(AppError::Unauthorized(_))
        ));
    }
}
