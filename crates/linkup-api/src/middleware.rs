use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use linkup_core::error::CoreError;
use linkup_core::AppState;

use crate::error::ApiError;

/// Authenticated caller, resolved from the bearer token. Rejections go
/// through the core error taxonomy so they share the `ApiError` JSON body.
pub struct AuthUser {
    pub user_id: i64,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(CoreError::Unauthenticated)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(CoreError::Unauthenticated)?;

        let claims = linkup_core::identity::validate_token(token, &state.config.jwt_secret)
            .map_err(|_| CoreError::Unauthenticated)?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}
