use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::config::get_config;
use crate::services::auth_service::check_can_sign_in;
use crate::utils::token::decode_jwt;
use crate::AppState;

fn unauthorized(code: &'static str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or("missing_authorization")?;
    let value = header.to_str().map_err(|_| "bad_authorization")?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or("unsupported_scheme")
}

/// Resolves the bearer token to a live `User` and stores it in the request
/// extensions. The user row is reloaded on every request so blocking takes
/// effect immediately.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = match bearer_token(req.headers()) {
        Ok(token) => token,
        Err(code) => return unauthorized(code),
    };

    let config = get_config();
    let claims = match decode_jwt(token, &config.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => return unauthorized("invalid_token"),
    };

    let user = match state.auth_service.find_by_id(claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return unauthorized("unknown_user"),
        Err(e) => return e.into_response(),
    };
    if let Err(e) = check_can_sign_in(&user, config.require_email_verification) {
        tracing::warn!(user_id = %user.id, error = %e, "Rejected token of a disabled account");
        return e.into_response();
    }

    req.extensions_mut().insert(user);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err("missing_authorization"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), Err("unsupported_scheme"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), Err("unsupported_scheme"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Ok("abc.def.ghi"));
    }
}
