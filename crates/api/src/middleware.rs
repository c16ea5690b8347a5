use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use kopontren_infra::services::Services;

use crate::app::errors::{ApiError, json_error};
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub services: Services,
}

/// Resolve the bearer token to a principal, or answer 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(req.headers()) else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing bearer token");
    };

    let principal = match state.services.authenticate(token).await {
        Ok(p) => p,
        Err(e) => return ApiError::from(e).into_response(),
    };

    req.extensions_mut().insert(PrincipalContext::new(principal));
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let token = header.to_str().ok()?.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn extracts_bearer_tokens_only() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(extract_bearer(&headers("Bearer   ")), None);
        assert_eq!(extract_bearer(&headers("Basic abc")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }
}
