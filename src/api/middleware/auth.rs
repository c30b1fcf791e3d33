//! Authentication middleware.
//!
//! Validates the `Authorization: Bearer <jwt>` header and stores the
//! caller's identity as a request extension. The role claim is decoded
//! here, once; an unknown role string becomes "no role", which every
//! downstream authorization check denies.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::authz::UserRole;
use crate::services::auth_service::AuthService;

/// Extension that holds authenticated caller information
#[derive(Debug, Clone)]
pub struct AuthExtension {
    pub email: String,
    /// Verified caller role; `None` when the token carried no usable role
    pub role: Option<UserRole>,
}

/// Extract the bearer token from the Authorization header
fn extract_bearer(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Authentication middleware function - requires a valid access token
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(&request) else {
        return (StatusCode::UNAUTHORIZED, "Missing authorization header").into_response();
    };

    match auth_service.validate_access_token(token) {
        Ok(claims) => {
            let auth = AuthExtension {
                email: claims.sub,
                role: UserRole::parse(&claims.role),
            };
            request.extensions_mut().insert(auth);
            next.run(request).await
        }
        Err(_) => (StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response(),
    }
}
