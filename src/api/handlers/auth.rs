//! Authentication handlers: login and invitation acceptance.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::SharedState;
use crate::authz::AppPermission;
use crate::error::{AppError, Result};
use crate::models::user::User;

pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route("/login", post(login))
        .route("/accept-invitation", post(accept_invitation))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    /// Effective permissions of the user's role, so the client can decide
    /// what to render without a second round trip.
    pub permissions: Vec<AppPermission>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationRequest {
    pub token: Uuid,
    pub password: String,
}

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".into(),
        ));
    }

    let (user, token) = state.auth_service().login(email, &req.password).await?;
    let permissions = state.grants.permissions_for(user.role);

    Ok(Json(LoginResponse {
        token,
        user,
        permissions,
    }))
}

pub async fn accept_invitation(
    State(state): State<SharedState>,
    Json(req): Json<AcceptInvitationRequest>,
) -> Result<Json<User>> {
    let user = state
        .user_service()
        .accept_invitation(req.token, &req.password)
        .await?;
    Ok(Json(user))
}
