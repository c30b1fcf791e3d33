//! Admin handlers: user invitations, role assignment, grant management and
//! the audit trail.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::dto::{MessageResponse, Pagination, PaginationQuery};
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::authz::{AppPermission, UserRole};
use crate::error::Result;
use crate::models::audit_log::AuditLog;
use crate::models::user::User;
use crate::store::PageRequest;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/invite", post(invite_user))
        .route("/users/:email/role", put(set_user_role))
        .route("/grants", get(list_grants).post(add_grant).delete(remove_grant))
        .route("/audit-logs", get(list_audit_logs))
}

#[derive(Debug, Deserialize)]
pub struct InviteUserRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    pub role: UserRole,
    pub permission: AppPermission,
}

#[derive(Debug, Serialize)]
pub struct RoleGrantsResponse {
    pub role: UserRole,
    pub permissions: Vec<AppPermission>,
}

#[derive(Debug, Serialize)]
pub struct AuditLogListResponse {
    pub entries: Vec<AuditLog>,
    pub pagination: Pagination,
}

pub async fn list_users(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<Vec<User>>> {
    state
        .grants
        .authorize(auth.role, AppPermission::PageViewAdmin)?;
    let users = state.user_service().list().await?;
    Ok(Json(users))
}

pub async fn invite_user(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(req): Json<InviteUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    state
        .grants
        .authorize(auth.role, AppPermission::PageViewAdmin)?;

    let user = state
        .user_service()
        .invite(req.email.trim(), &req.first_name, &req.last_name, req.role)
        .await?;

    state
        .audit_service()
        .record(&auth.email, "user.invite", None, json!({"invited": user.email}))
        .await;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn set_user_role(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(email): Path<String>,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<User>> {
    state
        .grants
        .authorize(auth.role, AppPermission::PageViewAdmin)?;

    let user = state.user_service().set_role(&email, req.role).await?;

    state
        .audit_service()
        .record(
            &auth.email,
            "user.set_role",
            None,
            json!({"user": email, "role": req.role}),
        )
        .await;

    Ok(Json(user))
}

pub async fn list_grants(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<Vec<RoleGrantsResponse>>> {
    state
        .grants
        .authorize(auth.role, AppPermission::PageViewAdmin)?;

    let grants = UserRole::ALL
        .into_iter()
        .map(|role| {
            let mut permissions = state.grants.permissions_for(role);
            permissions.sort_by_key(|p| format!("{:?}", p));
            RoleGrantsResponse { role, permissions }
        })
        .collect();

    Ok(Json(grants))
}

pub async fn add_grant(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(req): Json<GrantRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .grants
        .authorize(auth.role, AppPermission::PageViewAdmin)?;

    let added = state.grants.grant(req.role, req.permission);
    let message = if added {
        "Permission granted"
    } else {
        "Permission was already granted"
    };

    state
        .audit_service()
        .record(
            &auth.email,
            "grant.add",
            None,
            json!({"role": req.role, "permission": req.permission}),
        )
        .await;

    Ok(Json(MessageResponse::new(message)))
}

pub async fn remove_grant(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(req): Json<GrantRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .grants
        .authorize(auth.role, AppPermission::PageViewAdmin)?;

    let removed = state.grants.revoke(req.role, req.permission);
    let message = if removed {
        "Permission revoked"
    } else {
        "Permission was not granted"
    };

    state
        .audit_service()
        .record(
            &auth.email,
            "grant.remove",
            None,
            json!({"role": req.role, "permission": req.permission}),
        )
        .await;

    Ok(Json(MessageResponse::new(message)))
}

pub async fn list_audit_logs(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Query(paging): Query<PaginationQuery>,
) -> Result<Json<AuditLogListResponse>> {
    state
        .grants
        .authorize(auth.role, AppPermission::PageViewAdmin)?;

    let page = PageRequest {
        page: paging.page(),
        per_page: paging.per_page(),
    };
    let (entries, total) = state.audit_service().list(page).await?;

    Ok(Json(AuditLogListResponse {
        pagination: Pagination::new(page.page, page.per_page, total),
        entries,
    }))
}
