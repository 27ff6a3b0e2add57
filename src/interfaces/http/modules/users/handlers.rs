//! User management API handlers
//!
//! Admin-only endpoints for provisioning and managing accounts.
//! Delegates to `UserService` from the application/identity layer.
//! Accounts are never hard-deleted, only deactivated.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::json;

use super::dto::{CreateUserRequest, ListUsersParams, UpdateUserRequest, UserDto};
use crate::application::{RequestMeta, UserService};
use crate::auth::AuthenticatedUser;
use crate::domain::{CreateUserDto, GetUserDto, UpdateUserDto, UserRole};
use crate::infrastructure::database::repositories::UserRepository;
use crate::interfaces::http::common::{error_status, ApiResponse, PaginatedResponse, ValidatedJson};
use crate::interfaces::http::modules::SharedAudit;

/// User handler state, concrete over `UserRepository` for Axum compatibility.
#[derive(Clone)]
pub struct UserHandlerState {
    pub user_service: Arc<UserService<UserRepository>>,
    pub audit: SharedAudit,
}

fn parse_role(raw: &str) -> Result<UserRole, (StatusCode, Json<ApiResponse<UserDto>>)> {
    UserRole::parse(raw).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!("Unknown role '{}'", raw))),
        )
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(ListUsersParams),
    responses(
        (status = 200, description = "User list", body = PaginatedResponse<UserDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_users(
    State(state): State<UserHandlerState>,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<PaginatedResponse<UserDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    let dto = GetUserDto {
        search: params.search,
        role: params.role.as_deref().and_then(UserRole::parse),
        include_inactive: params.include_inactive,
        page: Some(params.page),
        page_size: Some(params.page_size),
    };

    match state.user_service.list_users(dto).await {
        Ok(result) => {
            let items: Vec<UserDto> = result.items.into_iter().map(UserDto::from).collect();
            Ok(Json(PaginatedResponse::new(
                items,
                result.total,
                result.page,
                result.limit,
            )))
        }
        Err(e) => Err((error_status(&e), Json(ApiResponse::error(e.to_string())))),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_user(
    State(state): State<UserHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserDto>>, (StatusCode, Json<ApiResponse<UserDto>>)> {
    match state.user_service.get_user_by_id(&id).await {
        Ok(Some(user)) => Ok(Json(ApiResponse::success(UserDto::from(user)))),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("User '{}' not found", id))),
        )),
        Err(e) => Err((error_status(&e), Json(ApiResponse::error(e.to_string())))),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserDto>),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Already exists")
    )
)]
pub async fn create_user(
    State(state): State<UserHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), (StatusCode, Json<ApiResponse<UserDto>>)> {
    let role = match request.role.as_deref() {
        Some(raw) => Some(parse_role(raw)?),
        None => None,
    };

    let dto = CreateUserDto {
        username: request.username,
        email: request.email,
        password: request.password,
        role,
    };

    let user = state
        .user_service
        .register(dto)
        .await
        .map_err(|e| (error_status(&e), Json(ApiResponse::error(e.to_string()))))?;

    state.audit.record(
        Some(&actor),
        "CREATE_USER",
        "user",
        Some(user.id.clone()),
        Some(json!({"username": user.username, "role": user.role.as_str()})),
        meta,
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from(user))),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_user(
    State(state): State<UserHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, (StatusCode, Json<ApiResponse<UserDto>>)> {
    let role = match request.role.as_deref() {
        Some(raw) => Some(parse_role(raw)?),
        None => None,
    };

    let dto = UpdateUserDto {
        username: request.username,
        email: request.email,
        role,
    };

    match state.user_service.update_user(&id, dto).await {
        Ok(Some(user)) => {
            state.audit.record(
                Some(&actor),
                "UPDATE_USER",
                "user",
                Some(id),
                Some(json!({"role": user.role.as_str()})),
                meta,
            );
            Ok(Json(ApiResponse::success(UserDto::from(user))))
        }
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("User '{}' not found", id))),
        )),
        Err(e) => Err((error_status(&e), Json(ApiResponse::error(e.to_string())))),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/deactivate",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deactivated"),
        (status = 404, description = "Not found")
    )
)]
pub async fn deactivate_user(
    State(state): State<UserHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    state
        .user_service
        .deactivate_user(&id)
        .await
        .map_err(|e| (error_status(&e), Json(ApiResponse::error(e.to_string()))))?;

    state
        .audit
        .record(Some(&actor), "DEACTIVATE_USER", "user", Some(id), None, meta);

    Ok(Json(ApiResponse::success(())))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/reactivate",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User reactivated"),
        (status = 404, description = "Not found")
    )
)]
pub async fn reactivate_user(
    State(state): State<UserHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    state
        .user_service
        .reactivate_user(&id)
        .await
        .map_err(|e| (error_status(&e), Json(ApiResponse::error(e.to_string()))))?;

    state
        .audit
        .record(Some(&actor), "REACTIVATE_USER", "user", Some(id), None, meta);

    Ok(Json(ApiResponse::success(())))
}
