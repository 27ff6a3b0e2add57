//! Authentication API handlers
//!
//! Delegates credential checks to `UserService`; owns the session
//! cookie lifecycle (set on login, cleared on logout).

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use super::dto::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, UserInfo,
};
use crate::application::{RequestMeta, UserService};
use crate::auth::cookie::{create_auth_cookie, create_logout_cookie};
use crate::auth::AuthenticatedUser;
use crate::domain::CreateUserDto;
use crate::infrastructure::database::repositories::UserRepository;
use crate::interfaces::http::common::{error_status, ApiResponse, ValidatedJson};
use crate::interfaces::http::modules::SharedAudit;

/// Auth handler state
#[derive(Clone)]
pub struct AuthHandlerState {
    pub user_service: Arc<UserService<UserRepository>>,
    pub audit: SharedAudit,
    /// Session cookie `Secure` attribute (config-driven)
    pub cookie_secure: bool,
    /// Session cookie lifetime, mirrors the token expiry
    pub token_expiration_hours: i64,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    jar: CookieJar,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>), (StatusCode, Json<ApiResponse<LoginResponse>>)>
{
    let result = state
        .user_service
        .login(&request.username, &request.password)
        .await
        .map_err(|e| (error_status(&e), Json(ApiResponse::error(e.to_string()))))?;

    let actor = AuthenticatedUser {
        user_id: result.user.id.clone(),
        username: result.user.username.clone(),
        role: result.user.role,
    };
    state
        .audit
        .record(Some(&actor), "LOGIN", "user", Some(result.user.id.clone()), None, meta);

    let cookie = create_auth_cookie(
        result.token.clone(),
        state.token_expiration_hours,
        state.cookie_secure,
    );

    let response = LoginResponse {
        token: result.token,
        token_type: result.token_type,
        expires_in: result.expires_in,
        user: UserInfo::from(result.user),
    };

    Ok((jar.add(cookie), Json(ApiResponse::success(response))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<UserInfo>),
        (status = 422, description = "Validation error"),
        (status = 409, description = "Username or email already exists")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserInfo>>), (StatusCode, Json<ApiResponse<UserInfo>>)> {
    let dto = CreateUserDto {
        username: request.username,
        email: request.email,
        password: request.password,
        role: None,
    };

    let user = state
        .user_service
        .register(dto)
        .await
        .map_err(|e| (error_status(&e), Json(ApiResponse::error(e.to_string()))))?;

    state.audit.record(
        None,
        "REGISTER",
        "user",
        Some(user.id.clone()),
        Some(json!({"username": user.username})),
        meta,
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserInfo::from(user))),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Session cookie cleared")
    )
)]
pub async fn logout(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    jar: CookieJar,
    meta: RequestMeta,
) -> (CookieJar, Json<ApiResponse<()>>) {
    state
        .audit
        .record(Some(&user), "LOGOUT", "user", Some(user.user_id.clone()), None, meta);

    let jar = jar.add(create_logout_cookie(state.cookie_secure));
    (jar, Json(ApiResponse::success(())))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user info", body = ApiResponse<UserInfo>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_current_user(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<UserInfo>>, (StatusCode, Json<ApiResponse<UserInfo>>)> {
    let db_user = state
        .user_service
        .get_user_by_id(&user.user_id)
        .await
        .map_err(|e| (error_status(&e), Json(ApiResponse::error(e.to_string()))))?;

    let Some(db_user) = db_user else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error("User not found")),
        ));
    };

    Ok(Json(ApiResponse::success(UserInfo::from(db_user))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/change-password",
    tag = "Authentication",
    security(("bearer_auth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed; outstanding tokens are revoked"),
        (status = 401, description = "Invalid current password"),
        (status = 422, description = "New password too short")
    )
)]
pub async fn change_password(
    State(state): State<AuthHandlerState>,
    Extension(user): Extension<AuthenticatedUser>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    state
        .user_service
        .change_password(&user.user_id, &request.current_password, &request.new_password)
        .await
        .map_err(|e| (error_status(&e), Json(ApiResponse::error(e.to_string()))))?;

    state.audit.record(
        Some(&user),
        "CHANGE_PASSWORD",
        "user",
        Some(user.user_id.clone()),
        None,
        meta,
    );

    Ok(Json(ApiResponse::success(())))
}
