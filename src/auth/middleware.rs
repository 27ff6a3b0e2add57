//! Authentication and role middleware for Axum

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{TimeZone, Utc};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde_json::json;

use super::cookie::AUTH_COOKIE_NAME;
use super::jwt::{verify_token, AuthError, Claims, JwtConfig};
use crate::domain::UserRole;
use crate::infrastructure::database::entities::user;

/// Authentication state containing JWT config and database handle
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
    pub db: DatabaseConnection,
}

/// Authenticated user attached to the request after the auth gate
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    fn from_claims(claims: &Claims, role: UserRole) -> Self {
        Self {
            user_id: claims.sub.clone(),
            username: claims.username.clone(),
            role,
        }
    }
}

/// Extract token from Authorization header
fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Pull the token out of the request. The session cookie takes
/// precedence over the Authorization header.
fn extract_request_token(request: &Request<Body>) -> Option<String> {
    let jar = CookieJar::from_headers(request.headers());
    if let Some(cookie) = jar.get(AUTH_COOKIE_NAME) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer)
        .map(String::from)
}

/// JWT authentication middleware - requires a valid token and a live user
///
/// A structurally valid token is not enough: the user must still exist,
/// must be active, and the token must have been issued after the user's
/// last password change.
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_request_token(&request) else {
        return auth_error_response(AuthError::MissingToken);
    };

    let claims = match verify_token(&token, &auth_state.jwt_config) {
        Ok(claims) => claims,
        Err(e) if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature) => {
            return auth_error_response(AuthError::ExpiredToken)
        }
        Err(_) => return auth_error_response(AuthError::InvalidToken),
    };

    // Catches tokens inside the decoder's expiry leeway window
    if claims.is_expired() {
        return auth_error_response(AuthError::ExpiredToken);
    }

    let model = match user::Entity::find_by_id(&claims.sub)
        .one(&auth_state.db)
        .await
    {
        Ok(Some(model)) => model,
        Ok(None) => return auth_error_response(AuthError::UserNotFound),
        Err(e) => {
            // Infrastructure fault, not an auth failure. Detail stays in
            // the log only.
            tracing::error!("Auth lookup failed: {}", e);
            return internal_error_response();
        }
    };

    // Tokens minted before the password changed are revoked
    let issued_at = Utc
        .timestamp_opt(claims.iat, 0)
        .single()
        .unwrap_or(chrono::DateTime::<Utc>::UNIX_EPOCH);
    if issued_at < model.password_changed_at {
        return auth_error_response(AuthError::PasswordChanged);
    }

    if !model.is_active {
        return auth_error_response(AuthError::AccountDeactivated);
    }

    // The database is authoritative for the role, not the token
    let role = role_from_entity(model.role);
    let authed = AuthenticatedUser::from_claims(&claims, role);
    request.extensions_mut().insert(authed);

    next.run(request).await
}

fn role_from_entity(role: user::UserRole) -> UserRole {
    match role {
        user::UserRole::Admin => UserRole::Admin,
        user::UserRole::Doctor => UserRole::Doctor,
        user::UserRole::Nurse => UserRole::Nurse,
        user::UserRole::Pharmacist => UserRole::Pharmacist,
        user::UserRole::LabTechnician => UserRole::LabTechnician,
        user::UserRole::Receptionist => UserRole::Receptionist,
        user::UserRole::Patient => UserRole::Patient,
    }
}

/// Role gate - must be layered after `auth_middleware`
///
/// The allow-list is a static slice so route groups can share one:
/// `middleware::from_fn_with_state(CLINICAL_STAFF, require_role)`.
pub async fn require_role(
    State(allowed): State<&'static [UserRole]>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let user = request.extensions().get::<AuthenticatedUser>();

    match user {
        Some(user) if allowed.contains(&user.role) => next.run(request).await,
        Some(_) => auth_error_response(AuthError::InsufficientPermissions),
        None => auth_error_response(AuthError::MissingToken),
    }
}

/// Create an authentication error response
fn auth_error_response(error: AuthError) -> Response {
    let status = match error {
        AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
        _ => StatusCode::UNAUTHORIZED,
    };

    let body = Json(json!({
        "success": false,
        "error": error.to_string()
    }));

    (status, body).into_response()
}

fn internal_error_response() -> Response {
    let body = Json(json!({
        "success": false,
        "error": "Internal server error"
    }));

    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cookie::create_auth_cookie;
    use crate::auth::jwt::create_token;
    use crate::infrastructure::database::migrator::Migrator;
    use axum::{middleware, routing::get, Router};
    use chrono::Duration;
    use sea_orm::{ActiveModelTrait, Database, Set};
    use sea_orm_migration::MigratorTrait;
    use tower::ServiceExt;

    async fn test_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn seed_user(
        db: &DatabaseConnection,
        id: &str,
        role: user::UserRole,
        is_active: bool,
    ) -> user::Model {
        let now = Utc::now();
        user::ActiveModel {
            id: Set(id.to_string()),
            username: Set(format!("user-{}", id)),
            email: Set(format!("{}@example.com", id)),
            password_hash: Set("hash".to_string()),
            role: Set(role),
            is_active: Set(is_active),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
            // Backdated so freshly minted tokens pass the revocation check
            password_changed_at: Set(now - Duration::hours(1)),
        }
        .insert(db)
        .await
        .unwrap()
    }

    fn protected_router(auth_state: AuthState) -> Router {
        Router::new()
            .route("/protected", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
    }

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
            issuer: "careflow-hms".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_token_rejected() {
        let db = test_db().await;
        let app = protected_router(AuthState {
            jwt_config: jwt_config(),
            db,
        });

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let db = test_db().await;
        let app = protected_router(AuthState {
            jwt_config: jwt_config(),
            db,
        });

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_bearer_token_accepted() {
        let db = test_db().await;
        seed_user(&db, "u1", user::UserRole::Doctor, true).await;
        let config = jwt_config();
        let token = create_token("u1", "user-u1", &UserRole::Doctor, &config).unwrap();
        let app = protected_router(AuthState {
            jwt_config: config,
            db,
        });

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cookie_token_accepted() {
        let db = test_db().await;
        seed_user(&db, "u2", user::UserRole::Nurse, true).await;
        let config = jwt_config();
        let token = create_token("u2", "user-u2", &UserRole::Nurse, &config).unwrap();
        let cookie = create_auth_cookie(token, 1, false);
        let app = protected_router(AuthState {
            jwt_config: config,
            db,
        });

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header(header::COOKIE, cookie.encoded().to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cookie_takes_precedence_over_header() {
        let db = test_db().await;
        seed_user(&db, "u3", user::UserRole::Admin, true).await;
        let config = jwt_config();
        let good = create_token("u3", "user-u3", &UserRole::Admin, &config).unwrap();
        let cookie = create_auth_cookie(good, 1, false);
        let app = protected_router(AuthState {
            jwt_config: config,
            db,
        });

        // Cookie is valid, header is garbage: the request must succeed
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header(header::COOKIE, cookie.encoded().to_string())
                    .header(header::AUTHORIZATION, "Bearer garbage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_deleted_user_rejected() {
        let db = test_db().await;
        let config = jwt_config();
        let token = create_token("ghost", "ghost", &UserRole::Doctor, &config).unwrap();
        let app = protected_router(AuthState {
            jwt_config: config,
            db,
        });

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_deactivated_user_rejected() {
        let db = test_db().await;
        seed_user(&db, "u4", user::UserRole::Receptionist, false).await;
        let config = jwt_config();
        let token = create_token("u4", "user-u4", &UserRole::Receptionist, &config).unwrap();
        let app = protected_router(AuthState {
            jwt_config: config,
            db,
        });

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_issued_before_password_change_rejected() {
        let db = test_db().await;
        let model = seed_user(&db, "u5", user::UserRole::Doctor, true).await;

        // Bump password_changed_at past the token's iat
        let mut active: user::ActiveModel = model.into();
        active.password_changed_at = Set(Utc::now() + Duration::hours(1));
        active.update(&db).await.unwrap();

        let config = jwt_config();
        let token = create_token("u5", "user-u5", &UserRole::Doctor, &config).unwrap();
        let app = protected_router(AuthState {
            jwt_config: config,
            db,
        });

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_gate_allows_and_denies() {
        const DOCTORS_ONLY: &[UserRole] = &[UserRole::Admin, UserRole::Doctor];

        let db = test_db().await;
        seed_user(&db, "doc", user::UserRole::Doctor, true).await;
        seed_user(&db, "rec", user::UserRole::Receptionist, true).await;
        let config = jwt_config();
        let auth_state = AuthState {
            jwt_config: config.clone(),
            db,
        };

        let app = Router::new()
            .route("/clinical", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(DOCTORS_ONLY, require_role))
            .layer(middleware::from_fn_with_state(auth_state, auth_middleware));

        let doc_token = create_token("doc", "user-doc", &UserRole::Doctor, &config).unwrap();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/clinical")
                    .header(header::AUTHORIZATION, format!("Bearer {}", doc_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let rec_token =
            create_token("rec", "user-rec", &UserRole::Receptionist, &config).unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/clinical")
                    .header(header::AUTHORIZATION, format!("Bearer {}", rec_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_database_role_overrides_token_role() {
        const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

        let db = test_db().await;
        // Token claims admin but the stored role is patient
        seed_user(&db, "u6", user::UserRole::Patient, true).await;
        let config = jwt_config();
        let token = create_token("u6", "user-u6", &UserRole::Admin, &config).unwrap();
        let auth_state = AuthState {
            jwt_config: config,
            db,
        };

        let app = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(ADMIN_ONLY, require_role))
            .layer(middleware::from_fn_with_state(auth_state, auth_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_expired_token_gets_expiry_message() {
        let db = test_db().await;
        seed_user(&db, "u7", user::UserRole::Doctor, true).await;

        // Expired two hours ago, well past the decoder's leeway
        let expired_config = JwtConfig {
            expiration_hours: -2,
            ..jwt_config()
        };
        let token = create_token("u7", "user-u7", &UserRole::Doctor, &expired_config).unwrap();
        let app = protected_router(AuthState {
            jwt_config: jwt_config(),
            db,
        });

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Token has expired");
    }

    #[tokio::test]
    async fn test_database_fault_returns_500() {
        use sea_orm::ConnectionTrait;

        let db = test_db().await;
        seed_user(&db, "u8", user::UserRole::Doctor, true).await;
        let config = jwt_config();
        let token = create_token("u8", "user-u8", &UserRole::Doctor, &config).unwrap();

        // Break the user lookup after the token is minted
        db.execute_unprepared("DROP TABLE users").await.unwrap();

        let app = protected_router(AuthState {
            jwt_config: config,
            db,
        });

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/protected")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
