//! Patient registry API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde_json::json;

use super::dto::{CreatePatientRequest, ListPatientsParams, PatientDto, UpdatePatientRequest};
use crate::application::RequestMeta;
use crate::auth::AuthenticatedUser;
use crate::infrastructure::database::entities::patient;
use crate::interfaces::http::common::{ApiResponse, PaginatedResponse, ValidatedJson};
use crate::interfaces::http::modules::SharedAudit;

/// Patient handler state
#[derive(Clone)]
pub struct PatientHandlerState {
    pub db: DatabaseConnection,
    pub audit: SharedAudit,
}

fn internal_error<T>(e: impl std::fmt::Display) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error(e.to_string())),
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/patients",
    tag = "Patients",
    security(("bearer_auth" = [])),
    params(ListPatientsParams),
    responses(
        (status = 200, description = "Patient list", body = PaginatedResponse<PatientDto>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_patients(
    State(state): State<PatientHandlerState>,
    Query(params): Query<ListPatientsParams>,
) -> Result<Json<PaginatedResponse<PatientDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    let page = params.page.max(1);
    let limit = params.page_size.clamp(1, 100);

    let mut query = patient::Entity::find();

    if let Some(ref search) = params.search {
        query = query.filter(
            patient::Column::FirstName
                .contains(search)
                .or(patient::Column::LastName.contains(search))
                .or(patient::Column::Email.contains(search))
                .or(patient::Column::Phone.contains(search)),
        );
    }

    if let Some(ref doctor_id) = params.assigned_doctor_id {
        query = query.filter(patient::Column::AssignedDoctorId.eq(doctor_id.clone()));
    }

    query = query.order_by_desc(patient::Column::CreatedAt);

    let total = query.clone().count(&state.db).await.map_err(internal_error)?;

    let models = query
        .offset(((page - 1) * limit) as u64)
        .limit(limit as u64)
        .all(&state.db)
        .await
        .map_err(internal_error)?;

    let items: Vec<PatientDto> = models.into_iter().map(PatientDto::from).collect();
    Ok(Json(PaginatedResponse::new(items, total, page, limit)))
}

#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}",
    tag = "Patients",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Patient details", body = ApiResponse<PatientDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_patient(
    State(state): State<PatientHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PatientDto>>, (StatusCode, Json<ApiResponse<PatientDto>>)> {
    let model = patient::Entity::find_by_id(&id)
        .one(&state.db)
        .await
        .map_err(internal_error)?;

    match model {
        Some(model) => Ok(Json(ApiResponse::success(PatientDto::from(model)))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Patient '{}' not found", id))),
        )),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/patients",
    tag = "Patients",
    security(("bearer_auth" = [])),
    request_body = CreatePatientRequest,
    responses(
        (status = 201, description = "Patient created", body = ApiResponse<PatientDto>),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_patient(
    State(state): State<PatientHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<CreatePatientRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PatientDto>>), (StatusCode, Json<ApiResponse<PatientDto>>)>
{
    let now = Utc::now();
    let new_patient = patient::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        first_name: Set(request.first_name),
        last_name: Set(request.last_name),
        date_of_birth: Set(request.date_of_birth),
        gender: Set(request.gender),
        blood_group: Set(request.blood_group),
        phone: Set(request.phone),
        email: Set(request.email),
        address: Set(request.address),
        user_id: Set(request.user_id),
        assigned_doctor_id: Set(request.assigned_doctor_id),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = new_patient.insert(&state.db).await.map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "CREATE_PATIENT",
        "patient",
        Some(model.id.clone()),
        Some(json!({"first_name": model.first_name, "last_name": model.last_name})),
        meta,
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(PatientDto::from(model))),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/patients/{id}",
    tag = "Patients",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Patient ID")),
    request_body = UpdatePatientRequest,
    responses(
        (status = 200, description = "Patient updated", body = ApiResponse<PatientDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_patient(
    State(state): State<PatientHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<UpdatePatientRequest>,
) -> Result<Json<ApiResponse<PatientDto>>, (StatusCode, Json<ApiResponse<PatientDto>>)> {
    let model = patient::Entity::find_by_id(&id)
        .one(&state.db)
        .await
        .map_err(internal_error)?;

    let Some(model) = model else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Patient '{}' not found", id))),
        ));
    };

    let mut active: patient::ActiveModel = model.into();
    if let Some(v) = request.first_name {
        active.first_name = Set(v);
    }
    if let Some(v) = request.last_name {
        active.last_name = Set(v);
    }
    if let Some(v) = request.date_of_birth {
        active.date_of_birth = Set(Some(v));
    }
    if let Some(v) = request.gender {
        active.gender = Set(Some(v));
    }
    if let Some(v) = request.blood_group {
        active.blood_group = Set(Some(v));
    }
    if let Some(v) = request.phone {
        active.phone = Set(Some(v));
    }
    if let Some(v) = request.email {
        active.email = Set(Some(v));
    }
    if let Some(v) = request.address {
        active.address = Set(Some(v));
    }
    if let Some(v) = request.assigned_doctor_id {
        active.assigned_doctor_id = Set(Some(v));
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await.map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "UPDATE_PATIENT",
        "patient",
        Some(id),
        None,
        meta,
    );

    Ok(Json(ApiResponse::success(PatientDto::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/patients/{id}",
    tag = "Patients",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Patient deleted"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_patient(
    State(state): State<PatientHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    let result = patient::Entity::delete_by_id(&id)
        .exec(&state.db)
        .await
        .map_err(internal_error)?;

    if result.rows_affected == 0 {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Patient '{}' not found", id))),
        ));
    }

    state.audit.record(
        Some(&actor),
        "DELETE_PATIENT",
        "patient",
        Some(id),
        None,
        meta,
    );

    Ok(Json(ApiResponse::success(())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::AuditRecorder;
    use crate::domain::UserRole;
    use crate::infrastructure::database::migrator::Migrator;
    use crate::infrastructure::database::repositories::AuditLogRepository;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use sea_orm::{ConnectionTrait, Database};
    use sea_orm_migration::MigratorTrait;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_state() -> PatientHandlerState {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let audit = Arc::new(AuditRecorder::new(Arc::new(AuditLogRepository::new(
            db.clone(),
        ))));
        PatientHandlerState { db, audit }
    }

    fn test_app(state: PatientHandlerState) -> Router {
        let actor = AuthenticatedUser {
            user_id: "staff-1".to_string(),
            username: "reception".to_string(),
            role: UserRole::Receptionist,
        };
        Router::new()
            .route("/patients", post(create_patient))
            .layer(Extension(actor))
            .with_state(state)
    }

    fn create_request() -> Request<Body> {
        let body = json!({"first_name": "Ada", "last_name": "Lovelace"});
        Request::builder()
            .method("POST")
            .uri("/patients")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_patient_returns_created() {
        let app = test_app(test_state().await);

        let resp = app.oneshot(create_request()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["data"]["first_name"], "Ada");
    }

    #[tokio::test]
    async fn test_audit_sink_failure_leaves_response_unchanged() {
        let state = test_state().await;

        // Break the audit sink before the request runs
        state
            .db
            .execute_unprepared("DROP TABLE audit_logs")
            .await
            .unwrap();

        let app = test_app(state.clone());
        let resp = app.oneshot(create_request()).await.unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["data"]["first_name"], "Ada");
        assert!(v["data"]["id"].as_str().is_some());

        // The row itself landed despite the dead audit trail
        let saved = patient::Entity::find()
            .all(&state.db)
            .await
            .unwrap();
        assert_eq!(saved.len(), 1);
    }
}
