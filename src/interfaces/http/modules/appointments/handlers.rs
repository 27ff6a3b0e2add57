//! Appointment scheduling API handlers
//!
//! A doctor holds at most one live (scheduled) appointment per time
//! slot; creating or rescheduling into an occupied slot is rejected
//! with 409.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde_json::json;

use super::dto::{
    AppointmentDto, CreateAppointmentRequest, ListAppointmentsParams, UpdateAppointmentRequest,
    UpdateAppointmentStatusRequest,
};
use crate::application::RequestMeta;
use crate::auth::AuthenticatedUser;
use crate::infrastructure::database::entities::appointment::{self, AppointmentStatus};
use crate::infrastructure::database::entities::{patient, user};
use crate::interfaces::http::common::{ApiResponse, PaginatedResponse, ValidatedJson};
use crate::interfaces::http::modules::SharedAudit;

/// Appointment handler state
#[derive(Clone)]
pub struct AppointmentHandlerState {
    pub db: DatabaseConnection,
    pub audit: SharedAudit,
}

fn internal_error<T>(e: impl std::fmt::Display) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error(e.to_string())),
    )
}

fn parse_status(raw: &str) -> Option<AppointmentStatus> {
    match raw {
        "scheduled" => Some(AppointmentStatus::Scheduled),
        "completed" => Some(AppointmentStatus::Completed),
        "cancelled" => Some(AppointmentStatus::Cancelled),
        "no_show" => Some(AppointmentStatus::NoShow),
        _ => None,
    }
}

/// Is there already a scheduled appointment for this doctor at this slot?
async fn slot_taken(
    db: &DatabaseConnection,
    doctor_id: &str,
    scheduled_at: DateTime<Utc>,
    exclude_id: Option<&str>,
) -> Result<bool, sea_orm::DbErr> {
    let mut query = appointment::Entity::find()
        .filter(appointment::Column::DoctorId.eq(doctor_id))
        .filter(appointment::Column::ScheduledAt.eq(scheduled_at))
        .filter(appointment::Column::Status.eq(AppointmentStatus::Scheduled));

    if let Some(id) = exclude_id {
        query = query.filter(appointment::Column::Id.ne(id));
    }

    Ok(query.count(db).await? > 0)
}

#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    tag = "Appointments",
    security(("bearer_auth" = [])),
    params(ListAppointmentsParams),
    responses(
        (status = 200, description = "Appointment list", body = PaginatedResponse<AppointmentDto>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_appointments(
    State(state): State<AppointmentHandlerState>,
    Query(params): Query<ListAppointmentsParams>,
) -> Result<Json<PaginatedResponse<AppointmentDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    let page = params.page.max(1);
    let limit = params.page_size.clamp(1, 100);

    let mut query = appointment::Entity::find();

    if let Some(ref patient_id) = params.patient_id {
        query = query.filter(appointment::Column::PatientId.eq(patient_id.clone()));
    }
    if let Some(ref doctor_id) = params.doctor_id {
        query = query.filter(appointment::Column::DoctorId.eq(doctor_id.clone()));
    }
    if let Some(status) = params.status.as_deref().and_then(parse_status) {
        query = query.filter(appointment::Column::Status.eq(status));
    }
    if let Some(from) = params.from {
        query = query.filter(appointment::Column::ScheduledAt.gte(from));
    }
    if let Some(to) = params.to {
        query = query.filter(appointment::Column::ScheduledAt.lte(to));
    }

    query = query.order_by_asc(appointment::Column::ScheduledAt);

    let total = query.clone().count(&state.db).await.map_err(internal_error)?;
    let models = query
        .offset(((page - 1) * limit) as u64)
        .limit(limit as u64)
        .all(&state.db)
        .await
        .map_err(internal_error)?;

    let items: Vec<AppointmentDto> = models.into_iter().map(AppointmentDto::from).collect();
    Ok(Json(PaginatedResponse::new(items, total, page, limit)))
}

#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}",
    tag = "Appointments",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment details", body = ApiResponse<AppointmentDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_appointment(
    State(state): State<AppointmentHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AppointmentDto>>, (StatusCode, Json<ApiResponse<AppointmentDto>>)> {
    let model = appointment::Entity::find_by_id(&id)
        .one(&state.db)
        .await
        .map_err(internal_error)?;

    match model {
        Some(model) => Ok(Json(ApiResponse::success(AppointmentDto::from(model)))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Appointment '{}' not found", id))),
        )),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    tag = "Appointments",
    security(("bearer_auth" = [])),
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment created", body = ApiResponse<AppointmentDto>),
        (status = 404, description = "Patient or doctor not found"),
        (status = 409, description = "Doctor already booked at this time")
    )
)]
pub async fn create_appointment(
    State(state): State<AppointmentHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<CreateAppointmentRequest>,
) -> Result<
    (StatusCode, Json<ApiResponse<AppointmentDto>>),
    (StatusCode, Json<ApiResponse<AppointmentDto>>),
> {
    let patient_exists = patient::Entity::find_by_id(&request.patient_id)
        .one(&state.db)
        .await
        .map_err(internal_error)?
        .is_some();
    if !patient_exists {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "Patient '{}' not found",
                request.patient_id
            ))),
        ));
    }

    let doctor = user::Entity::find_by_id(&request.doctor_id)
        .one(&state.db)
        .await
        .map_err(internal_error)?;
    let is_doctor = doctor.is_some_and(|u| u.role == user::UserRole::Doctor);
    if !is_doctor {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "Doctor '{}' not found",
                request.doctor_id
            ))),
        ));
    }

    let taken = slot_taken(&state.db, &request.doctor_id, request.scheduled_at, None)
        .await
        .map_err(internal_error)?;
    if taken {
        return Err((
            StatusCode::CONFLICT,
            Json(ApiResponse::error(
                "Doctor already has an appointment at this time",
            )),
        ));
    }

    let now = Utc::now();
    let new_appointment = appointment::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        patient_id: Set(request.patient_id),
        doctor_id: Set(request.doctor_id),
        scheduled_at: Set(request.scheduled_at),
        status: Set(AppointmentStatus::Scheduled),
        reason: Set(request.reason),
        notes: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = new_appointment
        .insert(&state.db)
        .await
        .map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "CREATE_APPOINTMENT",
        "appointment",
        Some(model.id.clone()),
        Some(json!({"doctor_id": model.doctor_id, "scheduled_at": model.scheduled_at})),
        meta,
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(AppointmentDto::from(model))),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}",
    tag = "Appointments",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Appointment ID")),
    request_body = UpdateAppointmentRequest,
    responses(
        (status = 200, description = "Appointment updated", body = ApiResponse<AppointmentDto>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Doctor already booked at the new time")
    )
)]
pub async fn update_appointment(
    State(state): State<AppointmentHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<UpdateAppointmentRequest>,
) -> Result<Json<ApiResponse<AppointmentDto>>, (StatusCode, Json<ApiResponse<AppointmentDto>>)> {
    let model = appointment::Entity::find_by_id(&id)
        .one(&state.db)
        .await
        .map_err(internal_error)?;

    let Some(model) = model else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Appointment '{}' not found", id))),
        ));
    };

    if let Some(new_time) = request.scheduled_at {
        let taken = slot_taken(&state.db, &model.doctor_id, new_time, Some(&id))
            .await
            .map_err(internal_error)?;
        if taken {
            return Err((
                StatusCode::CONFLICT,
                Json(ApiResponse::error(
                    "Doctor already has an appointment at this time",
                )),
            ));
        }
    }

    let mut active: appointment::ActiveModel = model.into();
    if let Some(v) = request.scheduled_at {
        active.scheduled_at = Set(v);
    }
    if let Some(v) = request.reason {
        active.reason = Set(Some(v));
    }
    if let Some(v) = request.notes {
        active.notes = Set(Some(v));
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await.map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "UPDATE_APPOINTMENT",
        "appointment",
        Some(id),
        None,
        meta,
    );

    Ok(Json(ApiResponse::success(AppointmentDto::from(updated))))
}

#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}/status",
    tag = "Appointments",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Appointment ID")),
    request_body = UpdateAppointmentStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<AppointmentDto>),
        (status = 400, description = "Invalid transition"),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_appointment_status(
    State(state): State<AppointmentHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
    Json(request): Json<UpdateAppointmentStatusRequest>,
) -> Result<Json<ApiResponse<AppointmentDto>>, (StatusCode, Json<ApiResponse<AppointmentDto>>)> {
    let Some(new_status) = parse_status(&request.status) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!(
                "Unknown status '{}'",
                request.status
            ))),
        ));
    };

    if new_status == AppointmentStatus::Scheduled {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                "Appointments cannot be moved back to scheduled",
            )),
        ));
    }

    let model = appointment::Entity::find_by_id(&id)
        .one(&state.db)
        .await
        .map_err(internal_error)?;

    let Some(model) = model else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Appointment '{}' not found", id))),
        ));
    };

    // Terminal states are final
    if model.status != AppointmentStatus::Scheduled {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format!(
                "Appointment is already {}",
                model.status
            ))),
        ));
    }

    let mut active: appointment::ActiveModel = model.into();
    active.status = Set(new_status.clone());
    if let Some(v) = request.notes {
        active.notes = Set(Some(v));
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await.map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "UPDATE_APPOINTMENT_STATUS",
        "appointment",
        Some(id),
        Some(json!({"status": new_status.to_string()})),
        meta,
    );

    Ok(Json(ApiResponse::success(AppointmentDto::from(updated))))
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
    use axum::routing::{post, put};
    use axum::Router;
    use chrono::TimeZone;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn seed_doctor(db: &sea_orm::DatabaseConnection, id: &str) {
        let now = Utc::now();
        user::ActiveModel {
            id: Set(id.to_string()),
            username: Set(format!("dr-{}", id)),
            email: Set(format!("{}@example.com", id)),
            password_hash: Set("hash".to_string()),
            role: Set(user::UserRole::Doctor),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
            password_changed_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap();
    }

    async fn test_state() -> AppointmentHandlerState {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        seed_doctor(&db, "doc-1").await;
        seed_doctor(&db, "doc-2").await;

        // Seed one patient
        let now = Utc::now();
        patient::ActiveModel {
            id: Set("p-1".to_string()),
            first_name: Set("Ada".to_string()),
            last_name: Set("Lovelace".to_string()),
            date_of_birth: Set(None),
            gender: Set(None),
            blood_group: Set(None),
            phone: Set(None),
            email: Set(None),
            address: Set(None),
            user_id: Set(None),
            assigned_doctor_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&db)
        .await
        .unwrap();

        let audit = Arc::new(AuditRecorder::new(Arc::new(AuditLogRepository::new(
            db.clone(),
        ))));
        AppointmentHandlerState { db, audit }
    }

    fn test_app(state: AppointmentHandlerState) -> Router {
        let actor = AuthenticatedUser {
            user_id: "staff-1".to_string(),
            username: "reception".to_string(),
            role: UserRole::Receptionist,
        };
        Router::new()
            .route("/appointments", post(create_appointment))
            .route("/appointments/{id}/status", put(update_appointment_status))
            .layer(Extension(actor))
            .with_state(state)
    }

    fn create_request(doctor_id: &str, at: DateTime<Utc>) -> Request<Body> {
        let body = json!({
            "patient_id": "p-1",
            "doctor_id": doctor_id,
            "scheduled_at": at,
        });
        Request::builder()
            .method("POST")
            .uri("/appointments")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_double_booking_rejected() {
        let state = test_state().await;
        let app = test_app(state);
        let slot = Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0).unwrap();

        let first = app.clone().oneshot(create_request("doc-1", slot)).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app.clone().oneshot(create_request("doc-1", slot)).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);

        // A different doctor can take the same slot
        let other = app.oneshot(create_request("doc-2", slot)).await.unwrap();
        assert_eq!(other.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_unknown_doctor_rejected() {
        let state = test_state().await;
        let app = test_app(state);
        let slot = Utc.with_ymd_and_hms(2026, 9, 1, 11, 0, 0).unwrap();

        let resp = app
            .oneshot(create_request("no-such-doctor", slot))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cancelled_slot_can_be_rebooked() {
        let state = test_state().await;
        let app = test_app(state.clone());
        let slot = Utc.with_ymd_and_hms(2026, 9, 2, 9, 30, 0).unwrap();

        let first = app.clone().oneshot(create_request("doc-1", slot)).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let id = {
            let bytes = axum::body::to_bytes(first.into_body(), usize::MAX).await.unwrap();
            let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            v["data"]["id"].as_str().unwrap().to_string()
        };

        let cancel = Request::builder()
            .method("PUT")
            .uri(format!("/appointments/{}/status", id))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"status": "cancelled"}"#))
            .unwrap();
        let resp = app.clone().oneshot(cancel).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let rebook = app.oneshot(create_request("doc-1", slot)).await.unwrap();
        assert_eq!(rebook.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_terminal_status_is_final() {
        let state = test_state().await;
        let app = test_app(state);
        let slot = Utc.with_ymd_and_hms(2026, 9, 3, 14, 0, 0).unwrap();

        let created = app.clone().oneshot(create_request("doc-1", slot)).await.unwrap();
        let id = {
            let bytes = axum::body::to_bytes(created.into_body(), usize::MAX).await.unwrap();
            let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            v["data"]["id"].as_str().unwrap().to_string()
        };

        let complete = Request::builder()
            .method("PUT")
            .uri(format!("/appointments/{}/status", id))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"status": "completed"}"#))
            .unwrap();
        assert_eq!(
            app.clone().oneshot(complete).await.unwrap().status(),
            StatusCode::OK
        );

        let cancel = Request::builder()
            .method("PUT")
            .uri(format!("/appointments/{}/status", id))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"status": "cancelled"}"#))
            .unwrap();
        assert_eq!(
            app.oneshot(cancel).await.unwrap().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
