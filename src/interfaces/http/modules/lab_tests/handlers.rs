//! Lab test API handlers
//!
//! Doctors order tests; lab technicians pick them up and record the
//! result. Lifecycle: ordered -> in_progress -> completed, with
//! cancellation possible until the test is completed.

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

use super::dto::{CompleteLabTestRequest, LabTestDto, ListLabTestsParams, OrderLabTestRequest};
use crate::application::RequestMeta;
use crate::auth::AuthenticatedUser;
use crate::infrastructure::database::entities::lab_test::{self, LabTestStatus};
use crate::infrastructure::database::entities::patient;
use crate::interfaces::http::common::{ApiResponse, PaginatedResponse, ValidatedJson};
use crate::interfaces::http::modules::SharedAudit;

/// Lab test handler state
#[derive(Clone)]
pub struct LabTestHandlerState {
    pub db: DatabaseConnection,
    pub audit: SharedAudit,
}

fn internal_error<T>(e: impl std::fmt::Display) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error(e.to_string())),
    )
}

fn parse_status(raw: &str) -> Option<LabTestStatus> {
    match raw {
        "ordered" => Some(LabTestStatus::Ordered),
        "in_progress" => Some(LabTestStatus::InProgress),
        "completed" => Some(LabTestStatus::Completed),
        "cancelled" => Some(LabTestStatus::Cancelled),
        _ => None,
    }
}

async fn find_lab_test(
    db: &DatabaseConnection,
    id: &str,
) -> Result<lab_test::Model, (StatusCode, Json<ApiResponse<LabTestDto>>)> {
    lab_test::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(format!("Lab test '{}' not found", id))),
            )
        })
}

#[utoipa::path(
    get,
    path = "/api/v1/lab-tests",
    tag = "Lab Tests",
    security(("bearer_auth" = [])),
    params(ListLabTestsParams),
    responses(
        (status = 200, description = "Lab test list", body = PaginatedResponse<LabTestDto>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_lab_tests(
    State(state): State<LabTestHandlerState>,
    Query(params): Query<ListLabTestsParams>,
) -> Result<Json<PaginatedResponse<LabTestDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    let page = params.page.max(1);
    let limit = params.page_size.clamp(1, 100);

    let mut query = lab_test::Entity::find();

    if let Some(ref patient_id) = params.patient_id {
        query = query.filter(lab_test::Column::PatientId.eq(patient_id.clone()));
    }
    if let Some(status) = params.status.as_deref().and_then(parse_status) {
        query = query.filter(lab_test::Column::Status.eq(status));
    }
    if let Some(ref test_type) = params.test_type {
        query = query.filter(lab_test::Column::TestType.eq(test_type.clone()));
    }

    query = query.order_by_desc(lab_test::Column::CreatedAt);

    let total = query.clone().count(&state.db).await.map_err(internal_error)?;
    let models = query
        .offset(((page - 1) * limit) as u64)
        .limit(limit as u64)
        .all(&state.db)
        .await
        .map_err(internal_error)?;

    let items: Vec<LabTestDto> = models.into_iter().map(LabTestDto::from).collect();
    Ok(Json(PaginatedResponse::new(items, total, page, limit)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lab-tests/{id}",
    tag = "Lab Tests",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Lab test ID")),
    responses(
        (status = 200, description = "Lab test details", body = ApiResponse<LabTestDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_lab_test(
    State(state): State<LabTestHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<LabTestDto>>, (StatusCode, Json<ApiResponse<LabTestDto>>)> {
    let model = find_lab_test(&state.db, &id).await?;
    Ok(Json(ApiResponse::success(LabTestDto::from(model))))
}

#[utoipa::path(
    post,
    path = "/api/v1/lab-tests",
    tag = "Lab Tests",
    security(("bearer_auth" = [])),
    request_body = OrderLabTestRequest,
    responses(
        (status = 201, description = "Lab test ordered", body = ApiResponse<LabTestDto>),
        (status = 404, description = "Patient not found")
    )
)]
pub async fn order_lab_test(
    State(state): State<LabTestHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<OrderLabTestRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LabTestDto>>), (StatusCode, Json<ApiResponse<LabTestDto>>)>
{
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

    let now = Utc::now();
    let new_test = lab_test::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        patient_id: Set(request.patient_id),
        ordered_by: Set(actor.user_id.clone()),
        test_type: Set(request.test_type),
        status: Set(LabTestStatus::Ordered),
        result: Set(None),
        processed_by: Set(None),
        completed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = new_test.insert(&state.db).await.map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "ORDER_LAB_TEST",
        "lab_test",
        Some(model.id.clone()),
        Some(json!({"test_type": model.test_type})),
        meta,
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(LabTestDto::from(model))),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/lab-tests/{id}/start",
    tag = "Lab Tests",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Lab test ID")),
    responses(
        (status = 200, description = "Test moved to in progress", body = ApiResponse<LabTestDto>),
        (status = 400, description = "Test is not in the ordered state"),
        (status = 404, description = "Not found")
    )
)]
pub async fn start_lab_test(
    State(state): State<LabTestHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> Result<Json<ApiResponse<LabTestDto>>, (StatusCode, Json<ApiResponse<LabTestDto>>)> {
    let model = find_lab_test(&state.db, &id).await?;

    if model.status != LabTestStatus::Ordered {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Lab test is not in the ordered state")),
        ));
    }

    let mut active: lab_test::ActiveModel = model.into();
    active.status = Set(LabTestStatus::InProgress);
    active.processed_by = Set(Some(actor.user_id.clone()));
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await.map_err(internal_error)?;

    state
        .audit
        .record(Some(&actor), "START_LAB_TEST", "lab_test", Some(id), None, meta);

    Ok(Json(ApiResponse::success(LabTestDto::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/lab-tests/{id}/complete",
    tag = "Lab Tests",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Lab test ID")),
    request_body = CompleteLabTestRequest,
    responses(
        (status = 200, description = "Result recorded", body = ApiResponse<LabTestDto>),
        (status = 400, description = "Test is not in progress"),
        (status = 404, description = "Not found")
    )
)]
pub async fn complete_lab_test(
    State(state): State<LabTestHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
    Json(request): Json<CompleteLabTestRequest>,
) -> Result<Json<ApiResponse<LabTestDto>>, (StatusCode, Json<ApiResponse<LabTestDto>>)> {
    let model = find_lab_test(&state.db, &id).await?;

    if model.status != LabTestStatus::InProgress {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Lab test is not in progress")),
        ));
    }

    let result_json = serde_json::to_string(&request.result).map_err(internal_error)?;

    let mut active: lab_test::ActiveModel = model.into();
    active.status = Set(LabTestStatus::Completed);
    active.result = Set(Some(result_json));
    active.processed_by = Set(Some(actor.user_id.clone()));
    active.completed_at = Set(Some(Utc::now()));
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await.map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "COMPLETE_LAB_TEST",
        "lab_test",
        Some(id),
        None,
        meta,
    );

    Ok(Json(ApiResponse::success(LabTestDto::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/lab-tests/{id}/cancel",
    tag = "Lab Tests",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Lab test ID")),
    responses(
        (status = 200, description = "Lab test cancelled", body = ApiResponse<LabTestDto>),
        (status = 400, description = "Test already finished"),
        (status = 404, description = "Not found")
    )
)]
pub async fn cancel_lab_test(
    State(state): State<LabTestHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> Result<Json<ApiResponse<LabTestDto>>, (StatusCode, Json<ApiResponse<LabTestDto>>)> {
    let model = find_lab_test(&state.db, &id).await?;

    if matches!(
        model.status,
        LabTestStatus::Completed | LabTestStatus::Cancelled
    ) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Lab test already finished")),
        ));
    }

    let mut active: lab_test::ActiveModel = model.into();
    active.status = Set(LabTestStatus::Cancelled);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await.map_err(internal_error)?;

    state
        .audit
        .record(Some(&actor), "CANCEL_LAB_TEST", "lab_test", Some(id), None, meta);

    Ok(Json(ApiResponse::success(LabTestDto::from(updated))))
}
