//! Prescription API handlers
//!
//! Doctors write prescriptions; pharmacists dispense them. Dispensing
//! decrements inventory stock inside one transaction: if any line item
//! lacks stock the whole dispense is rejected and nothing changes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;

use super::dto::{
    CreatePrescriptionRequest, DispenseResponse, ListPrescriptionsParams, PrescriptionDto,
};
use crate::application::RequestMeta;
use crate::auth::AuthenticatedUser;
use crate::infrastructure::database::entities::inventory_item;
use crate::infrastructure::database::entities::patient;
use crate::infrastructure::database::entities::prescription::{self, PrescriptionStatus};
use crate::interfaces::http::common::{ApiResponse, PaginatedResponse, ValidatedJson};
use crate::interfaces::http::modules::SharedAudit;

/// Prescription handler state
#[derive(Clone)]
pub struct PrescriptionHandlerState {
    pub db: DatabaseConnection,
    pub audit: SharedAudit,
}

fn internal_error<T>(e: impl std::fmt::Display) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error(e.to_string())),
    )
}

fn parse_status(raw: &str) -> Option<PrescriptionStatus> {
    match raw {
        "pending" => Some(PrescriptionStatus::Pending),
        "dispensed" => Some(PrescriptionStatus::Dispensed),
        "cancelled" => Some(PrescriptionStatus::Cancelled),
        _ => None,
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/prescriptions",
    tag = "Prescriptions",
    security(("bearer_auth" = [])),
    params(ListPrescriptionsParams),
    responses(
        (status = 200, description = "Prescription list", body = PaginatedResponse<PrescriptionDto>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_prescriptions(
    State(state): State<PrescriptionHandlerState>,
    Query(params): Query<ListPrescriptionsParams>,
) -> Result<Json<PaginatedResponse<PrescriptionDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    let page = params.page.max(1);
    let limit = params.page_size.clamp(1, 100);

    let mut query = prescription::Entity::find();

    if let Some(ref patient_id) = params.patient_id {
        query = query.filter(prescription::Column::PatientId.eq(patient_id.clone()));
    }
    if let Some(ref doctor_id) = params.doctor_id {
        query = query.filter(prescription::Column::DoctorId.eq(doctor_id.clone()));
    }
    if let Some(status) = params.status.as_deref().and_then(parse_status) {
        query = query.filter(prescription::Column::Status.eq(status));
    }

    query = query.order_by_desc(prescription::Column::CreatedAt);

    let total = query.clone().count(&state.db).await.map_err(internal_error)?;
    let models = query
        .offset(((page - 1) * limit) as u64)
        .limit(limit as u64)
        .all(&state.db)
        .await
        .map_err(internal_error)?;

    let items: Vec<PrescriptionDto> = models.into_iter().map(PrescriptionDto::from).collect();
    Ok(Json(PaginatedResponse::new(items, total, page, limit)))
}

#[utoipa::path(
    get,
    path = "/api/v1/prescriptions/{id}",
    tag = "Prescriptions",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Prescription ID")),
    responses(
        (status = 200, description = "Prescription details", body = ApiResponse<PrescriptionDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_prescription(
    State(state): State<PrescriptionHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PrescriptionDto>>, (StatusCode, Json<ApiResponse<PrescriptionDto>>)> {
    let model = prescription::Entity::find_by_id(&id)
        .one(&state.db)
        .await
        .map_err(internal_error)?;

    match model {
        Some(model) => Ok(Json(ApiResponse::success(PrescriptionDto::from(model)))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "Prescription '{}' not found",
                id
            ))),
        )),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/prescriptions",
    tag = "Prescriptions",
    security(("bearer_auth" = [])),
    request_body = CreatePrescriptionRequest,
    responses(
        (status = 201, description = "Prescription created", body = ApiResponse<PrescriptionDto>),
        (status = 404, description = "Patient not found"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_prescription(
    State(state): State<PrescriptionHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<CreatePrescriptionRequest>,
) -> Result<
    (StatusCode, Json<ApiResponse<PrescriptionDto>>),
    (StatusCode, Json<ApiResponse<PrescriptionDto>>),
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

    let items_json = serde_json::to_string(&request.items).map_err(internal_error)?;

    let now = Utc::now();
    let new_prescription = prescription::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        patient_id: Set(request.patient_id),
        doctor_id: Set(actor.user_id.clone()),
        items: Set(items_json),
        status: Set(PrescriptionStatus::Pending),
        notes: Set(request.notes),
        dispensed_by: Set(None),
        dispensed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = new_prescription
        .insert(&state.db)
        .await
        .map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "CREATE_PRESCRIPTION",
        "prescription",
        Some(model.id.clone()),
        Some(json!({"patient_id": model.patient_id, "item_count": request.items.len()})),
        meta,
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(PrescriptionDto::from(model))),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/prescriptions/{id}/dispense",
    tag = "Prescriptions",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Prescription ID")),
    responses(
        (status = 200, description = "Dispensed; stock decremented", body = ApiResponse<DispenseResponse>),
        (status = 400, description = "Prescription is not pending"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Insufficient stock")
    )
)]
pub async fn dispense_prescription(
    State(state): State<PrescriptionHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> Result<Json<ApiResponse<DispenseResponse>>, (StatusCode, Json<ApiResponse<DispenseResponse>>)>
{
    let model = prescription::Entity::find_by_id(&id)
        .one(&state.db)
        .await
        .map_err(internal_error)?;

    let Some(model) = model else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "Prescription '{}' not found",
                id
            ))),
        ));
    };

    if model.status != PrescriptionStatus::Pending {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Prescription is not pending")),
        ));
    }

    let items: Vec<super::dto::PrescriptionItem> =
        serde_json::from_str(&model.items).map_err(internal_error)?;

    let txn = state.db.begin().await.map_err(internal_error)?;
    let mut reorder_flagged = Vec::new();

    for item in items.iter().filter(|i| i.item_id.is_some()) {
        let item_id = item.item_id.as_deref().unwrap_or_default();
        let stock = inventory_item::Entity::find_by_id(item_id)
            .one(&txn)
            .await
            .map_err(internal_error)?;

        let Some(stock) = stock else {
            txn.rollback().await.ok();
            return Err((
                StatusCode::CONFLICT,
                Json(ApiResponse::error(format!(
                    "Inventory item '{}' not found",
                    item_id
                ))),
            ));
        };

        if stock.quantity < item.quantity {
            txn.rollback().await.ok();
            return Err((
                StatusCode::CONFLICT,
                Json(ApiResponse::error(format!(
                    "Insufficient stock for '{}': {} on hand, {} requested",
                    stock.name, stock.quantity, item.quantity
                ))),
            ));
        }

        let remaining = stock.quantity - item.quantity;
        let name = stock.name.clone();
        let reorder_level = stock.reorder_level;

        let mut active: inventory_item::ActiveModel = stock.into();
        active.quantity = Set(remaining);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await.map_err(internal_error)?;

        if remaining <= reorder_level {
            reorder_flagged.push(name);
        }
    }

    let mut active: prescription::ActiveModel = model.into();
    active.status = Set(PrescriptionStatus::Dispensed);
    active.dispensed_by = Set(Some(actor.user_id.clone()));
    active.dispensed_at = Set(Some(Utc::now()));
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await.map_err(internal_error)?;

    txn.commit().await.map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "DISPENSE_PRESCRIPTION",
        "prescription",
        Some(id),
        Some(json!({"reorder_flagged": reorder_flagged})),
        meta,
    );

    Ok(Json(ApiResponse::success(DispenseResponse {
        prescription: PrescriptionDto::from(updated),
        reorder_flagged,
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/prescriptions/{id}/cancel",
    tag = "Prescriptions",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Prescription ID")),
    responses(
        (status = 200, description = "Prescription cancelled", body = ApiResponse<PrescriptionDto>),
        (status = 400, description = "Prescription is not pending"),
        (status = 404, description = "Not found")
    )
)]
pub async fn cancel_prescription(
    State(state): State<PrescriptionHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> Result<Json<ApiResponse<PrescriptionDto>>, (StatusCode, Json<ApiResponse<PrescriptionDto>>)> {
    let model = prescription::Entity::find_by_id(&id)
        .one(&state.db)
        .await
        .map_err(internal_error)?;

    let Some(model) = model else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!(
                "Prescription '{}' not found",
                id
            ))),
        ));
    };

    if model.status != PrescriptionStatus::Pending {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Prescription is not pending")),
        ));
    }

    let mut active: prescription::ActiveModel = model.into();
    active.status = Set(PrescriptionStatus::Cancelled);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await.map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "CANCEL_PRESCRIPTION",
        "prescription",
        Some(id),
        None,
        meta,
    );

    Ok(Json(ApiResponse::success(PrescriptionDto::from(updated))))
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
    use rust_decimal::Decimal;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn test_state() -> PrescriptionHandlerState {
        use crate::infrastructure::database::entities::user;

        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let now = Utc::now();

        // Prescribing doctor, also the dispensing actor in these tests
        user::ActiveModel {
            id: Set("doc-1".to_string()),
            username: Set("drwho".to_string()),
            email: Set("drwho@example.com".to_string()),
            password_hash: Set("hash".to_string()),
            role: Set(user::UserRole::Doctor),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
            password_changed_at: Set(now),
        }
        .insert(&db)
        .await
        .unwrap();

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

        // 10 on hand, reorder at 5
        inventory_item::ActiveModel {
            id: Set("inv-1".to_string()),
            name: Set("Amoxicillin 500mg".to_string()),
            category: Set(Some("antibiotic".to_string())),
            unit: Set(Some("capsule".to_string())),
            quantity: Set(10),
            reorder_level: Set(5),
            unit_price: Set(Decimal::new(250, 2)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&db)
        .await
        .unwrap();

        let audit = Arc::new(AuditRecorder::new(Arc::new(AuditLogRepository::new(
            db.clone(),
        ))));
        PrescriptionHandlerState { db, audit }
    }

    fn test_app(state: PrescriptionHandlerState) -> Router {
        let actor = AuthenticatedUser {
            user_id: "doc-1".to_string(),
            username: "drwho".to_string(),
            role: UserRole::Doctor,
        };
        Router::new()
            .route("/prescriptions", post(create_prescription))
            .route("/prescriptions/{id}/dispense", post(dispense_prescription))
            .layer(Extension(actor))
            .with_state(state)
    }

    async fn create_with_quantity(app: &Router, quantity: i32) -> String {
        let body = json!({
            "patient_id": "p-1",
            "items": [{
                "item_id": "inv-1",
                "drug": "Amoxicillin 500mg",
                "dosage": "1 capsule 3x daily",
                "duration": "7 days",
                "quantity": quantity,
            }],
        });
        let req = Request::builder()
            .method("POST")
            .uri("/prescriptions")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        v["data"]["id"].as_str().unwrap().to_string()
    }

    async fn dispense(app: &Router, id: &str) -> axum::http::Response<Body> {
        let req = Request::builder()
            .method("POST")
            .uri(format!("/prescriptions/{}/dispense", id))
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(req).await.unwrap()
    }

    #[tokio::test]
    async fn test_dispense_decrements_stock_and_flags_reorder() {
        let state = test_state().await;
        let app = test_app(state.clone());

        // 10 - 6 = 4, below the reorder level of 5
        let id = create_with_quantity(&app, 6).await;
        let resp = dispense(&app, &id).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["data"]["prescription"]["status"], "dispensed");
        assert_eq!(v["data"]["reorder_flagged"][0], "Amoxicillin 500mg");

        let stock = inventory_item::Entity::find_by_id("inv-1")
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stock.quantity, 4);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rejected_and_stock_unchanged() {
        let state = test_state().await;
        let app = test_app(state.clone());

        let id = create_with_quantity(&app, 11).await;
        let resp = dispense(&app, &id).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let stock = inventory_item::Entity::find_by_id("inv-1")
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stock.quantity, 10);

        // Prescription stays pending
        let p = prescription::Entity::find_by_id(&id)
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(p.status, PrescriptionStatus::Pending);
    }

    #[tokio::test]
    async fn test_double_dispense_rejected() {
        let state = test_state().await;
        let app = test_app(state);

        let id = create_with_quantity(&app, 2).await;
        assert_eq!(dispense(&app, &id).await.status(), StatusCode::OK);
        assert_eq!(dispense(&app, &id).await.status(), StatusCode::BAD_REQUEST);
    }
}
