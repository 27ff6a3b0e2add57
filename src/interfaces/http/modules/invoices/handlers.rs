//! Invoice API handlers
//!
//! Lifecycle: draft -> issued -> paid, with cancellation allowed while
//! the invoice is still unpaid.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde_json::json;

use super::dto::{CreateInvoiceRequest, InvoiceDto, ListInvoicesParams};
use crate::application::RequestMeta;
use crate::auth::AuthenticatedUser;
use crate::infrastructure::database::entities::invoice::{self, InvoiceStatus};
use crate::infrastructure::database::entities::patient;
use crate::interfaces::http::common::{ApiResponse, PaginatedResponse, ValidatedJson};
use crate::interfaces::http::modules::SharedAudit;

/// Invoice handler state
#[derive(Clone)]
pub struct InvoiceHandlerState {
    pub db: DatabaseConnection,
    pub audit: SharedAudit,
}

fn internal_error<T>(e: impl std::fmt::Display) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error(e.to_string())),
    )
}

fn parse_status(raw: &str) -> Option<InvoiceStatus> {
    match raw {
        "draft" => Some(InvoiceStatus::Draft),
        "issued" => Some(InvoiceStatus::Issued),
        "paid" => Some(InvoiceStatus::Paid),
        "cancelled" => Some(InvoiceStatus::Cancelled),
        _ => None,
    }
}

async fn find_invoice(
    db: &DatabaseConnection,
    id: &str,
) -> Result<invoice::Model, (StatusCode, Json<ApiResponse<InvoiceDto>>)> {
    invoice::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(format!("Invoice '{}' not found", id))),
            )
        })
}

#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    tag = "Invoices",
    security(("bearer_auth" = [])),
    params(ListInvoicesParams),
    responses(
        (status = 200, description = "Invoice list", body = PaginatedResponse<InvoiceDto>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_invoices(
    State(state): State<InvoiceHandlerState>,
    Query(params): Query<ListInvoicesParams>,
) -> Result<Json<PaginatedResponse<InvoiceDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    let page = params.page.max(1);
    let limit = params.page_size.clamp(1, 100);

    let mut query = invoice::Entity::find();

    if let Some(ref patient_id) = params.patient_id {
        query = query.filter(invoice::Column::PatientId.eq(patient_id.clone()));
    }
    if let Some(status) = params.status.as_deref().and_then(parse_status) {
        query = query.filter(invoice::Column::Status.eq(status));
    }

    query = query.order_by_desc(invoice::Column::CreatedAt);

    let total = query.clone().count(&state.db).await.map_err(internal_error)?;
    let models = query
        .offset(((page - 1) * limit) as u64)
        .limit(limit as u64)
        .all(&state.db)
        .await
        .map_err(internal_error)?;

    let items: Vec<InvoiceDto> = models.into_iter().map(InvoiceDto::from).collect();
    Ok(Json(PaginatedResponse::new(items, total, page, limit)))
}

#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    tag = "Invoices",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice details", body = ApiResponse<InvoiceDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_invoice(
    State(state): State<InvoiceHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<InvoiceDto>>, (StatusCode, Json<ApiResponse<InvoiceDto>>)> {
    let model = find_invoice(&state.db, &id).await?;
    Ok(Json(ApiResponse::success(InvoiceDto::from(model))))
}

#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    tag = "Invoices",
    security(("bearer_auth" = [])),
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Draft invoice created", body = ApiResponse<InvoiceDto>),
        (status = 400, description = "Invalid line items"),
        (status = 404, description = "Patient not found")
    )
)]
pub async fn create_invoice(
    State(state): State<InvoiceHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InvoiceDto>>), (StatusCode, Json<ApiResponse<InvoiceDto>>)>
{
    if request
        .items
        .iter()
        .any(|i| i.quantity <= 0 || i.unit_price < Decimal::ZERO)
    {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                "Line items need a positive quantity and a non-negative price",
            )),
        ));
    }

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

    let total: Decimal = request.items.iter().map(|i| i.line_total()).sum();
    let items_json = serde_json::to_string(&request.items).map_err(internal_error)?;

    let now = Utc::now();
    let new_invoice = invoice::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        patient_id: Set(request.patient_id),
        items: Set(items_json),
        total_amount: Set(total),
        status: Set(InvoiceStatus::Draft),
        paid_at: Set(None),
        created_by: Set(Some(actor.user_id.clone())),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = new_invoice.insert(&state.db).await.map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "CREATE_INVOICE",
        "invoice",
        Some(model.id.clone()),
        Some(json!({"total_amount": model.total_amount})),
        meta,
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(InvoiceDto::from(model))),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/issue",
    tag = "Invoices",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice issued", body = ApiResponse<InvoiceDto>),
        (status = 400, description = "Invoice is not a draft"),
        (status = 404, description = "Not found")
    )
)]
pub async fn issue_invoice(
    State(state): State<InvoiceHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> Result<Json<ApiResponse<InvoiceDto>>, (StatusCode, Json<ApiResponse<InvoiceDto>>)> {
    let model = find_invoice(&state.db, &id).await?;

    if model.status != InvoiceStatus::Draft {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Invoice is not a draft")),
        ));
    }

    let mut active: invoice::ActiveModel = model.into();
    active.status = Set(InvoiceStatus::Issued);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await.map_err(internal_error)?;

    state
        .audit
        .record(Some(&actor), "ISSUE_INVOICE", "invoice", Some(id), None, meta);

    Ok(Json(ApiResponse::success(InvoiceDto::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/pay",
    tag = "Invoices",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice marked paid", body = ApiResponse<InvoiceDto>),
        (status = 400, description = "Invoice is not issued"),
        (status = 404, description = "Not found")
    )
)]
pub async fn pay_invoice(
    State(state): State<InvoiceHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> Result<Json<ApiResponse<InvoiceDto>>, (StatusCode, Json<ApiResponse<InvoiceDto>>)> {
    let model = find_invoice(&state.db, &id).await?;

    if model.status != InvoiceStatus::Issued {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Invoice is not issued")),
        ));
    }

    let mut active: invoice::ActiveModel = model.into();
    active.status = Set(InvoiceStatus::Paid);
    active.paid_at = Set(Some(Utc::now()));
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await.map_err(internal_error)?;

    state
        .audit
        .record(Some(&actor), "PAY_INVOICE", "invoice", Some(id), None, meta);

    Ok(Json(ApiResponse::success(InvoiceDto::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/invoices/{id}/cancel",
    tag = "Invoices",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice cancelled", body = ApiResponse<InvoiceDto>),
        (status = 400, description = "Paid invoices cannot be cancelled"),
        (status = 404, description = "Not found")
    )
)]
pub async fn cancel_invoice(
    State(state): State<InvoiceHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> Result<Json<ApiResponse<InvoiceDto>>, (StatusCode, Json<ApiResponse<InvoiceDto>>)> {
    let model = find_invoice(&state.db, &id).await?;

    if matches!(model.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                "Paid or cancelled invoices cannot be cancelled",
            )),
        ));
    }

    let mut active: invoice::ActiveModel = model.into();
    active.status = Set(InvoiceStatus::Cancelled);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await.map_err(internal_error)?;

    state
        .audit
        .record(Some(&actor), "CANCEL_INVOICE", "invoice", Some(id), None, meta);

    Ok(Json(ApiResponse::success(InvoiceDto::from(updated))))
}

#[cfg(test)]
mod tests {
    use super::super::dto::InvoiceItem;
    use rust_decimal::Decimal;

    #[test]
    fn line_total_multiplies_quantity() {
        let item = InvoiceItem {
            description: "Consultation".to_string(),
            quantity: 3,
            unit_price: Decimal::new(1550, 2),
        };
        assert_eq!(item.line_total(), Decimal::new(4650, 2));
    }
}
