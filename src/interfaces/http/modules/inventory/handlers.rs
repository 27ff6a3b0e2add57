//! Inventory API handlers
//!
//! Pharmacy stock keeping. Stock moves through explicit adjustments
//! (or prescription dispensing) and can never go negative. Items are
//! deactivated rather than deleted so historical prescriptions keep a
//! valid reference.

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
use sea_orm::sea_query::Expr;
use serde_json::json;

use super::dto::{
    AdjustStockRequest, CreateInventoryItemRequest, InventoryItemDto, ListInventoryParams,
    UpdateInventoryItemRequest,
};
use crate::application::RequestMeta;
use crate::auth::AuthenticatedUser;
use crate::infrastructure::database::entities::inventory_item;
use crate::interfaces::http::common::{ApiResponse, PaginatedResponse, ValidatedJson};
use crate::interfaces::http::modules::SharedAudit;

/// Inventory handler state
#[derive(Clone)]
pub struct InventoryHandlerState {
    pub db: DatabaseConnection,
    pub audit: SharedAudit,
}

fn internal_error<T>(e: impl std::fmt::Display) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error(e.to_string())),
    )
}

async fn find_item(
    db: &DatabaseConnection,
    id: &str,
) -> Result<inventory_item::Model, (StatusCode, Json<ApiResponse<InventoryItemDto>>)> {
    inventory_item::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(internal_error)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(format!(
                    "Inventory item '{}' not found",
                    id
                ))),
            )
        })
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(ListInventoryParams),
    responses(
        (status = 200, description = "Inventory list", body = PaginatedResponse<InventoryItemDto>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_inventory(
    State(state): State<InventoryHandlerState>,
    Query(params): Query<ListInventoryParams>,
) -> Result<Json<PaginatedResponse<InventoryItemDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    let page = params.page.max(1);
    let limit = params.page_size.clamp(1, 100);

    let mut query = inventory_item::Entity::find();

    if let Some(ref search) = params.search {
        query = query.filter(inventory_item::Column::Name.contains(search));
    }
    if let Some(ref category) = params.category {
        query = query.filter(inventory_item::Column::Category.eq(category.clone()));
    }
    if !params.include_inactive {
        query = query.filter(inventory_item::Column::IsActive.eq(true));
    }

    query = query.order_by_asc(inventory_item::Column::Name);

    let total = query.clone().count(&state.db).await.map_err(internal_error)?;
    let models = query
        .offset(((page - 1) * limit) as u64)
        .limit(limit as u64)
        .all(&state.db)
        .await
        .map_err(internal_error)?;

    let items: Vec<InventoryItemDto> = models.into_iter().map(InventoryItemDto::from).collect();
    Ok(Json(PaginatedResponse::new(items, total, page, limit)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/low-stock",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active items at or below their reorder level", body = ApiResponse<Vec<InventoryItemDto>>)
    )
)]
pub async fn list_low_stock(
    State(state): State<InventoryHandlerState>,
) -> Result<Json<ApiResponse<Vec<InventoryItemDto>>>, (StatusCode, Json<ApiResponse<()>>)> {
    let models = inventory_item::Entity::find()
        .filter(inventory_item::Column::IsActive.eq(true))
        .filter(
            Expr::col(inventory_item::Column::Quantity)
                .lte(Expr::col(inventory_item::Column::ReorderLevel)),
        )
        .order_by_asc(inventory_item::Column::Quantity)
        .all(&state.db)
        .await
        .map_err(internal_error)?;

    let items: Vec<InventoryItemDto> = models.into_iter().map(InventoryItemDto::from).collect();
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/inventory/{id}",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Item details", body = ApiResponse<InventoryItemDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_inventory_item(
    State(state): State<InventoryHandlerState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<InventoryItemDto>>, (StatusCode, Json<ApiResponse<InventoryItemDto>>)>
{
    let model = find_item(&state.db, &id).await?;
    Ok(Json(ApiResponse::success(InventoryItemDto::from(model))))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    request_body = CreateInventoryItemRequest,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<InventoryItemDto>),
        (status = 409, description = "Item name already exists")
    )
)]
pub async fn create_inventory_item(
    State(state): State<InventoryHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<CreateInventoryItemRequest>,
) -> Result<
    (StatusCode, Json<ApiResponse<InventoryItemDto>>),
    (StatusCode, Json<ApiResponse<InventoryItemDto>>),
> {
    let now = Utc::now();
    let new_item = inventory_item::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        name: Set(request.name),
        category: Set(request.category),
        unit: Set(request.unit),
        quantity: Set(request.quantity),
        reorder_level: Set(request.reorder_level),
        unit_price: Set(request.unit_price),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let model = new_item.insert(&state.db).await.map_err(|e| {
        if e.to_string().contains("UNIQUE") {
            (
                StatusCode::CONFLICT,
                Json(ApiResponse::error("Item name already exists")),
            )
        } else {
            internal_error(e)
        }
    })?;

    state.audit.record(
        Some(&actor),
        "CREATE_INVENTORY_ITEM",
        "inventory_item",
        Some(model.id.clone()),
        Some(json!({"name": model.name, "quantity": model.quantity})),
        meta,
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(InventoryItemDto::from(model))),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory/{id}",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Inventory item ID")),
    request_body = UpdateInventoryItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<InventoryItemDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn update_inventory_item(
    State(state): State<InventoryHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
    ValidatedJson(request): ValidatedJson<UpdateInventoryItemRequest>,
) -> Result<Json<ApiResponse<InventoryItemDto>>, (StatusCode, Json<ApiResponse<InventoryItemDto>>)>
{
    let model = find_item(&state.db, &id).await?;

    let mut active: inventory_item::ActiveModel = model.into();
    if let Some(v) = request.name {
        active.name = Set(v);
    }
    if let Some(v) = request.category {
        active.category = Set(Some(v));
    }
    if let Some(v) = request.unit {
        active.unit = Set(Some(v));
    }
    if let Some(v) = request.reorder_level {
        active.reorder_level = Set(v);
    }
    if let Some(v) = request.unit_price {
        active.unit_price = Set(v);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&state.db).await.map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "UPDATE_INVENTORY_ITEM",
        "inventory_item",
        Some(id),
        None,
        meta,
    );

    Ok(Json(ApiResponse::success(InventoryItemDto::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/inventory/{id}/adjust-stock",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Inventory item ID")),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = ApiResponse<InventoryItemDto>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Adjustment would drive stock negative")
    )
)]
pub async fn adjust_stock(
    State(state): State<InventoryHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
    Json(request): Json<AdjustStockRequest>,
) -> Result<Json<ApiResponse<InventoryItemDto>>, (StatusCode, Json<ApiResponse<InventoryItemDto>>)>
{
    let model = find_item(&state.db, &id).await?;

    let new_quantity = model.quantity + request.delta;
    if new_quantity < 0 {
        return Err((
            StatusCode::CONFLICT,
            Json(ApiResponse::error(format!(
                "Cannot remove {} units: only {} on hand",
                -request.delta, model.quantity
            ))),
        ));
    }

    let mut active: inventory_item::ActiveModel = model.into();
    active.quantity = Set(new_quantity);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await.map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "ADJUST_STOCK",
        "inventory_item",
        Some(id),
        Some(json!({"delta": request.delta, "reason": request.reason, "quantity": new_quantity})),
        meta,
    );

    Ok(Json(ApiResponse::success(InventoryItemDto::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/{id}",
    tag = "Inventory",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Item deactivated"),
        (status = 404, description = "Not found")
    )
)]
pub async fn deactivate_inventory_item(
    State(state): State<InventoryHandlerState>,
    Extension(actor): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    meta: RequestMeta,
) -> Result<Json<ApiResponse<InventoryItemDto>>, (StatusCode, Json<ApiResponse<InventoryItemDto>>)>
{
    let model = find_item(&state.db, &id).await?;

    let mut active: inventory_item::ActiveModel = model.into();
    active.is_active = Set(false);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await.map_err(internal_error)?;

    state.audit.record(
        Some(&actor),
        "DEACTIVATE_INVENTORY_ITEM",
        "inventory_item",
        Some(id),
        None,
        meta,
    );

    Ok(Json(ApiResponse::success(InventoryItemDto::from(updated))))
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

    async fn test_state() -> InventoryHandlerState {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let now = Utc::now();

        inventory_item::ActiveModel {
            id: Set("inv-1".to_string()),
            name: Set("Saline 0.9%".to_string()),
            category: Set(None),
            unit: Set(Some("bag".to_string())),
            quantity: Set(3),
            reorder_level: Set(2),
            unit_price: Set(Decimal::new(499, 2)),
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
        InventoryHandlerState { db, audit }
    }

    fn test_app(state: InventoryHandlerState) -> Router {
        let actor = AuthenticatedUser {
            user_id: "ph-1".to_string(),
            username: "pharmacist".to_string(),
            role: UserRole::Pharmacist,
        };
        Router::new()
            .route("/inventory/{id}/adjust-stock", post(adjust_stock))
            .layer(Extension(actor))
            .with_state(state)
    }

    async fn adjust(app: &Router, delta: i32) -> axum::http::Response<Body> {
        let req = Request::builder()
            .method("POST")
            .uri("/inventory/inv-1/adjust-stock")
            .header("content-type", "application/json")
            .body(Body::from(format!(r#"{{"delta": {}}}"#, delta)))
            .unwrap();
        app.clone().oneshot(req).await.unwrap()
    }

    #[tokio::test]
    async fn test_stock_never_negative() {
        let state = test_state().await;
        let app = test_app(state.clone());

        let resp = adjust(&app, -5).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let item = inventory_item::Entity::find_by_id("inv-1")
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.quantity, 3);
    }

    #[tokio::test]
    async fn test_adjust_to_exactly_zero_allowed() {
        let state = test_state().await;
        let app = test_app(state.clone());

        let resp = adjust(&app, -3).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let item = inventory_item::Entity::find_by_id("inv-1")
            .one(&state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.quantity, 0);
        assert!(item.needs_reorder());
    }
}
