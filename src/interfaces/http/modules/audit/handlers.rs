//! Audit trail API handlers
//!
//! Read-only. Records are written by [`crate::application::AuditRecorder`]
//! as a side effect of mutating requests; this module only exposes the
//! listing endpoint to administrators.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use super::dto::{AuditRecordDto, ListAuditParams};
use crate::domain::GetAuditDto;
use crate::interfaces::http::common::{error_status, ApiResponse, PaginatedResponse};
use crate::interfaces::http::modules::SharedAudit;

/// Audit handler state
#[derive(Clone)]
pub struct AuditHandlerState {
    pub audit: SharedAudit,
}

#[utoipa::path(
    get,
    path = "/api/v1/audit-logs",
    tag = "Audit",
    security(("bearer_auth" = [])),
    params(ListAuditParams),
    responses(
        (status = 200, description = "Audit records, newest first", body = PaginatedResponse<AuditRecordDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_audit_logs(
    State(state): State<AuditHandlerState>,
    Query(params): Query<ListAuditParams>,
) -> Result<Json<PaginatedResponse<AuditRecordDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    let dto = GetAuditDto {
        actor_id: params.actor_id,
        action: params.action,
        entity_type: params.entity_type,
        from: params.from,
        to: params.to,
        page: Some(params.page.max(1)),
        page_size: Some(params.page_size.clamp(1, 200)),
    };

    let result = state
        .audit
        .list(dto)
        .await
        .map_err(|e| (error_status(&e), Json(ApiResponse::error(e.to_string()))))?;

    let records: Vec<AuditRecordDto> =
        result.items.into_iter().map(AuditRecordDto::from).collect();
    Ok(Json(PaginatedResponse::new(
        records,
        result.total,
        result.page,
        result.limit,
    )))
}
