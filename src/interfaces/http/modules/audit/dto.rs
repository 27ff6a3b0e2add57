use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::AuditRecord;

/// Audit trail entry as returned to administrators
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditRecordDto {
    pub id: String,
    pub actor_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditRecord> for AuditRecordDto {
    fn from(record: AuditRecord) -> Self {
        Self {
            id: record.id,
            actor_id: record.actor_id,
            action: record.action,
            entity_type: record.entity_type,
            entity_id: record.entity_id,
            details: record.details,
            ip_address: record.ip_address,
            user_agent: record.user_agent,
            created_at: record.created_at,
        }
    }
}

/// Audit listing filters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListAuditParams {
    /// Filter by acting user ID
    pub actor_id: Option<String>,
    /// Filter by action verb, e.g. `CREATE_PATIENT`
    pub action: Option<String>,
    /// Filter by entity type, e.g. `patient`
    pub entity_type: Option<String>,
    /// Inclusive lower bound on record time (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on record time (RFC 3339)
    pub to: Option<DateTime<Utc>>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    50
}
