use chrono::{DateTime, Utc};

/// Append-only audit trail entry.
///
/// Written for every state-mutating request; never updated or deleted
/// by the application.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub id: String,
    /// Acting user; `None` for unauthenticated or system actions.
    pub actor_id: Option<String>,
    /// Action verb, e.g. `CREATE_PATIENT`.
    pub action: String,
    /// Entity type acted upon, e.g. `patient`.
    pub entity_type: String,
    pub entity_id: Option<String>,
    /// Free-form detail payload.
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for a new audit record (id and timestamp are assigned on write).
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub actor_id: Option<String>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Audit listing filters
#[derive(Debug, Clone, Default)]
pub struct GetAuditDto {
    pub actor_id: Option<String>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}
