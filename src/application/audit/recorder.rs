//! Append-only activity trail recorder
//!
//! Writes are fire-and-forget: the primary response never waits on the
//! audit insert, and an insert failure is logged but not surfaced.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::AuthenticatedUser;
use crate::domain::{AuditRecord, AuditRepositoryInterface, GetAuditDto, NewAuditRecord};
use crate::shared::{DomainResult, PaginatedResult};

/// Request metadata captured alongside each audit entry
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

pub struct AuditRecorder<R: AuditRepositoryInterface + 'static> {
    repo: Arc<R>,
}

impl<R: AuditRepositoryInterface + 'static> AuditRecorder<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Record an action (fire and forget)
    pub fn record(
        &self,
        actor: Option<&AuthenticatedUser>,
        action: &str,
        entity_type: &str,
        entity_id: Option<String>,
        details: Option<Value>,
        meta: RequestMeta,
    ) {
        let record = NewAuditRecord {
            actor_id: actor.map(|u| u.user_id.clone()),
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            details,
            ip_address: meta.ip_address,
            user_agent: meta.user_agent,
        };

        debug!(action = %record.action, entity_type = %record.entity_type, "Recording audit entry");

        let repo = self.repo.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.append(record).await {
                warn!("Failed to write audit entry: {}", e);
            }
        });
    }

    /// Query the audit trail (admin only at the HTTP layer)
    pub async fn list(&self, dto: GetAuditDto) -> DomainResult<PaginatedResult<AuditRecord>> {
        self.repo.list(dto).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::migrator::Migrator;
    use crate::infrastructure::database::repositories::AuditLogRepository;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;
    use serde_json::json;

    async fn recorder() -> AuditRecorder<AuditLogRepository> {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        AuditRecorder::new(Arc::new(AuditLogRepository::new(db)))
    }

    #[tokio::test]
    async fn test_record_and_list() {
        let recorder = recorder().await;

        recorder.record(
            None,
            "CREATE_PATIENT",
            "patient",
            Some("p-1".to_string()),
            Some(json!({"first_name": "Ada"})),
            RequestMeta::default(),
        );

        // The insert runs on a spawned task
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let page = recorder.list(GetAuditDto::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].action, "CREATE_PATIENT");
        assert_eq!(page.items[0].entity_id.as_deref(), Some("p-1"));
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        use sea_orm::ConnectionTrait;

        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let recorder = AuditRecorder::new(Arc::new(AuditLogRepository::new(db.clone())));

        // Break the sink
        db.execute_unprepared("DROP TABLE audit_logs").await.unwrap();

        // Must not panic the caller or the runtime
        recorder.record(None, "CREATE_PATIENT", "patient", None, None, RequestMeta::default());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_action_filter() {
        let recorder = recorder().await;

        recorder.record(None, "CREATE_PATIENT", "patient", None, None, RequestMeta::default());
        recorder.record(None, "PAY_INVOICE", "invoice", None, None, RequestMeta::default());

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let dto = GetAuditDto {
            action: Some("PAY_INVOICE".to_string()),
            ..Default::default()
        };
        let page = recorder.list(dto).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].entity_type, "invoice");
    }
}
