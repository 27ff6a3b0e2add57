use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::domain::{AuditRecord, AuditRepositoryInterface, DomainError, GetAuditDto, NewAuditRecord};
use crate::infrastructure::database::entities::audit_log;
use crate::shared::{DomainResult, PaginatedResult};

pub struct AuditLogRepository {
    db: DatabaseConnection,
}

impl AuditLogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn audit_model_to_domain(model: audit_log::Model) -> AuditRecord {
    let details = model
        .details
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok());

    AuditRecord {
        id: model.id,
        actor_id: model.actor_id,
        action: model.action,
        entity_type: model.entity_type,
        entity_id: model.entity_id,
        details,
        ip_address: model.ip_address,
        user_agent: model.user_agent,
        created_at: model.created_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Validation(format!("Database error: {}", e))
}

#[async_trait]
impl AuditRepositoryInterface for AuditLogRepository {
    async fn append(&self, record: NewAuditRecord) -> DomainResult<()> {
        let details = match record.details {
            Some(value) => Some(
                serde_json::to_string(&value)
                    .map_err(|e| DomainError::Validation(format!("Invalid audit details: {}", e)))?,
            ),
            None => None,
        };

        let entry = audit_log::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            actor_id: Set(record.actor_id),
            action: Set(record.action),
            entity_type: Set(record.entity_type),
            entity_id: Set(record.entity_id),
            details: Set(details),
            ip_address: Set(record.ip_address),
            user_agent: Set(record.user_agent),
            created_at: Set(Utc::now()),
        };

        entry.insert(&self.db).await.map_err(db_err)?;

        Ok(())
    }

    async fn list(&self, dto: GetAuditDto) -> DomainResult<PaginatedResult<AuditRecord>> {
        let page = dto.page.unwrap_or(1).max(1);
        let page_size = dto.page_size.unwrap_or(50).clamp(1, 200);

        let mut query = audit_log::Entity::find();

        if let Some(ref actor_id) = dto.actor_id {
            query = query.filter(audit_log::Column::ActorId.eq(actor_id.clone()));
        }
        if let Some(ref action) = dto.action {
            query = query.filter(audit_log::Column::Action.eq(action.clone()));
        }
        if let Some(ref entity_type) = dto.entity_type {
            query = query.filter(audit_log::Column::EntityType.eq(entity_type.clone()));
        }
        if let Some(from) = dto.from {
            query = query.filter(audit_log::Column::CreatedAt.gte(from));
        }
        if let Some(to) = dto.to {
            query = query.filter(audit_log::Column::CreatedAt.lte(to));
        }

        query = query.order_by_desc(audit_log::Column::CreatedAt);

        let total = query.clone().count(&self.db).await.map_err(db_err)?;

        let offset = ((page - 1) * page_size) as u64;
        let models = query
            .offset(offset)
            .limit(page_size as u64)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let items: Vec<AuditRecord> = models.into_iter().map(audit_model_to_domain).collect();

        Ok(PaginatedResult::new(items, total, page, page_size))
    }
}
