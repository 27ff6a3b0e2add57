use async_trait::async_trait;

use super::{AuditRecord, GetAuditDto, NewAuditRecord};
use crate::shared::{DomainResult, PaginatedResult};

#[async_trait]
pub trait AuditRepositoryInterface: Send + Sync {
    /// Append one record. The store is append-only; there is no update
    /// or delete counterpart.
    async fn append(&self, record: NewAuditRecord) -> DomainResult<()>;

    async fn list(&self, dto: GetAuditDto) -> DomainResult<PaginatedResult<AuditRecord>>;
}
