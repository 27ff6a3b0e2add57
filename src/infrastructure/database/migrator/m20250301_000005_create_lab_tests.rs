//! Create lab_tests table migration

use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_users::Users;
use super::m20250301_000002_create_patients::Patients;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LabTests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LabTests::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LabTests::PatientId).string().not_null())
                    .col(ColumnDef::new(LabTests::OrderedBy).string().not_null())
                    .col(ColumnDef::new(LabTests::TestType).string_len(100).not_null())
                    .col(
                        ColumnDef::new(LabTests::Status)
                            .string_len(20)
                            .not_null()
                            .default("ordered"),
                    )
                    .col(ColumnDef::new(LabTests::Result).text().null())
                    .col(ColumnDef::new(LabTests::ProcessedBy).string().null())
                    .col(
                        ColumnDef::new(LabTests::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(LabTests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LabTests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lab_tests_patient_id")
                            .from(LabTests::Table, LabTests::PatientId)
                            .to(Patients::Table, Patients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lab_tests_ordered_by")
                            .from(LabTests::Table, LabTests::OrderedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_lab_tests_status")
                    .table(LabTests::Table)
                    .col(LabTests::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LabTests::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum LabTests {
    Table,
    Id,
    PatientId,
    OrderedBy,
    TestType,
    Status,
    Result,
    ProcessedBy,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}
