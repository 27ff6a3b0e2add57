//! Create patients table migration

use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Patients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Patients::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Patients::FirstName).string_len(100).not_null())
                    .col(ColumnDef::new(Patients::LastName).string_len(100).not_null())
                    .col(ColumnDef::new(Patients::DateOfBirth).date().null())
                    .col(ColumnDef::new(Patients::Gender).string_len(20).null())
                    .col(ColumnDef::new(Patients::BloodGroup).string_len(5).null())
                    .col(ColumnDef::new(Patients::Phone).string_len(30).null())
                    .col(ColumnDef::new(Patients::Email).string_len(255).null())
                    .col(ColumnDef::new(Patients::Address).text().null())
                    .col(ColumnDef::new(Patients::UserId).string().null())
                    .col(ColumnDef::new(Patients::AssignedDoctorId).string().null())
                    .col(
                        ColumnDef::new(Patients::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Patients::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_patients_user_id")
                            .from(Patients::Table, Patients::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_patients_assigned_doctor_id")
                            .from(Patients::Table, Patients::AssignedDoctorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_patients_last_name")
                    .table(Patients::Table)
                    .col(Patients::LastName)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Patients::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Patients {
    Table,
    Id,
    FirstName,
    LastName,
    DateOfBirth,
    Gender,
    BloodGroup,
    Phone,
    Email,
    Address,
    UserId,
    AssignedDoctorId,
    CreatedAt,
    UpdatedAt,
}
