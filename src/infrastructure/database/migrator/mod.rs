//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users;
mod m20250301_000002_create_patients;
mod m20250301_000003_create_appointments;
mod m20250301_000004_create_prescriptions;
mod m20250301_000005_create_lab_tests;
mod m20250301_000006_create_invoices;
mod m20250301_000007_create_inventory_items;
mod m20250301_000008_create_audit_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_patients::Migration),
            Box::new(m20250301_000003_create_appointments::Migration),
            Box::new(m20250301_000004_create_prescriptions::Migration),
            Box::new(m20250301_000005_create_lab_tests::Migration),
            Box::new(m20250301_000006_create_invoices::Migration),
            Box::new(m20250301_000007_create_inventory_items::Migration),
            Box::new(m20250301_000008_create_audit_logs::Migration),
        ]
    }
}
