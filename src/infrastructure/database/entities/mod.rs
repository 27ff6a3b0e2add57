//! Database entities module

pub mod appointment;
pub mod audit_log;
pub mod inventory_item;
pub mod invoice;
pub mod lab_test;
pub mod patient;
pub mod prescription;
pub mod user;

pub use appointment::Entity as Appointment;
pub use audit_log::Entity as AuditLog;
pub use inventory_item::Entity as InventoryItem;
pub use invoice::Entity as Invoice;
pub use lab_test::Entity as LabTest;
pub use patient::Entity as Patient;
pub use prescription::Entity as Prescription;
pub use user::Entity as User;
