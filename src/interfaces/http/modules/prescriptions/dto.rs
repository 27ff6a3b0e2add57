//! Prescription DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::infrastructure::database::entities::prescription;

/// One prescribed line item. `item_id` links to inventory; items
/// without it (e.g. externally sourced drugs) skip stock handling.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrescriptionItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub drug: String,
    pub dosage: String,
    pub duration: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

/// Prescription API representation
#[derive(Debug, Serialize, ToSchema)]
pub struct PrescriptionDto {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub items: Vec<PrescriptionItem>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispensed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispensed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<prescription::Model> for PrescriptionDto {
    fn from(m: prescription::Model) -> Self {
        let items = serde_json::from_str(&m.items).unwrap_or_default();
        let status = match m.status {
            prescription::PrescriptionStatus::Pending => "pending",
            prescription::PrescriptionStatus::Dispensed => "dispensed",
            prescription::PrescriptionStatus::Cancelled => "cancelled",
        };
        Self {
            id: m.id,
            patient_id: m.patient_id,
            doctor_id: m.doctor_id,
            items,
            status: status.to_string(),
            notes: m.notes,
            dispensed_by: m.dispensed_by,
            dispensed_at: m.dispensed_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Create prescription request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePrescriptionRequest {
    #[validate(length(min = 1))]
    pub patient_id: String,
    #[validate(length(min = 1))]
    pub items: Vec<PrescriptionItem>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Dispense result: the updated prescription plus any inventory items
/// that dropped to or below their reorder level.
#[derive(Debug, Serialize, ToSchema)]
pub struct DispenseResponse {
    pub prescription: PrescriptionDto,
    /// Names of inventory items now flagged for reorder
    pub reorder_flagged: Vec<String>,
}

/// List prescriptions query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListPrescriptionsParams {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    /// Filter by status (pending, dispensed, cancelled)
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}
fn default_page_size() -> u32 {
    20
}
