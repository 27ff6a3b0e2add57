//! Lab test DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::infrastructure::database::entities::lab_test;

/// Lab test API representation
#[derive(Debug, Serialize, ToSchema)]
pub struct LabTestDto {
    pub id: String,
    pub patient_id: String,
    pub ordered_by: String,
    pub test_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<lab_test::Model> for LabTestDto {
    fn from(m: lab_test::Model) -> Self {
        let result = m.result.as_deref().and_then(|raw| serde_json::from_str(raw).ok());
        let status = match m.status {
            lab_test::LabTestStatus::Ordered => "ordered",
            lab_test::LabTestStatus::InProgress => "in_progress",
            lab_test::LabTestStatus::Completed => "completed",
            lab_test::LabTestStatus::Cancelled => "cancelled",
        };
        Self {
            id: m.id,
            patient_id: m.patient_id,
            ordered_by: m.ordered_by,
            test_type: m.test_type,
            status: status.to_string(),
            result,
            processed_by: m.processed_by,
            completed_at: m.completed_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Order lab test request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OrderLabTestRequest {
    #[validate(length(min = 1))]
    pub patient_id: String,
    /// e.g. "cbc", "blood_glucose", "urinalysis"
    #[validate(length(min = 1, max = 100))]
    pub test_type: String,
}

/// Complete lab test request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteLabTestRequest {
    /// Free-form result payload recorded by the technician
    pub result: serde_json::Value,
}

/// List lab tests query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListLabTestsParams {
    pub patient_id: Option<String>,
    /// Filter by status (ordered, in_progress, completed, cancelled)
    pub status: Option<String>,
    pub test_type: Option<String>,
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
