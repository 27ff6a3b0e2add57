//! Appointment DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::infrastructure::database::entities::appointment;

/// Appointment API representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentDto {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<appointment::Model> for AppointmentDto {
    fn from(m: appointment::Model) -> Self {
        Self {
            id: m.id,
            patient_id: m.patient_id,
            doctor_id: m.doctor_id,
            scheduled_at: m.scheduled_at,
            status: m.status.to_string(),
            reason: m.reason,
            notes: m.notes,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Create appointment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAppointmentRequest {
    #[validate(length(min = 1))]
    pub patient_id: String,
    #[validate(length(min = 1))]
    pub doctor_id: String,
    pub scheduled_at: DateTime<Utc>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Update appointment request (reschedule or annotate)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAppointmentRequest {
    pub scheduled_at: Option<DateTime<Utc>>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Status transition request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAppointmentStatusRequest {
    /// One of: completed, cancelled, no_show
    pub status: String,
    pub notes: Option<String>,
}

/// List appointments query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListAppointmentsParams {
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    /// Filter by status (scheduled, completed, cancelled, no_show)
    pub status: Option<String>,
    /// Inclusive lower bound on scheduled time
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on scheduled time
    pub to: Option<DateTime<Utc>>,
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
