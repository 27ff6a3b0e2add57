//! Invoice DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::infrastructure::database::entities::invoice;

/// One billed line item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl InvoiceItem {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Invoice API representation
#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceDto {
    pub id: String,
    pub patient_id: String,
    pub items: Vec<InvoiceItem>,
    pub total_amount: Decimal,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<invoice::Model> for InvoiceDto {
    fn from(m: invoice::Model) -> Self {
        let items = serde_json::from_str(&m.items).unwrap_or_default();
        let status = match m.status {
            invoice::InvoiceStatus::Draft => "draft",
            invoice::InvoiceStatus::Issued => "issued",
            invoice::InvoiceStatus::Paid => "paid",
            invoice::InvoiceStatus::Cancelled => "cancelled",
        };
        Self {
            id: m.id,
            patient_id: m.patient_id,
            items,
            total_amount: m.total_amount,
            status: status.to_string(),
            paid_at: m.paid_at,
            created_by: m.created_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Create invoice request. The total is computed server-side from the
/// line items; client-supplied totals are not trusted.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1))]
    pub patient_id: String,
    #[validate(length(min = 1))]
    pub items: Vec<InvoiceItem>,
}

/// List invoices query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListInvoicesParams {
    pub patient_id: Option<String>,
    /// Filter by status (draft, issued, paid, cancelled)
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
