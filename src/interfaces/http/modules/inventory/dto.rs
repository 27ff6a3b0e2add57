//! Inventory DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::infrastructure::database::entities::inventory_item;

/// Inventory item API representation
#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryItemDto {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub quantity: i32,
    pub reorder_level: i32,
    pub unit_price: Decimal,
    /// Stock is at or below the reorder level
    pub needs_reorder: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<inventory_item::Model> for InventoryItemDto {
    fn from(m: inventory_item::Model) -> Self {
        let needs_reorder = m.needs_reorder();
        Self {
            id: m.id,
            name: m.name,
            category: m.category,
            unit: m.unit,
            quantity: m.quantity,
            reorder_level: m.reorder_level,
            unit_price: m.unit_price,
            needs_reorder,
            is_active: m.is_active,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Create inventory item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    /// e.g. "capsule", "box", "ml"
    #[validate(length(max = 30))]
    pub unit: Option<String>,
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[validate(range(min = 0))]
    pub reorder_level: i32,
    pub unit_price: Decimal,
}

/// Update inventory item request (stock changes go through adjust-stock)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateInventoryItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 30))]
    pub unit: Option<String>,
    #[validate(range(min = 0))]
    pub reorder_level: Option<i32>,
    pub unit_price: Option<Decimal>,
}

/// Stock adjustment request. Positive delta restocks, negative
/// consumes; stock can never go below zero.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    pub delta: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// List inventory query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListInventoryParams {
    /// Search by item name
    pub search: Option<String>,
    pub category: Option<String>,
    /// Include deactivated items
    #[serde(default)]
    pub include_inactive: bool,
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
