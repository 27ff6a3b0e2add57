pub mod dto;
pub mod handlers;

pub use dto::{
    AdjustStockRequest, CreateInventoryItemRequest, InventoryItemDto, ListInventoryParams,
    UpdateInventoryItemRequest,
};
pub use handlers::{
    adjust_stock, create_inventory_item, deactivate_inventory_item, get_inventory_item,
    list_inventory, list_low_stock, update_inventory_item, InventoryHandlerState,
};
