pub mod dto;
pub mod handlers;

pub use dto::{CreateInvoiceRequest, InvoiceDto, InvoiceItem, ListInvoicesParams};
pub use handlers::{
    cancel_invoice, create_invoice, get_invoice, issue_invoice, list_invoices, pay_invoice,
    InvoiceHandlerState,
};
