pub mod dto;
pub mod handlers;

pub use dto::{
    CreatePrescriptionRequest, DispenseResponse, ListPrescriptionsParams, PrescriptionDto,
    PrescriptionItem,
};
pub use handlers::{
    cancel_prescription, create_prescription, dispense_prescription, get_prescription,
    list_prescriptions, PrescriptionHandlerState,
};
