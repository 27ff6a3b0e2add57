pub mod dto;
pub mod handlers;

pub use dto::{CompleteLabTestRequest, LabTestDto, ListLabTestsParams, OrderLabTestRequest};
pub use handlers::{
    cancel_lab_test, complete_lab_test, get_lab_test, list_lab_tests, order_lab_test,
    start_lab_test, LabTestHandlerState,
};
