pub mod dto;
pub mod handlers;

pub use dto::{
    AppointmentDto, CreateAppointmentRequest, ListAppointmentsParams, UpdateAppointmentRequest,
    UpdateAppointmentStatusRequest,
};
pub use handlers::{
    create_appointment, get_appointment, list_appointments, update_appointment,
    update_appointment_status, AppointmentHandlerState,
};
