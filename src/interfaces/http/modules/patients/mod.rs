pub mod dto;
pub mod handlers;

pub use dto::{CreatePatientRequest, ListPatientsParams, PatientDto, UpdatePatientRequest};
pub use handlers::{
    create_patient, delete_patient, get_patient, list_patients, update_patient,
    PatientHandlerState,
};
